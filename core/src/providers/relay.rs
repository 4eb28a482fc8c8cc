//! Relay provider
//!
//! Exposes one `move_player{N}_fn` and one `init_player{N}_fn` import per
//! player slot. Slots are numbered from 1 in import names and from 0 in the
//! roster.

use anyhow::Result;
use wasmtime::{Caller, Extern, Linker};

use super::{InputState, caller_memory};
use crate::config::ExportNames;
use crate::env::{ENV, HostFunction, HostState, Provider};
use crate::error::BridgeError;
use crate::relay::{PlayerInstance, RecordSizes, RelayRequest};

/// Store contexts that own a player roster
pub trait RelayHost: HostState {
    /// Player in roster slot `slot`, counted from 0
    fn player(&mut self, slot: usize) -> Option<&mut PlayerInstance>;

    /// Player in slot `slot` together with the pointer input it borrows
    /// while deciding
    fn player_with_input(&mut self, slot: usize) -> Option<(&mut PlayerInstance, &mut InputState)>;

    /// Export names used for size queries on the calling module
    fn exports(&self) -> &ExportNames;
}

/// Provides the relay imports for a fixed number of players
pub struct RelayProvider {
    players: usize,
}

impl RelayProvider {
    pub fn new(players: usize) -> Self {
        Self { players }
    }

    /// Import name of the decision relay for 1-based player `n`
    pub fn move_import(n: usize) -> String {
        format!("move_player{}_fn", n)
    }

    /// Import name of the init relay for 1-based player `n`
    pub fn init_import(n: usize) -> String {
        format!("init_player{}_fn", n)
    }
}

impl<T: RelayHost> Provider<T> for RelayProvider {
    fn name(&self) -> &str {
        "relay"
    }

    fn functions(&self) -> Vec<HostFunction<T>> {
        let mut functions = Vec::with_capacity(self.players * 2);
        for slot in 0..self.players {
            functions.push(HostFunction::new(
                Self::move_import(slot + 1),
                move |linker: &mut Linker<T>, name: &str| {
                    linker
                        .func_wrap(
                            ENV,
                            name,
                            move |caller: Caller<'_, T>,
                                  state: u32,
                                  moves: u32,
                                  count: i32,
                                  index: u32|
                                  -> Result<()> {
                                move_player(caller, slot, state, moves, count, index)
                            },
                        )
                        .map(|_| ())
                },
            ));
            functions.push(HostFunction::new(
                Self::init_import(slot + 1),
                move |linker: &mut Linker<T>, name: &str| {
                    linker
                        .func_wrap(
                            ENV,
                            name,
                            move |caller: Caller<'_, T>, base: u32, size: u32| -> Result<()> {
                                init_player(caller, slot, base, size)
                            },
                        )
                        .map(|_| ())
                },
            ));
        }
        functions
    }
}

/// Call a `() -> i32` size export on the calling module
fn query_size<T: HostState>(caller: &mut Caller<'_, T>, export: &str) -> Result<u32> {
    let module = caller.data().label().to_string();
    let missing = || BridgeError::MissingExport {
        module: module.clone(),
        export: export.to_string(),
    };
    let func = caller
        .get_export(export)
        .and_then(Extern::into_func)
        .ok_or_else(missing)?;
    let size = func
        .typed::<(), u32>(&*caller)
        .map_err(|_| missing())?
        .call(&mut *caller, ())?;
    Ok(size)
}

fn move_player<T: RelayHost>(
    mut caller: Caller<'_, T>,
    slot: usize,
    state_addr: u32,
    moves_addr: u32,
    count: i32,
    index_addr: u32,
) -> Result<()> {
    let count = u32::try_from(count).map_err(|_| BridgeError::NegativeCount(count))?;

    let exports = caller.data().exports();
    let (state_export, move_export) = (exports.state_size.clone(), exports.move_size.clone());
    let sizes = RecordSizes {
        state: query_size(&mut caller, &state_export)?,
        record: query_size(&mut caller, &move_export)?,
    };

    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    let (player, input) = ctx
        .player_with_input(slot)
        .ok_or(BridgeError::UnknownPlayer(slot))?;
    player.relay(
        data,
        input,
        sizes,
        RelayRequest {
            state_addr,
            moves_addr,
            count,
            index_addr,
        },
    )?;

    tracing::trace!(player = player.label(), count, "Move relayed");
    Ok(())
}

/// The coordinator's arguments are addresses in its own memory, so they
/// are ignored; the player initializes against its own heap.
fn init_player<T: RelayHost>(
    mut caller: Caller<'_, T>,
    slot: usize,
    _base: u32,
    _size: u32,
) -> Result<()> {
    let player = caller
        .data_mut()
        .player(slot)
        .ok_or(BridgeError::UnknownPlayer(slot))?;
    player.init()?;
    Ok(())
}
