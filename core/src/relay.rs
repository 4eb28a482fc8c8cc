//! Cross-instance move relay
//!
//! A player module never sees the coordinator's memory. For each decision
//! the relay copies the state blob, the candidate moves and the index slot
//! into regions the player allocates itself, calls its decision export, and
//! copies back only the 4-byte index. All three regions are freed before
//! the relay returns, on success and on failure alike.
//!
//! Pointer input has a single owner, the coordinator. It is lent to the
//! player for the duration of the decision call, so a click consumed by
//! the player is gone when the coordinator looks for it.


use anyhow::Result;
use smallvec::SmallVec;
use wasmtime::TypedFunc;

use crate::config::ExportNames;
use crate::context::PlayerContext;
use crate::error::BridgeError;
use crate::memory;
use crate::providers::InputState;
use crate::wasm::ModuleInstance;

/// Size of the index slot the player writes its choice into
pub const INDEX_SLOT_SIZE: u32 = 4;

/// Record sizes queried from the coordinator before each relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSizes {
    /// Bytes in one shared state blob
    pub state: u32,
    /// Bytes in one candidate move record
    pub record: u32,
}

/// Coordinator-side addresses of one decision request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRequest {
    pub state_addr: u32,
    pub moves_addr: u32,
    pub count: u32,
    pub index_addr: u32,
}

/// A player module with its allocator and decision exports resolved
pub struct PlayerInstance {
    module: ModuleInstance<PlayerContext>,
    exports: ExportNames,
    init_fn: Option<TypedFunc<(u32, u32), ()>>,
    allocate_fn: TypedFunc<u32, u32>,
    free_fn: TypedFunc<u32, ()>,
    decide_fn: TypedFunc<(u32, u32, u32, u32), ()>,
    heap_size: u32,
    initialized: bool,
}

impl PlayerInstance {
    /// Resolve the player exports; fails if the allocator or decision export is missing
    pub fn new(
        mut module: ModuleInstance<PlayerContext>,
        exports: &ExportNames,
        heap_size: u32,
    ) -> Result<Self, BridgeError> {
        let init_fn = module.optional_func::<(u32, u32), ()>(&exports.player_init);
        let allocate_fn = module.typed_func::<u32, u32>(&exports.allocate)?;
        let free_fn = module.typed_func::<u32, ()>(&exports.free)?;
        let decide_fn = module.typed_func::<(u32, u32, u32, u32), ()>(&exports.decide)?;

        Ok(Self {
            module,
            exports: exports.clone(),
            init_fn,
            allocate_fn,
            free_fn,
            decide_fn,
            heap_size,
            initialized: false,
        })
    }

    pub fn label(&self) -> &str {
        self.module.label()
    }

    pub fn module(&self) -> &ModuleInstance<PlayerContext> {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut ModuleInstance<PlayerContext> {
        &mut self.module
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the player's init export once, handing it its own heap
    ///
    /// Later calls are no-ops so the host and the coordinator can both
    /// request initialization without resetting the player's allocator.
    pub fn init(&mut self) -> Result<(), BridgeError> {
        if self.initialized {
            tracing::debug!(player = self.label(), "Player already initialized");
            return Ok(());
        }
        let base = self.module.heap_base()?;
        if let Some(init) = self.init_fn.clone() {
            let size = self.heap_size;
            self.module
                .call(&init, (base, size))
                .map_err(|e| self.fault(&self.exports.player_init, &e))?;
        }
        self.initialized = true;
        tracing::debug!(player = self.label(), base, size = self.heap_size, "Player initialized");
        Ok(())
    }

    /// Allocate `size` bytes through the player's own allocator
    pub fn allocate(&mut self, size: u32) -> Result<u32, BridgeError> {
        let addr = self
            .module
            .call(&self.allocate_fn, size)
            .map_err(|e| self.fault(&self.exports.allocate, &e))?;

        let fits = self
            .module
            .memory()
            .map(|data| memory::read_bytes(data, addr, size as usize).is_ok())
            .unwrap_or(false);
        if addr == 0 || !fits {
            // The allocator did hand out a region; give it back
            if addr != 0
                && let Err(e) = self.release(addr)
            {
                tracing::warn!(
                    player = self.label(),
                    addr,
                    "Failed to free unusable region: {}",
                    e
                );
            }
            return Err(BridgeError::AllocationFailure {
                player: self.label().to_string(),
                size,
                addr,
            });
        }
        Ok(addr)
    }

    /// Return a region to the player's allocator
    pub fn release(&mut self, addr: u32) -> Result<(), BridgeError> {
        self.module
            .call(&self.free_fn, addr)
            .map_err(|e| self.fault(&self.exports.free, &e))
    }

    /// Relay one decision request from the coordinator's memory
    ///
    /// `coordinator` is the coordinator's current memory view. Only the
    /// index slot at `request.index_addr` is written back into it. `input`
    /// is swapped into the player's context while it decides and swapped
    /// back afterwards, whatever the outcome.
    pub fn relay(
        &mut self,
        coordinator: &mut [u8],
        input: &mut InputState,
        sizes: RecordSizes,
        request: RelayRequest,
    ) -> Result<(), BridgeError> {
        let moves_size =
            sizes
                .record
                .checked_mul(request.count)
                .ok_or(BridgeError::SizeOverflow {
                    record_size: sizes.record,
                    count: request.count,
                })?;

        // Reject bad coordinator ranges before the player allocates anything
        memory::read_bytes(coordinator, request.state_addr, sizes.state as usize)?;
        memory::read_bytes(coordinator, request.moves_addr, moves_size as usize)?;
        memory::read_bytes(coordinator, request.index_addr, INDEX_SLOT_SIZE as usize)?;

        let mut allocations: SmallVec<[u32; 3]> = SmallVec::new();
        let outcome = self.relay_with(
            coordinator,
            input,
            [sizes.state, moves_size, INDEX_SLOT_SIZE],
            request,
            &mut allocations,
        );
        let released = self.release_all(&allocations);
        outcome.and(released)
    }

    fn relay_with(
        &mut self,
        coordinator: &mut [u8],
        input: &mut InputState,
        region_sizes: [u32; 3],
        request: RelayRequest,
        allocations: &mut SmallVec<[u32; 3]>,
    ) -> Result<(), BridgeError> {
        let sources = [request.state_addr, request.moves_addr, request.index_addr];

        for (source, size) in sources.into_iter().zip(region_sizes) {
            let local = self.allocate(size)?;
            allocations.push(local);
            let bytes = memory::read_bytes(coordinator, source, size as usize)?;
            memory::write_bytes(self.module.memory_mut()?, local, bytes)?;
        }

        let (state, moves, index) = (allocations[0], allocations[1], allocations[2]);
        std::mem::swap(&mut self.module.context_mut().input, input);
        let decided = self
            .module
            .call(&self.decide_fn, (state, moves, request.count, index));
        std::mem::swap(&mut self.module.context_mut().input, input);
        decided.map_err(|e| self.fault(&self.exports.decide, &e))?;

        // Re-fetch: the decision may have grown the player's memory
        let slot = memory::read_bytes(self.module.memory()?, index, INDEX_SLOT_SIZE as usize)?;
        memory::write_bytes(coordinator, request.index_addr, slot)?;
        Ok(())
    }

    /// Free in reverse allocation order, reporting every failure and returning the first
    fn release_all(&mut self, allocations: &[u32]) -> Result<(), BridgeError> {
        let mut first_error = None;
        for &addr in allocations.iter().rev() {
            if let Err(e) = self.release(addr) {
                tracing::error!(player = self.label(), addr, "Failed to free relay region: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn fault(&self, export: &str, error: &anyhow::Error) -> BridgeError {
        BridgeError::PlayerFault {
            player: self.label().to_string(),
            export: export.to_string(),
            message: format!("{:#}", error),
        }
    }
}
