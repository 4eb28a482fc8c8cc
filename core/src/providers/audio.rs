//! Audio provider
//!
//! Sound loading interns the resolved path; playback is fire-and-forget and
//! only queues the path for the host's audio backend.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use super::caller_memory;
use crate::env::{ENV, HostFunction, HostState, Provider};
use crate::memory;
use crate::registry::{AssetRoot, Handle, ResourceRegistry};

/// Host-side audio state for one module instance
#[derive(Debug, Default)]
pub struct AudioState {
    sounds: ResourceRegistry,
    assets: AssetRoot,
    pending: Vec<String>,
}

impl AudioState {
    pub fn new(assets: AssetRoot) -> Self {
        Self {
            assets,
            ..Self::default()
        }
    }

    /// Intern a sound by file name
    pub fn load(&mut self, file: &str) -> Handle {
        self.sounds.intern(&self.assets.resolve(file))
    }

    /// Queue playback of a previously loaded sound
    pub fn play(&mut self, handle: Handle) -> Result<(), crate::BridgeError> {
        let path = self.sounds.resolve(handle)?.to_string();
        self.pending.push(path);
        Ok(())
    }

    pub fn sounds(&self) -> &ResourceRegistry {
        &self.sounds
    }

    /// Drain queued playback requests
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

/// Store contexts that carry audio state
pub trait AudioHost: HostState {
    fn audio(&mut self) -> &mut AudioState;
}

/// Provides sound imports
pub struct AudioProvider;

impl<T: AudioHost> Provider<T> for AudioProvider {
    fn name(&self) -> &str {
        "audio"
    }

    fn functions(&self) -> Vec<HostFunction<T>> {
        vec![
            HostFunction::new("LoadSoundInternal", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, load_sound::<T>).map(|_| ())
            }),
            HostFunction::new("PlaySound", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, play_sound::<T>).map(|_| ())
            }),
        ]
    }
}

fn load_sound<T: AudioHost>(mut caller: Caller<'_, T>, file_ptr: u32, id_ptr: u32) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    let file = memory::read_cstring(data, file_ptr)?;
    let handle = ctx.audio().load(&file);
    memory::write_i32(data, id_ptr, handle as i32)?;
    Ok(())
}

fn play_sound<T: AudioHost>(mut caller: Caller<'_, T>, sound_ptr: u32) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    // Sound begins with its id field, like Texture2D
    let handle = memory::read_u32(data, sound_ptr)?;
    ctx.audio().play(handle)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;

    #[test]
    fn test_play_queues_resolved_path() {
        let mut audio = AudioState::new(AssetRoot::default());
        let handle = audio.load("move.ogg");
        audio.play(handle).unwrap();
        audio.play(handle).unwrap();
        assert_eq!(audio.take_pending(), vec!["move.ogg", "move.ogg"]);
        assert!(audio.take_pending().is_empty());
    }

    #[test]
    fn test_play_unknown_handle() {
        let mut audio = AudioState::default();
        assert_eq!(audio.play(3), Err(BridgeError::UnknownHandle(3)));
    }
}
