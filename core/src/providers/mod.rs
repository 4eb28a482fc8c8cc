//! Capability providers
//!
//! Each provider defines one group of `env` imports. Their host functions
//! fetch the calling module's memory fresh on every call and act on state
//! owned by the store context through the accessor traits below.
//!
//! - [`GraphicsProvider`] - window setup, drawing primitives, texture loading
//! - [`InputProvider`] - cursor position and edge-triggered button queries
//! - [`AudioProvider`] - sound loading and fire-and-forget playback
//! - [`FormatProvider`] - printf-style formatting, logging, `memset`
//! - [`RelayProvider`] - cross-instance move relay to player modules

pub mod audio;
pub mod format;
pub mod graphics;
pub mod input;
pub mod relay;


use wasmtime::{Caller, Extern, Memory};

use crate::error::BridgeError;
use crate::wasm::MEMORY_EXPORT;

pub use audio::{AudioHost, AudioProvider, AudioState};
pub use format::FormatProvider;
pub use graphics::{
    Color, DrawCommand, FontMetrics, GraphicsHost, GraphicsProvider, GraphicsState, TextureInfo,
    WindowInfo,
};
pub use input::{InputHost, InputProvider, InputState};
pub use relay::{RelayHost, RelayProvider};

/// The caller's exported memory, looked up on every call
pub(crate) fn caller_memory<T>(caller: &mut Caller<'_, T>) -> Result<Memory, BridgeError> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or(BridgeError::NoMemory)
}
