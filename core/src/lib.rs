//! modbridge core - host bridge between sandboxed WASM modules
//!
//! One coordinator module delegates decisions to player modules. Every
//! module has its own linear memory; the bridge marshals strings, integers,
//! floats and formatted text across that boundary, supplies the imported
//! capability surface, and relays move decisions between instances.
//!
//! # Architecture
//!
//! - [`memory`] - Bounds-checked codec over a module's linear memory
//! - [`ResourceRegistry`] - Dense handles for interned asset paths
//! - [`providers`] - Graphics, input, audio, format and relay imports
//! - [`Environment`] - Ordered provider composition, first match wins
//! - [`PlayerInstance`] - Cross-instance move relay into one player
//! - [`Scheduler`] - Fixed-rate pacing of the coordinator's tick
//! - [`Bridge`] - Assembles everything from a [`BridgeConfig`]

pub mod bridge;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod memory;
pub mod providers;
pub mod registry;
pub mod relay;
pub mod scheduler;
#[cfg(test)]
pub mod test_utils;
pub mod wasm;

pub use bridge::{Bridge, Coordinator, Frame, ImportReport, PlayerModule};
pub use config::{BridgeConfig, ExportNames, PlayerConfig, PlayerProfile};
pub use context::{CoordinatorContext, PlayerContext};
pub use env::{Environment, HostFunction, HostState, Provider};
pub use error::BridgeError;
pub use providers::{Color, DrawCommand};
pub use registry::{AssetRoot, Handle, ResourceRegistry};
pub use relay::{PlayerInstance, RecordSizes, RelayRequest};
pub use scheduler::Scheduler;
pub use wasm::{ModuleInstance, WasmEngine};
