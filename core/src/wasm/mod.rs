//! WASM runtime wrapper
//!
//! Thin abstractions over wasmtime for compiling and instantiating the
//! coordinator and player modules.
//!
//! - [`WasmEngine`] - Shared engine (one per bridge)
//! - [`ModuleInstance`] - One instantiated module with its own store and memory

mod engine;
mod instance;


pub use engine::{WASM_PAGE_SIZE, WasmEngine};
pub use instance::{HEAP_BASE_EXPORT, MEMORY_EXPORT, ModuleInstance};
