//! WASM engine wrapper for compiling compute modules

use std::path::Path;

use anyhow::{Context, Result};
use wasmtime::{Engine, ExternType, Module};

/// WASM page size in bytes
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Shared WASM engine (one per bridge, shared by every module it hosts)
pub struct WasmEngine {
    engine: Engine,
}

impl WasmEngine {
    /// Create a new WASM engine with default configuration
    pub fn new() -> Result<Self> {
        let engine = Engine::default();
        Ok(Self { engine })
    }

    /// Get a reference to the underlying wasmtime engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile a module from bytes (binary or WAT text)
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, bytes).context("Failed to compile WASM module")
    }

    /// Read and compile a module from disk
    pub fn load_module_file(&self, path: &Path) -> Result<Module> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read module {}", path.display()))?;
        self.load_module(&bytes)
            .with_context(|| format!("Failed to load module {}", path.display()))
    }

    /// Reject a module whose exported memory starts larger than `ram_limit`
    ///
    /// The store limiter would refuse it anyway, but only at instantiation
    /// and with a less useful message.
    pub fn validate_module_memory(module: &Module, ram_limit: usize) -> Result<()> {
        let memories = module.exports().filter_map(|export| match export.ty() {
            ExternType::Memory(ty) => Some((export.name(), ty)),
            _ => None,
        });

        for (name, ty) in memories {
            let initial = (ty.minimum() as usize).saturating_mul(WASM_PAGE_SIZE);
            anyhow::ensure!(
                initial <= ram_limit,
                "memory '{}' starts at {} pages ({} bytes), over the {} byte limit",
                name,
                ty.minimum(),
                initial,
                ram_limit
            );
            if ty.maximum().is_none() {
                tracing::debug!(memory = name, ram_limit, "Unbounded memory capped by limiter");
            }
        }
        Ok(())
    }
}
