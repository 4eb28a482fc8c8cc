//! Instantiated compute module

use anyhow::Result;
use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::env::HostState;
use crate::error::BridgeError;

/// Name of the linear memory export
pub const MEMORY_EXPORT: &str = "memory";

/// Name of the global marking the first free address at startup
pub const HEAP_BASE_EXPORT: &str = "__heap_base";

/// One module with its own store, memory and fixed import table
pub struct ModuleInstance<T: HostState> {
    store: Store<T>,
    instance: Instance,
    memory: Option<Memory>,
}

impl<T: HostState> ModuleInstance<T> {
    pub(crate) fn new(mut store: Store<T>, instance: Instance) -> Result<Self> {
        let memory = instance.get_memory(&mut store, MEMORY_EXPORT);
        Ok(Self {
            store,
            instance,
            memory,
        })
    }

    /// Label of the module this instance was created from
    pub fn label(&self) -> &str {
        self.store.data().label()
    }

    /// Look up a typed export, failing with [`BridgeError::MissingExport`]
    pub fn typed_func<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>, BridgeError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        self.instance
            .get_typed_func::<P, R>(&mut self.store, name)
            .map_err(|_| BridgeError::MissingExport {
                module: self.store.data().label().to_string(),
                export: name.to_string(),
            })
    }

    /// Look up a typed export that the module may legitimately omit
    pub fn optional_func<P, R>(&mut self, name: &str) -> Option<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        self.instance.get_typed_func::<P, R>(&mut self.store, name).ok()
    }

    /// First free address the module reports at startup
    pub fn heap_base(&mut self) -> Result<u32, BridgeError> {
        self.instance
            .get_global(&mut self.store, HEAP_BASE_EXPORT)
            .and_then(|global| global.get(&mut self.store).i32())
            .map(|base| base as u32)
            .ok_or_else(|| BridgeError::MissingExport {
                module: self.store.data().label().to_string(),
                export: HEAP_BASE_EXPORT.to_string(),
            })
    }

    /// Current view of the module's memory
    pub fn memory(&self) -> Result<&[u8], BridgeError> {
        let memory = self.memory.ok_or(BridgeError::NoMemory)?;
        Ok(memory.data(&self.store))
    }

    /// Current mutable view of the module's memory
    pub fn memory_mut(&mut self) -> Result<&mut [u8], BridgeError> {
        let memory = self.memory.ok_or(BridgeError::NoMemory)?;
        Ok(memory.data_mut(&mut self.store))
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<T> {
        &mut self.store
    }

    pub fn context(&self) -> &T {
        self.store.data()
    }

    pub fn context_mut(&mut self) -> &mut T {
        self.store.data_mut()
    }

    /// Call a typed export on this instance's store
    pub fn call<P, R>(&mut self, func: &TypedFunc<P, R>, params: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        func.call(&mut self.store, params)
    }
}
