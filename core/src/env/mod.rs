//! Environment multiplexing
//!
//! An [`Environment`] composes an ordered list of [`Provider`]s into one
//! import surface. The name table is built once in [`Environment::compose`]:
//! the first provider that defines a name owns it, later definitions are
//! shadowed. At instantiation every import the module requests is looked up
//! in that table and bound; an import nobody defines aborts instantiation
//! with [`BridgeError::UnresolvedImport`].

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use wasmtime::{ExternType, Linker, Module, Store};

use crate::error::BridgeError;
use crate::wasm::{ModuleInstance, WasmEngine};

/// Import namespace every provider function is registered under
pub const ENV: &str = "env";

/// Registers one host function into a linker under the given name
pub type Binder<T> = Box<dyn Fn(&mut Linker<T>, &str) -> Result<()> + Send + Sync>;

/// One named host function offered by a provider
pub struct HostFunction<T> {
    name: String,
    bind: Binder<T>,
}

impl<T> HostFunction<T> {
    pub fn new<F>(name: impl Into<String>, bind: F) -> Self
    where
        F: Fn(&mut Linker<T>, &str) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            bind: Box::new(bind),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Per-store host state every module context carries
pub trait HostState: Send + 'static {
    /// Human-readable module label for log lines
    fn label(&self) -> &str;

    /// Resource limiter enforcing the per-module RAM limit
    fn limits(&mut self) -> &mut wasmtime::StoreLimits;
}

/// A bundle of host functions implementing part of the import surface
///
/// Providers are stateless descriptors; the state their functions act on
/// lives in the store context `T`, so it is created with the instance and
/// dropped with it.
pub trait Provider<T>: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// The functions this provider defines, in registration order
    fn functions(&self) -> Vec<HostFunction<T>>;
}

struct Binding<T> {
    provider: usize,
    bind: Binder<T>,
}

/// An ordered provider list resolved into a name table
pub struct Environment<T> {
    providers: Vec<Box<dyn Provider<T>>>,
    table: HashMap<String, Binding<T>>,
}

impl<T: HostState> Environment<T> {
    /// Build the lookup table; earlier providers win name conflicts
    pub fn compose(providers: Vec<Box<dyn Provider<T>>>) -> Self {
        let mut table: HashMap<String, Binding<T>> = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            for function in provider.functions() {
                if let Some(existing) = table.get(&function.name) {
                    tracing::debug!(
                        name = %function.name,
                        kept = providers[existing.provider].name(),
                        shadowed = provider.name(),
                        "Import defined by more than one provider"
                    );
                    continue;
                }
                table.insert(
                    function.name,
                    Binding {
                        provider: index,
                        bind: function.bind,
                    },
                );
            }
        }

        Self { providers, table }
    }

    /// Name of the provider that will serve `name`, if any
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.table
            .get(name)
            .map(|binding| self.providers[binding.provider].name())
    }

    /// Names of the composed providers, in priority order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Every import of `module` that this environment cannot satisfy
    pub fn unresolved_imports(&self, module: &Module) -> Vec<BridgeError> {
        module
            .imports()
            .filter(|import| {
                import.module() != ENV
                    || !matches!(import.ty(), ExternType::Func(_))
                    || !self.table.contains_key(import.name())
            })
            .map(|import| BridgeError::UnresolvedImport {
                module: import.module().to_string(),
                name: import.name().to_string(),
            })
            .collect()
    }

    /// Build a linker holding exactly the imports `module` requests
    pub fn linker_for(&self, engine: &WasmEngine, module: &Module) -> Result<Linker<T>> {
        let mut linker = Linker::new(engine.engine());

        for import in module.imports() {
            let binding = match (import.module(), import.ty()) {
                (ENV, ExternType::Func(_)) => self.table.get(import.name()),
                _ => None,
            };
            let Some(binding) = binding else {
                return Err(BridgeError::UnresolvedImport {
                    module: import.module().to_string(),
                    name: import.name().to_string(),
                }
                .into());
            };
            (binding.bind)(&mut linker, import.name()).with_context(|| {
                format!(
                    "Failed to bind '{}' from provider '{}'",
                    import.name(),
                    self.providers[binding.provider].name()
                )
            })?;
        }

        Ok(linker)
    }

    /// Instantiate `module` against this environment with a fresh store
    pub fn instantiate(
        &self,
        engine: &WasmEngine,
        module: &Module,
        context: T,
    ) -> Result<ModuleInstance<T>> {
        let label = context.label().to_string();
        let linker = self.linker_for(engine, module)?;

        let mut store = Store::new(engine.engine(), context);
        store.limiter(|ctx| ctx.limits());

        let instance = linker
            .instantiate(&mut store, module)
            .with_context(|| format!("Failed to instantiate module '{}'", label))?;

        tracing::debug!(
            module = %label,
            imports = module.imports().len(),
            providers = ?self.provider_names(),
            "Module instantiated"
        );

        ModuleInstance::new(store, instance)
    }
}
