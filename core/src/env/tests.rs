//! Tests for environment composition and import binding

use super::*;
use crate::context::PlayerContext;

/// Provider answering each listed name with a constant
struct ConstProvider {
    name: &'static str,
    values: Vec<(&'static str, i32)>,
}

impl Provider<PlayerContext> for ConstProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn functions(&self) -> Vec<HostFunction<PlayerContext>> {
        self.values
            .iter()
            .map(|&(name, value)| {
                HostFunction::new(name, move |linker: &mut Linker<PlayerContext>, name: &str| {
                    linker.func_wrap(ENV, name, move || value).map(|_| ())
                })
            })
            .collect()
    }
}

/// Provider whose only function cannot be bound
struct BrokenProvider;

impl Provider<PlayerContext> for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }

    fn functions(&self) -> Vec<HostFunction<PlayerContext>> {
        vec![HostFunction::new(
            "explode",
            |_: &mut Linker<PlayerContext>, _: &str| Err(anyhow::anyhow!("cannot bind")),
        )]
    }
}

fn first_and_second() -> Environment<PlayerContext> {
    let providers: Vec<Box<dyn Provider<PlayerContext>>> = vec![
        Box::new(ConstProvider {
            name: "first",
            values: vec![("foo", 1)],
        }),
        Box::new(ConstProvider {
            name: "second",
            values: vec![("foo", 2), ("bar", 20)],
        }),
    ];
    Environment::compose(providers)
}

fn context() -> PlayerContext {
    PlayerContext::new("env-test", 1 << 20)
}

fn compile(engine: &WasmEngine, wat: &str) -> Module {
    engine.load_module(&wat::parse_str(wat).unwrap()).unwrap()
}

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn test_first_provider_wins() {
    let env = first_and_second();
    assert_eq!(env.resolve("foo"), Some("first"));
    assert_eq!(env.resolve("bar"), Some("second"));
    assert_eq!(env.resolve("baz"), None);
    assert_eq!(env.provider_names(), vec!["first", "second"]);
}

#[test]
fn test_first_match_is_what_gets_called() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(
        &engine,
        r#"
        (module
            (import "env" "foo" (func $foo (result i32)))
            (import "env" "bar" (func $bar (result i32)))
            (func (export "sum") (result i32)
                (i32.add (call $foo) (call $bar)))
        )
    "#,
    );

    let mut instance = first_and_second()
        .instantiate(&engine, &module, context())
        .unwrap();
    let sum = instance.typed_func::<(), i32>("sum").unwrap();
    assert_eq!(instance.call(&sum, ()).unwrap(), 21);
}

// ============================================================================
// Unresolved imports
// ============================================================================

#[test]
fn test_unknown_name_aborts_instantiation() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(
        &engine,
        r#"(module (import "env" "baz" (func (result i32))))"#,
    );

    let err = first_and_second()
        .instantiate(&engine, &module, context())
        .err()
        .unwrap();
    assert_eq!(
        err.downcast_ref::<BridgeError>(),
        Some(&BridgeError::UnresolvedImport {
            module: "env".to_string(),
            name: "baz".to_string(),
        })
    );
}

#[test]
fn test_foreign_namespace_is_unresolved() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(
        &engine,
        r#"(module (import "wasi_snapshot_preview1" "foo" (func (result i32))))"#,
    );

    let err = first_and_second()
        .instantiate(&engine, &module, context())
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::UnresolvedImport { module, .. }) if module == "wasi_snapshot_preview1"
    ));
}

#[test]
fn test_unresolved_imports_lists_every_gap() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(
        &engine,
        r#"
        (module
            (import "env" "foo" (func (result i32)))
            (import "env" "missing" (func))
            (import "env" "bar" (global i32))
        )
    "#,
    );

    let gaps = first_and_second().unresolved_imports(&module);
    assert_eq!(
        gaps,
        vec![
            BridgeError::UnresolvedImport {
                module: "env".to_string(),
                name: "missing".to_string(),
            },
            // Only functions are provided, whatever the name
            BridgeError::UnresolvedImport {
                module: "env".to_string(),
                name: "bar".to_string(),
            },
        ]
    );
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_only_requested_imports_are_bound() {
    let engine = WasmEngine::new().unwrap();
    let providers: Vec<Box<dyn Provider<PlayerContext>>> = vec![
        Box::new(BrokenProvider),
        Box::new(ConstProvider {
            name: "const",
            values: vec![("foo", 7)],
        }),
    ];
    let env = Environment::compose(providers);

    let quiet = compile(&engine, r#"(module (import "env" "foo" (func (result i32))))"#);
    assert!(env.instantiate(&engine, &quiet, context()).is_ok());

    let loud = compile(&engine, r#"(module (import "env" "explode" (func)))"#);
    let message = format!("{:#}", env.instantiate(&engine, &loud, context()).err().unwrap());
    assert!(message.contains("explode"), "{}", message);
    assert!(message.contains("broken"), "{}", message);
}

#[test]
fn test_ram_limit_enforced() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(&engine, r#"(module (memory (export "memory") 2))"#);
    let env = first_and_second();

    let tight = PlayerContext::new("tight", crate::wasm::WASM_PAGE_SIZE);
    assert!(env.instantiate(&engine, &module, tight).is_err());
    assert!(env.instantiate(&engine, &module, context()).is_ok());
}

#[test]
fn test_instance_label_comes_from_context() {
    let engine = WasmEngine::new().unwrap();
    let module = compile(&engine, "(module)");
    let instance = first_and_second()
        .instantiate(&engine, &module, context())
        .unwrap();
    assert_eq!(instance.label(), "env-test");
    assert!(instance.memory().is_err());
}
