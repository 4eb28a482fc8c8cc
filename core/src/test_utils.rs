//! Shared WAT fixtures and builders for unit tests

use crate::bridge::player_environment;
use crate::config::{ExportNames, PlayerProfile};
use crate::context::{CoordinatorContext, PlayerContext};
use crate::relay::PlayerInstance;
use crate::wasm::{ModuleInstance, WasmEngine};

/// Heap base every player fixture exports
pub const PLAYER_HEAP_BASE: u32 = 1024;

/// Coordinator layout: state blob, move records and index slot addresses
pub const STATE_ADDR: u32 = 256;
pub const MOVES_ADDR: u32 = 512;
pub const INDEX_ADDR: u32 = 1000;
/// Counter the coordinator fixture bumps on every tick
pub const TICK_COUNTER_ADDR: u32 = 1004;

// ============================================================================
// Player fixtures
// ============================================================================

/// Player with a stack allocator and the given `chess_move` body
///
/// `util_malloc` bumps `$top`, `util_free` resets `$top` to the freed
/// address, so freeing in reverse order restores the allocator exactly.
/// `init_calls` reports how often `chess_init` ran.
pub fn player_wat(decide_body: &str) -> String {
    format!(
        r#"
        (module
            (memory (export "memory") 1)
            (global (export "__heap_base") i32 (i32.const 1024))
            (global $top (mut i32) (i32.const 4096))
            (global $inits (mut i32) (i32.const 0))

            (func (export "chess_init") (param $base i32) (param $size i32)
                (global.set $top (local.get $base))
                (global.set $inits (i32.add (global.get $inits) (i32.const 1))))

            (func (export "init_calls") (result i32)
                (global.get $inits))

            (func (export "util_malloc") (param $size i32) (result i32)
                (local $addr i32)
                (local.set $addr (global.get $top))
                (global.set $top (i32.add (global.get $top) (local.get $size)))
                (local.get $addr))

            (func (export "util_free") (param $addr i32)
                (global.set $top (local.get $addr)))

            (func (export "chess_move")
                (param $state i32) (param $moves i32) (param $count i32) (param $index i32)
                (local $i i32) (local $best i32) (local $best_value i32) (local $value i32)
                {}
            )
        )
    "#,
        decide_body
    )
}

/// Picks the record whose first i32 is largest (8-byte records) and
/// scribbles over its copy of the state
pub fn max_player_wat() -> String {
    player_wat(
        r#"
        (i32.store (local.get $state) (i32.const 0xEEEEEEEE))
        (local.set $best_value (i32.const 0x80000000))
        (block $done
            (loop $next
                (br_if $done (i32.ge_s (local.get $i) (local.get $count)))
                (local.set $value
                    (i32.load (i32.add (local.get $moves) (i32.mul (local.get $i) (i32.const 8)))))
                (if (i32.gt_s (local.get $value) (local.get $best_value))
                    (then
                        (local.set $best_value (local.get $value))
                        (local.set $best (local.get $i))))
                (local.set $i (i32.add (local.get $i) (i32.const 1)))
                (br $next)))
        (i32.store (local.get $index) (local.get $best))
    "#,
    )
}

/// Player whose decision export traps
pub fn trapping_player_wat() -> String {
    player_wat("unreachable")
}

/// Player whose allocator always reports exhaustion
pub const OOM_PLAYER_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global (export "__heap_base") i32 (i32.const 1024))
        (func (export "util_malloc") (param i32) (result i32) (i32.const 0))
        (func (export "util_free") (param i32))
        (func (export "chess_move") (param i32 i32 i32 i32))
    )
"#;

/// Player whose allocator hands out an address past its memory
pub const WILD_PLAYER_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global (export "__heap_base") i32 (i32.const 1024))
        (func (export "util_malloc") (param i32) (result i32) (i32.const 0xFFFF0000))
        (func (export "util_free") (param i32))
        (func (export "chess_move") (param i32 i32 i32 i32))
    )
"#;

// ============================================================================
// Coordinator fixture
// ============================================================================

/// Coordinator relaying to player 1
///
/// State is 16 bytes at 256, three 8-byte records with values 1, 9, 5 at
/// 512 and the index slot at 1000. `relay(count)` forwards one decision;
/// `tick` clears the screen, relays three records and bumps the counter.
pub const COORDINATOR_WAT: &str = r#"
    (module
        (import "env" "move_player1_fn" (func $move1 (param i32 i32 i32 i32)))
        (import "env" "init_player1_fn" (func $init1 (param i32 i32)))
        (import "env" "ClearBackground" (func $clear (param i32)))
        (memory (export "memory") 1)
        (global (export "__heap_base") i32 (i32.const 2048))

        (data (i32.const 32) "\10\20\30\00")
        (data (i32.const 256) "\aa\aa\aa\aa\bb\bb\bb\bb\cc\cc\cc\cc\dd\dd\dd\dd")
        (data (i32.const 512)
            "\01\00\00\00\00\00\00\00\09\00\00\00\00\00\00\00\05\00\00\00\00\00\00\00")
        (data (i32.const 1000) "\ff\ff\ff\ff")

        (func (export "chess_state_size") (result i32) (i32.const 16))
        (func (export "chess_move_size") (result i32) (i32.const 8))

        (func (export "init") (param $base i32) (param $size i32)
            (call $init1 (local.get $base) (local.get $size)))

        (func (export "relay") (param $count i32)
            (call $move1 (i32.const 256) (i32.const 512) (local.get $count) (i32.const 1000)))

        (func (export "tick") (param $elapsed f32)
            (call $clear (i32.const 32))
            (call $move1 (i32.const 256) (i32.const 512) (i32.const 3) (i32.const 1000))
            (i32.store (i32.const 1004)
                (i32.add (i32.load (i32.const 1004)) (i32.const 1))))
    )
"#;

// ============================================================================
// Builders
// ============================================================================

/// Instantiate a minimal player from WAT text
pub fn player(engine: &WasmEngine, wat: &str) -> PlayerInstance {
    let wasm = wat::parse_str(wat).unwrap();
    let module = engine.load_module(&wasm).unwrap();
    let instance = player_environment(PlayerProfile::Minimal)
        .instantiate(engine, &module, PlayerContext::new("test-player", 1 << 20))
        .unwrap();
    PlayerInstance::new(instance, &ExportNames::default(), 8192).unwrap()
}

/// Instantiate the coordinator fixture (or another WAT) over `players`
pub fn coordinator(
    engine: &WasmEngine,
    wat: &str,
    players: Vec<PlayerInstance>,
) -> ModuleInstance<CoordinatorContext> {
    let wasm = wat::parse_str(wat).unwrap();
    let module = engine.load_module(&wasm).unwrap();
    let context = CoordinatorContext::new("test-coordinator", 1 << 20, ExportNames::default())
        .with_players(players);
    crate::bridge::coordinator_environment(context.players.len())
        .instantiate(engine, &module, context)
        .unwrap()
}
