//! Bridge assembly and frame loop
//!
//! Loads the module roster named by a [`BridgeConfig`], instantiates the
//! players with their profile's providers, instantiates the coordinator
//! with the full surface plus the relay, and paces the coordinator's tick.


use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use wasmtime::{Module, TypedFunc};

use crate::config::{BridgeConfig, ExportNames, PlayerProfile};
use crate::context::{CoordinatorContext, PlayerContext};
use crate::env::{Environment, Provider};
use crate::error::BridgeError;
use crate::providers::{
    AudioProvider, AudioState, DrawCommand, FormatProvider, GraphicsProvider, GraphicsState,
    InputProvider, RelayProvider,
};
use crate::relay::PlayerInstance;
use crate::scheduler::Scheduler;
use crate::wasm::{ModuleInstance, WasmEngine};

/// Environment for a player module of the given profile
pub fn player_environment(profile: PlayerProfile) -> Environment<PlayerContext> {
    let providers: Vec<Box<dyn Provider<PlayerContext>>> = match profile {
        PlayerProfile::Minimal => vec![Box::new(FormatProvider)],
        PlayerProfile::Interactive => vec![
            Box::new(FormatProvider),
            Box::new(GraphicsProvider),
            Box::new(InputProvider),
        ],
    };
    Environment::compose(providers)
}

/// Environment for the coordinator, relaying to `players` player slots
pub fn coordinator_environment(players: usize) -> Environment<CoordinatorContext> {
    let providers: Vec<Box<dyn Provider<CoordinatorContext>>> = vec![
        Box::new(GraphicsProvider),
        Box::new(InputProvider),
        Box::new(AudioProvider),
        Box::new(FormatProvider),
        Box::new(RelayProvider::new(players)),
    ];
    Environment::compose(providers)
}

/// A compiled player module waiting to be instantiated
pub struct PlayerModule {
    pub label: String,
    pub profile: PlayerProfile,
    pub module: Module,
}

/// The coordinator instance with its lifecycle exports resolved
pub struct Coordinator {
    module: ModuleInstance<CoordinatorContext>,
    init_fn: Option<TypedFunc<(u32, u32), ()>>,
    tick_fn: TypedFunc<f32, ()>,
}

impl Coordinator {
    pub fn new(
        mut module: ModuleInstance<CoordinatorContext>,
        exports: &ExportNames,
    ) -> Result<Self, BridgeError> {
        let init_fn = module.optional_func::<(u32, u32), ()>(&exports.init);
        let tick_fn = module.typed_func::<f32, ()>(&exports.tick)?;
        Ok(Self {
            module,
            init_fn,
            tick_fn,
        })
    }

    /// Call `init(__heap_base, heap_size)` if the module exports it
    pub fn init(&mut self, heap_size: u32) -> Result<()> {
        let Some(init) = self.init_fn.clone() else {
            tracing::debug!(module = self.module.label(), "No init export");
            return Ok(());
        };
        let base = self.module.heap_base()?;
        self.module
            .call(&init, (base, heap_size))
            .with_context(|| format!("init() failed in '{}'", self.module.label()))
    }

    /// Run one tick; any trap inside it, relays included, surfaces here
    pub fn tick(&mut self, elapsed_ms: f32) -> Result<()> {
        self.module.call(&self.tick_fn, elapsed_ms)
    }

    pub fn module(&self) -> &ModuleInstance<CoordinatorContext> {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut ModuleInstance<CoordinatorContext> {
        &mut self.module
    }

    pub fn context(&self) -> &CoordinatorContext {
        self.module.context()
    }

    pub fn context_mut(&mut self) -> &mut CoordinatorContext {
        self.module.context_mut()
    }
}

/// Output of one frame that ran a tick
#[derive(Debug)]
pub struct Frame {
    /// Milliseconds reported to the tick
    pub elapsed_ms: f32,
    /// Outcome of the tick; errors have already been logged
    pub result: Result<()>,
    /// Draw commands recorded by the coordinator, then by each player
    pub commands: Vec<DrawCommand>,
    /// Resolved paths of sounds played during the tick
    pub sounds: Vec<String>,
}

/// Imports a module requests that its environment cannot provide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub label: String,
    pub path: PathBuf,
    pub unresolved: Vec<BridgeError>,
}

/// A coordinator, its players and the tick scheduler
pub struct Bridge {
    coordinator: Coordinator,
    scheduler: Scheduler,
}

impl Bridge {
    /// Load every module named by `config` and start the bridge
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;
        let engine = WasmEngine::new()?;

        let coordinator = load_checked(&engine, config, &config.coordinator_path())?;
        let mut players = Vec::new();
        for (side, player) in config.players.roster() {
            let path = config.module_path(&player.module);
            players.push(PlayerModule {
                label: format!("{}:{}", side, player.module),
                profile: player.effective_profile(),
                module: load_checked(&engine, config, &path)?,
            });
        }

        Self::new(&engine, config, &coordinator, players, Instant::now())
    }

    /// Instantiate and initialize already compiled modules
    ///
    /// Players are initialized first, each with its own heap, then the
    /// coordinator. `start` is the scheduler's initial baseline.
    pub fn new(
        engine: &WasmEngine,
        config: &BridgeConfig,
        coordinator: &Module,
        players: Vec<PlayerModule>,
        start: Instant,
    ) -> Result<Self> {
        let mut roster = Vec::with_capacity(players.len());
        for player in players {
            let context = PlayerContext::new(player.label.as_str(), config.ram_limit)
                .with_graphics(GraphicsState::new(config.asset_root(), config.font_metrics()));
            let module = player_environment(player.profile)
                .instantiate(engine, &player.module, context)
                .with_context(|| format!("Failed to start player '{}'", player.label))?;
            let mut instance = PlayerInstance::new(module, &config.exports, config.heap_size)?;
            instance.init()?;
            tracing::info!(player = %player.label, profile = ?player.profile, "Player ready");
            roster.push(instance);
        }

        let player_count = roster.len();
        let label = config.coordinator.as_str();
        let context = CoordinatorContext::new(label, config.ram_limit, config.exports.clone())
            .with_graphics(GraphicsState::new(config.asset_root(), config.font_metrics()))
            .with_audio(AudioState::new(config.asset_root()))
            .with_players(roster);
        let module = coordinator_environment(player_count)
            .instantiate(engine, coordinator, context)
            .context("Failed to start coordinator")?;
        let mut coordinator = Coordinator::new(module, &config.exports)?;
        coordinator.init(config.heap_size)?;
        tracing::info!(
            coordinator = %config.coordinator,
            players = player_count,
            frame_rate = config.frame_rate,
            "Bridge ready"
        );

        Ok(Self {
            coordinator,
            scheduler: Scheduler::with_rate(config.frame_rate, start),
        })
    }

    /// Compile every configured module and list imports nothing provides
    pub fn check(config: &BridgeConfig) -> Result<Vec<ImportReport>> {
        config.validate()?;
        let engine = WasmEngine::new()?;
        let mut reports = Vec::new();

        let path = config.coordinator_path();
        let module = load_checked(&engine, config, &path)?;
        reports.push(ImportReport {
            label: config.coordinator.clone(),
            unresolved: coordinator_environment(config.players.roster().len())
                .unresolved_imports(&module),
            path,
        });

        for (side, player) in config.players.roster() {
            let path = config.module_path(&player.module);
            let module = load_checked(&engine, config, &path)?;
            reports.push(ImportReport {
                label: format!("{}:{}", side, player.module),
                unresolved: player_environment(player.effective_profile())
                    .unresolved_imports(&module),
                path,
            });
        }
        Ok(reports)
    }

    /// Run the scheduler for one display frame
    ///
    /// Returns `None` when no tick was due. A failed tick is returned in
    /// [`Frame::result`] and does not stop later frames.
    pub fn on_frame(&mut self, now: Instant) -> Option<Frame> {
        let coordinator = &mut self.coordinator;
        let mut elapsed_ms = 0.0;
        let result = self.scheduler.drive(now, |elapsed| {
            elapsed_ms = elapsed;
            coordinator.tick(elapsed)
        })?;

        let commands = self.take_commands();
        let sounds = self.coordinator.context_mut().audio.take_pending();
        tracing::trace!(
            elapsed_ms,
            commands = commands.len(),
            sounds = sounds.len(),
            "Frame ticked"
        );
        Some(Frame {
            elapsed_ms,
            result,
            commands,
            sounds,
        })
    }

    /// Drain draw commands from the coordinator and every player, in slot order
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        let context = self.coordinator.context_mut();
        let mut commands = context.graphics.take_commands();
        for player in &mut context.players {
            commands.extend(player.module_mut().context_mut().graphics.take_commands());
        }
        commands
    }

    // Pointer events land in the coordinator's input state only; a player
    // sees it while a decision is relayed to it.

    pub fn pointer_moved(&mut self, x: i32, y: i32) {
        self.coordinator.context_mut().input.pointer_moved(x, y);
    }

    pub fn pointer_pressed(&mut self, x: i32, y: i32) {
        self.coordinator.context_mut().input.pointer_pressed(x, y);
    }

    pub fn pointer_released(&mut self, x: i32, y: i32) {
        self.coordinator.context_mut().input.pointer_released(x, y);
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    pub fn players(&self) -> &[PlayerInstance] {
        &self.coordinator.context().players
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

/// Compile a module file and check its memory against the RAM limit
fn load_checked(engine: &WasmEngine, config: &BridgeConfig, path: &Path) -> Result<Module> {
    let module = engine.load_module_file(path)?;
    WasmEngine::validate_module_memory(&module, config.ram_limit)
        .with_context(|| format!("Module {} exceeds the RAM limit", path.display()))?;
    Ok(module)
}
