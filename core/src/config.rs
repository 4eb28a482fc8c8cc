//! Bridge configuration (modbridge.toml)
//!
//! Module roster, pacing, memory limits and export names. Every field has a
//! default, so an empty file (or no file at all) describes the standard
//! setup: `main.wasm` coordinating two `human` players at 60 Hz.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::providers::FontMetrics;
use crate::registry::AssetRoot;
use crate::wasm::WASM_PAGE_SIZE;

/// File name of the configuration inside the config directory
pub const CONFIG_FILE: &str = "modbridge.toml";

/// Player selection that gets the interactive provider set by default
pub const HUMAN_PLAYER: &str = "human";

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Directory module names are resolved against (default: current directory)
    #[serde(default = "default_module_dir")]
    pub module_dir: PathBuf,
    /// Coordinator module (default: main)
    #[serde(default = "default_coordinator")]
    pub coordinator: String,
    /// Per-side player selection
    #[serde(default)]
    pub players: PlayersConfig,
    /// Target tick rate in Hz (default: 60)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Heap size handed to every `init` export (default: 8192)
    #[serde(default = "default_heap_size")]
    pub heap_size: u32,
    /// Maximum linear memory per module in bytes (default: 16 MiB)
    #[serde(default = "default_ram_limit")]
    pub ram_limit: usize,
    /// Directory asset file names are resolved against (default: none)
    #[serde(default)]
    pub asset_dir: Option<PathBuf>,
    /// Horizontal advance per glyph as a fraction of font size (default: 0.6)
    #[serde(default = "default_text_advance")]
    pub text_advance: f32,
    /// Export names the bridge calls
    #[serde(default)]
    pub exports: ExportNames,
}

/// The two sides, in relay slot order (white is `move_player1_fn`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlayersConfig {
    #[serde(default)]
    pub white: PlayerConfig,
    #[serde(default)]
    pub black: PlayerConfig,
}

impl PlayersConfig {
    /// Sides in slot order
    pub fn roster(&self) -> [(&'static str, &PlayerConfig); 2] {
        [("white", &self.white), ("black", &self.black)]
    }
}

/// One side's module selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player module (default: human)
    #[serde(default = "default_player")]
    pub module: String,
    /// Provider set; derived from the module name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PlayerProfile>,
}

impl PlayerConfig {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            profile: None,
        }
    }

    /// Explicit profile, or interactive for `human` and minimal otherwise
    pub fn effective_profile(&self) -> PlayerProfile {
        self.profile.unwrap_or(if self.module == HUMAN_PLAYER {
            PlayerProfile::Interactive
        } else {
            PlayerProfile::Minimal
        })
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::new(default_player())
    }
}

/// Provider set a player module is instantiated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerProfile {
    /// Logging and formatting only
    Minimal,
    /// Logging, formatting, drawing and pointer input
    Interactive,
}

/// Names of the exports the bridge looks up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNames {
    /// Coordinator `(heap_base, heap_size)` (default: init)
    #[serde(default = "default_init")]
    pub init: String,
    /// Coordinator `(elapsed_ms: f32)` (default: tick)
    #[serde(default = "default_tick")]
    pub tick: String,
    /// Coordinator `() -> state bytes` (default: chess_state_size)
    #[serde(default = "default_state_size")]
    pub state_size: String,
    /// Coordinator `() -> move record bytes` (default: chess_move_size)
    #[serde(default = "default_move_size")]
    pub move_size: String,
    /// Player `(heap_base, heap_size)` (default: chess_init)
    #[serde(default = "default_player_init")]
    pub player_init: String,
    /// Player `(size) -> addr` (default: util_malloc)
    #[serde(default = "default_allocate")]
    pub allocate: String,
    /// Player `(addr)` (default: util_free)
    #[serde(default = "default_free")]
    pub free: String,
    /// Player `(state, moves, count, index)` (default: chess_move)
    #[serde(default = "default_decide")]
    pub decide: String,
}

fn default_module_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_coordinator() -> String {
    "main".to_string()
}
fn default_player() -> String {
    HUMAN_PLAYER.to_string()
}
fn default_frame_rate() -> u32 {
    60
}
fn default_heap_size() -> u32 {
    8192
}
fn default_ram_limit() -> usize {
    16 * 1024 * 1024
}
fn default_text_advance() -> f32 {
    0.6
}

fn default_init() -> String {
    "init".to_string()
}
fn default_tick() -> String {
    "tick".to_string()
}
fn default_state_size() -> String {
    "chess_state_size".to_string()
}
fn default_move_size() -> String {
    "chess_move_size".to_string()
}
fn default_player_init() -> String {
    "chess_init".to_string()
}
fn default_allocate() -> String {
    "util_malloc".to_string()
}
fn default_free() -> String {
    "util_free".to_string()
}
fn default_decide() -> String {
    "chess_move".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            module_dir: default_module_dir(),
            coordinator: default_coordinator(),
            players: PlayersConfig::default(),
            frame_rate: default_frame_rate(),
            heap_size: default_heap_size(),
            ram_limit: default_ram_limit(),
            asset_dir: None,
            text_advance: default_text_advance(),
            exports: ExportNames::default(),
        }
    }
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            init: default_init(),
            tick: default_tick(),
            state_size: default_state_size(),
            move_size: default_move_size(),
            player_init: default_player_init(),
            allocate: default_allocate(),
            free: default_free(),
            decide: default_decide(),
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/modbridge`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.modbridge", "", "modbridge")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

impl BridgeConfig {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write the configuration, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create '{}'", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config '{}'", path.display()))?;
        Ok(())
    }

    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.frame_rate > 0, "frame_rate must be positive");
        ensure!(self.heap_size > 0, "heap_size must be positive");
        ensure!(
            self.ram_limit >= WASM_PAGE_SIZE,
            "ram_limit must be at least one page ({} bytes), got {}",
            WASM_PAGE_SIZE,
            self.ram_limit
        );
        ensure!(
            self.text_advance.is_finite() && self.text_advance > 0.0,
            "text_advance must be a positive number"
        );
        ensure!(!self.coordinator.is_empty(), "coordinator module is empty");
        for (side, player) in self.players.roster() {
            ensure!(!player.module.is_empty(), "{} player module is empty", side);
        }

        let exports = &self.exports;
        for (key, name) in [
            ("init", &exports.init),
            ("tick", &exports.tick),
            ("state_size", &exports.state_size),
            ("move_size", &exports.move_size),
            ("player_init", &exports.player_init),
            ("allocate", &exports.allocate),
            ("free", &exports.free),
            ("decide", &exports.decide),
        ] {
            ensure!(!name.is_empty(), "exports.{} is empty", key);
        }
        Ok(())
    }

    /// Path of a module selection
    ///
    /// A bare name gets a `.wasm` suffix; relative paths are taken from
    /// `module_dir`.
    pub fn module_path(&self, selection: &str) -> PathBuf {
        let path = Path::new(selection);
        let file = if path.extension().is_some() {
            path.to_path_buf()
        } else {
            path.with_extension("wasm")
        };
        if file.is_absolute() {
            file
        } else {
            self.module_dir.join(file)
        }
    }

    pub fn coordinator_path(&self) -> PathBuf {
        self.module_path(&self.coordinator)
    }

    pub fn asset_root(&self) -> AssetRoot {
        AssetRoot::new(self.asset_dir.clone())
    }

    pub fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            advance_ratio: self.text_advance,
        }
    }
}
