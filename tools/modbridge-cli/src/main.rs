//! modbridge CLI - headless runner for coordinator and player modules
//!
//! # Commands
//!
//! - `modbridge run` - Start the bridge and tick the coordinator
//! - `modbridge check` - Report imports no provider can satisfy
//!
//! # Usage
//!
//! ```bash
//! # Coordinator main.wasm against two computer players, 300 ticks
//! modbridge run --module-dir wasm --white random --black minimax --frames 300
//!
//! # Verify a roster before running it
//! modbridge check --module-dir wasm --black minimax
//! ```
//!
//! Settings come from `modbridge.toml` in the platform config directory
//! (or `--config`); command-line flags override individual fields.

mod check;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use modbridge_core::{BridgeConfig, PlayerConfig};

/// modbridge - host bridge for sandboxed WASM modules
#[derive(Parser)]
#[command(name = "modbridge")]
#[command(about = "Run a WASM coordinator against WASM players")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge and tick the coordinator headlessly
    Run(run::RunArgs),

    /// Compile every module and list unresolved imports
    Check(check::CheckArgs),
}

/// Config file selection and per-field overrides shared by all commands
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Path to modbridge.toml (defaults to the platform config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory module names are resolved against
    #[arg(long)]
    pub module_dir: Option<PathBuf>,

    /// Coordinator module
    #[arg(long)]
    pub coordinator: Option<String>,

    /// White player module (e.g. human, random)
    #[arg(long)]
    pub white: Option<String>,

    /// Black player module
    #[arg(long)]
    pub black: Option<String>,

    /// Directory asset file names are resolved against
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the config file, then apply command-line overrides
    pub fn resolve(&self) -> Result<BridgeConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => BridgeConfig::load(path)?,
            None => match BridgeConfig::default_path() {
                Some(path) => BridgeConfig::load_or_default(&path)?,
                None => BridgeConfig::default(),
            },
        };

        if let Some(dir) = &self.module_dir {
            config.module_dir = dir.clone();
        }
        if let Some(coordinator) = &self.coordinator {
            config.coordinator = coordinator.clone();
        }
        // A new selection drops any profile pinned for the previous module
        if let Some(white) = &self.white {
            config.players.white = PlayerConfig::new(white.as_str());
        }
        if let Some(black) = &self.black {
            config.players.black = PlayerConfig::new(black.as_str());
        }
        if let Some(dir) = &self.asset_dir {
            config.asset_dir = Some(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run::execute(args),
        Commands::Check(args) => check::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modbridge.toml");
        std::fs::write(
            &path,
            r#"
frame_rate = 30

[players.white]
module = "random"
profile = "interactive"
"#,
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(path),
            white: Some("minimax".to_string()),
            module_dir: Some(PathBuf::from("wasm")),
            ..ConfigArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.module_dir, PathBuf::from("wasm"));
        assert_eq!(config.players.white, PlayerConfig::new("minimax"));
        assert_eq!(config.players.black.module, "human");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            config: Some(dir.path().join("missing.toml")),
            ..ConfigArgs::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "modbridge",
            "run",
            "--white",
            "random",
            "--frames",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.frames, Some(10));
                assert_eq!(args.config.white.as_deref(), Some("random"));
            }
            Commands::Check(_) => panic!("expected run"),
        }
    }
}
