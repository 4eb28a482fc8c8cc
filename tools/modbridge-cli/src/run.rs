//! Run command - start the bridge and tick the coordinator
//!
//! Headless: draw commands are counted and sounds are logged, nothing is
//! rasterised. Display frames are paced with `thread::sleep` at the
//! configured frame rate.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use modbridge_core::Bridge;

use crate::ConfigArgs;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Stop after this many ticks (runs until interrupted if unset)
    #[arg(long)]
    pub frames: Option<u64>,
}

/// Execute the run command
pub fn execute(args: RunArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let mut bridge = Bridge::from_config(&config)?;

    // Poll twice per tick interval so ticks never wait a full extra frame
    let poll = Duration::from_secs(1) / config.frame_rate.max(1) / 2;
    let mut failed = 0u64;

    loop {
        if let Some(limit) = args.frames
            && bridge.scheduler().ticks() >= limit
        {
            break;
        }

        std::thread::sleep(poll);
        let Some(frame) = bridge.on_frame(Instant::now()) else {
            continue;
        };

        if frame.result.is_err() {
            failed += 1;
        }
        for sound in &frame.sounds {
            tracing::info!(%sound, "PlaySound");
        }
        tracing::debug!(
            tick = bridge.scheduler().ticks(),
            elapsed_ms = frame.elapsed_ms,
            commands = frame.commands.len(),
            "Frame"
        );
    }

    tracing::info!(
        ticks = bridge.scheduler().ticks(),
        failed,
        "Run finished"
    );
    Ok(())
}
