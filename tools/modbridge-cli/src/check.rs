//! Check command - verify that every module's imports can be bound

use anyhow::{Result, bail};
use clap::Args;
use modbridge_core::Bridge;

use crate::ConfigArgs;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let reports = Bridge::check(&config)?;

    let mut unresolved = 0;
    for report in &reports {
        if report.unresolved.is_empty() {
            println!("ok      {} ({})", report.label, report.path.display());
            continue;
        }
        println!("FAILED  {} ({})", report.label, report.path.display());
        for error in &report.unresolved {
            println!("        {}", error);
        }
        unresolved += report.unresolved.len();
    }

    if unresolved > 0 {
        bail!("{} unresolved import(s)", unresolved);
    }
    Ok(())
}
