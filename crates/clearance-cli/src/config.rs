//! # Config CLI — Check or print engine configuration.
//!
//! `check` parses and validates a YAML file and reports the first problem.
//! `show` prints the effective configuration, defaults filled in, as YAML.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use clearance_state::EngineConfig;

use crate::load_engine_config;

/// Config subcommand arguments.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a config file. Exits 1 if it is rejected.
    Check {
        /// YAML file to check.
        path: PathBuf,
    },

    /// Print the effective config as YAML.
    Show {
        /// YAML file; defaults to `$CLEARANCE_CONFIG` or built-ins.
        path: Option<PathBuf>,
    },
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs) -> Result<u8> {
    match &args.command {
        ConfigCommand::Check { path } => match EngineConfig::load(path) {
            Ok(config) => {
                println!("  {} OK", path.display());
                println!(
                    "  shipping window: {} days from {:?}",
                    config.shipping_fees.abort_days, config.shipping_anchor
                );
                println!(
                    "  duty window:     {} days from {:?}",
                    config.duty_fees.abort_days, config.duty_anchor
                );
                Ok(0)
            }
            Err(e) => {
                println!("  {} REJECTED: {e}", path.display());
                Ok(1)
            }
        },
        ConfigCommand::Show { path } => {
            let config = load_engine_config(path.as_deref())?;
            print!("{}", render_yaml(&config)?);
            Ok(0)
        }
    }
}

/// YAML rendering of `config`.
pub fn render_yaml(config: &EngineConfig) -> Result<String> {
    serde_yaml::to_string(config).context("failed to render config as YAML")
}
