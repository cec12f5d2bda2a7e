//! # clearance-cli — Operator CLI for the Clearance Engine
//!
//! Provides the `clearance` command-line interface. Every subcommand works
//! offline against the same crates the API serves from, so quotes and
//! transition listings match what the service would compute.
//!
//! ## Subcommands
//!
//! - `clearance quote` — Shipping, escalated fee and duty quotes.
//! - `clearance transitions` — The lifecycle graph with actors and gates.
//! - `clearance gateway` — Sign or verify payment callback signatures.
//! - `clearance config` — Check or print an engine config file.
//!
//! ```bash
//! clearance quote fee --base 1000.00 --days 12
//! clearance quote duty --value 25000 --hs 61091000 --country DE --days 7
//! clearance transitions --from document-approved
//! clearance config check deploy/engine.yaml
//! ```

pub mod config;
pub mod gateway;
pub mod quote;
pub mod transitions;

use std::path::Path;

use anyhow::Context;
use clearance_state::EngineConfig;

/// Load the engine config from `path`, or from `$CLEARANCE_CONFIG`, or
/// fall back to defaults.
pub fn load_engine_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load engine config from {}", path.display())),
        None => EngineConfig::from_env().context("failed to load engine config from environment"),
    }
}

/// Render `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
