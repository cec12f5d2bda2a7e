//! # clearance CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clearance_cli::config::{run_config, ConfigArgs};
use clearance_cli::gateway::{run_gateway, GatewayArgs};
use clearance_cli::quote::{run_quote, QuoteArgs};
use clearance_cli::transitions::{run_transitions, TransitionsArgs};

/// Operator tooling for the parcel clearance engine.
///
/// Quotes fees and duty with the engine's own calculators, lists the
/// lifecycle graph, signs gateway callbacks, and checks engine config.
#[derive(Parser, Debug)]
#[command(name = "clearance", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shipping, escalated fee and duty quotes.
    Quote(QuoteArgs),

    /// List lifecycle transitions with their actors and gates.
    Transitions(TransitionsArgs),

    /// Sign or verify payment gateway callbacks.
    Gateway(GatewayArgs),

    /// Check or print engine configuration.
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Quote(args) => run_quote(&args),
        Commands::Transitions(args) => run_transitions(&args),
        Commands::Gateway(args) => run_gateway(&args),
        Commands::Config(args) => run_config(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_cli::quote::QuoteCommand;

    #[test]
    fn parse_fee_quote() {
        let cli = Cli::try_parse_from([
            "clearance", "quote", "fee", "--base", "1000", "--days", "12", "--window", "duty",
        ])
        .unwrap();
        match cli.command {
            Commands::Quote(args) => match args.command {
                QuoteCommand::Fee { base, days, window } => {
                    assert_eq!(base, "1000");
                    assert_eq!(days, 12);
                    assert_eq!(window, clearance_cli::quote::Window::Duty);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "clearance", "quote", "shipping", "--weight-grams", "2400", "--json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Quote(ref a) if a.json));
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["clearance", "-vv", "transitions"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn gateway_verify_requires_signature() {
        assert!(Cli::try_parse_from([
            "clearance", "gateway", "verify", "--order-id", "o", "--payment-id", "p",
        ])
        .is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
