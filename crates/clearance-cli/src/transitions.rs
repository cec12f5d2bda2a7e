//! # Transitions CLI — Inspect the lifecycle graph.
//!
//! ```bash
//! clearance transitions
//! clearance transitions --from import-approved
//! clearance transitions --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use clearance_state::{ShipmentStatus, TransitionRule, TRANSITIONS};

use crate::print_json;

/// Transitions subcommand arguments.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Only list edges leaving this status (wire name or slug).
    #[arg(long)]
    pub from: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Rules leaving `from`, or the whole table.
pub fn select_rules(from: Option<&str>) -> Result<Vec<&'static TransitionRule>> {
    match from {
        Some(name) => {
            let status = ShipmentStatus::from_name(name)
                .with_context(|| format!("unknown status '{name}'"))?;
            Ok(status.outgoing().collect())
        }
        None => Ok(TRANSITIONS.iter().collect()),
    }
}

/// Execute the transitions subcommand.
pub fn run_transitions(args: &TransitionsArgs) -> Result<u8> {
    let rules = select_rules(args.from.as_deref())?;
    if args.json {
        print_json(&rules)?;
        return Ok(0);
    }
    if rules.is_empty() {
        println!("  no outgoing transitions (terminal status)");
        return Ok(0);
    }
    for rule in &rules {
        let gates: Vec<String> = rule.gates.iter().map(|g| format!("{g:?}")).collect();
        println!(
            "  {:<26} -> {:<26} {:<18} {}",
            rule.from.as_str(),
            rule.to.as_str(),
            rule.actor.describe(),
            if gates.is_empty() { "-".to_string() } else { gates.join(", ") }
        );
    }
    println!();
    println!("Total: {} transitions", rules.len());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_table_without_filter() {
        assert_eq!(select_rules(None).unwrap().len(), TRANSITIONS.len());
    }

    #[test]
    fn filter_accepts_slug() {
        let rules = select_rules(Some("document-approved")).unwrap();
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r.from == ShipmentStatus::DocumentApproved));
        assert!(rules.iter().any(|r| r.to == ShipmentStatus::Aborted));
    }

    #[test]
    fn terminal_status_has_no_edges() {
        assert!(select_rules(Some("DELIVERED")).unwrap().is_empty());
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!(select_rules(Some("LOST")).is_err());
    }
}
