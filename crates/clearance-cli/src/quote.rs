//! # Quote CLI — Shipping, escalated fee and duty quotes.
//!
//! Runs the same calculators the engine prices orders with. Rates, tariff
//! and fee schedules come from the engine config (`--config`, then
//! `$CLEARANCE_CONFIG`, then defaults).
//!
//! ## Usage
//!
//! ```bash
//! clearance quote shipping --weight-grams 2400
//! clearance quote fee --base 1000.00 --days 12 --window duty
//! clearance quote duty --value 25000 --hs 61091000 --country DE --days 7
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use clearance_core::{Amount, Clock, HsCode, RateBps, SystemClock};
use clearance_fees::{
    compute_duty, DutyAssessment, DutyRates, FeeAssessment, FeeSchedule, RateTable,
    ShippingTariff,
};
use clearance_state::EngineConfig;

use crate::{load_engine_config, print_json};

/// Quote subcommand arguments.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Engine config YAML. Defaults to `$CLEARANCE_CONFIG` or built-ins.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: QuoteCommand,
}

/// Which escalation window to quote against.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    Shipping,
    Duty,
}

/// Available quote subcommands.
#[derive(Subcommand, Debug)]
pub enum QuoteCommand {
    /// Base shipping cost for a parcel weight.
    Shipping {
        /// Gross weight in grams.
        #[arg(long)]
        weight_grams: u64,
    },

    /// Escalated total for a base amount after some days in the window.
    Fee {
        /// Base amount in major units (e.g. 1000.00).
        #[arg(long)]
        base: String,

        /// Whole days elapsed since the window opened.
        #[arg(long)]
        days: i64,

        /// Schedule to apply.
        #[arg(long, value_enum, default_value = "shipping")]
        window: Window,
    },

    /// Duty, GST and late fine on a declared value.
    Duty {
        /// Declared customs value in major units.
        #[arg(long)]
        value: String,

        /// Destination HS code.
        #[arg(long)]
        hs: String,

        /// Destination country.
        #[arg(long)]
        country: String,

        /// Whole days elapsed since the duty window opened.
        #[arg(long, default_value_t = 0)]
        days: i64,

        /// Override the duty rate, in percent.
        #[arg(long)]
        duty_rate: Option<String>,

        /// Override the GST rate, in percent.
        #[arg(long)]
        gst_rate: Option<String>,
    },
}

/// Execute the quote subcommand.
pub fn run_quote(args: &QuoteArgs) -> Result<u8> {
    let config = load_engine_config(args.config.as_deref())?;
    match &args.command {
        QuoteCommand::Shipping { weight_grams } => {
            run_shipping(&config.tariff, *weight_grams, args.json)
        }
        QuoteCommand::Fee { base, days, window } => {
            let schedule = schedule_for(&config, *window);
            run_fee(schedule, base, *days, args.json)
        }
        QuoteCommand::Duty {
            value,
            hs,
            country,
            days,
            duty_rate,
            gst_rate,
        } => {
            let rates = resolve_rates(
                &config,
                hs,
                country,
                duty_rate.as_deref(),
                gst_rate.as_deref(),
            )?;
            run_duty(&config.duty_fees, value, rates, *days, args.json)
        }
    }
}

fn schedule_for(config: &EngineConfig, window: Window) -> &FeeSchedule {
    match window {
        Window::Shipping => &config.shipping_fees,
        Window::Duty => &config.duty_fees,
    }
}

fn run_shipping(tariff: &ShippingTariff, weight_grams: u64, json: bool) -> Result<u8> {
    let cost = tariff.quote(weight_grams)?;
    if json {
        print_json(&serde_json::json!({
            "weight_grams": weight_grams,
            "chargeable_kg": ShippingTariff::chargeable_kg(weight_grams),
            "base_fee": tariff.base_fee,
            "per_kg": tariff.per_kg,
            "total": cost,
        }))?;
    } else {
        println!("  chargeable kg: {}", ShippingTariff::chargeable_kg(weight_grams));
        println!("  base fee:      {}", tariff.base_fee);
        println!("  per kg:        {}", tariff.per_kg);
        println!("  total:         {cost}");
    }
    Ok(0)
}

/// Assess `base` (major units) after `days` under `schedule`.
pub fn fee_quote(schedule: &FeeSchedule, base: &str, days: i64) -> Result<FeeAssessment> {
    let base = Amount::parse(base).with_context(|| format!("invalid base amount '{base}'"))?;
    Ok(schedule.assess_days(base, days)?)
}

fn run_fee(schedule: &FeeSchedule, base: &str, days: i64, json: bool) -> Result<u8> {
    let assessment = fee_quote(schedule, base, days)?;
    if json {
        print_json(&assessment)?;
        return Ok(if assessment.is_cancelled() { 2 } else { 0 });
    }
    match assessment {
        FeeAssessment::Payable {
            days_elapsed,
            base,
            fine,
            total,
        } => {
            println!("  days elapsed: {days_elapsed}");
            println!("  base:         {base}");
            println!("  fine:         {fine}");
            println!("  total:        {total}");
            Ok(0)
        }
        FeeAssessment::Cancelled { days_elapsed } => {
            println!(
                "  cancelled: window closed after {days_elapsed} days (limit {})",
                schedule.abort_days
            );
            Ok(2)
        }
    }
}

/// Rates from the overrides, else the configured table.
pub fn resolve_rates(
    config: &EngineConfig,
    hs: &str,
    country: &str,
    duty_rate: Option<&str>,
    gst_rate: Option<&str>,
) -> Result<DutyRates> {
    let hs = HsCode::new(hs)?;
    let configured = config.rates.rates_for(&hs, country);
    let pick = |label: &str, raw: Option<&str>, fallback: Option<RateBps>| -> Result<RateBps> {
        match raw {
            Some(raw) => RateBps::parse_percent(raw)
                .with_context(|| format!("invalid {label} rate '{raw}'")),
            None => fallback.with_context(|| {
                format!("no {label} rate configured for HS {hs} into {country}; pass --{label}-rate")
            }),
        }
    };
    Ok(DutyRates {
        duty_rate: pick("duty", duty_rate, configured.map(|r| r.duty_rate))?,
        gst_rate: pick("gst", gst_rate, configured.map(|r| r.gst_rate))?,
    })
}

/// Duty assessment for `value` (major units) after `days` in the window.
pub fn duty_quote(
    schedule: &FeeSchedule,
    value: &str,
    rates: DutyRates,
    days: i64,
) -> Result<DutyAssessment> {
    let value = Amount::parse(value).with_context(|| format!("invalid declared value '{value}'"))?;
    let opened = SystemClock.now();
    Ok(compute_duty(value, rates, schedule, opened, opened.plus_days(days))?)
}

fn run_duty(
    schedule: &FeeSchedule,
    value: &str,
    rates: DutyRates,
    days: i64,
    json: bool,
) -> Result<u8> {
    let assessment = duty_quote(schedule, value, rates, days)?;
    if json {
        print_json(&assessment)?;
        return Ok(if matches!(assessment, DutyAssessment::Cancelled { .. }) { 2 } else { 0 });
    }
    match assessment {
        DutyAssessment::Payable(quote) => {
            println!("  declared value: {}", quote.declared_value);
            println!("  duty ({} bps):   {}", quote.duty_rate.bps(), quote.duty);
            println!("  gst ({} bps):    {}", quote.gst_rate.bps(), quote.gst);
            println!("  days elapsed:   {}", quote.days_elapsed);
            println!("  fine:           {}", quote.fine);
            println!("  total payable:  {}", quote.total_payable);
            Ok(0)
        }
        DutyAssessment::Cancelled { days_elapsed } => {
            println!("  cancelled: duty window closed after {days_elapsed} days");
            Ok(2)
        }
    }
}
