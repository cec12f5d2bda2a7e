//! # Pricing
//!
//! Amounts due on a shipment at a point in time. Shipping and duty
//! escalate from their configured anchors; return and destruction charges
//! are flat. Nothing here writes.

use clearance_core::{Amount, Timestamp};
use clearance_fees::{compute_duty, DutyAssessment, DutyRates, FeeAssessment, FeeError, RateTable};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::ClearanceError;
use crate::payment::PaymentKind;
use crate::shipment::Shipment;

/// An escalating payment that is currently due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentWindow {
    /// What is due.
    pub kind: PaymentKind,
    /// When the window started counting.
    pub opened_at: Timestamp,
    /// When the window closes.
    pub deadline: Timestamp,
    /// Amount due now, or `Cancelled`.
    pub assessment: FeeAssessment,
}

/// Fee computation bound to a config and a rate table.
#[derive(Clone, Copy)]
pub struct Pricing<'a> {
    config: &'a EngineConfig,
    rates: &'a dyn RateTable,
}

impl<'a> Pricing<'a> {
    /// Bind a config and rate table.
    pub fn new(config: &'a EngineConfig, rates: &'a dyn RateTable) -> Self {
        Self { config, rates }
    }

    /// Duty and GST rates for the shipment's destination classification.
    pub fn duty_rates(&self, shipment: &Shipment) -> Result<DutyRates, ClearanceError> {
        let hs = &shipment.classification.destination_hs_code;
        let country = &shipment.receiver.address.country;
        self.rates.rates_for(hs, country).ok_or_else(|| {
            ClearanceError::missing(format!("duty rates for HS {hs} into {country}"))
        })
    }

    /// Un-escalated amount of a payment.
    pub fn base_for(&self, shipment: &Shipment, kind: PaymentKind) -> Result<Amount, ClearanceError> {
        match kind {
            PaymentKind::Shipping => Ok(self.config.tariff.quote(shipment.goods.weight_grams)?),
            PaymentKind::Duty => {
                let rates = self.duty_rates(shipment)?;
                let value = shipment.goods.declared_value;
                let duty = value
                    .apply_rate(rates.duty_rate)
                    .ok_or(FeeError::Overflow { what: "duty" })?;
                let gst = value
                    .apply_rate(rates.gst_rate)
                    .ok_or(FeeError::Overflow { what: "gst" })?;
                Ok(duty
                    .checked_add(gst)
                    .ok_or(FeeError::Overflow { what: "duty base" })?)
            }
            PaymentKind::ReturnCharges | PaymentKind::DestructionCharges => shipment
                .charges
                .as_ref()
                .map(|c| c.sheet.total())
                .ok_or_else(|| ClearanceError::missing("assessed charges")),
        }
    }

    fn window_start(&self, shipment: &Shipment, kind: PaymentKind, now: Timestamp) -> Option<Timestamp> {
        self.config
            .window_for(kind)
            .map(|(_, anchor)| shipment.anchor_time(anchor).unwrap_or(now))
    }

    /// What paying `kind` would cost at `now`.
    ///
    /// An anchor not yet reached counts as day 0.
    pub fn assess(
        &self,
        shipment: &Shipment,
        kind: PaymentKind,
        now: Timestamp,
    ) -> Result<FeeAssessment, ClearanceError> {
        let base = self.base_for(shipment, kind)?;
        match (self.config.window_for(kind), self.window_start(shipment, kind, now)) {
            (Some((schedule, _)), Some(opened_at)) => Ok(schedule.assess(base, opened_at, now)?),
            _ => Ok(FeeAssessment::Payable {
                days_elapsed: 0,
                base,
                fine: Amount::ZERO,
                total: base,
            }),
        }
    }

    /// Itemized duty quote at `now`.
    pub fn duty_quote(&self, shipment: &Shipment, now: Timestamp) -> Result<DutyAssessment, ClearanceError> {
        let rates = self.duty_rates(shipment)?;
        let opened_at = self
            .window_start(shipment, PaymentKind::Duty, now)
            .unwrap_or(now);
        Ok(compute_duty(
            shipment.goods.declared_value,
            rates,
            &self.config.duty_fees,
            opened_at,
            now,
        )?)
    }

    /// The escalating payment due in the shipment's current status, if any.
    pub fn open_window(
        &self,
        shipment: &Shipment,
        now: Timestamp,
    ) -> Result<Option<PaymentWindow>, ClearanceError> {
        let Some(kind) = PaymentKind::due_in(shipment.status).filter(PaymentKind::escalates) else {
            return Ok(None);
        };
        if shipment.payments.is_confirmed(kind) {
            return Ok(None);
        }
        let Some((schedule, _)) = self.config.window_for(kind) else {
            return Ok(None);
        };
        let opened_at = self.window_start(shipment, kind, now).unwrap_or(now);
        Ok(Some(PaymentWindow {
            kind,
            opened_at,
            deadline: schedule.deadline(opened_at),
            assessment: self.assess(shipment, kind, now)?,
        }))
    }
}
