//! # Prometheus Metrics
//!
//! Operational metrics for a ledger run, rendered in the Prometheus text
//! exposition format when `--metrics` is passed.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use strongbox_contracts::Bank;

use crate::runtime::Outcome;

/// Holds all Prometheus metric handles for a run.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Executed operations, by `op` and `outcome` (`ok` / `rejected`).
    pub operations_total: IntCounterVec,
    /// Rejected operations, by `op` and error `reason`.
    pub rejections_total: IntCounterVec,
    /// Running deposit total in canonical units.
    pub total_deposited: Gauge,
    /// Capacity left under the bank cap, in canonical units.
    pub remaining_capacity: Gauge,
    /// Events in the audit log.
    pub events_recorded: IntGauge,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("strongbox".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Scripted operations executed"),
            &["op", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Operations rejected by the ledger"),
            &["op", "reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let total_deposited = Gauge::new(
            "total_deposited",
            "Sum of outstanding deposits in canonical units",
        )?;
        registry.register(Box::new(total_deposited.clone()))?;

        let remaining_capacity = Gauge::new(
            "remaining_capacity",
            "Canonical units still accepted before the bank cap",
        )?;
        registry.register(Box::new(remaining_capacity.clone()))?;

        let events_recorded = IntGauge::new("events_recorded", "Events in the audit log")?;
        registry.register(Box::new(events_recorded.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejections_total,
            total_deposited,
            remaining_capacity,
            events_recorded,
        })
    }

    /// Counts one executed step.
    pub fn record(&self, outcome: &Outcome) {
        let label = if outcome.ok { "ok" } else { "rejected" };
        self.operations_total
            .with_label_values(&[outcome.op, label])
            .inc();
        if let Some(reason) = outcome.error_kind {
            self.rejections_total
                .with_label_values(&[outcome.op, reason])
                .inc();
        }
    }

    /// Refreshes the gauges from the ledger.
    pub fn observe(&self, bank: &Bank) {
        self.total_deposited.set(bank.total_deposited() as f64);
        self.remaining_capacity.set(bank.remaining_capacity() as f64);
        self.events_recorded
            .set(i64::try_from(bank.last_sequence()).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(op: &'static str, error_kind: Option<&'static str>) -> Outcome {
        Outcome {
            index: 0,
            op,
            ok: error_kind.is_none(),
            events: Vec::new(),
            value: None,
            error: error_kind.map(str::to_string),
            error_kind,
        }
    }

    #[test]
    fn counts_by_outcome_and_reason() {
        let metrics = LedgerMetrics::new().unwrap();
        metrics.record(&outcome("deposit", None));
        metrics.record(&outcome("deposit", None));
        metrics.record(&outcome("withdraw", Some("invalid_withdrawal")));

        assert_eq!(
            metrics
                .operations_total
                .with_label_values(&["deposit", "ok"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["withdraw", "invalid_withdrawal"])
                .get(),
            1
        );

        let text = metrics.encode().unwrap();
        assert!(text.contains("strongbox_operations_total"));
        assert!(text.contains("reason=\"invalid_withdrawal\""));
    }
}
