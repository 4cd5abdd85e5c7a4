//! Observability infrastructure for the scoring engine
//!
//! Provides:
//! - Prometheus metrics (observations, findings, quota, tracked keys, lookup errors)
//! - Structured JSON logging with tracing

use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::classify::Severity;
use crate::finding::{Finding, Quantity};

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    observations: IntCounterVec,
    findings_emitted: IntCounterVec,
    keys_tracked: IntGaugeVec,
    keys_evicted: IntGaugeVec,
    quota_remaining: IntGauge,
    events_skipped: IntCounterVec,
    receipt_lookup_errors: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            observations: register_int_counter_vec!(
                "gas_anomaly_observations_total",
                "Observations scored, by quantity",
                &["quantity"]
            )
            .expect("Failed to register observations"),

            findings_emitted: register_int_counter_vec!(
                "gas_anomaly_findings_emitted_total",
                "Findings emitted, by quantity and severity",
                &["quantity", "severity"]
            )
            .expect("Failed to register findings_emitted"),

            keys_tracked: register_int_gauge_vec!(
                "gas_anomaly_keys_tracked",
                "Number of keys with statistics, by quantity",
                &["quantity"]
            )
            .expect("Failed to register keys_tracked"),

            keys_evicted: register_int_gauge_vec!(
                "gas_anomaly_keys_evicted",
                "Keys evicted to bound memory, by quantity",
                &["quantity"]
            )
            .expect("Failed to register keys_evicted"),

            quota_remaining: register_int_gauge!(
                "gas_anomaly_quota_remaining",
                "Findings that may still be emitted"
            )
            .expect("Failed to register quota_remaining"),

            events_skipped: register_int_counter_vec!(
                "gas_anomaly_events_skipped_total",
                "Transactions not evaluated, by reason",
                &["reason"]
            )
            .expect("Failed to register events_skipped"),

            receipt_lookup_errors: register_int_counter!(
                "gas_anomaly_receipt_lookup_errors_total",
                "Receipt lookups that failed"
            )
            .expect("Failed to register receipt_lookup_errors"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance. Clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn inc_observations(&self, quantity: Quantity) {
        self.inner()
            .observations
            .with_label_values(&[quantity.as_str()])
            .inc();
    }

    pub fn inc_findings(&self, quantity: Quantity, severity: Severity) {
        self.inner()
            .findings_emitted
            .with_label_values(&[quantity.as_str(), severity.as_str()])
            .inc();
    }

    /// Update key gauges of one store
    pub fn set_keys(&self, quantity: Quantity, tracked: usize, evicted: u64) {
        let inner = self.inner();
        inner
            .keys_tracked
            .with_label_values(&[quantity.as_str()])
            .set(tracked as i64);
        inner
            .keys_evicted
            .with_label_values(&[quantity.as_str()])
            .set(evicted as i64);
    }

    pub fn set_quota_remaining(&self, remaining: u64) {
        self.inner().quota_remaining.set(remaining as i64);
    }

    pub fn inc_skipped(&self, reason: &str) {
        self.inner()
            .events_skipped
            .with_label_values(&[reason])
            .inc();
    }

    pub fn inc_receipt_lookup_errors(&self) {
        self.inner().receipt_lookup_errors.inc();
    }
}

/// Structured logger for engine events
///
/// Provides consistent JSON-formatted logging for findings, skipped
/// transactions and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log an emitted finding
    pub fn log_finding(&self, tx_hash: &str, quantity: Quantity, finding: &Finding) {
        let distance = finding
            .metadata
            .get("distance")
            .map(String::as_str)
            .unwrap_or_default();

        match finding.severity {
            Severity::High => {
                warn!(
                    event = "finding_emitted",
                    component = %self.component,
                    tx_hash = %tx_hash,
                    quantity = %quantity,
                    severity = %finding.severity,
                    distance = %distance,
                    alert_id = %finding.alert_id,
                    "High severity gas anomaly"
                );
            }
            _ => {
                info!(
                    event = "finding_emitted",
                    component = %self.component,
                    tx_hash = %tx_hash,
                    quantity = %quantity,
                    severity = %finding.severity,
                    distance = %distance,
                    alert_id = %finding.alert_id,
                    "Gas anomaly"
                );
            }
        }
    }

    /// Log a transaction that was not evaluated
    pub fn log_skipped(&self, tx_hash: &str, reason: &str) {
        info!(
            event = "transaction_skipped",
            component = %self.component,
            tx_hash = %tx_hash,
            reason = %reason,
            "Transaction not evaluated"
        );
    }

    /// Log a failed receipt lookup
    pub fn log_lookup_failure(&self, tx_hash: &str, error: &str) {
        warn!(
            event = "receipt_lookup_failed",
            component = %self.component,
            tx_hash = %tx_hash,
            error = %error,
            "Receipt lookup failed, statistics left untouched"
        );
    }

    /// Log startup event
    pub fn log_startup(&self, version: &str, alpha: &str, quota_capacity: u64) {
        info!(
            event = "startup",
            component = %self.component,
            version = %version,
            alpha = %alpha,
            quota_capacity = quota_capacity,
            "Gas anomaly agent started"
        );
    }

    /// Log shutdown event
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            component = %self.component,
            reason = %reason,
            "Gas anomaly agent shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malachite::Integer;

    #[test]
    fn test_metrics_handles_share_registry() {
        let first = EngineMetrics::new();
        let second = first.clone();

        first.inc_observations(Quantity::GasUsed);
        second.inc_observations(Quantity::GasUsed);
        second.set_quota_remaining(3);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|family| family.get_name() == "gas_anomaly_observations_total"));
        assert!(families
            .iter()
            .any(|family| family.get_name() == "gas_anomaly_quota_remaining"));
    }

    #[test]
    fn test_logger_accepts_findings() {
        let logger = StructuredLogger::new("test");
        let finding = Finding::new(
            Quantity::GasPrice,
            Severity::High,
            "0xabc",
            &Integer::from(10),
            &Integer::from(20),
        );
        logger.log_finding("0xabc", Quantity::GasPrice, &finding);
        logger.log_skipped("0xabc", "no_recipient");
    }
}
