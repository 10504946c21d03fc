//! Prometheus metrics for the marketplace client.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a fatal configuration error that surfaces on
//! first use rather than silently dropping data.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Operation groups composed.
/// Labels: action (list/buy/cancel/opt_in/mint/withdraw)
pub static GROUPS_COMPOSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "omni_groups_composed_total",
        "Total operation groups composed",
        &["action"]
    )
    .unwrap()
});

/// Composition refused locally.
/// Labels: action, reason
pub static COMPOSITION_FAILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "omni_composition_failed_total",
        "Total compositions refused before signing",
        &["action", "reason"]
    )
    .unwrap()
});

/// Execution outcomes.
/// Labels: action, result (confirmed/timed_out/rejected/transport_error)
pub static OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "omni_execution_outcomes_total",
        "Total execution outcomes by action and result",
        &["action", "result"]
    )
    .unwrap()
});

/// Signing pass failures.
/// Labels: reason (rejected/backend_unavailable/backend_error/...)
pub static SIGNING_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "omni_signing_failures_total",
        "Total signing passes that aborted a group",
        &["reason"]
    )
    .unwrap()
});

/// Confirmation checks spent before inclusion.
pub static CONFIRMATION_CHECKS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "omni_confirmation_checks",
        "Confirmation checks spent before inclusion was observed",
        &["action"],
        vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0]
    )
    .unwrap()
});

/// Registry entries seen by discovery scans.
/// Labels: result (listed/malformed/unreadable/placeholder)
pub static SCAN_ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "omni_scan_entries_total",
        "Registry entries processed by discovery scans",
        &["result"]
    )
    .unwrap()
});

/// Listings visible after the latest scan.
pub static LISTINGS_VISIBLE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "omni_listings_visible",
        "Listings visible after the latest discovery scan"
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record a composed group.
    pub fn group_composed(action: &str) {
        GROUPS_COMPOSED_TOTAL.with_label_values(&[action]).inc();
    }

    /// Record a composition refused locally.
    pub fn composition_failed(action: &str, reason: &str) {
        COMPOSITION_FAILED_TOTAL
            .with_label_values(&[action, reason])
            .inc();
    }

    /// Record an execution outcome.
    pub fn outcome(action: &str, result: &str) {
        OUTCOMES_TOTAL.with_label_values(&[action, result]).inc();
    }

    /// Record checks spent before confirmation.
    pub fn confirmation_checks(action: &str, checks: u32) {
        CONFIRMATION_CHECKS
            .with_label_values(&[action])
            .observe(f64::from(checks));
    }

    /// Record a signing failure.
    pub fn signing_failed(reason: &str) {
        SIGNING_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a completed discovery scan.
    pub fn scan_completed(listed: usize, malformed: usize, unreadable: usize, placeholders: usize) {
        for (result, count) in [
            ("listed", listed),
            ("malformed", malformed),
            ("unreadable", unreadable),
            ("placeholder", placeholders),
        ] {
            if count > 0 {
                SCAN_ENTRIES_TOTAL
                    .with_label_values(&[result])
                    .inc_by(count as f64);
            }
        }
        LISTINGS_VISIBLE.set(listed as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
