//! Observability infrastructure for the ignition forecaster
//!
//! Provides:
//! - Prometheus metrics (ingestion volume, prediction latency, forecast latency, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<IgnitionMetricsInner> = OnceLock::new();

struct IgnitionMetricsInner {
    rows_ingested: IntCounterVec,
    rows_dropped: IntCounterVec,
    prediction_latency_seconds: Histogram,
    forecast_latency_seconds: Histogram,
    predictions_generated: IntCounter,
    prediction_errors: IntCounter,
    unseen_categories: IntCounterVec,
    piles_tracked: IntGauge,
    model_version_info: GaugeVec,
}

impl IgnitionMetricsInner {
    fn new() -> Self {
        Self {
            rows_ingested: register_int_counter_vec!(
                "ignition_rows_ingested_total",
                "Rows appended to the record store",
                &["kind"]
            )
            .expect("Failed to register rows_ingested"),

            rows_dropped: register_int_counter_vec!(
                "ignition_rows_dropped_total",
                "Rows dropped during normalization for missing required fields",
                &["kind"]
            )
            .expect("Failed to register rows_dropped"),

            prediction_latency_seconds: register_histogram!(
                "ignition_prediction_latency_seconds",
                "Time spent running the regression model for one pile",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            forecast_latency_seconds: register_histogram!(
                "ignition_forecast_latency_seconds",
                "Time spent aggregating a forecast over all piles",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register forecast_latency_seconds"),

            predictions_generated: register_int_counter!(
                "ignition_predictions_generated_total",
                "Total number of predictions generated"
            )
            .expect("Failed to register predictions_generated"),

            prediction_errors: register_int_counter!(
                "ignition_prediction_errors_total",
                "Total number of failed predictions"
            )
            .expect("Failed to register prediction_errors"),

            unseen_categories: register_int_counter_vec!(
                "ignition_unseen_categories_total",
                "Categorical values missing from the training vocabulary",
                &["vocabulary"]
            )
            .expect("Failed to register unseen_categories"),

            piles_tracked: register_int_gauge!(
                "ignition_piles_tracked",
                "Distinct piles considered by the last forecast"
            )
            .expect("Failed to register piles_tracked"),

            model_version_info: register_gauge_vec!(
                "ignition_model_version_info",
                "Information about the currently loaded regression model",
                &["version", "checksum"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Forecaster metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct IgnitionMetrics {
    _private: (),
}

impl Default for IgnitionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnitionMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(IgnitionMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &IgnitionMetricsInner {
        GLOBAL_METRICS.get_or_init(IgnitionMetricsInner::new)
    }

    pub fn inc_rows_ingested(&self, kind: &str, count: u64) {
        self.inner().rows_ingested.with_label_values(&[kind]).inc_by(count);
    }

    pub fn inc_rows_dropped(&self, kind: &str, count: u64) {
        self.inner().rows_dropped.with_label_values(&[kind]).inc_by(count);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_forecast_latency(&self, duration_secs: f64) {
        self.inner().forecast_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_generated(&self) {
        self.inner().predictions_generated.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_unseen_category(&self, vocabulary: &str) {
        self.inner().unseen_categories.with_label_values(&[vocabulary]).inc();
    }

    pub fn set_piles_tracked(&self, count: i64) {
        self.inner().piles_tracked.set(count);
    }

    pub fn set_model_version(&self, version: &str, checksum: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, checksum])
            .set(1.0);
    }

    pub fn clear_model_version(&self) {
        self.inner().model_version_info.reset();
    }
}

/// Structured logger for forecaster events
///
/// Provides consistent JSON-formatted logging for ingestion, forecasts,
/// model lifecycle and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_ingest(&self, filename: &str, kind: &str, inserted: usize) {
        info!(
            event = "ingest_completed",
            node = %self.node_name,
            filename = %filename,
            kind = %kind,
            inserted_rows = inserted,
            "Ingested uploaded file"
        );
    }

    pub fn log_prediction(
        &self,
        warehouse: i64,
        pile_id: &str,
        days_to_fire: f64,
        risk_level: &str,
        model_version: &str,
    ) {
        info!(
            event = "prediction_generated",
            node = %self.node_name,
            warehouse = warehouse,
            pile_id = %pile_id,
            days_to_fire = days_to_fire,
            risk_level = %risk_level,
            model_version = %model_version,
            "Generated ignition prediction"
        );
    }

    pub fn log_forecast(&self, period: &str, piles_seen: usize, incidents: usize, failed: usize) {
        if failed > 0 {
            warn!(
                event = "forecast_completed",
                node = %self.node_name,
                period = %period,
                piles_seen = piles_seen,
                incidents = incidents,
                failed_piles = failed,
                "Forecast completed with skipped piles"
            );
        } else {
            info!(
                event = "forecast_completed",
                node = %self.node_name,
                period = %period,
                piles_seen = piles_seen,
                incidents = incidents,
                "Forecast completed"
            );
        }
    }

    pub fn log_model_update(&self, old_version: &str, new_version: &str, success: bool) {
        if success {
            info!(
                event = "model_loaded",
                node = %self.node_name,
                old_version = %old_version,
                new_version = %new_version,
                "Regression model loaded"
            );
        } else {
            warn!(
                event = "model_reload_failed",
                node = %self.node_name,
                old_version = %old_version,
                new_version = %new_version,
                "Model reload failed, keeping previous version"
            );
        }
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            node = %self.node_name,
            service_version = %version,
            model_version = %model_version,
            "Ignition forecast service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Ignition forecast service shutting down"
        );
    }
}
