//! Forecast aggregation across all piles
//!
//! Reconstructs every known pile as of the window start, predicts its
//! ignition date and counts the predictions that land inside the window.
//! A pile without history or with a failing prediction is skipped; store
//! failures abort the whole forecast.

use super::features::FeatureReconstructor;
use super::output::{PredictionInput, RiskPredictor};
use crate::models::{DailyCount, ForecastSummary, Incident};
use crate::observability::IgnitionMetrics;
use crate::store::{RecordStore, StoreError};
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default window length for latest-known forecasts
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// Default upper bound on the days one window may span
pub const MAX_FORECAST_DAYS: u32 = 366;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no temperature or weather data has been ingested")]
    NoData,

    #[error("invalid forecast window: {0}")]
    InvalidWindow(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How the forecast window is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastWindow {
    /// Starts the day after the newest ingested timestamp
    LatestKnown { days: u32 },
    /// Explicit inclusive date range
    Explicit { start: NaiveDate, end: NaiveDate },
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForecastStats {
    pub piles_seen: usize,
    pub predicted: usize,
    pub skipped_no_history: usize,
    pub failed: usize,
    pub incidents: usize,
}

#[derive(Debug, Clone)]
pub struct ForecastAggregator {
    reconstructor: FeatureReconstructor,
    max_days: u32,
}

impl Default for ForecastAggregator {
    fn default() -> Self {
        Self {
            reconstructor: FeatureReconstructor::default(),
            max_days: MAX_FORECAST_DAYS,
        }
    }
}

impl ForecastAggregator {
    /// Cap the number of days a single window may span
    pub fn with_max_days(max_days: u32) -> Self {
        Self {
            max_days,
            ..Self::default()
        }
    }

    /// Resolve a window to its inclusive `(start, end)` dates
    pub fn resolve_window(
        &self,
        store: &dyn RecordStore,
        window: ForecastWindow,
    ) -> Result<(NaiveDate, NaiveDate), ForecastError> {
        match window {
            ForecastWindow::LatestKnown { days } => {
                if days == 0 {
                    return Err(ForecastError::InvalidWindow(
                        "forecast_days must be at least 1".to_string(),
                    ));
                }
                if days > self.max_days {
                    return Err(self.too_long(days));
                }
                let latest = [store.max_temperature_timestamp()?, store.max_weather_timestamp()?]
                    .into_iter()
                    .flatten()
                    .max()
                    .ok_or(ForecastError::NoData)?;

                let start = latest
                    .date()
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| out_of_range(latest.date()))?;
                let end = start
                    .checked_add_days(Days::new(u64::from(days) - 1))
                    .ok_or_else(|| out_of_range(start))?;
                Ok((start, end))
            }
            ForecastWindow::Explicit { start, end } => {
                if start > end {
                    return Err(ForecastError::InvalidWindow(format!(
                        "start {} is after end {}",
                        start, end
                    )));
                }
                let span = (end - start).num_days() + 1;
                if span > i64::from(self.max_days) {
                    return Err(self.too_long(span));
                }
                Ok((start, end))
            }
        }
    }

    fn too_long(&self, days: impl std::fmt::Display) -> ForecastError {
        ForecastError::InvalidWindow(format!(
            "window of {} days exceeds the limit of {} days",
            days, self.max_days
        ))
    }

    /// Predict every pile and summarize incidents in the window
    pub fn aggregate(
        &self,
        store: &dyn RecordStore,
        predictor: &RiskPredictor,
        window: ForecastWindow,
    ) -> Result<(ForecastSummary, ForecastStats), ForecastError> {
        let started = Instant::now();
        let (start, end) = self.resolve_window(store, window)?;
        let as_of = midnight(start);

        let piles = store.distinct_piles()?;
        let mut stats = ForecastStats {
            piles_seen: piles.len(),
            ..Default::default()
        };
        let mut incidents = Vec::new();

        for pile in &piles {
            let Some(ctx) = self.reconstructor.reconstruct(store, pile, as_of)? else {
                stats.skipped_no_history += 1;
                continue;
            };

            let input = PredictionInput::from_context(&ctx);
            let result = match predictor.predict(&input, start) {
                Ok(result) => result,
                Err(e) => {
                    warn!(pile = %pile, error = %e, "Prediction failed, skipping pile");
                    stats.failed += 1;
                    continue;
                }
            };
            stats.predicted += 1;

            match result.predicted_ignition_date {
                Some(date) if date >= start && date <= end => {
                    debug!(pile = %pile, date = %date, "Ignition predicted inside window");
                    incidents.push(Incident {
                        date,
                        warehouse: pile.warehouse,
                        pile_id: pile.pile_id.clone(),
                        predicted_ignition_date: date,
                        message: result.message,
                    });
                }
                _ => {}
            }
        }
        stats.incidents = incidents.len();

        let summary = ForecastSummary {
            period: format!("{} — {}", start, end),
            summary_by_day: daily_counts(start, end, &incidents),
            high_risk_incidents: incidents,
        };

        let metrics = IgnitionMetrics::new();
        metrics.observe_forecast_latency(started.elapsed().as_secs_f64());
        metrics.set_piles_tracked(stats.piles_seen as i64);

        info!(
            period = %summary.period,
            piles_seen = stats.piles_seen,
            predicted = stats.predicted,
            skipped_no_history = stats.skipped_no_history,
            failed = stats.failed,
            incidents = stats.incidents,
            "Forecast aggregated"
        );

        Ok((summary, stats))
    }
}

fn out_of_range(from: NaiveDate) -> ForecastError {
    ForecastError::InvalidWindow(format!("window starting after {} is out of range", from))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// One entry per day in `[start, end]`, zero-count days included
pub fn daily_counts(start: NaiveDate, end: NaiveDate, incidents: &[Incident]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for incident in incidents {
        *counts.entry(incident.date).or_default() += 1;
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| DailyCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
