//! Risk prediction and post-processing
//!
//! Encodes a prediction input into the model feature vector, runs the
//! injected regressor, and turns the raw days-to-ignition value into a
//! calendar date, a risk tier and a human-readable message.

use super::encoder::Vocabularies;
use super::features::FeatureContext;
use super::Predictor;
use crate::models::{FeatureVector, PredictionResult, RiskLevel};
use crate::observability::IgnitionMetrics;
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Predictions at or below this many days are high risk
pub const HIGH_RISK_MAX_DAYS: f64 = 2.0;

/// Predictions at or below this many days (and above the high bound) are medium risk
pub const MEDIUM_RISK_MAX_DAYS: f64 = 5.0;

/// One pile's model input, before categorical encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub warehouse: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub pile_id: String,
    pub coal_grade: String,
    pub max_temp: f64,
    pub shift: i64,
    pub temp: f64,
    pub pressure: f64,
    pub humidity: i64,
    pub precipitation: f64,
    pub wind_dir: i64,
    pub v_avg: f64,
    pub v_max: f64,
    pub cloudcover: i64,
    pub weather_code: i64,
    pub supply_grade: String,
    pub to_warehouse_tn: f64,
    pub to_ship_tn: f64,
    pub supply_warehouse: i64,
    pub pile_age_days: i64,
}

impl PredictionInput {
    /// Input for a reconstructed pile; supply fields mirror the pile itself
    pub fn from_context(ctx: &FeatureContext) -> Self {
        Self {
            warehouse: ctx.pile.warehouse,
            pile_id: ctx.pile.pile_id.clone(),
            coal_grade: ctx.coal_grade.clone(),
            max_temp: ctx.max_temp,
            shift: ctx.shift,
            temp: ctx.weather.temp,
            pressure: ctx.weather.pressure,
            humidity: ctx.weather.humidity,
            precipitation: ctx.weather.precipitation,
            wind_dir: ctx.weather.wind_dir,
            v_avg: ctx.weather.v_avg,
            v_max: ctx.weather.v_max,
            cloudcover: ctx.weather.cloudcover,
            weather_code: ctx.weather.weather_code,
            supply_grade: ctx.coal_grade.clone(),
            to_warehouse_tn: 0.0,
            to_ship_tn: 0.0,
            supply_warehouse: ctx.pile.warehouse,
            pile_age_days: ctx.pile_age_days,
        }
    }

    pub fn to_features(&self, vocabularies: &Vocabularies) -> FeatureVector {
        FeatureVector {
            warehouse: self.warehouse as f32,
            max_temp: self.max_temp as f32,
            shift: self.shift as f32,
            temp: self.temp as f32,
            pressure: self.pressure as f32,
            humidity: self.humidity as f32,
            precipitation: self.precipitation as f32,
            wind_dir: self.wind_dir as f32,
            v_avg: self.v_avg as f32,
            v_max: self.v_max as f32,
            cloudcover: self.cloudcover as f32,
            weather_code: self.weather_code as f32,
            to_warehouse_tn: self.to_warehouse_tn as f32,
            to_ship_tn: self.to_ship_tn as f32,
            supply_warehouse: self.supply_warehouse as f32,
            pile_age_days: self.pile_age_days as f32,
            encoded_pile_id: vocabularies.encode_pile_id(&self.pile_id) as f32,
            encoded_coal_grade: vocabularies.encode_coal_grade(&self.coal_grade) as f32,
            encoded_supply_grade: vocabularies.encode_supply_grade(&self.supply_grade) as f32,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

/// Tier for a raw (untruncated) days-to-ignition value
pub fn risk_level(days_to_fire: f64) -> RiskLevel {
    if days_to_fire <= HIGH_RISK_MAX_DAYS {
        RiskLevel::High
    } else if days_to_fire <= MEDIUM_RISK_MAX_DAYS {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Build the result for a model output relative to `reference_date`.
///
/// The calendar offset truncates toward zero; the tier uses the raw value.
pub fn format_result(days_to_fire: f64, reference_date: NaiveDate) -> Result<PredictionResult> {
    if !days_to_fire.is_finite() {
        bail!("Model returned a non-finite prediction: {}", days_to_fire);
    }

    let whole_days = days_to_fire.trunc() as i64;
    let predicted_ignition_date = Duration::try_days(whole_days)
        .and_then(|offset| reference_date.checked_add_signed(offset));

    Ok(PredictionResult {
        predicted_ignition_date,
        predicted_days_to_fire: days_to_fire,
        risk_level: risk_level(days_to_fire),
        message: format!(
            "Predicted time to spontaneous ignition: {:.2} days (~{} days)",
            days_to_fire, whole_days
        ),
    })
}

/// Runs the regressor over encoded inputs
#[derive(Clone)]
pub struct RiskPredictor {
    predictor: Arc<dyn Predictor>,
    vocabularies: Arc<Vocabularies>,
    metrics: IgnitionMetrics,
}

impl RiskPredictor {
    pub fn new(predictor: Arc<dyn Predictor>, vocabularies: Arc<Vocabularies>) -> Self {
        Self {
            predictor,
            vocabularies,
            metrics: IgnitionMetrics::new(),
        }
    }

    pub fn model_version(&self) -> String {
        self.predictor.model_version()
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    /// Predict days to ignition for one input, relative to `reference_date`
    pub fn predict(&self, input: &PredictionInput, reference_date: NaiveDate) -> Result<PredictionResult> {
        let features = input.to_features(&self.vocabularies);

        let start = Instant::now();
        let outcome = self
            .predictor
            .predict(&features)
            .and_then(|days| format_result(days, reference_date));
        self.metrics.observe_prediction_latency(start.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => {
                self.metrics.inc_predictions_generated();
                debug!(
                    warehouse = input.warehouse,
                    pile_id = %input.pile_id,
                    days_to_fire = result.predicted_days_to_fire,
                    risk_level = %result.risk_level,
                    "Prediction completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                Err(e)
            }
        }
    }
}
