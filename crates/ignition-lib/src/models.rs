//! Core data models for the ignition forecaster

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a physical stockpile
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PileKey {
    pub warehouse: i64,
    pub pile_id: String,
}

impl PileKey {
    pub fn new(warehouse: i64, pile_id: impl Into<String>) -> Self {
        Self {
            warehouse,
            pile_id: pile_id.into(),
        }
    }
}

impl fmt::Display for PileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.warehouse, self.pile_id)
    }
}

/// Maximum-temperature measurement taken on a pile during a shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub warehouse: i64,
    pub pile_id: String,
    pub coal_grade: String,
    pub max_temp: f64,
    pub measured_at: NaiveDateTime,
    pub shift: i64,
}

impl TemperatureReading {
    pub fn pile(&self) -> PileKey {
        PileKey::new(self.warehouse, self.pile_id.clone())
    }
}

/// Historical ignition episode; also carries the pile formation timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireEvent {
    pub warehouse: i64,
    pub pile_id: String,
    pub coal_grade: String,
    pub fire_start: NaiveDateTime,
    pub pile_formed_at: Option<NaiveDateTime>,
}

impl FireEvent {
    pub fn pile(&self) -> PileKey {
        PileKey::new(self.warehouse, self.pile_id.clone())
    }
}

/// Weather station observation, not keyed by pile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub observed_at: NaiveDateTime,
    pub temp: f64,
    pub pressure: Option<f64>,
    pub humidity: i64,
    pub precipitation: Option<f64>,
    pub wind_dir: Option<i64>,
    pub wind_speed: Option<f64>,
    pub v_max: Option<f64>,
    pub cloudcover: Option<i64>,
    pub visibility: Option<i64>,
    pub weather_code: Option<i64>,
}

/// Coal movement into a warehouse and out to a ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyEvent {
    pub unload_to_warehouse: NaiveDateTime,
    pub coal_grade: String,
    pub pile_id: i64,
    pub load_to_ship: Option<NaiveDateTime>,
    pub to_warehouse_tn: Option<f64>,
    pub to_ship_tn: Option<f64>,
    pub warehouse: i64,
}

/// Number of model input features
pub const NUM_FEATURES: usize = 19;

/// Feature names in the order the regression model was fit on
pub const FEATURE_ORDER: [&str; NUM_FEATURES] = [
    "warehouse",
    "max_temp",
    "shift",
    "temp",
    "pressure",
    "humidity",
    "precipitation",
    "wind_dir",
    "v_avg",
    "v_max",
    "cloudcover",
    "weather_code",
    "to_warehouse_tn",
    "to_ship_tn",
    "supply_warehouse",
    "pile_age_days",
    "encoded_pile_id",
    "encoded_coal_grade",
    "encoded_supply_grade",
];

/// Feature vector for ML inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub warehouse: f32,
    pub max_temp: f32,
    pub shift: f32,
    pub temp: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub precipitation: f32,
    pub wind_dir: f32,
    pub v_avg: f32,
    pub v_max: f32,
    pub cloudcover: f32,
    pub weather_code: f32,
    pub to_warehouse_tn: f32,
    pub to_ship_tn: f32,
    pub supply_warehouse: f32,
    pub pile_age_days: f32,
    pub encoded_pile_id: f32,
    pub encoded_coal_grade: f32,
    pub encoded_supply_grade: f32,
}

impl FeatureVector {
    /// Values in `FEATURE_ORDER`. Reordering this silently corrupts predictions.
    pub fn to_array(&self) -> [f32; NUM_FEATURES] {
        [
            self.warehouse,
            self.max_temp,
            self.shift,
            self.temp,
            self.pressure,
            self.humidity,
            self.precipitation,
            self.wind_dir,
            self.v_avg,
            self.v_max,
            self.cloudcover,
            self.weather_code,
            self.to_warehouse_tn,
            self.to_ship_tn,
            self.supply_warehouse,
            self.pile_age_days,
            self.encoded_pile_id,
            self.encoded_coal_grade,
            self.encoded_supply_grade,
        ]
    }
}

/// Coarse ignition risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single pile prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_ignition_date: Option<NaiveDate>,
    pub predicted_days_to_fire: f64,
    pub risk_level: RiskLevel,
    pub message: String,
}

/// Predicted ignition falling inside a forecast window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub date: NaiveDate,
    pub warehouse: i64,
    pub pile_id: String,
    pub predicted_ignition_date: NaiveDate,
    pub message: String,
}

/// Number of incidents predicted for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Aggregated forecast over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub period: String,
    pub summary_by_day: Vec<DailyCount>,
    pub high_risk_incidents: Vec<Incident>,
}
