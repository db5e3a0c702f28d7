//! Ignition prediction engine

pub mod encoder;
pub mod features;
pub mod forecast;
mod inference;
pub mod output;
pub mod registry;

pub use encoder::{canonical_pile_id, EncoderError, Vocabularies, Vocabulary, UNSEEN_CODE};
pub use features::{FeatureContext, FeatureReconstructor, WeatherContext, DEFAULT_PILE_AGE_DAYS};
pub use forecast::{
    ForecastAggregator, ForecastError, ForecastStats, ForecastWindow, DEFAULT_FORECAST_DAYS,
    MAX_FORECAST_DAYS,
};
pub use inference::OnnxRegressor;
pub use output::{risk_level, PredictionInput, RiskPredictor};
pub use registry::{LoadedModel, ModelRegistry, ModelSource, RegistryError};

use crate::models::FeatureVector;
use anyhow::Result;

/// Regression capability mapping a feature vector to days until ignition
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Get current model version
    fn model_version(&self) -> String;
}
