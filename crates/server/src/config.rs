//! Service configuration

use anyhow::Result;
use chrono::NaiveDate;
use ignition_lib::predictor::{ModelSource, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS};
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, read from `IGNITION_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct IgnitionConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP port for the API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Exported ONNX regressor
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// JSON file with the training vocabularies
    #[serde(default = "default_vocabulary_path")]
    pub vocabulary_path: PathBuf,

    /// Expected hex SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Store snapshot file; unset keeps records in memory only
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Window length for the dashboard forecast
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    /// Longest window a forecast request may ask for
    #[serde(default = "default_max_forecast_days")]
    pub max_forecast_days: u32,

    /// Reference date for single predictions that omit one
    #[serde(default = "default_reference_date")]
    pub default_reference_date: NaiveDate,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/ignition.onnx")
}

fn default_vocabulary_path() -> PathBuf {
    PathBuf::from("models/vocabularies.json")
}

fn default_forecast_days() -> u32 {
    DEFAULT_FORECAST_DAYS
}

fn default_max_forecast_days() -> u32 {
    MAX_FORECAST_DAYS
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 21).unwrap_or(NaiveDate::MIN)
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            model_path: default_model_path(),
            vocabulary_path: default_vocabulary_path(),
            model_sha256: None,
            store_path: None,
            forecast_days: default_forecast_days(),
            max_forecast_days: default_max_forecast_days(),
            default_reference_date: default_reference_date(),
        }
    }
}

impl IgnitionConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("IGNITION").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn model_source(&self) -> ModelSource {
        ModelSource {
            model_path: self.model_path.clone(),
            vocabulary_path: self.vocabulary_path.clone(),
            expected_sha256: self.model_sha256.clone(),
        }
    }
}
