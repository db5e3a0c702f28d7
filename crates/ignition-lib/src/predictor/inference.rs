//! ONNX inference using tract
//!
//! Runs the exported days-to-ignition regressor loaded via tract-onnx.

use super::Predictor;
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Regressor backed by an ONNX graph taking `f32[1, 19]`
pub struct OnnxRegressor {
    model: TractModel,
    version: String,
    slow_inferences: AtomicU64,
}

impl OnnxRegressor {
    /// Create a regressor from model bytes
    pub fn new(model_bytes: &[u8], version: impl Into<String>) -> Result<Self> {
        let model = Self::load_model(model_bytes)?;
        Ok(Self {
            model,
            version: version.into(),
            slow_inferences: AtomicU64::new(0),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(features: &FeatureVector) -> Result<Tensor> {
        let data = features.to_array().to_vec();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Feature vector has the wrong shape")?;
        Ok(array.into())
    }
}

impl Predictor for OnnxRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let start = Instant::now();

        let input = Self::features_to_tensor(features)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let days = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model output is empty")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            let slow_total = self.slow_inferences.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                elapsed_ms = elapsed.as_millis(),
                slow_total,
                version = %self.version,
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(days as f64)
    }

    fn model_version(&self) -> String {
        self.version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_model_bytes() {
        assert!(OnnxRegressor::new(b"not an onnx graph", "v1").is_err());
    }

    #[test]
    fn test_feature_tensor_shape() {
        let features = FeatureVector {
            warehouse: 4.0,
            max_temp: 65.0,
            shift: 2.0,
            temp: 5.0,
            pressure: 1013.25,
            humidity: 70.0,
            precipitation: 0.0,
            wind_dir: 0.0,
            v_avg: 5.0,
            v_max: 7.5,
            cloudcover: 50.0,
            weather_code: 0.0,
            to_warehouse_tn: 0.0,
            to_ship_tn: 0.0,
            supply_warehouse: 4.0,
            pile_age_days: 30.0,
            encoded_pile_id: 1.0,
            encoded_coal_grade: 0.0,
            encoded_supply_grade: 0.0,
        };
        let tensor = OnnxRegressor::features_to_tensor(&features).unwrap();
        assert_eq!(tensor.shape(), &[1, NUM_FEATURES]);
    }
}
