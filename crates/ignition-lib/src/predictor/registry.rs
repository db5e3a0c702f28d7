//! Process-wide holder for the loaded model and its vocabularies
//!
//! The registry is built once at startup and shared by reference. `reload`
//! re-reads both artifacts, verifies the checksum and swaps the model in one
//! step; a failed reload leaves the previous model serving.

use super::encoder::{EncoderError, Vocabularies};
use super::inference::OnnxRegressor;
use super::output::RiskPredictor;
use super::Predictor;
use crate::observability::IgnitionMetrics;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no model is loaded")]
    NotLoaded,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid model: {0:#}")]
    Model(anyhow::Error),

    #[error(transparent)]
    Vocabulary(#[from] EncoderError),

    #[error("model registry lock poisoned")]
    Poisoned,
}

/// Where the model artifacts live on disk
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub model_path: PathBuf,
    pub vocabulary_path: PathBuf,
    pub expected_sha256: Option<String>,
}

/// A model ready to serve predictions
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    pub vocabularies: Arc<Vocabularies>,
    pub version: String,
    pub checksum: String,
}

impl LoadedModel {
    pub fn risk_predictor(&self) -> RiskPredictor {
        RiskPredictor::new(self.predictor.clone(), self.vocabularies.clone())
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("version", &self.version)
            .field("checksum", &self.checksum)
            .finish()
    }
}

pub struct ModelRegistry {
    source: Option<ModelSource>,
    current: RwLock<Option<Arc<LoadedModel>>>,
    metrics: IgnitionMetrics,
}

impl ModelRegistry {
    /// Registry that loads from `source`; nothing is read until `load`
    pub fn new(source: ModelSource) -> Self {
        Self {
            source: Some(source),
            current: RwLock::new(None),
            metrics: IgnitionMetrics::new(),
        }
    }

    /// Registry serving an in-memory predictor, with no on-disk source
    pub fn from_parts(
        predictor: Arc<dyn Predictor>,
        vocabularies: Vocabularies,
    ) -> Self {
        let version = predictor.model_version();
        let loaded = LoadedModel {
            predictor,
            vocabularies: Arc::new(vocabularies),
            version,
            checksum: String::new(),
        };
        Self {
            source: None,
            current: RwLock::new(Some(Arc::new(loaded))),
            metrics: IgnitionMetrics::new(),
        }
    }

    /// Registry with neither a source nor a model
    pub fn empty() -> Self {
        Self {
            source: None,
            current: RwLock::new(None),
            metrics: IgnitionMetrics::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_ok()
    }

    /// The serving model, or `NotLoaded`
    pub fn current(&self) -> Result<Arc<LoadedModel>, RegistryError> {
        let guard = self.current.read().map_err(|_| RegistryError::Poisoned)?;
        guard.clone().ok_or(RegistryError::NotLoaded)
    }

    pub fn current_version(&self) -> Option<String> {
        self.current().ok().map(|m| m.version.clone())
    }

    /// Initial load from the configured source
    pub fn load(&self) -> Result<Arc<LoadedModel>, RegistryError> {
        self.reload()
    }

    /// Re-read the artifacts and swap them in
    pub fn reload(&self) -> Result<Arc<LoadedModel>, RegistryError> {
        let old_version = self.current_version().unwrap_or_else(|| "none".to_string());

        let source = self.source.as_ref().ok_or(RegistryError::NotLoaded)?;
        let loaded = match Self::read_source(source) {
            Ok(loaded) => Arc::new(loaded),
            Err(e) => {
                warn!(
                    model_path = %source.model_path.display(),
                    old_version = %old_version,
                    error = %e,
                    "Model reload failed, keeping previous version"
                );
                return Err(e);
            }
        };

        {
            let mut guard = self.current.write().map_err(|_| RegistryError::Poisoned)?;
            *guard = Some(loaded.clone());
        }

        self.metrics.set_model_version(&loaded.version, &loaded.checksum);
        info!(
            old_version = %old_version,
            new_version = %loaded.version,
            checksum = %loaded.checksum,
            "Model loaded"
        );
        Ok(loaded)
    }

    /// Drop the serving model
    pub fn unload(&self) -> Result<(), RegistryError> {
        let mut guard = self.current.write().map_err(|_| RegistryError::Poisoned)?;
        if guard.take().is_some() {
            self.metrics.clear_model_version();
            info!("Model unloaded");
        }
        Ok(())
    }

    fn read_source(source: &ModelSource) -> Result<LoadedModel, RegistryError> {
        let model_bytes = read_file(&source.model_path)?;
        let checksum = compute_checksum(&model_bytes);

        if let Some(expected) = &source.expected_sha256 {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(RegistryError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
        }

        let vocabularies = Vocabularies::from_json(&read_file(&source.vocabulary_path)?)?;
        let version = model_version(&source.model_path, &checksum);
        let regressor = OnnxRegressor::new(&model_bytes, version.clone())
            .map_err(RegistryError::Model)?;

        Ok(LoadedModel {
            predictor: Arc::new(regressor),
            vocabularies: Arc::new(vocabularies),
            version,
            checksum,
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, RegistryError> {
    std::fs::read(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Version label: file stem plus a checksum prefix
fn model_version(path: &Path, checksum: &str) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    format!("{}-{}", stem, &checksum[..checksum.len().min(12)])
}
