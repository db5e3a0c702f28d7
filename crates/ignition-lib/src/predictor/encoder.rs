//! Categorical encoding with training-time vocabularies
//!
//! Each vocabulary maps a label to the integer code the regression model saw
//! during training. Codes are positions in the trained class list.

use crate::observability::IgnitionMetrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Code returned for labels absent from the training vocabulary
pub const UNSEEN_CODE: i64 = -1;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("vocabulary {vocabulary} lists {label:?} more than once")]
    Duplicate { vocabulary: String, label: String },

    #[error("failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed vocabulary file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Bijection between labels and integer codes
#[derive(Debug, Clone)]
pub struct Vocabulary {
    name: String,
    codes: HashMap<String, i64>,
}

impl Vocabulary {
    pub fn new(name: impl Into<String>, classes: Vec<String>) -> Result<Self, EncoderError> {
        let name = name.into();
        let mut codes = HashMap::with_capacity(classes.len());
        for (idx, label) in classes.iter().enumerate() {
            if codes.insert(label.clone(), idx as i64).is_some() {
                return Err(EncoderError::Duplicate {
                    vocabulary: name,
                    label: label.clone(),
                });
            }
        }
        Ok(Self { name, codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code for `value`, or `UNSEEN_CODE` with a warning when unknown
    pub fn encode(&self, value: &str) -> i64 {
        match self.codes.get(value) {
            Some(code) => *code,
            None => {
                warn!(vocabulary = %self.name, value = %value, "Unseen category, using sentinel code");
                IgnitionMetrics::new().inc_unseen_category(&self.name);
                UNSEEN_CODE
            }
        }
    }
}

/// On-disk vocabulary layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyFile {
    pub pile_id: Vec<String>,
    pub coal_grade: Vec<String>,
    pub supply_grade: Vec<String>,
}

/// The three vocabularies the regression model was trained with
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub pile_id: Vocabulary,
    pub coal_grade: Vocabulary,
    pub supply_grade: Vocabulary,
}

impl Vocabularies {
    pub fn from_file_contents(file: VocabularyFile) -> Result<Self, EncoderError> {
        Ok(Self {
            pile_id: Vocabulary::new("pile_id", file.pile_id)?,
            coal_grade: Vocabulary::new("coal_grade", file.coal_grade)?,
            supply_grade: Vocabulary::new("supply_grade", file.supply_grade)?,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, EncoderError> {
        let file: VocabularyFile = serde_json::from_slice(bytes)?;
        Self::from_file_contents(file)
    }

    pub fn load(path: &Path) -> Result<Self, EncoderError> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    pub fn encode_pile_id(&self, pile_id: &str) -> i64 {
        self.pile_id.encode(&canonical_pile_id(pile_id))
    }

    pub fn encode_coal_grade(&self, grade: &str) -> i64 {
        self.coal_grade.encode(grade.trim())
    }

    pub fn encode_supply_grade(&self, grade: &str) -> i64 {
        self.supply_grade.encode(grade.trim())
    }
}

/// Numeric pile ids are rendered as their integer value (`"046"` -> `"46"`)
pub fn canonical_pile_id(pile_id: &str) -> String {
    let trimmed = pile_id.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n.to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
        _ => trimmed.to_string(),
    }
}
