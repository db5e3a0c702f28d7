//! Schema normalization for uploaded CSV files
//!
//! This module turns header-less tabular text into typed records. It supports
//! four fixed layouts (temperature, fire events, weather, supply), picked
//! either explicitly by the caller or from the file name.

pub mod coerce;
mod schema;


pub use schema::{
    FIRE_COLUMNS, FIRE_HEADER_MARKERS, SUPPLY_COLUMNS, TEMPERATURE_COLUMNS, WEATHER_COLUMNS,
};

use crate::models::{FireEvent, SupplyEvent, TemperatureReading, WeatherObservation};
use crate::observability::IgnitionMetrics;
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Layout of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Temperature,
    Fire,
    Weather,
    Supply,
}

impl FileKind {
    pub const ALL: [FileKind; 4] = [
        FileKind::Temperature,
        FileKind::Fire,
        FileKind::Weather,
        FileKind::Supply,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Temperature => "temperature",
            FileKind::Fire => "fire",
            FileKind::Weather => "weather",
            FileKind::Supply => "supply",
        }
    }

    /// Substrings of a file name that select this kind
    fn name_markers(&self) -> &'static [&'static str] {
        match self {
            FileKind::Temperature => &["temperature"],
            FileKind::Fire => &["fire"],
            FileKind::Weather => &["weather"],
            FileKind::Supply => &["supply", "supplies"],
        }
    }

    /// Number of leading columns the layout reads
    pub fn column_count(&self) -> usize {
        match self {
            FileKind::Temperature => TEMPERATURE_COLUMNS.len(),
            FileKind::Fire => FIRE_COLUMNS.len(),
            FileKind::Weather => WEATHER_COLUMNS.len(),
            FileKind::Supply => SUPPLY_COLUMNS.len(),
        }
    }

    /// Classify a file by case-insensitive substring match on its name.
    ///
    /// A name matching more than one kind is rejected rather than resolved
    /// by precedence.
    pub fn classify(filename: &str) -> Result<FileKind, IngestError> {
        let lower = filename.to_lowercase();
        let matches: Vec<FileKind> = Self::ALL
            .into_iter()
            .filter(|k| k.name_markers().iter().any(|m| lower.contains(m)))
            .collect();

        match matches.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(IngestError::UnrecognizedFileKind(filename.to_string())),
            _ => Err(IngestError::AmbiguousFileKind {
                filename: filename.to_string(),
                candidates: matches,
            }),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "temperature" => Ok(FileKind::Temperature),
            "fire" | "fires" => Ok(FileKind::Fire),
            "weather" => Ok(FileKind::Weather),
            "supply" | "supplies" => Ok(FileKind::Supply),
            other => Err(IngestError::UnrecognizedFileKind(other.to_string())),
        }
    }
}

/// Errors surfaced by ingestion; malformed rows are never errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unrecognized file kind: {0} (expected temperature, fire, weather or supply)")]
    UnrecognizedFileKind(String),

    #[error("file name {filename} matches several kinds: {candidates:?}")]
    AmbiguousFileKind {
        filename: String,
        candidates: Vec<FileKind>,
    },

    #[error("{kind} file has {found} columns, expected at least {expected}")]
    MissingColumns {
        kind: FileKind,
        expected: usize,
        found: usize,
    },

    #[error("no usable {kind} rows among {rows_seen} read")]
    SchemaValidation { kind: FileKind, rows_seen: usize },

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Typed records produced by one normalization call
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedBatch {
    Temperature(Vec<TemperatureReading>),
    Fire(Vec<FireEvent>),
    Weather(Vec<WeatherObservation>),
    Supply(Vec<SupplyEvent>),
}

impl NormalizedBatch {
    pub fn kind(&self) -> FileKind {
        match self {
            NormalizedBatch::Temperature(_) => FileKind::Temperature,
            NormalizedBatch::Fire(_) => FileKind::Fire,
            NormalizedBatch::Weather(_) => FileKind::Weather,
            NormalizedBatch::Supply(_) => FileKind::Supply,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NormalizedBatch::Temperature(v) => v.len(),
            NormalizedBatch::Fire(v) => v.len(),
            NormalizedBatch::Weather(v) => v.len(),
            NormalizedBatch::Supply(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every record to the store, returning the inserted count
    pub fn append_to(self, store: &mut dyn RecordStore) -> Result<usize, StoreError> {
        match self {
            NormalizedBatch::Temperature(v) => store.append_temperatures(v),
            NormalizedBatch::Fire(v) => store.append_fire_events(v),
            NormalizedBatch::Weather(v) => store.append_weather(v),
            NormalizedBatch::Supply(v) => store.append_supplies(v),
        }
    }
}

/// Parse header-less CSV bytes into raw rows.
///
/// The width of the first record is the file width; longer records are bad
/// lines and skipped, shorter ones are kept and read as absent cells.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    let mut width = None;
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let w = *width.get_or_insert(record.len());
        if record.len() > w {
            skipped += 1;
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    if skipped > 0 {
        debug!(skipped, "Skipped over-long CSV lines");
    }
    Ok(rows)
}

fn map_rows<T>(rows: &[Vec<String>], f: impl Fn(&[String]) -> Option<T>) -> Vec<T> {
    rows.iter().filter_map(|r| f(r)).collect()
}

/// Coerce raw rows into typed records of `kind`, dropping invalid rows
pub fn normalize(kind: FileKind, rows: &[Vec<String>]) -> Result<NormalizedBatch, IngestError> {
    let first = rows.first().ok_or(IngestError::SchemaValidation {
        kind,
        rows_seen: 0,
    })?;

    let width = first.len();
    if width < kind.column_count() {
        return Err(IngestError::MissingColumns {
            kind,
            expected: kind.column_count(),
            found: width,
        });
    }

    let data = if kind == FileKind::Fire && schema::is_fire_header(first) {
        &rows[1..]
    } else {
        rows
    };

    let batch = match kind {
        FileKind::Temperature => NormalizedBatch::Temperature(map_rows(data, schema::temperature_row)),
        FileKind::Fire => NormalizedBatch::Fire(map_rows(data, schema::fire_row)),
        FileKind::Weather => NormalizedBatch::Weather(map_rows(data, schema::weather_row)),
        FileKind::Supply => NormalizedBatch::Supply(map_rows(data, schema::supply_row)),
    };

    if batch.is_empty() {
        return Err(IngestError::SchemaValidation {
            kind,
            rows_seen: data.len(),
        });
    }

    let dropped = data.len() - batch.len();
    IgnitionMetrics::new().inc_rows_dropped(kind.as_str(), dropped as u64);
    debug!(kind = %kind, kept = batch.len(), dropped, "Normalized rows");

    Ok(batch)
}

/// Normalize `rows` and append the surviving records to `store`
pub fn ingest(
    store: &mut dyn RecordStore,
    kind: FileKind,
    rows: &[Vec<String>],
) -> Result<usize, IngestError> {
    let batch = normalize(kind, rows)?;
    let inserted = batch.append_to(store)?;

    IgnitionMetrics::new().inc_rows_ingested(kind.as_str(), inserted as u64);
    info!(kind = %kind, rows_seen = rows.len(), inserted, "Ingestion completed");
    Ok(inserted)
}
