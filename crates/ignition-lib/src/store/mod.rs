//! Record store for ingested time series
//!
//! This module provides:
//! - The `RecordStore` trait consumed by ingestion, reconstruction and forecasting
//! - An append-only in-memory store with optional JSON snapshot persistence

mod memory;

pub use memory::MemoryStore;

use crate::models::{
    FireEvent, PileKey, SupplyEvent, TemperatureReading, WeatherObservation,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by a record store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is corrupt: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub temperatures: usize,
    pub fire_events: usize,
    pub weather: usize,
    pub supplies: usize,
}

/// Append-only store of ingested records.
///
/// The core never updates or deletes rows. Each append is all-or-nothing:
/// on `Ok` every row is stored (and persisted, for persistent backends), on
/// `Err` none is. Range queries are inclusive and return rows in ascending
/// time order.
pub trait RecordStore: Send {
    fn append_temperatures(&mut self, rows: Vec<TemperatureReading>) -> StoreResult<usize>;

    fn append_fire_events(&mut self, rows: Vec<FireEvent>) -> StoreResult<usize>;

    fn append_weather(&mut self, rows: Vec<WeatherObservation>) -> StoreResult<usize>;

    fn append_supplies(&mut self, rows: Vec<SupplyEvent>) -> StoreResult<usize>;

    /// Most recent reading for the pile with `measured_at < before`
    fn latest_temperature_before(
        &self,
        pile: &PileKey,
        before: NaiveDateTime,
    ) -> StoreResult<Option<TemperatureReading>>;

    /// First fire event recorded for the pile, in insertion order
    fn first_fire_event(&self, pile: &PileKey) -> StoreResult<Option<FireEvent>>;

    /// Most recent observation whose calendar day is `<= day`
    fn latest_weather_on_or_before(&self, day: NaiveDate)
        -> StoreResult<Option<WeatherObservation>>;

    /// Distinct piles seen in temperature readings, sorted
    fn distinct_piles(&self) -> StoreResult<Vec<PileKey>>;

    fn max_temperature_timestamp(&self) -> StoreResult<Option<NaiveDateTime>>;

    fn max_weather_timestamp(&self) -> StoreResult<Option<NaiveDateTime>>;

    fn temperatures_between(
        &self,
        pile: &PileKey,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<TemperatureReading>>;

    fn fire_events_between(
        &self,
        pile: &PileKey,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<FireEvent>>;

    fn weather_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<WeatherObservation>>;

    /// Distinct warehouses seen in temperature readings, sorted
    fn warehouses(&self) -> StoreResult<Vec<i64>>;

    /// Distinct pile ids in one warehouse, sorted
    fn piles_in_warehouse(&self, warehouse: i64) -> StoreResult<Vec<String>>;

    fn counts(&self) -> StoreResult<StoreCounts>;
}
