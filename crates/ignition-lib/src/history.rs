//! Read-only history queries for dashboards
//!
//! Daily weather aggregates, per-pile timelines and the distinct warehouse
//! and pile listings. Date ranges are inclusive of the whole end day.

use crate::models::PileKey;
use crate::predictor::FeatureReconstructor;
use crate::store::{RecordStore, StoreResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weather aggregated over one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub avg_humidity: i64,
    pub total_precip: f64,
    pub avg_wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperaturePoint {
    pub date: NaiveDate,
    pub temp: f64,
    pub shift: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirePoint {
    pub date: NaiveDate,
}

/// Timeline of one pile alongside the weather for the same period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PileHistory {
    pub temperatures: Vec<TemperaturePoint>,
    pub weather: Vec<DailyWeather>,
    pub fires: Vec<FirePoint>,
}

fn day_bounds(from: NaiveDate, to: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    (from.and_time(NaiveTime::MIN), to.and_time(end_of_day))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Default)]
struct DayAccumulator {
    temp_sum: f64,
    humidity_sum: f64,
    precip_sum: f64,
    wind_sum: f64,
    wind_samples: usize,
    samples: usize,
}

/// Per-day weather aggregates in `[from, to]`, ascending; empty days are absent
pub fn daily_weather(
    store: &dyn RecordStore,
    from: NaiveDate,
    to: NaiveDate,
) -> StoreResult<Vec<DailyWeather>> {
    let (lo, hi) = day_bounds(from, to);
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for obs in store.weather_between(lo, hi)? {
        let acc = days.entry(obs.observed_at.date()).or_default();
        acc.samples += 1;
        acc.temp_sum += obs.temp;
        acc.humidity_sum += obs.humidity as f64;
        acc.precip_sum += obs.precipitation.unwrap_or(0.0);
        if let Some(wind) = obs.wind_speed {
            acc.wind_sum += wind;
            acc.wind_samples += 1;
        }
    }

    Ok(days
        .into_iter()
        .map(|(date, acc)| {
            let n = acc.samples as f64;
            DailyWeather {
                date,
                avg_temp: round1(acc.temp_sum / n),
                avg_humidity: (acc.humidity_sum / n).trunc() as i64,
                total_precip: round1(acc.precip_sum),
                avg_wind_speed: (acc.wind_samples > 0)
                    .then(|| round1(acc.wind_sum / acc.wind_samples as f64)),
            }
        })
        .collect())
}

pub fn pile_history(
    store: &dyn RecordStore,
    pile: &PileKey,
    from: NaiveDate,
    to: NaiveDate,
) -> StoreResult<PileHistory> {
    let (lo, hi) = day_bounds(from, to);

    let temperatures = store
        .temperatures_between(pile, lo, hi)?
        .into_iter()
        .map(|r| TemperaturePoint {
            date: r.measured_at.date(),
            temp: r.max_temp,
            shift: r.shift,
        })
        .collect();

    let fires = store
        .fire_events_between(pile, lo, hi)?
        .into_iter()
        .map(|f| FirePoint {
            date: f.fire_start.date(),
        })
        .collect();

    Ok(PileHistory {
        temperatures,
        weather: daily_weather(store, from, to)?,
        fires,
    })
}

/// Days since the pile was formed, or the default age when unknown
pub fn pile_age(store: &dyn RecordStore, pile: &PileKey, today: NaiveDate) -> StoreResult<i64> {
    FeatureReconstructor::new().pile_age(store, pile, today.and_time(NaiveTime::MIN))
}

pub fn warehouses(store: &dyn RecordStore) -> StoreResult<Vec<i64>> {
    store.warehouses()
}

pub fn piles(store: &dyn RecordStore, warehouse: i64) -> StoreResult<Vec<String>> {
    store.piles_in_warehouse(warehouse)
}
