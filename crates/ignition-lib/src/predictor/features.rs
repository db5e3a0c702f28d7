//! Feature reconstruction for a pile at a reference instant
//!
//! Rebuilds the model context from stored history: the latest temperature
//! strictly before the reference, the pile age from its formation date, and
//! the previous day's weather. Missing weather and age are filled with
//! defaults; a pile with no prior temperature cannot be reconstructed.

use crate::models::{PileKey, WeatherObservation};
use crate::store::{RecordStore, StoreResult};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Age used when the pile formation date is unknown
pub const DEFAULT_PILE_AGE_DAYS: i64 = 30;

pub const DEFAULT_TEMP: f64 = 5.0;
pub const DEFAULT_PRESSURE: f64 = 1013.25;
pub const DEFAULT_HUMIDITY: i64 = 70;
pub const DEFAULT_PRECIPITATION: f64 = 0.0;
pub const DEFAULT_WIND_DIR: i64 = 0;
pub const DEFAULT_WIND_SPEED: f64 = 5.0;
pub const DEFAULT_CLOUDCOVER: i64 = 50;
pub const DEFAULT_WEATHER_CODE: i64 = 0;

/// Gust speed is estimated from the mean wind speed when not observed
const GUST_FACTOR: f64 = 1.5;

/// Weather fields fed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temp: f64,
    pub pressure: f64,
    pub humidity: i64,
    pub precipitation: f64,
    pub wind_dir: i64,
    pub v_avg: f64,
    pub v_max: f64,
    pub cloudcover: i64,
    pub weather_code: i64,
}

impl Default for WeatherContext {
    fn default() -> Self {
        Self {
            temp: DEFAULT_TEMP,
            pressure: DEFAULT_PRESSURE,
            humidity: DEFAULT_HUMIDITY,
            precipitation: DEFAULT_PRECIPITATION,
            wind_dir: DEFAULT_WIND_DIR,
            v_avg: DEFAULT_WIND_SPEED,
            v_max: DEFAULT_WIND_SPEED * GUST_FACTOR,
            cloudcover: DEFAULT_CLOUDCOVER,
            weather_code: DEFAULT_WEATHER_CODE,
        }
    }
}

impl From<&WeatherObservation> for WeatherContext {
    fn from(obs: &WeatherObservation) -> Self {
        let v_avg = obs.wind_speed.unwrap_or(DEFAULT_WIND_SPEED);
        Self {
            temp: obs.temp,
            pressure: obs.pressure.unwrap_or(DEFAULT_PRESSURE),
            humidity: obs.humidity,
            precipitation: obs.precipitation.unwrap_or(DEFAULT_PRECIPITATION),
            wind_dir: obs.wind_dir.unwrap_or(DEFAULT_WIND_DIR),
            v_avg,
            v_max: obs.v_max.unwrap_or(v_avg * GUST_FACTOR),
            cloudcover: obs.cloudcover.unwrap_or(DEFAULT_CLOUDCOVER),
            weather_code: obs.weather_code.unwrap_or(DEFAULT_WEATHER_CODE),
        }
    }
}

/// Everything known about a pile at `as_of`, before encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContext {
    pub pile: PileKey,
    pub coal_grade: String,
    pub max_temp: f64,
    pub shift: i64,
    pub pile_age_days: i64,
    pub weather: WeatherContext,
    pub as_of: NaiveDateTime,
}

/// Reconstructs `FeatureContext` values from a record store
#[derive(Debug, Clone)]
pub struct FeatureReconstructor {
    default_age_days: i64,
}

impl Default for FeatureReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureReconstructor {
    pub fn new() -> Self {
        Self {
            default_age_days: DEFAULT_PILE_AGE_DAYS,
        }
    }

    /// Build the context for `pile` as of `as_of`.
    ///
    /// Returns `Ok(None)` when the pile has no temperature reading strictly
    /// before `as_of`. Only store failures are errors.
    pub fn reconstruct(
        &self,
        store: &dyn RecordStore,
        pile: &PileKey,
        as_of: NaiveDateTime,
    ) -> StoreResult<Option<FeatureContext>> {
        let Some(reading) = store.latest_temperature_before(pile, as_of)? else {
            debug!(pile = %pile, as_of = %as_of, "No temperature history before reference");
            return Ok(None);
        };

        let pile_age_days = self.pile_age(store, pile, as_of)?;

        let weather_day = as_of.date() - Duration::days(1);
        let weather = match store.latest_weather_on_or_before(weather_day)? {
            Some(obs) => WeatherContext::from(&obs),
            None => WeatherContext::default(),
        };

        Ok(Some(FeatureContext {
            pile: pile.clone(),
            coal_grade: reading.coal_grade,
            max_temp: reading.max_temp,
            shift: reading.shift,
            pile_age_days,
            weather,
            as_of,
        }))
    }

    /// Whole days from the pile formation date to `as_of`
    pub fn pile_age(
        &self,
        store: &dyn RecordStore,
        pile: &PileKey,
        as_of: NaiveDateTime,
    ) -> StoreResult<i64> {
        let formed = store
            .first_fire_event(pile)?
            .and_then(|event| event.pile_formed_at);

        Ok(match formed {
            Some(formed) => (as_of.date() - formed.date()).num_days(),
            None => self.default_age_days,
        })
    }
}
