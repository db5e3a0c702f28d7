//! Fixed column layouts for the four input files
//!
//! Each mapper reads cells positionally and returns `None` when a required
//! field is absent after coercion. Nullable fields stay `None` in the record.

use super::coerce;
use crate::models::{FireEvent, SupplyEvent, TemperatureReading, WeatherObservation};

pub const TEMPERATURE_COLUMNS: [&str; 7] = [
    "warehouse",
    "pile_id",
    "coal_grade",
    "max_temp",
    "picket",
    "measured_at",
    "shift",
];

pub const FIRE_COLUMNS: [&str; 8] = [
    "compiled_at",
    "coal_grade",
    "weight",
    "warehouse",
    "fire_start",
    "fire_end",
    "pile_formed_at",
    "pile_id",
];

pub const WEATHER_COLUMNS: [&str; 11] = [
    "observed_at",
    "temp",
    "pressure",
    "humidity",
    "precipitation",
    "wind_dir",
    "wind_speed",
    "v_max",
    "cloudcover",
    "visibility",
    "weather_code",
];

pub const SUPPLY_COLUMNS: [&str; 7] = [
    "unload_to_warehouse",
    "coal_grade",
    "pile_id",
    "load_to_ship",
    "to_warehouse_tn",
    "to_ship_tn",
    "warehouse",
];

/// Cell text in the first column of a fire-event header row
pub const FIRE_HEADER_MARKERS: &[&str] = &["дата составления", "compiled_at"];

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(String::as_str)
}

fn owned_text(row: &[String], idx: usize) -> String {
    coerce::text(cell(row, idx)).unwrap_or_default().to_string()
}

pub fn temperature_row(row: &[String]) -> Option<TemperatureReading> {
    Some(TemperatureReading {
        warehouse: coerce::int(cell(row, 0))?,
        pile_id: owned_text(row, 1),
        coal_grade: owned_text(row, 2),
        max_temp: coerce::float(cell(row, 3))?,
        measured_at: coerce::datetime(cell(row, 5))?,
        shift: coerce::int(cell(row, 6))?,
    })
}

pub fn fire_row(row: &[String]) -> Option<FireEvent> {
    let pile_id = coerce::text(cell(row, 7))?.to_string();
    Some(FireEvent {
        warehouse: coerce::int(cell(row, 3))?,
        pile_id,
        coal_grade: owned_text(row, 1),
        fire_start: coerce::datetime(cell(row, 4))?,
        pile_formed_at: coerce::datetime(cell(row, 6)),
    })
}

pub fn weather_row(row: &[String]) -> Option<WeatherObservation> {
    Some(WeatherObservation {
        observed_at: coerce::datetime(cell(row, 0))?,
        temp: coerce::float(cell(row, 1))?,
        pressure: coerce::float(cell(row, 2)),
        humidity: coerce::int(cell(row, 3))?,
        precipitation: coerce::float(cell(row, 4)),
        wind_dir: coerce::int(cell(row, 5)),
        wind_speed: coerce::float(cell(row, 6)),
        v_max: coerce::float(cell(row, 7)),
        cloudcover: coerce::int(cell(row, 8)),
        visibility: coerce::int(cell(row, 9)),
        weather_code: coerce::int(cell(row, 10)),
    })
}

pub fn supply_row(row: &[String]) -> Option<SupplyEvent> {
    Some(SupplyEvent {
        unload_to_warehouse: coerce::datetime(cell(row, 0))?,
        coal_grade: owned_text(row, 1),
        pile_id: coerce::int(cell(row, 2))?,
        load_to_ship: coerce::datetime(cell(row, 3)),
        to_warehouse_tn: coerce::float(cell(row, 4)),
        to_ship_tn: coerce::float(cell(row, 5)),
        warehouse: coerce::int(cell(row, 6))?,
    })
}

/// True when any cell of `row` carries a fire-event header marker
pub fn is_fire_header(row: &[String]) -> bool {
    row.iter().any(|c| {
        let lower = c.trim().to_lowercase();
        FIRE_HEADER_MARKERS.iter().any(|m| lower.contains(m))
    })
}
