//! In-memory record store
//!
//! Rows live in append-only vectors. When a snapshot path is configured every
//! append rewrites the whole store as one JSON document, atomically via a
//! temp file and rename, and the snapshot is loaded again at startup. An
//! append whose snapshot write fails is rolled back.

use super::{RecordStore, StoreCounts, StoreError, StoreResult};
use crate::models::{
    FireEvent, PileKey, SupplyEvent, TemperatureReading, WeatherObservation,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    temperatures: Vec<TemperatureReading>,
    fire_events: Vec<FireEvent>,
    weather: Vec<WeatherObservation>,
    supplies: Vec<SupplyEvent>,
}

/// Append-only store backed by vectors
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store persisted to `path`, loading an existing snapshot.
    ///
    /// A snapshot that cannot be parsed is renamed to
    /// `<name>.corrupt-<timestamp>` and the store starts empty; any other
    /// read failure is returned.
    pub fn with_persistence(path: PathBuf) -> StoreResult<Self> {
        let mut store = Self {
            persistence_path: Some(path.clone()),
            ..Default::default()
        };

        if path.exists() {
            match store.load_from_disk(&path) {
                Ok(()) => {}
                Err(StoreError::Snapshot(e)) => {
                    let kept = quarantine(&path)?;
                    warn!(
                        path = %path.display(),
                        moved_to = %kept.display(),
                        error = %e,
                        "Store snapshot is corrupt, moved aside and starting empty"
                    );
                    store.tables = Tables::default();
                }
                Err(e) => return Err(e),
            }
        }

        Ok(store)
    }

    fn save_to_disk(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec(&self.tables)?;

        let temp_path = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;

        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn load_from_disk(&mut self, path: &Path) -> StoreResult<()> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        self.tables = serde_json::from_slice(&data)?;

        let counts = self.counts()?;
        info!(
            path = %path.display(),
            temperatures = counts.temperatures,
            fire_events = counts.fire_events,
            weather = counts.weather,
            supplies = counts.supplies,
            "Loaded store snapshot"
        );
        Ok(())
    }

    /// Extend one table and persist; the table is restored if persisting fails
    fn append<T>(
        &mut self,
        table: fn(&mut Tables) -> &mut Vec<T>,
        rows: Vec<T>,
    ) -> StoreResult<usize> {
        let n = rows.len();
        if n == 0 {
            return Ok(0);
        }

        let before = table(&mut self.tables).len();
        table(&mut self.tables).extend(rows);

        if let Some(path) = self.persistence_path.clone() {
            if let Err(e) = self.save_to_disk(&path) {
                table(&mut self.tables).truncate(before);
                warn!(path = %path.display(), error = %e, "Snapshot write failed, append rolled back");
                return Err(e);
            }
            debug!(path = %path.display(), rows = n, "Store snapshot written");
        }
        Ok(n)
    }
}

/// Rename an unreadable snapshot out of the way, returning its new path
fn quarantine(path: &Path) -> StoreResult<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let target = path.with_file_name(format!(
        "{}.corrupt-{}",
        name,
        Utc::now().format("%Y%m%dT%H%M%S%.3f")
    ));
    std::fs::rename(path, &target)?;
    Ok(target)
}

fn matches_pile(warehouse: i64, pile_id: &str, pile: &PileKey) -> bool {
    warehouse == pile.warehouse && pile_id == pile.pile_id
}

impl RecordStore for MemoryStore {
    fn append_temperatures(&mut self, rows: Vec<TemperatureReading>) -> StoreResult<usize> {
        self.append(|t| &mut t.temperatures, rows)
    }

    fn append_fire_events(&mut self, rows: Vec<FireEvent>) -> StoreResult<usize> {
        self.append(|t| &mut t.fire_events, rows)
    }

    fn append_weather(&mut self, rows: Vec<WeatherObservation>) -> StoreResult<usize> {
        self.append(|t| &mut t.weather, rows)
    }

    fn append_supplies(&mut self, rows: Vec<SupplyEvent>) -> StoreResult<usize> {
        self.append(|t| &mut t.supplies, rows)
    }

    fn latest_temperature_before(
        &self,
        pile: &PileKey,
        before: NaiveDateTime,
    ) -> StoreResult<Option<TemperatureReading>> {
        Ok(self
            .tables
            .temperatures
            .iter()
            .filter(|t| matches_pile(t.warehouse, &t.pile_id, pile) && t.measured_at < before)
            .max_by_key(|t| t.measured_at)
            .cloned())
    }

    fn first_fire_event(&self, pile: &PileKey) -> StoreResult<Option<FireEvent>> {
        Ok(self
            .tables
            .fire_events
            .iter()
            .find(|f| matches_pile(f.warehouse, &f.pile_id, pile))
            .cloned())
    }

    fn latest_weather_on_or_before(
        &self,
        day: NaiveDate,
    ) -> StoreResult<Option<WeatherObservation>> {
        Ok(self
            .tables
            .weather
            .iter()
            .filter(|w| w.observed_at.date() <= day)
            .max_by_key(|w| w.observed_at)
            .cloned())
    }

    fn distinct_piles(&self) -> StoreResult<Vec<PileKey>> {
        let piles: BTreeSet<PileKey> = self.tables.temperatures.iter().map(|t| t.pile()).collect();
        Ok(piles.into_iter().collect())
    }

    fn max_temperature_timestamp(&self) -> StoreResult<Option<NaiveDateTime>> {
        Ok(self.tables.temperatures.iter().map(|t| t.measured_at).max())
    }

    fn max_weather_timestamp(&self) -> StoreResult<Option<NaiveDateTime>> {
        Ok(self.tables.weather.iter().map(|w| w.observed_at).max())
    }

    fn temperatures_between(
        &self,
        pile: &PileKey,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<TemperatureReading>> {
        let mut rows: Vec<_> = self
            .tables
            .temperatures
            .iter()
            .filter(|t| {
                matches_pile(t.warehouse, &t.pile_id, pile)
                    && t.measured_at >= from
                    && t.measured_at <= to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.measured_at);
        Ok(rows)
    }

    fn fire_events_between(
        &self,
        pile: &PileKey,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<FireEvent>> {
        let mut rows: Vec<_> = self
            .tables
            .fire_events
            .iter()
            .filter(|f| {
                matches_pile(f.warehouse, &f.pile_id, pile)
                    && f.fire_start >= from
                    && f.fire_start <= to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.fire_start);
        Ok(rows)
    }

    fn weather_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<WeatherObservation>> {
        let mut rows: Vec<_> = self
            .tables
            .weather
            .iter()
            .filter(|w| w.observed_at >= from && w.observed_at <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|w| w.observed_at);
        Ok(rows)
    }

    fn warehouses(&self) -> StoreResult<Vec<i64>> {
        let set: BTreeSet<i64> = self.tables.temperatures.iter().map(|t| t.warehouse).collect();
        Ok(set.into_iter().collect())
    }

    fn piles_in_warehouse(&self, warehouse: i64) -> StoreResult<Vec<String>> {
        let set: BTreeSet<&str> = self
            .tables
            .temperatures
            .iter()
            .filter(|t| t.warehouse == warehouse)
            .map(|t| t.pile_id.as_str())
            .collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        Ok(StoreCounts {
            temperatures: self.tables.temperatures.len(),
            fire_events: self.tables.fire_events.len(),
            weather: self.tables.weather.len(),
            supplies: self.tables.supplies.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn reading(pile_id: &str, at: &str, max_temp: f64) -> TemperatureReading {
        TemperatureReading {
            warehouse: 4,
            pile_id: pile_id.to_string(),
            coal_grade: "A1".to_string(),
            max_temp,
            measured_at: ts(at),
            shift: 2,
        }
    }

    fn weather(at: &str, temp: f64) -> WeatherObservation {
        WeatherObservation {
            observed_at: ts(at),
            temp,
            pressure: Some(1010.0),
            humidity: 80,
            precipitation: Some(0.2),
            wind_dir: Some(180),
            wind_speed: Some(3.0),
            v_max: None,
            cloudcover: Some(90),
            visibility: None,
            weather_code: Some(3),
        }
    }

    #[test]
    fn test_latest_temperature_before_is_strict() {
        let mut store = MemoryStore::new();
        store
            .append_temperatures(vec![
                reading("46", "2025-11-18 00:00:00", 40.0),
                reading("46", "2025-11-19 00:00:00", 50.0),
                reading("46", "2025-11-20 00:00:00", 60.0),
            ])
            .unwrap();

        let pile = PileKey::new(4, "46");
        let got = store
            .latest_temperature_before(&pile, ts("2025-11-20 00:00:00"))
            .unwrap()
            .unwrap();
        assert_eq!(got.max_temp, 50.0);

        let none = store
            .latest_temperature_before(&pile, ts("2025-11-18 00:00:00"))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_first_fire_event_uses_insertion_order() {
        let mut store = MemoryStore::new();
        let fire = |formed: &str| FireEvent {
            warehouse: 4,
            pile_id: "46".to_string(),
            coal_grade: "A1".to_string(),
            fire_start: ts("2025-10-01 00:00:00"),
            pile_formed_at: Some(ts(formed)),
        };
        store
            .append_fire_events(vec![fire("2025-06-01 00:00:00"), fire("2025-09-01 00:00:00")])
            .unwrap();

        let got = store.first_fire_event(&PileKey::new(4, "46")).unwrap().unwrap();
        assert_eq!(got.pile_formed_at, Some(ts("2025-06-01 00:00:00")));
        assert!(store.first_fire_event(&PileKey::new(3, "46")).unwrap().is_none());
    }

    #[test]
    fn test_latest_weather_on_or_before_compares_dates() {
        let mut store = MemoryStore::new();
        store
            .append_weather(vec![
                weather("2025-11-19 06:00:00", 1.0),
                weather("2025-11-19 21:00:00", 2.0),
                weather("2025-11-20 03:00:00", 3.0),
            ])
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 11, 19).unwrap();
        let got = store.latest_weather_on_or_before(day).unwrap().unwrap();
        assert_eq!(got.temp, 2.0);
    }

    #[test]
    fn test_distinct_piles_and_warehouses() {
        let mut store = MemoryStore::new();
        let mut other = reading("12", "2025-11-18 00:00:00", 30.0);
        other.warehouse = 3;
        store
            .append_temperatures(vec![
                reading("46", "2025-11-18 00:00:00", 40.0),
                reading("46", "2025-11-19 00:00:00", 41.0),
                other,
            ])
            .unwrap();

        assert_eq!(
            store.distinct_piles().unwrap(),
            vec![PileKey::new(3, "12"), PileKey::new(4, "46")]
        );
        assert_eq!(store.warehouses().unwrap(), vec![3, 4]);
        assert_eq!(store.piles_in_warehouse(4).unwrap(), vec!["46".to_string()]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store").join("snapshot.json");

        {
            let mut store = MemoryStore::with_persistence(path.clone()).unwrap();
            store
                .append_temperatures(vec![reading("46", "2025-11-20 00:00:00", 65.0)])
                .unwrap();
            store.append_weather(vec![weather("2025-11-19 12:00:00", 4.0)]).unwrap();
        }

        let reopened = MemoryStore::with_persistence(path).unwrap();
        let counts = reopened.counts().unwrap();
        assert_eq!(counts.temperatures, 1);
        assert_eq!(counts.weather, 1);
    }

    #[test]
    fn test_corrupt_snapshot_is_kept_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let original = br#"{"temperatures": [ trunc"#;
        std::fs::write(&path, original).unwrap();

        let mut store = MemoryStore::with_persistence(path.clone()).unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts::default());

        store
            .append_temperatures(vec![reading("46", "2025-11-20 00:00:00", 65.0)])
            .unwrap();

        let kept: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("snapshot.json.corrupt-")
            })
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(std::fs::read(&kept[0]).unwrap(), original.to_vec());

        let reopened = MemoryStore::with_persistence(path).unwrap();
        assert_eq!(reopened.counts().unwrap().temperatures, 1);
    }

    #[test]
    fn test_unreadable_snapshot_fails_startup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            MemoryStore::with_persistence(path.clone()),
            Err(StoreError::Io(_))
        ));
        assert!(path.is_dir());
    }

    #[test]
    fn test_failed_snapshot_write_rolls_back_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut store = MemoryStore::with_persistence(path.clone()).unwrap();
        store
            .append_temperatures(vec![reading("46", "2025-11-19 00:00:00", 60.0)])
            .unwrap();

        // A directory where the snapshot file belongs makes the rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        for _ in 0..2 {
            assert!(store
                .append_temperatures(vec![reading("46", "2025-11-20 00:00:00", 65.0)])
                .is_err());
            assert_eq!(store.counts().unwrap().temperatures, 1);
        }
    }
}
