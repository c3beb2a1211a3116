use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, OnceLock, PoisonError, RwLock,
    },
};

use ahash::HashMap;
use chrono::NaiveTime;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};

use super::{
    table::{CongestionReading, CongestionScale, PredictionRecord, PredictionTable},
    time_grid::{bucket_of, interval_of, interval_to_time, INTERVALS_PER_DAY},
};
use crate::{error::TrafficError, graphs::SensorId};

/// Normalizes `2017-10-01` and `Oct1_2017` style dates to the file name form.
pub fn normalize_date(date: &str) -> String {
    date.trim().replace('-', "_").to_lowercase()
}

/// Splits `<date>_<model>` where the date is either `yyyy_mm_dd` or
/// `<month+day>_<year>`. The model may itself contain '_'.
fn split_file_stem(stem: &str) -> Option<(String, String)> {
    let parts = stem.split('_').collect_vec();
    let is_digits = |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());

    let date_parts = if parts.len() >= 4
        && is_digits(parts[0], 4)
        && is_digits(parts[1], 2)
        && is_digits(parts[2], 2)
    {
        3
    } else {
        2
    };
    if parts.len() <= date_parts {
        return None;
    }

    Some((
        parts[..date_parts].join("_"),
        parts[date_parts..].join("_"),
    ))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    model: String,
    date: String,
}

impl CacheKey {
    fn new(model: &str, date: &str) -> CacheKey {
        CacheKey {
            model: model.trim().to_string(),
            date: normalize_date(date),
        }
    }

    fn file_name(&self) -> String {
        format!("predictions_{}_{}.csv", self.date, self.model)
    }
}

#[derive(Default)]
struct CacheSlot {
    loading: Mutex<()>,
    table: OnceLock<Arc<PredictionTable>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModelComparison {
    pub detector_id: SensorId,
    pub date: String,
    pub time: String,
    pub predictions: Vec<ModelPrediction>,
    /// Requested models without a value for this sensor and time.
    pub missing: Vec<String>,
    pub statistics: ComparisonStatistics,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModelPrediction {
    pub model: String,
    pub traffic_prediction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonStatistics {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Lazily loaded, shared cache of prediction tables keyed by model and date.
///
/// The first caller to touch a key parses the file while holding that key's
/// loading lock; concurrent callers for the same key wait on it and reuse the
/// result. Loads for different keys run in parallel. A populated key is served
/// from its `OnceLock` under a shared map guard only.
pub struct PredictionStore {
    data_dir: PathBuf,
    scale: CongestionScale,
    entries: RwLock<HashMap<CacheKey, Arc<CacheSlot>>>,
    // Held shared by every load and exclusively by `clear_cache`.
    clear_gate: RwLock<()>,
    loads: AtomicUsize,
}

impl PredictionStore {
    pub fn new(data_dir: impl Into<PathBuf>, scale: CongestionScale) -> PredictionStore {
        PredictionStore {
            data_dir: data_dir.into(),
            scale,
            entries: RwLock::new(HashMap::default()),
            clear_gate: RwLock::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn scale(&self) -> CongestionScale {
        self.scale
    }

    /// The table for `model` on `date`, loading it on first access.
    pub fn table(&self, model: &str, date: &str) -> Result<Arc<PredictionTable>, TrafficError> {
        let key = CacheKey::new(model, date);
        if let Some(table) = self.cached(&key) {
            return Ok(table);
        }

        let _gate = self.clear_gate.read().unwrap_or_else(PoisonError::into_inner);
        let slot = self.slot(&key);
        let _loading = slot.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = slot.table.get() {
            return Ok(table.clone());
        }

        match self.load(&key) {
            Ok(table) => Ok(slot.table.get_or_init(|| Arc::new(table)).clone()),
            Err(error) => {
                self.evict_empty(&key, &slot);
                Err(error)
            }
        }
    }

    // Failed loads leave no slot behind, so unknown keys cannot grow the map.
    fn evict_empty(&self, key: &CacheKey, slot: &Arc<CacheSlot>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let same_slot = entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot));
        if same_slot && slot.table.get().is_none() {
            entries.remove(key);
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<PredictionTable>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key)?.table.get().cloned()
    }

    fn slot(&self, key: &CacheKey) -> Arc<CacheSlot> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.clone()).or_default().clone()
    }

    fn load(&self, key: &CacheKey) -> Result<PredictionTable, TrafficError> {
        let path = self.data_dir.join(key.file_name());
        // A key whose file name splits back differently names another key's file.
        let canonical = split_file_stem(&format!("{}_{}", key.date, key.model))
            == Some((key.date.clone(), key.model.clone()));
        if !canonical || !path.is_file() {
            return Err(TrafficError::NotFound(format!(
                "no predictions for model '{}' on date '{}'",
                key.model, key.date
            )));
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        let table = PredictionTable::from_path(&key.model, &key.date, &path, self.scale)?;
        info!(
            "loaded {} predictions for {} sensors from {}",
            table.record_count(),
            table.sensors().len(),
            path.display()
        );
        Ok(table)
    }

    /// Drops every cached table. Waits for loads in flight to finish first.
    pub fn clear_cache(&self) {
        let _gate = self.clear_gate.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let cleared = entries.len();
        entries.clear();
        info!("prediction cache cleared ({} entries)", cleared);
    }

    /// Number of populated cache entries.
    pub fn cached_entries(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.table.get().is_some()).count()
    }

    /// Number of keys in the cache map, populated or not.
    pub fn cache_slots(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Prediction files parsed since the store was created.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn require_sensor(
        &self,
        table: &PredictionTable,
        sensor: SensorId,
    ) -> Result<(), TrafficError> {
        if table.contains(sensor) {
            return Ok(());
        }
        Err(TrafficError::NotFound(format!(
            "no predictions for sensor {} in model '{}' on '{}'",
            sensor,
            table.model(),
            table.date()
        )))
    }

    pub fn get(
        &self,
        sensor: SensorId,
        model: &str,
        date: &str,
        time: NaiveTime,
    ) -> Result<PredictionRecord, TrafficError> {
        let table = self.table(model, date)?;
        self.require_sensor(&table, sensor)?;

        let interval = interval_of(time);
        table.record(sensor, interval).ok_or_else(|| {
            TrafficError::NotFound(format!(
                "no prediction for sensor {} at {} in model '{}'",
                sensor,
                time.format("%H:%M:%S"),
                model
            ))
        })
    }

    /// Records with `start <= time <= end`, ascending. Open bounds cover the day.
    pub fn get_range(
        &self,
        sensor: SensorId,
        model: &str,
        date: &str,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Result<Vec<PredictionRecord>, TrafficError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(TrafficError::validation(
                    "start_time",
                    "start time must not be after end time",
                ));
            }
        }

        let table = self.table(model, date)?;
        self.require_sensor(&table, sensor)?;

        let records = (0..INTERVALS_PER_DAY)
            .filter(|&interval| {
                let time = interval_to_time(interval);
                start.map_or(true, |start| start <= time) && end.map_or(true, |end| time <= end)
            })
            .filter_map(|interval| table.record(sensor, interval))
            .collect();

        Ok(records)
    }

    /// The same sensor and time across several models.
    pub fn compare(
        &self,
        sensor: SensorId,
        date: &str,
        time: NaiveTime,
        models: &[String],
    ) -> Result<ModelComparison, TrafficError> {
        if models.is_empty() {
            return Err(TrafficError::validation("models", "at least one model is required"));
        }

        let mut predictions = Vec::new();
        let mut missing = Vec::new();
        for model in models.iter().unique() {
            match self.get(sensor, model, date, time) {
                Ok(record) => predictions.push(ModelPrediction {
                    model: model.clone(),
                    traffic_prediction: record.traffic_prediction,
                }),
                Err(TrafficError::NotFound(message)) => {
                    debug!("compare: {}", message);
                    missing.push(model.clone());
                }
                Err(error) => return Err(error),
            }
        }

        let values = predictions.iter().map(|prediction| prediction.traffic_prediction).collect_vec();
        let (min, max) = match values.iter().copied().minmax_by(f64::total_cmp).into_option() {
            Some(bounds) => bounds,
            None => {
                return Err(TrafficError::NotFound(format!(
                    "no model has a prediction for sensor {} at {}",
                    sensor,
                    time.format("%H:%M:%S")
                )))
            }
        };
        let average = values.iter().sum::<f64>() / values.len() as f64;

        Ok(ModelComparison {
            detector_id: sensor,
            date: normalize_date(date),
            time: time.format("%H:%M:%S").to_string(),
            predictions,
            missing,
            statistics: ComparisonStatistics {
                average,
                min,
                max,
                range: max - min,
            },
        })
    }

    /// Per-sensor mean over the 30-minute bucket containing `time`. Sensors
    /// without any record in the bucket are absent from the map.
    pub fn aggregate_30min(
        &self,
        model: &str,
        date: &str,
        time: NaiveTime,
    ) -> Result<HashMap<SensorId, f64>, TrafficError> {
        let table = self.table(model, date)?;
        let bucket = bucket_of(time);

        Ok(table
            .sensors()
            .into_iter()
            .filter_map(|sensor| table.bucket_average(sensor, bucket).map(|value| (sensor, value)))
            .collect())
    }

    pub fn sensor_aggregate_30min(
        &self,
        sensor: SensorId,
        model: &str,
        date: &str,
        time: NaiveTime,
    ) -> Result<f64, TrafficError> {
        let table = self.table(model, date)?;
        self.require_sensor(&table, sensor)?;
        table.bucket_average(sensor, bucket_of(time)).ok_or_else(|| {
            TrafficError::NotFound(format!(
                "no predictions for sensor {} in the half hour containing {}",
                sensor,
                time.format("%H:%M:%S")
            ))
        })
    }

    /// Value at the interval, falling back to the closest recorded interval.
    pub fn nearest_value(
        &self,
        sensor: SensorId,
        model: &str,
        date: &str,
        interval: u32,
    ) -> Result<CongestionReading, TrafficError> {
        let table = self.table(model, date)?;
        table.nearest(sensor, interval).ok_or_else(|| TrafficError::StaleData {
            sensor,
            model: model.to_string(),
            date: normalize_date(date),
        })
    }

    /// Sorted ids of the sensors present in one table.
    pub fn sensors(&self, model: &str, date: &str) -> Result<Vec<SensorId>, TrafficError> {
        Ok(self.table(model, date)?.sensors())
    }

    fn prediction_files(&self) -> Vec<(String, String)> {
        let Ok(entries) = std::fs::read_dir(&self.data_dir) else {
            return Vec::new();
        };

        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_prefix("predictions_")?.strip_suffix(".csv")?;
                split_file_stem(stem)
            })
            .collect()
    }

    pub fn available_models(&self) -> Vec<String> {
        self.prediction_files()
            .into_iter()
            .map(|(_, model)| model)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn available_dates(&self) -> Vec<String> {
        self.prediction_files()
            .into_iter()
            .map(|(date, _)| date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_normalized_to_file_form() {
        assert_eq!(normalize_date("2017-10-01"), "2017_10_01");
        assert_eq!(normalize_date("Oct1_2017"), "oct1_2017");
        assert_eq!(
            CacheKey::new("xgboost", "oct1_2017").file_name(),
            "predictions_oct1_2017_xgboost.csv"
        );
    }

    #[test]
    fn file_stems_split_both_date_forms() {
        let split = |stem| split_file_stem(stem).unwrap();
        assert_eq!(split("oct1_2017_xgboost"), ("oct1_2017".to_string(), "xgboost".to_string()));
        assert_eq!(split("oct1_2017_gcn_gru"), ("oct1_2017".to_string(), "gcn_gru".to_string()));
        assert_eq!(split("2017_10_01_xgboost"), ("2017_10_01".to_string(), "xgboost".to_string()));
        assert_eq!(split("2017_10_01_gcn_gru"), ("2017_10_01".to_string(), "gcn_gru".to_string()));
        assert_eq!(split_file_stem("oct1_2017"), None);
        assert_eq!(split_file_stem("2017_10_01"), None);
    }

    #[test]
    fn failed_loads_leave_no_slots() {
        let store = PredictionStore::new("/nonexistent/sensor_routes", CongestionScale::Canonical);
        for i in 0..100 {
            assert!(store.table(&format!("m{}", i), "oct1_2017").is_err());
        }
        assert_eq!(store.cache_slots(), 0);
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let store = PredictionStore::new("/nonexistent/sensor_routes", CongestionScale::Canonical);
        let error = store.table("xgboost", "oct1_2017").unwrap_err();
        assert!(matches!(error, TrafficError::NotFound(_)));
        assert_eq!(store.cached_entries(), 0);
    }

    #[test]
    fn clear_cache_is_idempotent() {
        let store = PredictionStore::new("/nonexistent/sensor_routes", CongestionScale::Canonical);
        store.clear_cache();
        store.clear_cache();
        assert_eq!(store.cached_entries(), 0);
        assert!(store.available_models().is_empty());
    }
}
