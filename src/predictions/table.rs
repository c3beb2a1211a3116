use std::{fs::File, io::Read, path::Path};

use ahash::{HashMap, HashMapExt};
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::time_grid::{bucket_intervals, format_time, interval_of, interval_to_time, parse_time, INTERVALS_PER_DAY};
use crate::{error::TrafficError, graphs::SensorId};

/// Scale the prediction files are written on.
///
/// Routing and categorization always work on the canonical 0–100 scale. Files
/// exported on the older 0–800 scale are converted once, at load time, by
/// `value × 100 / 800`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CongestionScale {
    #[default]
    Canonical,
    Extended,
}

impl CongestionScale {
    pub fn max_value(&self) -> f64 {
        match self {
            CongestionScale::Canonical => 100.0,
            CongestionScale::Extended => 800.0,
        }
    }

    pub fn to_canonical(&self, value: f64) -> f64 {
        value * 100.0 / self.max_value()
    }
}

/// A single predicted value as served to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub detector_id: SensorId,
    pub model: String,
    pub date: String,
    pub interval: u32,
    pub time: String,
    pub traffic_prediction: f64,
}

/// Congestion used for one sensor during a search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CongestionReading {
    pub value: f64,
    /// Interval the value was recorded for.
    pub interval: u32,
    /// True if the requested interval had no record and a neighbouring one was used.
    pub fallback: bool,
}

const REQUIRED_COLUMNS: [&str; 5] = ["detid", "date", "interval", "time", "traffic_predict"];

// The `interval` column is required but the slot is derived from `time`.
#[derive(Debug, Deserialize)]
struct PredictionRow {
    detid: SensorId,
    date: String,
    time: String,
    traffic_predict: f64,
}

/// One model's predictions for one day: a 480-slot series per sensor.
#[derive(Debug)]
pub struct PredictionTable {
    model: String,
    date: String,
    series: HashMap<SensorId, Vec<Option<f64>>>,
    record_count: usize,
}

impl PredictionTable {
    pub fn from_path(
        model: &str,
        date: &str,
        path: &Path,
        scale: CongestionScale,
    ) -> Result<PredictionTable, TrafficError> {
        let file = File::open(path).map_err(|source| TrafficError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        PredictionTable::from_reader(model, date, file, scale).map_err(|message| {
            TrafficError::PredictionData {
                path: path.to_path_buf(),
                message,
            }
        })
    }

    /// Parses a prediction table. `date` is used until a row names the calendar date.
    ///
    /// A repeated sensor and interval keeps its first value.
    pub fn from_reader<R: Read>(
        model: &str,
        date: &str,
        reader: R,
        scale: CongestionScale,
    ) -> Result<PredictionTable, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header = reader.headers().map_err(|error| format!("header: {}", error))?;
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !header.iter().any(|cell| cell == **column))
        {
            return Err(format!("missing column '{}'", missing));
        }

        let mut series: HashMap<SensorId, Vec<Option<f64>>> = HashMap::new();
        let mut calendar_date: Option<String> = None;
        let mut record_count = 0;
        let mut duplicates = 0;

        for (index, row) in reader.deserialize::<PredictionRow>().enumerate() {
            let row = row.map_err(|error| format!("row {}: {}", index + 1, error))?;
            let time = parse_time("time", &row.time).map_err(|error| format!("row {}: {}", index + 1, error))?;
            if !row.traffic_predict.is_finite() || row.traffic_predict < 0.0 {
                return Err(format!(
                    "row {}: congestion value {} is not a non-negative number",
                    index + 1,
                    row.traffic_predict
                ));
            }

            let slot = &mut series
                .entry(row.detid)
                .or_insert_with(|| vec![None; INTERVALS_PER_DAY as usize])[interval_of(time) as usize];
            if slot.is_some() {
                duplicates += 1;
                continue;
            }
            *slot = Some(scale.to_canonical(row.traffic_predict));
            calendar_date.get_or_insert(row.date);
            record_count += 1;
        }

        if duplicates > 0 {
            warn!("{}: ignored {} repeated sensor intervals", model, duplicates);
        }

        Ok(PredictionTable {
            model: model.to_string(),
            date: calendar_date.unwrap_or_else(|| date.to_string()),
            series,
            record_count,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Calendar date of the records, as written in the source.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Sorted ids of all sensors with at least one record.
    pub fn sensors(&self) -> Vec<SensorId> {
        self.series.keys().copied().sorted().collect()
    }

    pub fn contains(&self, sensor: SensorId) -> bool {
        self.series.contains_key(&sensor)
    }

    pub fn series(&self, sensor: SensorId) -> Option<&[Option<f64>]> {
        self.series.get(&sensor).map(|series| series.as_slice())
    }

    pub fn value(&self, sensor: SensorId, interval: u32) -> Option<f64> {
        *self.series(sensor)?.get(interval as usize)?
    }

    /// Value at `interval`, or at the closest interval that has one. Ties go to
    /// the earlier interval.
    pub fn nearest(&self, sensor: SensorId, interval: u32) -> Option<CongestionReading> {
        let series = self.series(sensor)?;
        let interval = interval.min(INTERVALS_PER_DAY - 1);

        if let Some(value) = series[interval as usize] {
            return Some(CongestionReading {
                value,
                interval,
                fallback: false,
            });
        }

        (1..INTERVALS_PER_DAY).find_map(|offset| {
            let earlier = interval
                .checked_sub(offset)
                .and_then(|candidate| series[candidate as usize].map(|value| (candidate, value)));
            let later = (interval + offset < INTERVALS_PER_DAY)
                .then(|| interval + offset)
                .and_then(|candidate| series[candidate as usize].map(|value| (candidate, value)));

            earlier.or(later).map(|(interval, value)| CongestionReading {
                value,
                interval,
                fallback: true,
            })
        })
    }

    /// Mean of the records present in a 30-minute bucket.
    pub fn bucket_average(&self, sensor: SensorId, bucket: u32) -> Option<f64> {
        let series = self.series(sensor)?;
        let values = bucket_intervals(bucket)
            .filter_map(|interval| series[interval as usize])
            .collect_vec();

        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    pub fn record(&self, sensor: SensorId, interval: u32) -> Option<PredictionRecord> {
        let value = self.value(sensor, interval)?;
        Some(PredictionRecord {
            detector_id: sensor,
            model: self.model.clone(),
            date: self.date.clone(),
            interval,
            time: format_time(interval_to_time(interval)),
            traffic_prediction: value,
        })
    }
}
