use std::sync::Arc;

use chrono::NaiveTime;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    category::{CategoryCounts, TrafficCategory},
    error::TrafficError,
    graphs::{sensor_graph::SensorGraph, SensorId},
    predictions::{
        time_grid::{bucket_intervals, bucket_of, bucket_to_time, format_time},
        PredictionStore,
    },
};

#[derive(Clone, Debug, Serialize)]
pub struct SensorTraffic {
    pub detector_id: SensorId,
    pub lat: f64,
    pub lon: f64,
    pub road: String,
    pub class: String,
    pub value: f64,
    pub category: TrafficCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapshotStatistics {
    pub total_detectors: u32,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub counts: CategoryCounts,
}

/// Network wide congestion for one half-hour bucket.
#[derive(Clone, Debug, Serialize)]
pub struct TrafficSnapshot {
    pub model: String,
    pub date: String,
    pub time: String,
    pub bucket: u32,
    pub bucket_start: String,
    /// Interval at which the bucket starts.
    pub interval: u32,
    pub detectors: Vec<SensorTraffic>,
    pub statistics: SnapshotStatistics,
    /// Sensors without any record in the bucket.
    pub missing_sensors: Vec<SensorId>,
}

#[derive(Clone)]
pub struct TrafficSnapshotAggregator {
    graph: Arc<SensorGraph>,
    store: Arc<PredictionStore>,
}

impl TrafficSnapshotAggregator {
    pub fn new(graph: Arc<SensorGraph>, store: Arc<PredictionStore>) -> TrafficSnapshotAggregator {
        TrafficSnapshotAggregator { graph, store }
    }

    pub fn snapshot_at(&self, model: &str, date: &str, time: NaiveTime) -> Result<TrafficSnapshot, TrafficError> {
        let table = self.store.table(model, date)?;
        let bucket = bucket_of(time);

        let averages: Vec<Option<f64>> = self
            .graph
            .sensors()
            .par_iter()
            .map(|sensor| table.bucket_average(sensor.id, bucket))
            .collect();

        let mut detectors = Vec::new();
        let mut missing_sensors = Vec::new();
        for (sensor, average) in self.graph.sensors().iter().zip(averages) {
            match average {
                Some(value) => detectors.push(SensorTraffic {
                    detector_id: sensor.id,
                    lat: sensor.latitude,
                    lon: sensor.longitude,
                    road: sensor.road.clone(),
                    class: sensor.class.clone(),
                    value,
                    category: TrafficCategory::of(value),
                }),
                None => missing_sensors.push(sensor.id),
            }
        }

        if !missing_sensors.is_empty() {
            warn!(
                "{} of {} sensors have no {} predictions at {}",
                missing_sensors.len(),
                self.graph.sensors().len(),
                model,
                format_time(time)
            );
        }

        let values = detectors.iter().map(|detector| detector.value).collect_vec();
        let (min, max) = match values.iter().copied().minmax_by(f64::total_cmp).into_option() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        let statistics = SnapshotStatistics {
            total_detectors: detectors.len() as u32,
            average: (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64),
            min,
            max,
            counts: detectors.iter().map(|detector| detector.category).collect(),
        };
        info!(
            "snapshot {} {} bucket {}: {} sensors",
            model,
            table.date(),
            bucket,
            statistics.total_detectors
        );

        Ok(TrafficSnapshot {
            model: table.model().to_string(),
            date: table.date().to_string(),
            time: format_time(time),
            bucket,
            bucket_start: format_time(bucket_to_time(bucket)),
            interval: bucket_intervals(bucket).start,
            detectors,
            statistics,
            missing_sensors,
        })
    }
}
