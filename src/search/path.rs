use itertools::Itertools;
use serde::Serialize;
use tracing::warn;

use super::{collections::dijkstra_data::SearchPath, congestion::CongestionSnapshot};
use crate::{
    category::{CategoryCounts, TrafficCategory},
    graphs::{sensor_graph::SensorGraph, SensorId, Weight},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Dijkstra,
    Astar,
}

#[derive(Clone, Debug, Serialize)]
pub struct PathResult {
    pub algorithm: Algorithm,
    /// Sensor ids from source to target.
    pub path: Vec<SensorId>,
    pub path_length: usize,
    /// Sum of `edge_costs`, in the cost model of `algorithm`.
    pub total_cost: Weight,
    pub edge_costs: Vec<Weight>,
    /// Great-circle length of the path in meters.
    pub distance_meters: f64,
    /// Congestion of each path sensor, `None` where it was not looked up.
    pub traffic_levels: Vec<Option<f64>>,
    pub traffic_counts: CategoryCounts,
    pub avg_traffic: Option<f64>,
    pub min_traffic: Option<f64>,
    pub max_traffic: Option<f64>,
    /// Sensors whose congestion came from a neighbouring interval.
    pub fallback_sensors: Vec<SensorId>,
    /// `[lon, lat]` of every path sensor.
    pub polyline: Vec<[f64; 2]>,
}

impl PathResult {
    pub fn assemble(
        graph: &SensorGraph,
        algorithm: Algorithm,
        search_path: &SearchPath,
        snapshot: Option<&CongestionSnapshot>,
    ) -> PathResult {
        let vertices = &search_path.vertices;
        let sensors = vertices.iter().map(|&vertex| graph.sensor(vertex)).collect_vec();

        let edge_costs = search_path
            .costs
            .iter()
            .tuple_windows()
            .map(|(before, after)| after - before)
            .collect_vec();

        let distance_meters = vertices
            .iter()
            .tuple_windows()
            .map(|(&tail, &head)| graph.physical_distance(tail, head))
            .sum();

        let readings = vertices
            .iter()
            .map(|&vertex| snapshot.and_then(|snapshot| snapshot.reading(vertex)))
            .collect_vec();
        let traffic_levels = readings.iter().map(|reading| reading.map(|reading| reading.value)).collect_vec();
        let values = traffic_levels.iter().flatten().copied().collect_vec();

        let fallback_sensors = sensors
            .iter()
            .zip(&readings)
            .filter(|(_, reading)| reading.is_some_and(|reading| reading.fallback))
            .map(|(sensor, _)| sensor.id)
            .collect_vec();
        if !fallback_sensors.is_empty() {
            warn!(
                "used nearest interval for sensors {:?} along {:?} path",
                fallback_sensors, algorithm
            );
        }

        let (min_traffic, max_traffic) = match values.iter().copied().minmax_by(f64::total_cmp).into_option() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        let avg_traffic = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

        PathResult {
            algorithm,
            path: sensors.iter().map(|sensor| sensor.id).collect(),
            path_length: vertices.len(),
            total_cost: search_path.cost(),
            edge_costs,
            distance_meters,
            traffic_counts: values.iter().map(|&value| TrafficCategory::of(value)).collect(),
            traffic_levels,
            avg_traffic,
            min_traffic,
            max_traffic,
            fallback_sensors,
            polyline: sensors.iter().map(|sensor| sensor.coordinate()).collect(),
        }
    }
}
