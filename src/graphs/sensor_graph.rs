use std::path::Path;

use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use super::{
    edge::{Edge, SensorEdge, WeightedEdge},
    reading::{read_sensors, read_weight_table},
    sensor::Sensor,
    vec_vec_graph::VecVecGraph,
    Graph, SensorId, Vertex, Weight,
};
use crate::error::TrafficError;

/// A sensor together with its distance from a query point.
#[derive(Clone, Debug, Serialize)]
pub struct NearbySensor {
    pub sensor: Sensor,
    pub distance_km: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GraphStats {
    pub total_detectors: u32,
    pub total_edges: u32,
    pub detector_ids_sample: Vec<SensorId>,
}

/// Immutable routing topology over the detector network.
///
/// Sensors are stored sorted by id, so the dense vertex order matches id order.
/// That makes every scan over the sensors, and every adjacency list, visit
/// lower ids first.
pub struct SensorGraph {
    sensors: Vec<Sensor>,
    vertices: HashMap<SensorId, Vertex>,
    graph: VecVecGraph,
    weight_per_meter: Weight,
}

impl SensorGraph {
    pub fn build(mut sensors: Vec<Sensor>, edges: &[SensorEdge]) -> Result<SensorGraph, TrafficError> {
        sensors.sort_by_key(|sensor| sensor.id);

        if let Some((duplicate, _)) = sensors.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(TrafficError::GraphLoad(format!(
                "sensor {} appears more than once",
                duplicate.id
            )));
        }
        if let Some(sensor) = sensors.iter().find(|sensor| {
            !(-90.0..=90.0).contains(&sensor.latitude)
                || !(-180.0..=180.0).contains(&sensor.longitude)
        }) {
            return Err(TrafficError::GraphLoad(format!(
                "sensor {} has invalid coordinates ({}, {})",
                sensor.id, sensor.latitude, sensor.longitude
            )));
        }

        let mut vertices = HashMap::with_capacity(sensors.len());
        for (vertex, sensor) in sensors.iter().enumerate() {
            vertices.insert(sensor.id, vertex as Vertex);
        }

        let resolve = |id: SensorId| {
            vertices.get(&id).copied().ok_or_else(|| {
                TrafficError::GraphLoad(format!("edge references unknown sensor {}", id))
            })
        };

        let mut weighted_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            let tail = resolve(edge.from)?;
            let head = resolve(edge.to)?;
            if !(0.0..=1.0).contains(&edge.weight) {
                return Err(TrafficError::GraphLoad(format!(
                    "edge {} -> {} has weight {}, expected a value in [0, 1]",
                    edge.from, edge.to, edge.weight
                )));
            }
            if let Some(edge) = WeightedEdge::new(tail, head, edge.weight) {
                weighted_edges.push(edge);
            }
        }

        let graph = VecVecGraph::from_edges(sensors.len() as u32, &weighted_edges);

        // Smallest weight per meter over all edges. Scaling straight-line
        // distance by it never exceeds the weight of any real route.
        let weight_per_meter = weighted_edges
            .iter()
            .filter_map(|edge| {
                let meters =
                    sensors[edge.tail as usize].distance_to_sensor(&sensors[edge.head as usize]);
                (meters > 0.0).then(|| edge.weight / meters)
            })
            .fold(None, |min: Option<Weight>, ratio| {
                Some(min.map_or(ratio, |min| min.min(ratio)))
            })
            .unwrap_or(0.0);

        let sensor_graph = SensorGraph {
            sensors,
            vertices,
            graph,
            weight_per_meter,
        };
        info!(
            "built sensor graph with {} sensors and {} edges",
            sensor_graph.sensors.len(),
            sensor_graph.number_of_edges()
        );

        Ok(sensor_graph)
    }

    pub fn from_files(sensor_file: &Path, weight_file: &Path) -> Result<SensorGraph, TrafficError> {
        let sensors = read_sensors(sensor_file)?;
        let edges = read_weight_table(weight_file)?;
        SensorGraph::build(sensors, &edges)
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn sensor(&self, vertex: Vertex) -> &Sensor {
        &self.sensors[vertex as usize]
    }

    pub fn sensor_by_id(&self, id: SensorId) -> Option<&Sensor> {
        self.vertex(id).map(|vertex| self.sensor(vertex))
    }

    pub fn vertex(&self, id: SensorId) -> Option<Vertex> {
        self.vertices.get(&id).copied()
    }

    pub fn contains(&self, id: SensorId) -> bool {
        self.vertices.contains_key(&id)
    }

    /// Weight of the direct edge between two sensors.
    pub fn edge_weight(&self, tail: Vertex, head: Vertex) -> Option<Weight> {
        self.graph.get_weight(&Edge { tail, head })
    }

    /// Straight-line distance between two vertices in meters.
    pub fn physical_distance(&self, tail: Vertex, head: Vertex) -> f64 {
        self.sensor(tail).distance_to_sensor(self.sensor(head))
    }

    /// Lower bound on the distance weight of any route from `vertex` to `target`.
    pub fn min_weight_between(&self, vertex: Vertex, target: Vertex) -> Weight {
        self.physical_distance(vertex, target) * self.weight_per_meter
    }

    pub fn weight_per_meter(&self) -> Weight {
        self.weight_per_meter
    }

    /// Closest sensor by great-circle distance. Ties go to the lowest id.
    pub fn nearest_node(&self, latitude: f64, longitude: f64) -> Option<NearbySensor> {
        let mut nearest: Option<(&Sensor, f64)> = None;
        for sensor in &self.sensors {
            let distance = sensor.distance_to(latitude, longitude);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((sensor, distance));
            }
        }

        nearest.map(|(sensor, meters)| NearbySensor {
            sensor: sensor.clone(),
            distance_km: meters / 1000.0,
        })
    }

    pub fn nearest_nodes(&self, latitude: f64, longitude: f64, k: usize) -> Vec<NearbySensor> {
        self.by_distance(latitude, longitude)
            .into_iter()
            .take(k)
            .collect()
    }

    pub fn sensors_in_radius(&self, latitude: f64, longitude: f64, radius_km: f64) -> Vec<NearbySensor> {
        self.by_distance(latitude, longitude)
            .into_iter()
            .take_while(|nearby| nearby.distance_km <= radius_km)
            .collect()
    }

    fn by_distance(&self, latitude: f64, longitude: f64) -> Vec<NearbySensor> {
        // Stable sort keeps id order between equally distant sensors.
        self.sensors
            .iter()
            .map(|sensor| NearbySensor {
                sensor: sensor.clone(),
                distance_km: sensor.distance_to(latitude, longitude) / 1000.0,
            })
            .sorted_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_detectors: self.number_of_vertices(),
            total_edges: self.number_of_edges(),
            detector_ids_sample: self.sensors.iter().take(10).map(|sensor| sensor.id).collect(),
        }
    }
}

impl Graph for SensorGraph {
    fn number_of_vertices(&self) -> u32 {
        self.sensors.len() as u32
    }

    fn edges(&self, tail: Vertex) -> Box<dyn ExactSizeIterator<Item = WeightedEdge> + Send + '_> {
        self.graph.edges(tail)
    }

    fn get_weight(&self, edge: &Edge) -> Option<Weight> {
        self.graph.get_weight(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensors() -> Vec<Sensor> {
        vec![
            Sensor::new(63, 25.045, 121.515),
            Sensor::new(51, 25.040, 121.500),
            Sensor::new(61, 25.040, 121.510),
        ]
    }

    #[test]
    fn build_sorts_sensors_by_id() {
        let edges = vec![SensorEdge { from: 51, to: 61, weight: 0.2 }];
        let graph = SensorGraph::build(sensors(), &edges).unwrap();

        let ids: Vec<SensorId> = graph.sensors().iter().map(|sensor| sensor.id).collect();
        assert_eq!(ids, vec![51, 61, 63]);
        assert_eq!(graph.number_of_edges(), 1);
        assert_eq!(graph.edge_weight(0, 1), Some(0.2));
        assert_eq!(graph.edge_weight(1, 0), None);
    }

    #[test]
    fn unknown_sensor_in_edge_is_fatal() {
        let edges = vec![SensorEdge { from: 51, to: 99, weight: 0.2 }];
        let error = SensorGraph::build(sensors(), &edges).err().unwrap();
        assert!(matches!(error, TrafficError::GraphLoad(message) if message.contains("99")));
    }

    #[test]
    fn weight_outside_unit_range_is_fatal() {
        for weight in [1.5, -0.1, f64::NAN] {
            let edges = vec![SensorEdge { from: 51, to: 61, weight }];
            let error = SensorGraph::build(sensors(), &edges).err().unwrap();
            assert!(matches!(error, TrafficError::GraphLoad(_)), "{}", weight);
        }

        let edges = vec![SensorEdge { from: 51, to: 61, weight: 1.0 }];
        assert!(SensorGraph::build(sensors(), &edges).is_ok());
    }

    #[test]
    fn duplicate_sensor_is_fatal() {
        let mut sensors = sensors();
        sensors.push(Sensor::new(61, 25.0, 121.0));
        assert!(SensorGraph::build(sensors, &[]).is_err());
    }

    #[test]
    fn nearest_node_prefers_lowest_id_on_tie() {
        let sensors = vec![
            Sensor::new(7, 25.0, 121.0),
            Sensor::new(3, 25.0, 121.0),
            Sensor::new(5, 26.0, 121.0),
        ];
        let graph = SensorGraph::build(sensors, &[]).unwrap();

        let nearest = graph.nearest_node(25.0, 121.0).unwrap();
        assert_eq!(nearest.sensor.id, 3);
        assert_eq!(nearest.distance_km, 0.0);
    }

    #[test]
    fn far_coordinates_still_resolve() {
        let graph = SensorGraph::build(sensors(), &[]).unwrap();
        let nearest = graph.nearest_node(-33.86, 151.2).unwrap();
        assert!(nearest.distance_km > 5000.0);
    }

    #[test]
    fn nearest_nodes_and_radius_are_sorted() {
        let graph = SensorGraph::build(sensors(), &[]).unwrap();

        let nearest = graph.nearest_nodes(25.040, 121.501, 2);
        let ids: Vec<SensorId> = nearest.iter().map(|nearby| nearby.sensor.id).collect();
        assert_eq!(ids, vec![51, 61]);

        let in_radius = graph.sensors_in_radius(25.040, 121.501, 0.5);
        assert_eq!(in_radius.len(), 1);
        assert_eq!(in_radius[0].sensor.id, 51);
    }

    #[test]
    fn heuristic_scale_never_exceeds_edge_weights() {
        let edges = vec![
            SensorEdge { from: 51, to: 61, weight: 0.2 },
            SensorEdge { from: 61, to: 63, weight: 0.05 },
        ];
        let graph = SensorGraph::build(sensors(), &edges).unwrap();

        for tail in 0..graph.number_of_vertices() {
            for edge in graph.edges(tail) {
                assert!(graph.min_weight_between(edge.tail, edge.head) <= edge.weight + 1e-12);
            }
        }
    }
}
