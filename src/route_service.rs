use std::sync::Arc;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    category::TrafficCategory,
    config::DataConfig,
    error::{ErrorBody, TrafficError},
    graphs::{
        sensor_graph::{GraphStats, NearbySensor, SensorGraph},
        SensorId,
    },
    predictions::{
        normalize_date,
        time_grid::{format_time, interval_of, parse_time},
        PredictionRecord, PredictionStore,
    },
    search::{
        astar::fastest_path, congestion::CongestionSnapshot, dijkstra::shortest_path_with_traffic,
        path::PathResult,
    },
    snapshot::{TrafficSnapshot, TrafficSnapshotAggregator},
    utility::get_progressspinner,
};

pub const MAX_NEAREST: usize = 50;

/// Route request as sent by clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub model: String,
    /// `HH:MM:SS`.
    pub departure_time: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Checks the ranges, naming `lat_field` or `lon_field` on failure.
    pub fn validated(lat: f64, lon: f64, lat_field: &str, lon_field: &str) -> Result<Coordinate, TrafficError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(TrafficError::validation(
                lat_field,
                format!("{} is not a latitude in [-90, 90]", lat),
            ));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(TrafficError::validation(
                lon_field,
                format!("{} is not a longitude in [-180, 180]", lon),
            ));
        }
        Ok(Coordinate { lat, lon })
    }
}

/// A query point and the sensor it was matched to.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedEndpoint {
    pub input: Coordinate,
    pub detector: NearbySensor,
}

/// Outcome of one solver inside a comparison.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PathSlot {
    Found(PathResult),
    Failed { error: ErrorBody },
}

impl PathSlot {
    fn from_result(result: Result<PathResult, TrafficError>, solver: &str) -> PathSlot {
        match result {
            Ok(path) => PathSlot::Found(path),
            Err(error) => {
                warn!("{} path failed: {}", solver, error);
                PathSlot::Failed {
                    error: ErrorBody::from(&error),
                }
            }
        }
    }

    pub fn path(&self) -> Option<&PathResult> {
        match self {
            PathSlot::Found(path) => Some(path),
            PathSlot::Failed { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RouteDelta {
    pub same_path: bool,
    pub shortest_sensors: usize,
    pub fastest_sensors: usize,
    pub extra_distance_meters: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DetectorTraffic {
    pub detector_id: SensorId,
    pub lat: f64,
    pub lon: f64,
    pub road: String,
    pub value: Option<f64>,
    pub category: Option<TrafficCategory>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RouteComparison {
    pub model: String,
    pub date: String,
    pub departure_time: String,
    pub interval: u32,
    pub start: ResolvedEndpoint,
    pub end: ResolvedEndpoint,
    pub shortest: PathSlot,
    pub fastest: PathSlot,
    pub comparison: Option<RouteDelta>,
    /// Every sensor with its congestion at the departure interval.
    pub detectors: Vec<DetectorTraffic>,
}

/// Entry point for route and prediction queries over shared, read-only state.
#[derive(Clone)]
pub struct RouteService {
    graph: Arc<SensorGraph>,
    store: Arc<PredictionStore>,
    default_date: String,
}

impl RouteService {
    pub fn new(graph: Arc<SensorGraph>, store: Arc<PredictionStore>, default_date: &str) -> RouteService {
        RouteService {
            graph,
            store,
            default_date: normalize_date(default_date),
        }
    }

    /// Loads the sensor graph named by `config`. Prediction tables load lazily.
    pub fn from_config(config: &DataConfig) -> Result<RouteService, TrafficError> {
        let spinner = get_progressspinner("loading sensor graph");
        let graph = SensorGraph::from_files(&config.detectors_path(), &config.weights_path());
        spinner.finish_and_clear();

        let store = PredictionStore::new(&config.data_dir, config.scale);
        Ok(RouteService::new(Arc::new(graph?), Arc::new(store), &config.date))
    }

    pub fn graph(&self) -> &SensorGraph {
        &self.graph
    }

    pub fn store(&self) -> &PredictionStore {
        &self.store
    }

    pub fn default_date(&self) -> &str {
        &self.default_date
    }

    fn date_or_default(&self, date: Option<&str>) -> String {
        date.filter(|date| !date.trim().is_empty())
            .map(normalize_date)
            .unwrap_or_else(|| self.default_date.clone())
    }

    fn resolve_point(&self, input: Coordinate) -> Result<ResolvedEndpoint, TrafficError> {
        let detector = self
            .graph
            .nearest_node(input.lat, input.lon)
            .ok_or_else(|| TrafficError::NotFound("the sensor graph is empty".to_string()))?;
        Ok(ResolvedEndpoint { input, detector })
    }

    /// Nearest sensors to both points. Far matches are accepted.
    pub fn resolve(&self, start: Coordinate, end: Coordinate) -> Result<(ResolvedEndpoint, ResolvedEndpoint), TrafficError> {
        Ok((self.resolve_point(start)?, self.resolve_point(end)?))
    }

    /// Shortest and fastest route between the sensors nearest to both points.
    ///
    /// The two searches run in parallel and fail independently. Invalid input
    /// and a prediction table that cannot be loaded fail the whole request.
    pub fn compare_routes(&self, request: &RouteRequest) -> Result<RouteComparison, TrafficError> {
        let start = Coordinate::validated(request.start_lat, request.start_lon, "start_lat", "start_lon")?;
        let end = Coordinate::validated(request.end_lat, request.end_lon, "end_lat", "end_lon")?;
        let time = parse_time("departure_time", &request.departure_time)?;
        let model = request.model.trim();
        if model.is_empty() {
            return Err(TrafficError::validation("model", "model must not be empty"));
        }
        let date = self.date_or_default(request.date.as_deref());

        let table = self.store.table(model, &date)?;
        let (start, end) = self.resolve(start, end)?;
        let interval = interval_of(time);
        let snapshot = CongestionSnapshot::from_table(&self.graph, &table, interval);

        let (source, target) = (start.detector.sensor.id, end.detector.sensor.id);
        let (shortest, fastest) = rayon::join(
            || shortest_path_with_traffic(&self.graph, source, target, &snapshot),
            || fastest_path(&self.graph, &snapshot, source, target),
        );
        let shortest = PathSlot::from_result(shortest, "shortest");
        let fastest = PathSlot::from_result(fastest, "fastest");

        let comparison = match (shortest.path(), fastest.path()) {
            (Some(shortest), Some(fastest)) => Some(RouteDelta {
                same_path: shortest.path == fastest.path,
                shortest_sensors: shortest.path_length,
                fastest_sensors: fastest.path_length,
                extra_distance_meters: fastest.distance_meters - shortest.distance_meters,
            }),
            _ => None,
        };

        let detectors = self
            .graph
            .sensors()
            .iter()
            .enumerate()
            .map(|(vertex, sensor)| {
                let value = snapshot.value(vertex as u32);
                DetectorTraffic {
                    detector_id: sensor.id,
                    lat: sensor.latitude,
                    lon: sensor.longitude,
                    road: sensor.road.clone(),
                    value,
                    category: value.map(TrafficCategory::of),
                }
            })
            .collect();

        info!(
            "routes {} -> {} with {} at {}",
            source,
            target,
            model,
            format_time(time)
        );

        Ok(RouteComparison {
            model: model.to_string(),
            date,
            departure_time: format_time(time),
            interval,
            start,
            end,
            shortest,
            fastest,
            comparison,
            detectors,
        })
    }

    pub fn nearest_detectors(&self, lat: f64, lon: f64, k: usize) -> Result<Vec<NearbySensor>, TrafficError> {
        let point = Coordinate::validated(lat, lon, "lat", "lon")?;
        if !(1..=MAX_NEAREST).contains(&k) {
            return Err(TrafficError::validation(
                "k",
                format!("{} is not in 1..={}", k, MAX_NEAREST),
            ));
        }
        Ok(self.graph.nearest_nodes(point.lat, point.lon, k))
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.graph.stats()
    }

    pub fn snapshot(&self, model: &str, date: Option<&str>, time: NaiveTime) -> Result<TrafficSnapshot, TrafficError> {
        let date = self.date_or_default(date);
        TrafficSnapshotAggregator::new(self.graph.clone(), self.store.clone()).snapshot_at(model, &date, time)
    }

    pub fn prediction(
        &self,
        sensor: SensorId,
        model: &str,
        date: Option<&str>,
        time: NaiveTime,
    ) -> Result<PredictionRecord, TrafficError> {
        if !self.graph.contains(sensor) {
            return Err(TrafficError::NotFound(format!("unknown sensor {}", sensor)));
        }
        self.store.get(sensor, model, &self.date_or_default(date), time)
    }
}
