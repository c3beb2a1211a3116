use chrono::NaiveTime;
use tracing::{debug, warn};

use super::{
    congestion::CongestionSnapshot,
    dijkstra::{dijkstra_single_pair, resolve_vertex},
    path::{Algorithm, PathResult},
    DistanceHeuristic, EdgeCost,
};
use crate::{
    cost::{traffic_cost, MIN_MULTIPLIER},
    error::TrafficError,
    graphs::{edge::WeightedEdge, sensor_graph::SensorGraph, SensorId, Vertex, Weight},
    predictions::{time_grid::interval_of, PredictionStore},
};

/// Straight-line distance scaled to the cheapest weight per meter of the graph.
pub struct GreatCircleHeuristic<'a> {
    pub graph: &'a SensorGraph,
}

impl<'a> DistanceHeuristic for GreatCircleHeuristic<'a> {
    fn lower_bound(&self, source: Vertex, target: Vertex) -> Weight {
        self.graph.min_weight_between(source, target) * MIN_MULTIPLIER
    }
}

/// Prices an edge with the congestion of the sensor it leads to.
pub struct TrafficEdgeCost<'a> {
    pub snapshot: &'a CongestionSnapshot,
}

impl<'a> EdgeCost for TrafficEdgeCost<'a> {
    fn cost(&self, edge: &WeightedEdge) -> Option<Weight> {
        self.snapshot
            .value(edge.head)
            .map(|congestion| traffic_cost(edge.weight, congestion))
    }
}

fn stale(graph: &SensorGraph, snapshot: &CongestionSnapshot, vertex: Vertex) -> TrafficError {
    TrafficError::StaleData {
        sensor: graph.sensor(vertex).id,
        model: snapshot.model().to_string(),
        date: snapshot.date().to_string(),
    }
}

/// Cheapest path under congestion-weighted edge costs.
///
/// Sensors without any reading for the day cannot be priced and are never
/// entered. If that leaves the target unreachable the error is `StaleData`
/// naming one such sensor, otherwise `NoPath`.
pub fn fastest_path(
    graph: &SensorGraph,
    snapshot: &CongestionSnapshot,
    source: SensorId,
    target: SensorId,
) -> Result<PathResult, TrafficError> {
    let source_vertex = resolve_vertex(graph, source)?;
    let target_vertex = resolve_vertex(graph, target)?;

    if source_vertex != target_vertex {
        for vertex in [source_vertex, target_vertex] {
            if snapshot.reading(vertex).is_none() {
                return Err(stale(graph, snapshot, vertex));
            }
        }
    }

    let outcome = dijkstra_single_pair(
        graph,
        &TrafficEdgeCost { snapshot },
        &GreatCircleHeuristic { graph },
        source_vertex,
        target_vertex,
    );
    debug!(
        "astar {} -> {} expanded {} vertices, {} unpriced edges",
        source,
        target,
        outcome.expanded,
        outcome.unpriced.len()
    );

    match outcome.path {
        Some(path) => Ok(PathResult::assemble(graph, Algorithm::Astar, &path, Some(snapshot))),
        None => match outcome.unpriced.first() {
            Some(&vertex) => {
                warn!(
                    "no priced path {} -> {}: sensor {} has no predictions",
                    source,
                    target,
                    graph.sensor(vertex).id
                );
                Err(stale(graph, snapshot, vertex))
            }
            None => Err(TrafficError::NoPath {
                from: source,
                to: target,
            }),
        },
    }
}

/// [`fastest_path`] with congestion taken from `model` on `date` at `time`.
pub fn fastest_path_at(
    graph: &SensorGraph,
    store: &PredictionStore,
    source: SensorId,
    target: SensorId,
    model: &str,
    date: &str,
    time: NaiveTime,
) -> Result<PathResult, TrafficError> {
    let table = store.table(model, date)?;
    let snapshot = CongestionSnapshot::from_table(graph, &table, interval_of(time));
    fastest_path(graph, &snapshot, source, target)
}
