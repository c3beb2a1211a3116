use tracing::debug;

use super::{
    collections::{
        dijkstra_data::{DijkstraData, DijkstraDataVec, SearchPath},
        vertex_distance_queue::{VertexDistanceQueue, VertexDistanceQueueBinaryHeap},
        vertex_expanded_data::{VertexExpandedData, VertexExpandedDataVec},
    },
    congestion::CongestionSnapshot,
    path::{Algorithm, PathResult},
    DistanceEdgeCost, DistanceHeuristic, EdgeCost, TrivialHeuristic,
};
use crate::{
    error::TrafficError,
    graphs::{sensor_graph::SensorGraph, Graph, SensorId, Vertex},
};

pub struct SearchOutcome {
    pub path: Option<SearchPath>,
    /// Heads of edges skipped because `EdgeCost` could not price them.
    pub unpriced: Vec<Vertex>,
    pub expanded: usize,
}

/// Single pair search ordered by `distance + lower_bound`.
///
/// With the trivial heuristic this is plain Dijkstra. The heuristic has to be
/// consistent, since expanded vertices are never reopened. Distances are only
/// replaced on strict improvement and equal keys pop in insertion order, so
/// among equally cheap paths the one discovered first wins.
pub fn dijkstra_single_pair(
    graph: &dyn Graph,
    cost: &dyn EdgeCost,
    heuristic: &dyn DistanceHeuristic,
    source: Vertex,
    target: Vertex,
) -> SearchOutcome {
    let mut data = DijkstraDataVec::new(graph);
    let mut expanded = VertexExpandedDataVec::new(graph);
    let mut queue = VertexDistanceQueueBinaryHeap::new();
    let mut unpriced = Vec::new();

    data.set_distance(source, 0.0);
    queue.insert(source, heuristic.lower_bound(source, target));

    while let Some(tail) = queue.pop() {
        if expanded.expand(tail) {
            continue;
        }
        if tail == target {
            break;
        }

        let distance_tail = data.get_distance(tail);

        for edge in graph.edges(tail) {
            let Some(edge_cost) = cost.cost(&edge) else {
                unpriced.push(edge.head);
                continue;
            };

            let alternative_distance_head = distance_tail + edge_cost;
            if alternative_distance_head < data.get_distance(edge.head) {
                data.set_distance(edge.head, alternative_distance_head);
                data.set_predecessor(edge.head, tail);
                queue.insert(
                    edge.head,
                    alternative_distance_head + heuristic.lower_bound(edge.head, target),
                );
            }
        }
    }

    SearchOutcome {
        path: data.get_path(target),
        unpriced,
        expanded: expanded.number_of_expanded(),
    }
}

pub(crate) fn resolve_vertex(graph: &SensorGraph, sensor: SensorId) -> Result<Vertex, TrafficError> {
    graph
        .vertex(sensor)
        .ok_or_else(|| TrafficError::NotFound(format!("unknown sensor {}", sensor)))
}

fn shortest_search_path(
    graph: &SensorGraph,
    source: SensorId,
    target: SensorId,
) -> Result<SearchPath, TrafficError> {
    let source_vertex = resolve_vertex(graph, source)?;
    let target_vertex = resolve_vertex(graph, target)?;

    let outcome = dijkstra_single_pair(
        graph,
        &DistanceEdgeCost {},
        &TrivialHeuristic {},
        source_vertex,
        target_vertex,
    );
    debug!(
        "dijkstra {} -> {} expanded {} vertices",
        source, target, outcome.expanded
    );

    outcome.path.ok_or(TrafficError::NoPath {
        from: source,
        to: target,
    })
}

/// Path with the smallest total edge weight. Does not look at congestion.
pub fn shortest_path(
    graph: &SensorGraph,
    source: SensorId,
    target: SensorId,
) -> Result<PathResult, TrafficError> {
    let path = shortest_search_path(graph, source, target)?;
    Ok(PathResult::assemble(graph, Algorithm::Dijkstra, &path, None))
}

/// Same route as [`shortest_path`], annotated with the congestion along it.
pub fn shortest_path_with_traffic(
    graph: &SensorGraph,
    source: SensorId,
    target: SensorId,
    snapshot: &CongestionSnapshot,
) -> Result<PathResult, TrafficError> {
    let path = shortest_search_path(graph, source, target)?;
    Ok(PathResult::assemble(graph, Algorithm::Dijkstra, &path, Some(snapshot)))
}
