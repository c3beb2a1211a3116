use crate::graphs::{edge::WeightedEdge, Vertex, Weight};

pub mod astar;
pub mod collections;
pub mod congestion;
pub mod dijkstra;
pub mod path;

/// Prices an edge for a search. `None` marks an edge the search may not use.
pub trait EdgeCost: Send + Sync {
    fn cost(&self, edge: &WeightedEdge) -> Option<Weight>;
}

pub trait DistanceHeuristic: Send + Sync {
    fn lower_bound(&self, _source: Vertex, _target: Vertex) -> Weight {
        0.0
    }
}

pub struct TrivialHeuristic {}

impl DistanceHeuristic for TrivialHeuristic {}

/// The edge weight as is.
pub struct DistanceEdgeCost {}

impl EdgeCost for DistanceEdgeCost {
    fn cost(&self, edge: &WeightedEdge) -> Option<Weight> {
        Some(crate::cost::distance_cost(edge.weight))
    }
}
