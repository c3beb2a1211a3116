pub mod edge;
pub mod reading;
pub mod sensor;
pub mod sensor_graph;
pub mod vec_vec_graph;

use edge::{Edge, WeightedEdge};

/// Dense index of a sensor inside a [`sensor_graph::SensorGraph`].
pub type Vertex = u32;
/// Detector id as found in the reference data.
pub type SensorId = u32;
/// Normalized routing weight or cost.
pub type Weight = f64;

pub trait Graph: Send + Sync {
    fn number_of_vertices(&self) -> u32;

    fn number_of_edges(&self) -> u32 {
        (0..self.number_of_vertices())
            .map(|vertex| self.edges(vertex).len() as u32)
            .sum::<u32>()
    }

    /// Outgoing edges of `tail`, ordered by head.
    fn edges(&self, tail: Vertex) -> Box<dyn ExactSizeIterator<Item = WeightedEdge> + Send + '_>;

    fn get_weight(&self, edge: &Edge) -> Option<Weight>;
}
