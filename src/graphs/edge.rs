use super::{SensorId, Vertex, Weight};

/// A row of the pairwise weight table, keyed by detector ids.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorEdge {
    pub from: SensorId,
    pub to: SensorId,
    pub weight: Weight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub tail: Vertex,
    pub head: Vertex,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedEdge {
    pub tail: Vertex,
    pub head: Vertex,
    pub weight: Weight,
}

impl WeightedEdge {
    pub fn new(tail: Vertex, head: Vertex, weight: Weight) -> Option<WeightedEdge> {
        if tail == head {
            return None;
        }

        Some(WeightedEdge { tail, head, weight })
    }

    pub fn remove_weight(&self) -> Edge {
        Edge {
            tail: self.tail,
            head: self.head,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaillessEdge {
    pub head: Vertex,
    pub weight: Weight,
}

impl TaillessEdge {
    pub fn set_tail(&self, tail: Vertex) -> WeightedEdge {
        WeightedEdge {
            tail,
            head: self.head,
            weight: self.weight,
        }
    }
}
