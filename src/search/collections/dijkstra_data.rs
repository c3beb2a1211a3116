use crate::graphs::{Graph, Vertex, Weight};

/// Vertices of a found path together with the cost of reaching each of them.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPath {
    pub vertices: Vec<Vertex>,
    /// Cost from the source to `vertices[i]`.
    pub costs: Vec<Weight>,
}

impl SearchPath {
    pub fn cost(&self) -> Weight {
        self.costs.last().copied().unwrap_or(0.0)
    }
}

/// Trait for handling data access in Dijkstra's algorithm.
pub trait DijkstraData {
    /// Retrieves the predecessor of a given vertex, if any.
    fn get_predecessor(&self, vertex: Vertex) -> Option<Vertex>;

    /// Sets the predecessor for a given vertex.
    fn set_predecessor(&mut self, vertex: Vertex, predecessor: Vertex);

    /// Retrieves the distance to a given vertex, `Weight::INFINITY` if unreached.
    fn get_distance(&self, vertex: Vertex) -> Weight;

    /// Sets the distance to a given vertex.
    fn set_distance(&mut self, vertex: Vertex, distance: Weight);

    /// Constructs the path to a target vertex, if reachable.
    ///
    /// Traces back from the target using the predecessor data and reverses the
    /// result so it starts at the source.
    fn get_path(&self, target: Vertex) -> Option<SearchPath> {
        if self.get_distance(target) == Weight::INFINITY {
            return None;
        }

        let mut vertices = vec![target];
        let mut predecessor = target;
        while let Some(new_predecessor) = self.get_predecessor(predecessor) {
            predecessor = new_predecessor;
            vertices.push(predecessor);
        }
        vertices.reverse();

        let costs = vertices
            .iter()
            .map(|&vertex| self.get_distance(vertex))
            .collect();

        Some(SearchPath { vertices, costs })
    }
}

/// Predecessors and distances stored in flat vectors indexed by vertex.
pub struct DijkstraDataVec {
    pub predecessors: Vec<Vertex>,
    pub distances: Vec<Weight>,
}

impl DijkstraDataVec {
    pub fn new(graph: &dyn Graph) -> Self {
        DijkstraDataVec {
            predecessors: vec![Vertex::MAX; graph.number_of_vertices() as usize],
            distances: vec![Weight::INFINITY; graph.number_of_vertices() as usize],
        }
    }
}

impl DijkstraData for DijkstraDataVec {
    fn get_predecessor(&self, vertex: Vertex) -> Option<Vertex> {
        let predecessor = self.predecessors[vertex as usize];

        if predecessor == Vertex::MAX {
            return None;
        }

        Some(predecessor)
    }

    fn set_predecessor(&mut self, vertex: Vertex, predecessor: Vertex) {
        self.predecessors[vertex as usize] = predecessor;
    }

    fn get_distance(&self, vertex: Vertex) -> Weight {
        self.distances[vertex as usize]
    }

    fn set_distance(&mut self, vertex: Vertex, distance: Weight) {
        self.distances[vertex as usize] = distance
    }
}
