use super::{
    edge::{Edge, TaillessEdge, WeightedEdge},
    Graph, Vertex, Weight,
};

/// Adjacency lists indexed by tail, each sorted by head.
#[derive(Clone, Debug, Default)]
pub struct VecVecGraph {
    edges: Vec<Vec<TaillessEdge>>,
}

impl VecVecGraph {
    pub fn with_vertices(number_of_vertices: u32) -> VecVecGraph {
        VecVecGraph {
            edges: vec![Vec::new(); number_of_vertices as usize],
        }
    }

    /// Builds the graph keeping the lightest of any parallel edges.
    pub fn from_edges(number_of_vertices: u32, edges: &[WeightedEdge]) -> VecVecGraph {
        let mut graph = VecVecGraph::with_vertices(number_of_vertices);

        edges.iter().for_each(|edge| {
            if edge.weight
                < graph
                    .get_weight(&edge.remove_weight())
                    .unwrap_or(Weight::INFINITY)
            {
                graph.set_weight(&edge.remove_weight(), edge.weight);
            }
        });

        graph
    }

    pub fn set_weight(&mut self, edge: &Edge, weight: Weight) {
        let max_edge_endpoints = std::cmp::max(edge.tail, edge.head) as usize;
        if max_edge_endpoints >= self.edges.len() {
            self.edges.resize(max_edge_endpoints + 1, Vec::new());
        }

        let edges_sharing_tail = &mut self.edges[edge.tail as usize];
        match edges_sharing_tail.binary_search_by_key(&edge.head, |other| other.head) {
            Ok(index) => edges_sharing_tail[index].weight = weight,
            Err(index) => edges_sharing_tail.insert(
                index,
                TaillessEdge {
                    head: edge.head,
                    weight,
                },
            ),
        }
    }
}

impl Graph for VecVecGraph {
    fn number_of_vertices(&self) -> u32 {
        self.edges.len() as u32
    }

    fn edges(&self, tail: Vertex) -> Box<dyn ExactSizeIterator<Item = WeightedEdge> + Send + '_> {
        // The tail is not stored per edge, so the iterator carries it along.
        struct EdgeIterator<'a> {
            edge_iter: std::slice::Iter<'a, TaillessEdge>,
            tail: Vertex,
        }

        impl<'a> Iterator for EdgeIterator<'a> {
            type Item = WeightedEdge;

            fn next(&mut self) -> Option<Self::Item> {
                self.edge_iter
                    .next()
                    .map(|tailless_edge| tailless_edge.set_tail(self.tail))
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.edge_iter.size_hint()
            }
        }

        impl<'a> ExactSizeIterator for EdgeIterator<'a> {
            fn len(&self) -> usize {
                self.edge_iter.len()
            }
        }

        let edge_iter = self
            .edges
            .get(tail as usize)
            .map(|edges| edges.iter())
            .unwrap_or_default();

        Box::new(EdgeIterator { edge_iter, tail })
    }

    fn get_weight(&self, edge: &Edge) -> Option<Weight> {
        let edges_sharing_tail = self.edges.get(edge.tail as usize)?;

        let edge_index = edges_sharing_tail
            .binary_search_by_key(&edge.head, |tailless_edge| tailless_edge.head)
            .ok()?;

        Some(edges_sharing_tail[edge_index].weight)
    }
}
