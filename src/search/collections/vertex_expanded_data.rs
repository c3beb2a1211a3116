use crate::graphs::{Graph, Vertex};

pub trait VertexExpandedData {
    /// Marks `vertex` as expanded and returns whether it already was.
    fn expand(&mut self, vertex: Vertex) -> bool;
}

pub struct VertexExpandedDataVec {
    expanded: Vec<bool>,
}

impl VertexExpandedDataVec {
    pub fn new(graph: &dyn Graph) -> Self {
        VertexExpandedDataVec {
            expanded: vec![false; graph.number_of_vertices() as usize],
        }
    }

    pub fn number_of_expanded(&self) -> usize {
        self.expanded.iter().filter(|&&expanded| expanded).count()
    }
}

impl VertexExpandedData for VertexExpandedDataVec {
    fn expand(&mut self, vertex: Vertex) -> bool {
        let is_expanded = self.expanded[vertex as usize];
        self.expanded[vertex as usize] = true;
        is_expanded
    }
}
