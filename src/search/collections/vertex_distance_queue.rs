use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use crate::graphs::{Vertex, Weight};

/// A trait for a priority queue that manages vertices and their keys.
///
/// Vertices may be inserted more than once; stale entries are skipped by the
/// caller through its expanded set.
pub trait VertexDistanceQueue {
    /// Inserts a vertex with its associated key into the priority queue.
    fn insert(&mut self, vertex: Vertex, key: Weight);

    /// Removes and returns the vertex with the smallest key, or none if the
    /// queue is empty.
    fn pop(&mut self) -> Option<Vertex>;
}

#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    key: Weight,
    sequence: u64,
    vertex: Vertex,
}

// Equal keys are ordered by insertion, so ties resolve in discovery order.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// A min priority queue on a binary heap.
#[derive(Default)]
pub struct VertexDistanceQueueBinaryHeap {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    sequence: u64,
}

impl VertexDistanceQueueBinaryHeap {
    pub fn new() -> Self {
        VertexDistanceQueueBinaryHeap::default()
    }
}

impl VertexDistanceQueue for VertexDistanceQueueBinaryHeap {
    fn insert(&mut self, vertex: Vertex, key: Weight) {
        self.heap.push(Reverse(QueueEntry {
            key,
            sequence: self.sequence,
            vertex,
        }));
        self.sequence += 1;
    }

    fn pop(&mut self) -> Option<Vertex> {
        let Reverse(QueueEntry { vertex, .. }) = self.heap.pop()?;

        Some(vertex)
    }
}
