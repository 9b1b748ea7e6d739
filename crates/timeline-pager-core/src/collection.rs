// Sparse ordered collection of timeline edges
//
// Edges are kept strictly ascending by index with no duplicates. Gaps are
// allowed and mark regions that have not been fetched yet.

use std::ops::RangeInclusive;

use crate::entry::{BatchEdge, Edge};

/// Counts produced by a single merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Edges added at a previously unknown index
    pub inserted: usize,
    /// Edges unioned into an already cached index
    pub updated: usize,
    /// Tombstones skipped
    pub dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseOrderedCollection {
    edges: Vec<Edge>,
}

impl SparseOrderedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    pub fn get(&self, index: u64) -> Option<&Edge> {
        self.edges
            .binary_search_by_key(&index, |edge| edge.index)
            .ok()
            .map(|pos| &self.edges[pos])
    }

    /// Edges whose index lies in `[start, end]`.
    pub fn slice(&self, start: u64, end: u64) -> &[Edge] {
        if start > end {
            return &[];
        }
        let lo = self.edges.partition_point(|edge| edge.index < start);
        let hi = self.edges.partition_point(|edge| edge.index <= end);
        &self.edges[lo..hi]
    }

    /// Whether every index in `[start, end]` is cached.
    pub fn contains_range(&self, start: u64, end: u64) -> bool {
        start <= end && self.slice(start, end).len() as u64 == end - start + 1
    }

    /// Merge a delivered batch into the collection.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = BatchEdge>) -> MergeStats {
        let mut stats = MergeStats::default();
        for edge in incoming {
            match Edge::from_batch(edge) {
                Some(edge) => merge_one(&mut self.edges, edge, &mut stats),
                None => stats.dropped += 1,
            }
        }
        stats
    }

    pub fn first_continuous_block_end(&self, range_start: u64, range_end: u64) -> Option<u64> {
        find_first_continuous_block_end(&self.edges, range_start, range_end)
    }

    pub fn first_continuous_block(
        &self,
        range_start: u64,
        range_end: u64,
    ) -> Option<RangeInclusive<u64>> {
        find_first_continuous_block(&self.edges, range_start, range_end)
    }
}

impl From<Vec<BatchEdge>> for SparseOrderedCollection {
    fn from(batch: Vec<BatchEdge>) -> Self {
        let mut collection = Self::new();
        collection.merge(batch);
        collection
    }
}

/// Merge `incoming` into the ascending `existing` edges and return the result.
pub fn merge_edges(existing: Vec<Edge>, incoming: impl IntoIterator<Item = BatchEdge>) -> Vec<Edge> {
    let mut collection = SparseOrderedCollection { edges: existing };
    collection.merge(incoming);
    collection.edges
}

fn merge_one(edges: &mut Vec<Edge>, incoming: Edge, stats: &mut MergeStats) {
    // Pages usually arrive in ascending order past everything cached.
    if edges.last().map_or(true, |last| last.index < incoming.index) {
        edges.push(incoming);
        stats.inserted += 1;
        return;
    }

    for pos in 0..edges.len() {
        if edges[pos].index == incoming.index {
            let existing = std::mem::take(&mut edges[pos].node);
            edges[pos].node = existing.merged(incoming.node);
            stats.updated += 1;
            return;
        }
        if edges[pos].index > incoming.index {
            edges.insert(pos, incoming);
            stats.inserted += 1;
            return;
        }
    }

    edges.push(incoming);
    stats.inserted += 1;
}

/// Last index of the first unbroken run of cached indices inside
/// `[range_start, range_end]`, or `None` when nothing in the range is cached.
pub fn find_first_continuous_block_end(
    edges: &[Edge],
    range_start: u64,
    range_end: u64,
) -> Option<u64> {
    find_first_continuous_block(edges, range_start, range_end).map(|block| *block.end())
}

/// Like [`find_first_continuous_block_end`], but also reports where the block starts.
pub fn find_first_continuous_block(
    edges: &[Edge],
    range_start: u64,
    range_end: u64,
) -> Option<RangeInclusive<u64>> {
    let mut block: Option<(u64, u64)> = None;

    for edge in edges {
        if edge.index > range_end {
            break;
        }
        if edge.index < range_start {
            continue;
        }
        match block {
            Some((start, reference)) => {
                if edge.index == reference + 1 {
                    block = Some((start, edge.index));
                } else {
                    break;
                }
            }
            None => block = Some((edge.index, edge.index)),
        }
    }

    block.map(|(start, end)| start..=end)
}
