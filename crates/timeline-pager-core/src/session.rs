// Session-scoped timeline state
//
// One session exists per filter set. It owns the sparse collection, the
// distribution and the loading flag; consumers only ever get shared
// references. The generation counter lets late pages from a previous filter
// set be recognised and discarded.

use tracing::{debug, info, warn};

use crate::collection::{MergeStats, SparseOrderedCollection};
use crate::distribution::TimelineDistribution;
use crate::entry::{Batch, Edge};
use crate::slice::TimelineSlice;
use crate::source::{TimelineFilters, TimelineView};

#[derive(Debug, Clone, Default)]
pub struct TimelineSession {
    filters: TimelineFilters,
    generation: u64,
    collection: SparseOrderedCollection,
    distribution: TimelineDistribution,
    loading: bool,
}

impl TimelineSession {
    pub fn new(filters: TimelineFilters) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    pub fn filters(&self) -> &TimelineFilters {
        &self.filters
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn collection(&self) -> &SparseOrderedCollection {
        &self.collection
    }

    pub fn distribution(&self) -> &TimelineDistribution {
        &self.distribution
    }

    /// Authoritative entry count for the current filter set. Zero until a
    /// view has been applied.
    pub fn total_count(&self) -> u64 {
        self.distribution.total_count()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Discard everything cached and start a fresh session for `filters`.
    pub fn reset(&mut self, filters: TimelineFilters) {
        self.generation += 1;
        info!(
            generation = self.generation,
            discarded = self.collection.len(),
            "Resetting timeline session"
        );
        self.filters = filters;
        self.collection.clear();
        self.distribution = TimelineDistribution::default();
        self.loading = false;
    }

    /// Apply the result of the initial query.
    pub fn apply_view(&mut self, view: TimelineView) -> MergeStats {
        self.distribution = view.distribution;
        let stats = self.collection.merge(view.entries);
        info!(
            generation = self.generation,
            total_count = self.total_count(),
            cached = self.collection.len(),
            "Applied timeline view"
        );
        stats
    }

    /// Merge a page fetched during `generation`. Pages from an older session
    /// are dropped and `None` is returned.
    pub fn merge_page(&mut self, generation: u64, batch: Batch) -> Option<MergeStats> {
        if generation != self.generation {
            warn!(
                page_generation = generation,
                generation = self.generation,
                edges = batch.len(),
                "Dropping page from a previous timeline session"
            );
            return None;
        }
        let stats = self.collection.merge(batch);
        debug!(
            generation,
            inserted = stats.inserted,
            updated = stats.updated,
            dropped = stats.dropped,
            cached = self.collection.len(),
            "Merged timeline page"
        );
        Some(stats)
    }

    /// Cached edges inside the raw requested slice.
    pub fn visible_entries(&self, slice: &TimelineSlice) -> Vec<Edge> {
        self.collection
            .edges()
            .iter()
            .filter(|edge| slice.contains(edge.index))
            .cloned()
            .collect()
    }
}
