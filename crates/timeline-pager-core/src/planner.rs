// Viewport fetch planning
//
// Given the cached edges, the total count and a requested slice, work out the
// single offset the next page fetch should start from. The planner remembers
// the offset it computed last time so identical consecutive offsets fire only
// once, and it tracks offsets that are still in flight.

use std::collections::BTreeSet;

use tracing::debug;

use crate::collection::SparseOrderedCollection;
use crate::slice::TimelineSlice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Never emit an offset whose fetch has not resolved yet.
    pub dedup_in_flight: bool,
    /// Fetch from the start of the viewport when the first cached block
    /// inside it begins later. Off by default: a leading gap is skipped and
    /// pagination resumes after the first block.
    pub fill_leading_gap: bool,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            dedup_in_flight: true,
            fill_leading_gap: false,
        }
    }
}

/// Outcome of one planner evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Issue a fetch starting at this offset.
    Fetch(u64),
    /// Nothing to fetch: the viewport is continuously cached.
    Covered,
    /// Nothing to fetch: the timeline is empty or the viewport lies outside it.
    Idle,
    /// An offset is needed but was already emitted or is still in flight.
    Suppressed(u64),
}

impl FetchPlan {
    pub fn offset(&self) -> Option<u64> {
        match self {
            FetchPlan::Fetch(offset) => Some(*offset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewportFetchPlanner {
    options: PlannerOptions,
    last_offset: Option<u64>,
    in_flight: BTreeSet<u64>,
}

impl ViewportFetchPlanner {
    pub fn new(options: PlannerOptions) -> Self {
        Self {
            options,
            last_offset: None,
            in_flight: BTreeSet::new(),
        }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Offsets emitted whose fetch has not completed or failed yet.
    pub fn in_flight(&self) -> impl Iterator<Item = u64> + '_ {
        self.in_flight.iter().copied()
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Raw offset computation, without any suppression.
    pub fn next_fetch(
        &self,
        collection: &SparseOrderedCollection,
        total_count: u64,
        slice: &TimelineSlice,
    ) -> Option<u64> {
        let range = slice.clamp(total_count)?;

        let Some(block) = collection.first_continuous_block(range.start, range.end) else {
            // Nothing cached inside the viewport yet.
            return Some(range.start);
        };

        if self.options.fill_leading_gap && *block.start() > range.start {
            return Some(range.start);
        }
        if *block.end() == range.end {
            return None;
        }
        Some(block.end() + 1)
    }

    /// Evaluate the viewport and decide whether a fetch should be issued.
    ///
    /// A `Fetch` result is recorded as in flight; the caller reports back with
    /// [`mark_completed`](Self::mark_completed) or [`mark_failed`](Self::mark_failed).
    pub fn evaluate(
        &mut self,
        collection: &SparseOrderedCollection,
        total_count: u64,
        slice: &TimelineSlice,
    ) -> FetchPlan {
        let offset = self.next_fetch(collection, total_count, slice);
        let previous = std::mem::replace(&mut self.last_offset, offset);

        let plan = match offset {
            None if slice.clamp(total_count).is_none() => FetchPlan::Idle,
            None => FetchPlan::Covered,
            Some(offset) if previous == Some(offset) => FetchPlan::Suppressed(offset),
            Some(offset) if self.options.dedup_in_flight && self.in_flight.contains(&offset) => {
                FetchPlan::Suppressed(offset)
            }
            Some(offset) => {
                self.in_flight.insert(offset);
                FetchPlan::Fetch(offset)
            }
        };

        debug!(
            viewport = %slice,
            total_count,
            cached = collection.len(),
            plan = ?plan,
            "planned viewport"
        );
        plan
    }

    pub fn mark_completed(&mut self, offset: u64) {
        self.in_flight.remove(&offset);
    }

    /// Forget a failed offset so a later evaluation may retry it.
    pub fn mark_failed(&mut self, offset: u64) {
        self.in_flight.remove(&offset);
        if self.last_offset == Some(offset) {
            self.last_offset = None;
        }
    }

    /// Drop all memory of previous evaluations, e.g. after the filter set changed.
    pub fn reset(&mut self) {
        self.last_offset = None;
        self.in_flight.clear();
    }
}
