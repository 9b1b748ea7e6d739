// timeline-pager-core - Sparse timeline cache and demand-driven pagination
//
// Keeps a gap-tolerant, strictly ascending collection of timeline edges,
// plans the single next page fetch needed to cover a viewport, and merges
// fetched pages back in. The driver ties these together in a single-task
// reactive loop over an async data source.

pub mod collection;
pub mod distribution;
pub mod driver;
pub mod entry;
pub mod error;
pub mod memory;
pub mod planner;
pub mod session;
pub mod slice;
pub mod source;

pub use collection::{
    find_first_continuous_block, find_first_continuous_block_end, merge_edges, MergeStats,
    SparseOrderedCollection,
};
pub use distribution::{MonthBucket, TimelineDistribution, YearBucket};
pub use driver::{Completion, DriverCommand, DriverHandle, TimelineDriver};
pub use entry::{Batch, BatchEdge, Edge, EntryKind, TimelineEntry};
pub use error::{ErrorCode, Result, TimelineError};
pub use memory::{MemorySource, SourceRequest, DEFAULT_PAGE_SIZE};
pub use planner::{FetchPlan, PlannerOptions, ViewportFetchPlanner};
pub use session::TimelineSession;
pub use slice::{ClampedRange, TimelineSlice};
pub use source::{TimelineFilters, TimelineSource, TimelineView};
