// In-memory timeline source
//
// Serves a fixed list of entries the way the backend would: newest first,
// filtered, paginated by offset. Used by the CLI and by tests.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::distribution::TimelineDistribution;
use crate::entry::{Batch, BatchEdge, TimelineEntry};
use crate::error::{Result, TimelineError};
use crate::source::{TimelineFilters, TimelineSource, TimelineView};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// On-disk fixture shape: `{ "entries": [...] }`
#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    entries: Vec<TimelineEntry>,
}

/// A fetch the source was asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRequest {
    View,
    Page(u64),
}

#[derive(Debug)]
pub struct MemorySource {
    /// Dated entries, newest first.
    entries: Vec<(NaiveDate, TimelineEntry)>,
    page_size: usize,
    latency: Duration,
    fail_offsets: BTreeSet<u64>,
    fail_view: bool,
    requests: Mutex<Vec<SourceRequest>>,
}

impl MemorySource {
    /// Build a source over `entries`. Entries without a date are not part of
    /// the timeline and are skipped.
    pub fn new(entries: Vec<TimelineEntry>) -> Self {
        let mut dated: Vec<(NaiveDate, TimelineEntry)> = entries
            .into_iter()
            .filter_map(|entry| entry.date.map(|date| (date, entry)))
            .collect();
        // Stable sort keeps fixture order within a day.
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        Self {
            entries: dated,
            page_size: DEFAULT_PAGE_SIZE,
            latency: Duration::ZERO,
            fail_offsets: BTreeSet::new(),
            fail_view: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)
            .map_err(|e| TimelineError::invalid_fixture(e.to_string()))?;
        Ok(Self::new(fixture.entries))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TimelineError::invalid_fixture(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Entries returned per page. Values below 1 are treated as 1.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make page fetches starting at any of `offsets` fail.
    pub fn fail_offsets(mut self, offsets: impl IntoIterator<Item = u64>) -> Self {
        self.fail_offsets = offsets.into_iter().collect();
        self
    }

    /// Make every `fetch_view` call fail.
    pub fn fail_view(mut self) -> Self {
        self.fail_view = true;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Every request served so far, in arrival order.
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests.lock().clone()
    }

    /// Offsets of every page request served so far, in arrival order.
    pub fn requested_offsets(&self) -> Vec<u64> {
        self.requests
            .lock()
            .iter()
            .filter_map(|request| match request {
                SourceRequest::Page(offset) => Some(*offset),
                SourceRequest::View => None,
            })
            .collect()
    }

    fn filtered<'a>(
        &'a self,
        filters: &'a TimelineFilters,
    ) -> impl Iterator<Item = &'a (NaiveDate, TimelineEntry)> + 'a {
        self.entries
            .iter()
            .filter(move |(_, entry)| filters.matches(entry))
    }

    fn page(&self, filters: &TimelineFilters, offset: u64) -> Batch {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        self.filtered(filters)
            .enumerate()
            .skip(skip)
            .take(self.page_size)
            .map(|(index, (_, entry))| BatchEdge::new(index as u64, entry.clone()))
            .collect()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl TimelineSource for MemorySource {
    async fn fetch_view(&self, filters: &TimelineFilters) -> Result<TimelineView> {
        self.requests.lock().push(SourceRequest::View);
        self.simulate_latency().await;

        if self.fail_view {
            return Err(TimelineError::view_failure("injected source failure"));
        }

        let distribution = TimelineDistribution::from_dates(self.filtered(filters).map(|(d, _)| *d));
        let entries = self.page(filters, 0);
        debug!(
            total_count = distribution.total_count(),
            first_page = entries.len(),
            "Serving timeline view"
        );
        Ok(TimelineView {
            distribution,
            entries,
        })
    }

    async fn fetch_page(&self, filters: &TimelineFilters, offset: u64) -> Result<Batch> {
        self.requests.lock().push(SourceRequest::Page(offset));
        self.simulate_latency().await;

        if self.fail_offsets.contains(&offset) {
            return Err(TimelineError::page_failure(offset, "injected source failure"));
        }
        let page = self.page(filters, offset);
        debug!(offset, edges = page.len(), "Serving timeline page");
        Ok(page)
    }
}
