// Data source seam
//
// The engine only consumes two operations from its backend: the initial view
// (distribution plus a first page) and additional pages from an offset.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::distribution::TimelineDistribution;
use crate::entry::{Batch, EntryKind, TimelineEntry};
use crate::error::Result;

/// Filter set a timeline session is scoped to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFilters {
    /// Earliest date to include (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Latest date to include (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Entry kinds to include. Empty means all kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<EntryKind>,
}

impl TimelineFilters {
    pub fn matches(&self, entry: &TimelineEntry) -> bool {
        if let Some(start) = self.start_date {
            if entry.date.map_or(true, |date| date < start) {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if entry.date.map_or(true, |date| date > end) {
                return false;
            }
        }
        if !self.kinds.is_empty() {
            return entry.kind.is_some_and(|kind| self.kinds.contains(&kind));
        }
        true
    }
}

/// Result of the initial timeline query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    #[serde(default)]
    pub distribution: TimelineDistribution,
    #[serde(default)]
    pub entries: Batch,
}

/// Paginated backend supplying timeline data.
///
/// Implementations are called from the driver's single task; the returned
/// futures must be `Send` so they can be boxed alongside other in-flight fetches.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Fetch the distribution and the first page for `filters`.
    async fn fetch_view(&self, filters: &TimelineFilters) -> Result<TimelineView>;

    /// Fetch the page of entries starting at `offset`.
    async fn fetch_page(&self, filters: &TimelineFilters, offset: u64) -> Result<Batch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, date: Option<NaiveDate>) -> TimelineEntry {
        TimelineEntry {
            kind: Some(kind),
            date,
            ..Default::default()
        }
    }

    #[test]
    fn test_filters_match_date_range_and_kind() {
        let filters = TimelineFilters {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31),
            kinds: vec![EntryKind::Image],
        };

        assert!(filters.matches(&entry(EntryKind::Image, NaiveDate::from_ymd_opt(2023, 6, 1))));
        assert!(filters.matches(&entry(EntryKind::Image, NaiveDate::from_ymd_opt(2023, 12, 31))));
        assert!(!filters.matches(&entry(EntryKind::Video, NaiveDate::from_ymd_opt(2023, 6, 1))));
        assert!(!filters.matches(&entry(EntryKind::Image, NaiveDate::from_ymd_opt(2024, 1, 1))));
        assert!(!filters.matches(&entry(EntryKind::Image, None)));
    }

    #[test]
    fn test_default_filters_match_everything() {
        let filters = TimelineFilters::default();
        assert!(filters.matches(&TimelineEntry::default()));
    }
}
