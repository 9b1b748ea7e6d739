use serde::{Deserialize, Serialize};

/// Range of indices a consumer currently needs, both ends inclusive.
///
/// Signed so callers can pass values outside the timeline; [`TimelineSlice::clamp`]
/// pulls them back into `[0, total_count - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSlice {
    pub start_index: i64,
    pub end_index: i64,
}

/// A slice that has been fitted to the timeline. Always `start <= end < total_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedRange {
    pub start: u64,
    pub end: u64,
}

impl TimelineSlice {
    pub fn new(start_index: i64, end_index: i64) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    /// Fit the slice into a timeline of `total_count` entries.
    ///
    /// Returns `None` when the timeline is empty, the slice is inverted or it
    /// lies entirely outside the timeline.
    pub fn clamp(&self, total_count: u64) -> Option<ClampedRange> {
        if total_count == 0 || self.end_index < self.start_index {
            return None;
        }
        let last = i64::try_from(total_count - 1).unwrap_or(i64::MAX);
        let start = self.start_index.max(0);
        let end = self.end_index.min(last);
        if end < start {
            return None;
        }
        // Both bounds are non-negative here.
        Some(ClampedRange {
            start: start as u64,
            end: end as u64,
        })
    }

    /// Whether `index` lies inside the raw (unclamped) slice.
    pub fn contains(&self, index: u64) -> bool {
        match i64::try_from(index) {
            Ok(index) => self.start_index <= index && index <= self.end_index,
            Err(_) => false,
        }
    }
}

impl std::fmt::Display for TimelineSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start_index, self.end_index)
    }
}

impl std::str::FromStr for TimelineSlice {
    type Err = String;

    /// Parse `START:END`, e.g. `40:80` or `-5:1000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid viewport '{}': expected START:END", s))?;
        let start = start
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("Invalid viewport start '{}': {}", start, e))?;
        let end = end
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("Invalid viewport end '{}': {}", end, e))?;
        Ok(TimelineSlice::new(start, end))
    }
}

impl ClampedRange {
    /// Number of indices covered. Never zero.
    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }
}
