// Timeline entry payloads and the edges that carry them
//
// `BatchEdge` is what a data source delivers (the node may be null);
// `Edge` is what the collection stores (the node is always present).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Image,
    Video,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Image => write!(f, "image"),
            EntryKind::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" | "photo" => Ok(EntryKind::Image),
            "video" => Ok(EntryKind::Video),
            _ => Err(format!("Unsupported entry kind: {}. Supported: image, video", s)),
        }
    }
}

/// A single timeline entry.
///
/// Every field is optional: a page may deliver a partial view of an entry
/// that is already cached, and [`TimelineEntry::merged`] unions the two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl TimelineEntry {
    /// Shallow field-level union: fields set on `incoming` win, fields it
    /// leaves unset keep their existing value.
    pub fn merged(self, incoming: TimelineEntry) -> TimelineEntry {
        TimelineEntry {
            id: incoming.id.or(self.id),
            kind: incoming.kind.or(self.kind),
            date: incoming.date.or(self.date),
            filename: incoming.filename.or(self.filename),
            thumbnail_url: incoming.thumbnail_url.or(self.thumbnail_url),
            width: incoming.width.or(self.width),
            height: incoming.height.or(self.height),
        }
    }
}

/// Edge as delivered by a data source. A `None` node is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEdge {
    pub index: u64,
    #[serde(default)]
    pub node: Option<TimelineEntry>,
}

impl BatchEdge {
    pub fn new(index: u64, node: TimelineEntry) -> Self {
        Self {
            index,
            node: Some(node),
        }
    }

    pub fn tombstone(index: u64) -> Self {
        Self { index, node: None }
    }
}

/// A page of edges in the order the data source delivered them.
pub type Batch = Vec<BatchEdge>;

/// Edge stored in the sparse collection. The node is always resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub index: u64,
    pub node: TimelineEntry,
}

impl Edge {
    /// Resolve a delivered edge, dropping tombstones.
    pub fn from_batch(edge: BatchEdge) -> Option<Self> {
        let index = edge.index;
        edge.node.map(|node| Edge { index, node })
    }
}
