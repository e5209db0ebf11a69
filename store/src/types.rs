use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Match state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Unset,
    Matched,
    Edge,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStatus::Unset => "unset",
            MatchStatus::Matched => "matched",
            MatchStatus::Edge => "edge",
        })
    }
}

/// One feedback record as stored by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub product: String,
    pub channel: String,
    pub content: String,
    pub content_clean: String,
    pub create_time: NaiveDateTime,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub match_status: MatchStatus,
}

impl Record {
    pub fn stratum(&self) -> Stratum {
        Stratum {
            product: self.product.clone(),
            channel: self.channel.clone(),
        }
    }
}

/// A record before it has been assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub product: String,
    pub channel: String,
    pub content: String,
    pub content_clean: String,
    pub create_time: NaiveDateTime,
}

/// Records sharing one (product, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stratum {
    pub product: String,
    pub channel: String,
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product, self.channel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub record_id: u64,
    pub content_clean: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Edge record: a record whose best similarity fell below the threshold.
/// `label` is filled in by escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub record_id: u64,
    pub content_clean: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOrigin {
    Initial,
    Iterative,
}

impl fmt::Display for TagOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagOrigin::Initial => "initial",
            TagOrigin::Iterative => "iterative",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub label: String,
    pub embedding: Vec<f32>,
    pub origin: TagOrigin,
    #[serde(default)]
    pub cluster_id: Option<usize>,
}

/// A tag before insertion. The store assigns id and origin.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    pub label: String,
    pub embedding: Vec<f32>,
    pub cluster_id: Option<usize>,
}

/// A record's row in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEmbedding {
    pub record_id: u64,
    pub content_clean: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub tag_id: Option<u64>,
    #[serde(default)]
    pub similarity: Option<f32>,
}

/// Match fields to write onto a record's vector-store row.
/// `None` clears a previous match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchUpdate {
    pub record_id: u64,
    pub best: Option<(u64, f32)>,
}

/// Result of matching one record, applied to the record store.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Matched {
        record_id: u64,
        tag_id: u64,
        label: String,
        similarity: f32,
    },
    Edge {
        record_id: u64,
        content_clean: String,
        best: Option<(u64, f32)>,
    },
}

impl Outcome {
    pub fn record_id(&self) -> u64 {
        match self {
            Outcome::Matched { record_id, .. } | Outcome::Edge { record_id, .. } => *record_id,
        }
    }

    /// The vector-store side of this outcome. Edge outcomes clear the match.
    pub fn match_update(&self) -> MatchUpdate {
        match self {
            Outcome::Matched {
                record_id,
                tag_id,
                similarity,
                ..
            } => MatchUpdate {
                record_id: *record_id,
                best: Some((*tag_id, *similarity)),
            },
            Outcome::Edge { record_id, .. } => MatchUpdate {
                record_id: *record_id,
                best: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub unset: usize,
    pub matched: usize,
    pub edge: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: MatchStatus) {
        match status {
            MatchStatus::Unset => self.unset += 1,
            MatchStatus::Matched => self.matched += 1,
            MatchStatus::Edge => self.edge += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordStats {
    pub total: usize,
    pub today: usize,
    pub by_status: StatusCounts,
    pub samples: usize,
    pub edges: usize,
    pub unresolved_edges: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    pub initial: usize,
    pub iterative: usize,
}

impl TagCounts {
    pub fn total(&self) -> usize {
        self.initial + self.iterative
    }
}
