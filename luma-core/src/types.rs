//! Core records consumed and produced by the recommendation engine.
//!
//! These mirror the rows the surrounding application stores for state
//! check-ins, journey events, assignments and published blocks. Optional
//! columns are `Option` fields rather than loosely-typed properties.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs for consistency with the web frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::era::{EraContent, Phase};

/// Event kind recorded when a user finishes an ERA step of a block.
pub const STEP_DONE_KIND: &str = "era.step.done";

/// Explore weight assumed when a block does not set one.
pub const DEFAULT_EXPLORE_WEIGHT: f64 = 0.5;

/// Errors surfaced to the caller before any data is fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required identifier was missing or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Phase was not one of experience, recognize, align
    #[error("Invalid phase '{0}': expected experience, recognize or align")]
    InvalidPhase(String),
}

/// Most recent regulation reading on the canonical 1-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StateSnapshot {
    pub tempo: f64,
    pub flow: f64,
    pub sync: f64,
    pub timestamp: DateTime<Utc>,
}

impl StateSnapshot {
    /// Create a snapshot taken now.
    pub fn new(tempo: f64, flow: f64, sync: f64) -> Self {
        Self {
            tempo,
            flow,
            sync,
            timestamp: Utc::now(),
        }
    }

    /// Mean of tempo, flow and sync.
    pub fn average(&self) -> f64 {
        (self.tempo + self.flow + self.sync) / 3.0
    }

    /// Whether every reading is a finite number.
    pub fn is_finite(&self) -> bool {
        self.tempo.is_finite() && self.flow.is_finite() && self.sync.is_finite()
    }
}

/// Append-only activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Event {
    pub kind: String,
    #[serde(default)]
    #[cfg_attr(feature = "typescript", ts(type = "Record<string, unknown>"))]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event of the given kind with empty data.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: serde_json::Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// A step-done event for a block.
    pub fn step_done(block_id: impl Into<String>) -> Self {
        Self::new(STEP_DONE_KIND).with_data("block_id", block_id.into())
    }

    /// Add a data field.
    pub fn with_data(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Block id of a completed ERA step, if this is one.
    pub fn completed_block_id(&self) -> Option<&str> {
        if self.kind != STEP_DONE_KIND {
            return None;
        }
        self.data.get("block_id").and_then(|v| v.as_str())
    }
}

/// Lifecycle state of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Active,
    Completed,
    Skipped,
    /// Any status this engine does not know about
    #[serde(other)]
    Unknown,
}

impl AssignmentStatus {
    /// Pending and active assignments are the ones still in progress.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// Link between a user and a block they are working through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Assignment {
    pub block_id: String,
    pub phase: Phase,
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn new(block_id: impl Into<String>, phase: Phase, status: AssignmentStatus) -> Self {
        Self {
            block_id: block_id.into(),
            phase,
            status,
        }
    }
}

fn default_explore_weight() -> f64 {
    DEFAULT_EXPLORE_WEIGHT
}

/// A published catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Block {
    pub id: String,
    pub name: String,
    /// Day types this block suits ("challenging", "stable", "growth", ...)
    #[serde(default)]
    pub day_type: BTreeSet<String>,
    /// Weekday guidance; absent for blocks without ERA content
    #[serde(default)]
    pub era: Option<EraContent>,
    #[serde(default)]
    pub context_tags: Vec<String>,
    /// Prior in 0..=1 biasing how often the block surfaces
    #[serde(default = "default_explore_weight")]
    pub explore_weight: f64,
    /// Externally computed quality signal in 0..=1
    #[serde(default)]
    pub effectiveness_score: Option<f64>,
    #[serde(default)]
    pub sort_order: i64,
}

impl Block {
    /// Create a block with default metadata.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            day_type: BTreeSet::new(),
            era: None,
            context_tags: Vec::new(),
            explore_weight: DEFAULT_EXPLORE_WEIGHT,
            effectiveness_score: None,
            sort_order: 0,
        }
    }

    /// Add a day type.
    pub fn with_day_type(mut self, day_type: impl Into<String>) -> Self {
        self.day_type.insert(day_type.into());
        self
    }

    /// Set the ERA guidance.
    pub fn with_era(mut self, era: EraContent) -> Self {
        self.era = Some(era);
        self
    }

    /// Add a context tag.
    pub fn with_context_tag(mut self, tag: impl Into<String>) -> Self {
        self.context_tags.push(tag.into());
        self
    }

    /// Set the explore weight.
    pub fn with_explore_weight(mut self, weight: f64) -> Self {
        self.explore_weight = weight;
        self
    }

    /// Set the effectiveness score.
    pub fn with_effectiveness(mut self, score: f64) -> Self {
        self.effectiveness_score = Some(score);
        self
    }

    /// Set the catalog position.
    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Membership test on day types.
    pub fn has_day_type(&self, day_type: &str) -> bool {
        self.day_type.contains(day_type)
    }
}

/// A block paired with its score for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoredBlock {
    pub block: Block,
    pub score: f64,
}

/// Result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Recommendation {
    /// The selected block, or `None` when nothing was available
    pub next: Option<Block>,
    /// Human-readable justification
    #[serde(rename = "whyNow")]
    pub why_now: String,
    /// The snapshot the decision was based on
    pub state: Option<StateSnapshot>,
}
