//! Audit trail for recommendations.
//!
//! Every block LUMA hands out is recorded as a `block_assigned` event so the
//! decision can be inspected later. Writing is best-effort: the orchestrator
//! never fails a request because the log is down.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use luma_core::{Phase, ScoreBreakdown};

/// Maximum entries in the audit log before pruning.
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// Event kind written for each recommendation.
pub const BLOCK_ASSIGNED_KIND: &str = "block_assigned";

/// Who the assignment is attributed to.
pub const ASSIGNED_BY: &str = "luma";

/// Error types for audit writes.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The sink rejected or could not persist the entry
    #[error("Audit write failed: {0}")]
    WriteFailed(String),

    /// The write did not finish in time
    #[error("Audit write timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// An entry in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry ID
    pub entry_id: String,
    pub rehab_id: String,
    pub user_id: String,
    /// Event kind, always `block_assigned` for recommendations
    pub kind: String,
    /// `{block_id, phase, reasoning, assigned_by}` plus the score terms
    pub data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    /// Entry for a recommended block.
    pub fn block_assigned(
        rehab_id: impl Into<String>,
        user_id: impl Into<String>,
        block_id: &str,
        phase: Phase,
        reasoning: &str,
        breakdown: Option<&ScoreBreakdown>,
    ) -> Self {
        let mut data = serde_json::json!({
            "block_id": block_id,
            "phase": phase.as_str(),
            "reasoning": reasoning,
            "assigned_by": ASSIGNED_BY,
        });

        if let Some(breakdown) = breakdown {
            data["score"] = serde_json::json!(breakdown.total());
            data["breakdown"] = serde_json::to_value(breakdown).unwrap_or_default();
        }

        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            rehab_id: rehab_id.into(),
            user_id: user_id.into(),
            kind: BLOCK_ASSIGNED_KIND.to_string(),
            data,
            recorded_at: Utc::now(),
        }
    }

    /// Block id recorded in the entry data.
    pub fn block_id(&self) -> Option<&str> {
        self.data.get("block_id").and_then(|v| v.as_str())
    }
}

/// Write sink for recommendation audit events.
#[async_trait]
pub trait RecommendationLog: Send + Sync {
    /// Persist one entry.
    async fn record(&self, entry: LogEntry) -> Result<(), LogError>;
}

/// Bounded in-memory audit log.
pub struct AuditLog {
    /// Log entries (newest first)
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    /// Maximum entries to retain
    max_entries: AtomicUsize,
}

impl AuditLog {
    /// Create a new audit log.
    pub fn new() -> Self {
        Self::with_max_entries(MAX_AUDIT_ENTRIES)
    }

    /// Create with custom max entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries: AtomicUsize::new(max_entries),
        }
    }

    /// Change the retention limit. Applied on the next push.
    pub fn set_max_entries(&self, max_entries: usize) {
        self.max_entries.store(max_entries, Ordering::SeqCst);
    }

    /// Get the retention limit.
    pub fn max_entries(&self) -> usize {
        self.max_entries.load(Ordering::SeqCst)
    }

    /// Append an entry, pruning the oldest past the limit.
    pub async fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.write().await;
        entries.push_front(entry);

        let max_entries = self.max_entries();
        while entries.len() > max_entries {
            entries.pop_back();
        }
    }

    /// Get recent entries.
    pub async fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    /// Get entries for a user.
    pub async fn get_by_user(&self, user_id: &str, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get count.
    pub async fn count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// Clear the log.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecommendationLog for AuditLog {
    async fn record(&self, entry: LogEntry) -> Result<(), LogError> {
        self.push(entry).await;
        Ok(())
    }
}
