//! Read-only collaborator traits.
//!
//! The orchestrator consumes state readings, journey events, assignments and
//! the published catalog through these traits. Implementations may be backed
//! by a database, an HTTP API or memory (see [`crate::memory`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use luma_core::{Assignment, Block, Event, StateSnapshot};

/// Which collaborator a failure came from. `Log` is the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    State,
    Events,
    Assignments,
    Catalog,
    Log,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "state",
            Self::Events => "events",
            Self::Assignments => "assignments",
            Self::Catalog => "catalog",
            Self::Log => "log",
        })
    }
}

/// Error types for collaborator reads.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Backing store is not reachable
    #[error("{0} unavailable: {1}")]
    Unavailable(Collaborator, String),

    /// Call did not complete within the configured bound
    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        collaborator: Collaborator,
        timeout_ms: u64,
    },

    /// Query executed but failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Latest regulation reading for a user.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Most recent snapshot on the canonical 1-10 scale, if any.
    async fn get_latest(
        &self,
        rehab_id: &str,
        user_id: &str,
    ) -> Result<Option<StateSnapshot>, RepositoryError>;
}

/// Journey activity history.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Up to `limit` events, newest first.
    async fn get_recent(
        &self,
        rehab_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Event>, RepositoryError>;
}

/// Blocks a user is currently working through.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Assignments with status pending or active.
    async fn get_active(
        &self,
        rehab_id: &str,
        user_id: &str,
    ) -> Result<Vec<Assignment>, RepositoryError>;
}

/// Published content catalog.
#[async_trait]
pub trait BlockCatalog: Send + Sync {
    /// All published blocks ordered by `sort_order` ascending.
    async fn get_published(&self) -> Result<Vec<Block>, RepositoryError>;
}

/// Scale a state repository reports readings on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateScale {
    /// Canonical engine scale
    #[default]
    OneToTen,
    /// Check-in UI scale, 0-100
    Percent,
}

impl StateScale {
    /// Convert a snapshot on this scale to the canonical 1-10 scale.
    pub fn to_canonical(&self, snapshot: StateSnapshot) -> StateSnapshot {
        match self {
            Self::OneToTen => snapshot,
            Self::Percent => {
                let convert = |v: f64| (v / 10.0).clamp(1.0, 10.0);
                StateSnapshot {
                    tempo: convert(snapshot.tempo),
                    flow: convert(snapshot.flow),
                    sync: convert(snapshot.sync),
                    timestamp: snapshot.timestamp,
                }
            }
        }
    }
}

/// Converts readings from another scale at the repository boundary.
pub struct ScaledStateRepository {
    inner: Arc<dyn StateRepository>,
    scale: StateScale,
}

impl ScaledStateRepository {
    pub fn new(inner: Arc<dyn StateRepository>, scale: StateScale) -> Self {
        Self { inner, scale }
    }
}

#[async_trait]
impl StateRepository for ScaledStateRepository {
    async fn get_latest(
        &self,
        rehab_id: &str,
        user_id: &str,
    ) -> Result<Option<StateSnapshot>, RepositoryError> {
        let snapshot = self.inner.get_latest(rehab_id, user_id).await?;
        Ok(snapshot.map(|s| self.scale.to_canonical(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[test]
    fn test_percent_conversion() {
        let converted = StateScale::Percent.to_canonical(StateSnapshot::new(50.0, 100.0, 120.0));
        assert_eq!(converted.tempo, 5.0);
        assert_eq!(converted.flow, 10.0);
        assert_eq!(converted.sync, 10.0);

        let floor = StateScale::Percent.to_canonical(StateSnapshot::new(0.0, 4.0, 10.0));
        assert_eq!(floor.tempo, 1.0);
        assert_eq!(floor.flow, 1.0);
        assert_eq!(floor.sync, 1.0);

        let same = StateScale::OneToTen.to_canonical(StateSnapshot::new(5.0, 6.0, 7.0));
        assert_eq!(same.flow, 6.0);
    }

    #[tokio::test]
    async fn test_scaled_repository() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put_state("rehab-1", "user-1", StateSnapshot::new(40.0, 60.0, 80.0))
            .await;

        let repo = ScaledStateRepository::new(store, StateScale::Percent);
        let state = repo.get_latest("rehab-1", "user-1").await.unwrap().unwrap();
        assert!((state.average() - 6.0).abs() < 1e-9);

        assert!(repo.get_latest("rehab-1", "other").await.unwrap().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = RepositoryError::Timeout {
            collaborator: Collaborator::Catalog,
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "catalog timed out after 250ms");
    }
}
