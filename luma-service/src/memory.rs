//! In-memory collaborators for tests and local development.
//!
//! One store implements every collaborator trait. Reads and writes can be
//! made to fail or stall so the orchestrator's degradation paths can be
//! exercised without a database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use luma_core::{Assignment, Block, Event, StateSnapshot};

use crate::audit::{AuditLog, LogEntry, LogError, RecommendationLog};
use crate::repository::{
    AssignmentRepository, BlockCatalog, Collaborator, EventRepository, RepositoryError,
    StateRepository,
};

type UserKey = (String, String);

fn key(rehab_id: &str, user_id: &str) -> UserKey {
    (rehab_id.to_string(), user_id.to_string())
}

/// In-memory store backing all collaborators.
pub struct InMemoryStore {
    states: RwLock<HashMap<UserKey, Vec<StateSnapshot>>>,
    /// Per user, newest first
    events: RwLock<HashMap<UserKey, Vec<Event>>>,
    assignments: RwLock<HashMap<UserKey, Vec<Assignment>>>,
    blocks: RwLock<Vec<Block>>,
    audit: AuditLog,
    failing: RwLock<HashSet<Collaborator>>,
    fail_writes: AtomicBool,
    read_delay_ms: AtomicU64,
    write_delay_ms: AtomicU64,
    read_calls: AtomicU32,
    write_calls: AtomicU32,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            blocks: RwLock::new(Vec::new()),
            audit: AuditLog::new(),
            failing: RwLock::new(HashSet::new()),
            fail_writes: AtomicBool::new(false),
            read_delay_ms: AtomicU64::new(0),
            write_delay_ms: AtomicU64::new(0),
            read_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
        }
    }

    /// Delay every read by `delay`.
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.read_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Delay every audit write by `delay`.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.write_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Make audit writes fail.
    pub fn with_failing_writes(self, fail: bool) -> Self {
        self.fail_writes.store(fail, Ordering::SeqCst);
        self
    }

    /// Record a state reading.
    pub async fn put_state(&self, rehab_id: &str, user_id: &str, snapshot: StateSnapshot) {
        let mut states = self.states.write().await;
        states.entry(key(rehab_id, user_id)).or_default().push(snapshot);
    }

    /// Record an event. Later events with the same timestamp sort first.
    pub async fn push_event(&self, rehab_id: &str, user_id: &str, event: Event) {
        let mut events = self.events.write().await;
        let list = events.entry(key(rehab_id, user_id)).or_default();
        list.insert(0, event);
        list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Record an assignment in any status.
    pub async fn add_assignment(&self, rehab_id: &str, user_id: &str, assignment: Assignment) {
        let mut assignments = self.assignments.write().await;
        assignments
            .entry(key(rehab_id, user_id))
            .or_default()
            .push(assignment);
    }

    /// Publish a block to the catalog.
    pub async fn publish(&self, block: Block) {
        let mut blocks = self.blocks.write().await;
        blocks.push(block);
    }

    /// Make reads from a collaborator fail until cleared.
    pub async fn fail(&self, collaborator: Collaborator) {
        let mut failing = self.failing.write().await;
        failing.insert(collaborator);
    }

    /// Clear all injected read failures.
    pub async fn heal(&self) {
        let mut failing = self.failing.write().await;
        failing.clear();
    }

    /// The audit entries written so far.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Number of read calls received.
    pub fn read_calls(&self) -> u32 {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of audit write calls received.
    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Shared read prologue: count, delay, injected failure.
    async fn begin_read(&self, collaborator: Collaborator) -> Result<(), RepositoryError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failing.read().await.contains(&collaborator) {
            return Err(RepositoryError::Unavailable(
                collaborator,
                "injected failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateRepository for InMemoryStore {
    async fn get_latest(
        &self,
        rehab_id: &str,
        user_id: &str,
    ) -> Result<Option<StateSnapshot>, RepositoryError> {
        self.begin_read(Collaborator::State).await?;

        let states = self.states.read().await;
        let latest = states.get(&key(rehab_id, user_id)).and_then(|list| {
            list.iter()
                .fold(None, |best: Option<&StateSnapshot>, s| match best {
                    Some(b) if b.timestamp > s.timestamp => Some(b),
                    _ => Some(s),
                })
                .cloned()
        });
        Ok(latest)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn get_recent(
        &self,
        rehab_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Event>, RepositoryError> {
        self.begin_read(Collaborator::Events).await?;

        let events = self.events.read().await;
        Ok(events
            .get(&key(rehab_id, user_id))
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryStore {
    async fn get_active(
        &self,
        rehab_id: &str,
        user_id: &str,
    ) -> Result<Vec<Assignment>, RepositoryError> {
        self.begin_read(Collaborator::Assignments).await?;

        let assignments = self.assignments.read().await;
        Ok(assignments
            .get(&key(rehab_id, user_id))
            .map(|list| {
                list.iter()
                    .filter(|a| a.status.is_open())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl BlockCatalog for InMemoryStore {
    async fn get_published(&self) -> Result<Vec<Block>, RepositoryError> {
        self.begin_read(Collaborator::Catalog).await?;

        let mut blocks = self.blocks.read().await.clone();
        blocks.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        Ok(blocks)
    }
}

#[async_trait]
impl RecommendationLog for InMemoryStore {
    async fn record(&self, entry: LogEntry) -> Result<(), LogError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LogError::WriteFailed("injected failure".to_string()));
        }
        self.audit.push(entry).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use luma_core::{AssignmentStatus, Phase};

    #[tokio::test]
    async fn test_latest_state_wins() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut old = StateSnapshot::new(1.0, 1.0, 1.0);
        old.timestamp = now - ChronoDuration::hours(2);
        let mut new = StateSnapshot::new(8.0, 8.0, 8.0);
        new.timestamp = now;

        store.put_state("r", "u", new).await;
        store.put_state("r", "u", old).await;

        let latest = store.get_latest("r", "u").await.unwrap().unwrap();
        assert_eq!(latest.tempo, 8.0);
    }

    #[tokio::test]
    async fn test_events_newest_first_with_limit() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        for i in 0..12 {
            let event = Event::step_done(format!("b{}", i)).at(now + ChronoDuration::seconds(i));
            store.push_event("r", "u", event).await;
        }

        let events = store.get_recent("r", "u", 10).await.unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].completed_block_id(), Some("b11"));
        assert_eq!(events[9].completed_block_id(), Some("b2"));
    }

    #[tokio::test]
    async fn test_only_open_assignments() {
        let store = InMemoryStore::new();
        store
            .add_assignment(
                "r",
                "u",
                Assignment::new("a", Phase::Experience, AssignmentStatus::Active),
            )
            .await;
        store
            .add_assignment(
                "r",
                "u",
                Assignment::new("b", Phase::Experience, AssignmentStatus::Completed),
            )
            .await;
        store
            .add_assignment("r", "u", Assignment::new("c", Phase::Align, AssignmentStatus::Pending))
            .await;

        let ids: Vec<_> = store
            .get_active("r", "u")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.block_id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_catalog_sorted() {
        let store = InMemoryStore::new();
        store.publish(Block::new("z", "Z").with_sort_order(1)).await;
        store.publish(Block::new("a", "A").with_sort_order(2)).await;
        store.publish(Block::new("m", "M").with_sort_order(1)).await;

        let ids: Vec<_> = store
            .get_published()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["m", "z", "a"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryStore::new().with_failing_writes(true);
        store.fail(Collaborator::Catalog).await;

        assert!(store.get_published().await.is_err());
        assert!(store.get_recent("r", "u", 10).await.is_ok());

        let entry = LogEntry::block_assigned("r", "u", "b", Phase::Align, "x", None);
        assert!(store.record(entry).await.is_err());
        assert_eq!(store.write_calls(), 1);
        assert_eq!(store.audit().count().await, 0);

        store.heal().await;
        assert!(store.get_published().await.is_ok());
        assert_eq!(store.read_calls(), 3);
    }
}
