//! RecommendationOrchestrator - main entry point for block recommendations.
//!
//! Validates the request, reads the four collaborators concurrently, ranks
//! the catalog, explains the pick and records it. Only validation errors
//! reach the caller; every collaborator failure degrades to empty data.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use luma_core::{
    generate_reasoning, Assignment, Block, Event, Recommendation, ScoredBlock, ScoringContext,
    ScoringEngine, StateSnapshot, ValidationError,
};

use crate::audit::{LogEntry, LogError, RecommendationLog};
use crate::config::{ConfigError, LumaConfig};
use crate::memory::InMemoryStore;
use crate::repository::{
    AssignmentRepository, BlockCatalog, Collaborator, EventRepository, RepositoryError,
    ScaledStateRepository, StateRepository, StateScale,
};
use crate::request::RecommendationRequest;

/// Collaborator data for one request, already degraded.
#[derive(Debug, Default)]
struct Inputs {
    state: Option<StateSnapshot>,
    events: Vec<Event>,
    assignments: Vec<Assignment>,
    blocks: Vec<Block>,
}

/// Substitute the fallback for a failed read.
pub(crate) fn degrade<T: Default>(
    collaborator: Collaborator,
    result: Result<T, RepositoryError>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(
                collaborator = %collaborator,
                error = %e,
                "Collaborator read failed, continuing without it"
            );
            T::default()
        }
    }
}

/// Main entry point for LUMA recommendations.
pub struct RecommendationOrchestrator {
    /// Configuration
    config: LumaConfig,
    /// Scorer built from the configured weights
    engine: ScoringEngine,
    states: Arc<dyn StateRepository>,
    events: Arc<dyn EventRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    catalog: Arc<dyn BlockCatalog>,
    /// Audit sink
    log: Arc<dyn RecommendationLog>,
}

impl RecommendationOrchestrator {
    /// Create a builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Use one in-memory store for every collaborator, with default config.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        let config = LumaConfig::default();
        store.audit().set_max_entries(config.audit.max_entries);
        Self {
            engine: ScoringEngine::with_weights(config.weights.clone()),
            config,
            states: store.clone(),
            events: store.clone(),
            assignments: store.clone(),
            catalog: store.clone(),
            log: store,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LumaConfig {
        &self.config
    }

    /// Recommend the next block.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, ValidationError> {
        let phase = request.validate()?;

        debug!(
            rehab_id = %request.rehab_id,
            user_id = %request.user_id,
            phase = %phase,
            context = ?request.context,
            "Processing recommendation request"
        );

        let inputs = self.gather(&request.rehab_id, &request.user_id).await;
        let ctx = ScoringContext::new(
            inputs.state.as_ref(),
            &inputs.events,
            &inputs.assignments,
            self.engine.weights().recency_window,
        );

        let ranked = self.engine.score_blocks(
            &inputs.blocks,
            inputs.state.as_ref(),
            &inputs.events,
            &inputs.assignments,
            phase,
        );
        let next = ranked.into_iter().next().map(|s| s.block);
        let why_now = generate_reasoning(next.as_ref(), inputs.state.as_ref(), phase);

        if let Some(block) = &next {
            info!(
                rehab_id = %request.rehab_id,
                user_id = %request.user_id,
                phase = %phase,
                block_id = %block.id,
                "Recommended block"
            );

            if self.config.audit.enabled {
                let breakdown = self.engine.breakdown(block, &ctx);
                let entry = LogEntry::block_assigned(
                    &request.rehab_id,
                    &request.user_id,
                    &block.id,
                    phase,
                    &why_now,
                    Some(&breakdown),
                );
                self.write_audit(entry).await;
            }
        } else {
            info!(phase = %phase, "No blocks available");
        }

        Ok(Recommendation {
            next,
            why_now,
            state: inputs.state,
        })
    }

    /// Top `limit` scored blocks for the request. Nothing is audited.
    pub async fn rank(
        &self,
        request: &RecommendationRequest,
        limit: usize,
    ) -> Result<Vec<ScoredBlock>, ValidationError> {
        let phase = request.validate()?;
        let inputs = self.gather(&request.rehab_id, &request.user_id).await;

        let mut ranked = self.engine.score_blocks(
            &inputs.blocks,
            inputs.state.as_ref(),
            &inputs.events,
            &inputs.assignments,
            phase,
        );
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Read all collaborators concurrently, degrading failures.
    async fn gather(&self, rehab_id: &str, user_id: &str) -> Inputs {
        let event_limit = self.config.fetch.event_limit;

        let (state, events, assignments, blocks) = tokio::join!(
            self.fetch(Collaborator::State, move || self.states.get_latest(rehab_id, user_id)),
            self.fetch(Collaborator::Events, move || self
                .events
                .get_recent(rehab_id, user_id, event_limit)),
            self.fetch(Collaborator::Assignments, move || self
                .assignments
                .get_active(rehab_id, user_id)),
            self.fetch(Collaborator::Catalog, move || self.catalog.get_published()),
        );

        Inputs {
            state: degrade(Collaborator::State, state),
            events: degrade(Collaborator::Events, events),
            assignments: degrade(Collaborator::Assignments, assignments),
            blocks: degrade(Collaborator::Catalog, blocks),
        }
    }

    /// One bounded call, retried according to config.
    async fn fetch<T, F, Fut>(
        &self,
        collaborator: Collaborator,
        call: F,
    ) -> Result<T, RepositoryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        let timeout = self.config.fetch.timeout();
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RepositoryError::Timeout {
                    collaborator,
                    timeout_ms: self.config.fetch.timeout_ms,
                }),
            };

            match result {
                Err(e) if attempt < self.config.fetch.retries => {
                    attempt += 1;
                    debug!(
                        collaborator = %collaborator,
                        error = %e,
                        attempt,
                        "Retrying collaborator read"
                    );
                }
                other => return other,
            }
        }
    }

    /// Record an audit entry without letting failure reach the caller.
    async fn write_audit(&self, entry: LogEntry) {
        let log = Arc::clone(&self.log);
        let timeout = self.config.fetch.timeout();
        let timeout_ms = self.config.fetch.timeout_ms;

        let write = async move {
            let block_id = entry.block_id().unwrap_or_default().to_string();
            let result = match tokio::time::timeout(timeout, log.record(entry)).await {
                Ok(result) => result,
                Err(_) => Err(LogError::Timeout { timeout_ms }),
            };

            match result {
                Ok(()) => debug!(block_id = %block_id, "Recorded recommendation"),
                Err(e) => warn!(
                    collaborator = %Collaborator::Log,
                    block_id = %block_id,
                    error = %e,
                    "Failed to record recommendation"
                ),
            }
        };

        if self.config.audit.detached {
            tokio::spawn(write);
        } else {
            write.await;
        }
    }
}

/// Builder for [`RecommendationOrchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: LumaConfig,
    states: Option<Arc<dyn StateRepository>>,
    events: Option<Arc<dyn EventRepository>>,
    assignments: Option<Arc<dyn AssignmentRepository>>,
    catalog: Option<Arc<dyn BlockCatalog>>,
    log: Option<Arc<dyn RecommendationLog>>,
    memory: Option<Arc<InMemoryStore>>,
}

impl OrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration.
    pub fn config(mut self, config: LumaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn states(mut self, states: Arc<dyn StateRepository>) -> Self {
        self.states = Some(states);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventRepository>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn assignments(mut self, assignments: Arc<dyn AssignmentRepository>) -> Self {
        self.assignments = Some(assignments);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn BlockCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn log(mut self, log: Arc<dyn RecommendationLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Use one in-memory store for every collaborator.
    ///
    /// Its audit buffer takes `audit.max_entries` from the config at build.
    pub fn store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.memory = Some(Arc::clone(&store));
        self.states(store.clone())
            .events(store.clone())
            .assignments(store.clone())
            .catalog(store.clone())
            .log(store)
    }

    /// Validate config and assemble the orchestrator.
    ///
    /// A state repository on the percent scale is wrapped so the scorer
    /// always sees 1-10 readings.
    pub fn build(self) -> Result<RecommendationOrchestrator, ConfigError> {
        self.config.validate()?;

        if let Some(store) = &self.memory {
            store.audit().set_max_entries(self.config.audit.max_entries);
        }

        let states = self.states.ok_or(ConfigError::MissingCollaborator("states"))?;
        let states: Arc<dyn StateRepository> = match self.config.state_scale {
            StateScale::OneToTen => states,
            scale => Arc::new(ScaledStateRepository::new(states, scale)),
        };

        Ok(RecommendationOrchestrator {
            engine: ScoringEngine::with_weights(self.config.weights.clone()),
            states,
            events: self.events.ok_or(ConfigError::MissingCollaborator("events"))?,
            assignments: self
                .assignments
                .ok_or(ConfigError::MissingCollaborator("assignments"))?,
            catalog: self.catalog.ok_or(ConfigError::MissingCollaborator("catalog"))?,
            log: self.log.ok_or(ConfigError::MissingCollaborator("log"))?,
            config: self.config,
        })
    }
}
