//! LUMA Service - adaptive block recommendations
//!
//! Wires the rule-based scorer in `luma-core` to its collaborators:
//! - Repository traits for state, events, assignments and the block catalog
//! - Bounded, concurrent reads that degrade to empty data on failure
//! - Best-effort `block_assigned` audit trail
//! - YAML configuration for weights, timeouts and the state scale
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       RecommendationOrchestrator        │
//! │   (validate → fetch → score → record)   │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┼───────────────┐
//!      ▼           ▼               ▼
//! ┌──────────┐ ┌──────────────┐ ┌──────────────────┐
//! │ Repos    │ │ ScoringEngine│ │ RecommendationLog│
//! │ (state,  │ │ + reasoning  │ │ (block_assigned) │
//! │ events,  │ │              │ │                  │
//! │ catalog) │ │              │ │                  │
//! └──────────┘ └──────────────┘ └──────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod memory;
pub mod orchestrator;
pub mod repository;
pub mod request;

// Re-export main types for convenience
pub use audit::{AuditLog, LogEntry, LogError, RecommendationLog};
pub use config::{AuditConfig, ConfigError, FetchConfig, LumaConfig};
pub use memory::InMemoryStore;
pub use orchestrator::{OrchestratorBuilder, RecommendationOrchestrator};
pub use repository::{
    AssignmentRepository, BlockCatalog, Collaborator, EventRepository, RepositoryError,
    ScaledStateRepository, StateRepository, StateScale,
};
pub use request::RecommendationRequest;
