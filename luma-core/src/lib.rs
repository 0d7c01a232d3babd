//! LUMA Core - deterministic block recommendation
//!
//! Given a user's latest regulation reading, their recent journey events and
//! their open assignments, this crate ranks a catalog of content blocks and
//! explains the pick:
//!
//! - **Scoring**: additive, inspectable rule terms with named weights
//! - **Reasoning**: plain-text "why now" for the selected block
//! - **ERA model**: phases and per-weekday block guidance
//!
//! Everything here is pure. Fetching data, timeouts and audit logging live in
//! `luma-service`.
//!
//! # Example
//!
//! ```
//! use luma_core::{generate_reasoning, Block, Phase, ScoringEngine, StateSnapshot};
//!
//! let blocks = vec![Block::new("b1", "Box breathing").with_context_tag("calm")];
//! let state = StateSnapshot::new(5.0, 6.0, 5.0);
//!
//! let phase = Phase::Experience;
//! let ranked = ScoringEngine::new().score_blocks(&blocks, Some(&state), &[], &[], phase);
//! let why_now = generate_reasoning(ranked.first().map(|s| &s.block), Some(&state), phase);
//! assert_eq!(
//!     why_now,
//!     "Starting experience phase, steady state for consistent growth → Supports calm"
//! );
//! ```

pub mod era;
pub mod reasoning;
pub mod scoring;
pub mod types;
pub mod weights;

// Re-export main types
pub use era::{EraContent, EraDay, Phase};
pub use reasoning::{generate_reasoning, NO_BLOCKS_REASON};
pub use scoring::{has_phase_content, score_blocks, ScoreBreakdown, ScoringContext, ScoringEngine};
pub use types::*;
pub use weights::{ScoringWeights, StateBand};
