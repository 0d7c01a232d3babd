//! Recommendation request.

use serde::{Deserialize, Serialize};

use luma_core::{Phase, ValidationError};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Request for the next block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RecommendationRequest {
    #[serde(default)]
    pub rehab_id: String,
    #[serde(default)]
    pub user_id: String,
    /// "experience", "recognize" or "align"
    #[serde(default)]
    pub phase: String,
    /// Opaque caller context, carried through for tracing only
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

impl RecommendationRequest {
    /// Create a new request.
    pub fn new(
        rehab_id: impl Into<String>,
        user_id: impl Into<String>,
        phase: impl Into<String>,
    ) -> Self {
        Self {
            rehab_id: rehab_id.into(),
            user_id: user_id.into(),
            phase: phase.into(),
            context: None,
        }
    }

    /// Attach caller context.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Check identifiers and parse the phase.
    pub fn validate(&self) -> Result<Phase, ValidationError> {
        if self.rehab_id.trim().is_empty() {
            return Err(ValidationError::MissingField("rehab_id"));
        }
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("user_id"));
        }
        self.phase.parse()
    }
}
