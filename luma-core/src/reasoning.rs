//! "Why now" text for a recommendation.

use crate::era::Phase;
use crate::types::{Block, StateSnapshot};
use crate::weights::StateBand;

/// Returned when there is nothing to recommend.
pub const NO_BLOCKS_REASON: &str = "No blocks available for this phase";

/// How many context tags are named in the explanation.
const MAX_NAMED_TAGS: usize = 2;

/// Build the justification for a selected block.
///
/// The state average is rounded before banding, so a 3.6 average reads as
/// steady here even though the scorer treats it as challenging.
pub fn generate_reasoning(
    selected: Option<&Block>,
    state: Option<&StateSnapshot>,
    phase: Phase,
) -> String {
    let Some(block) = selected else {
        return NO_BLOCKS_REASON.to_string();
    };

    let mut reason = format!("Starting {} phase", phase);

    if let Some(state) = state.filter(|s| s.is_finite()) {
        let clause = match StateBand::from_average(state.average().round()) {
            StateBand::Challenging => ", building foundation during challenge",
            StateBand::Growth => ", strong state for deeper practice",
            StateBand::Stable => ", steady state for consistent growth",
        };
        reason.push_str(clause);
    }

    if !block.context_tags.is_empty() {
        let named: Vec<&str> = block
            .context_tags
            .iter()
            .take(MAX_NAMED_TAGS)
            .map(String::as_str)
            .collect();
        reason.push_str(" → Supports ");
        reason.push_str(&named.join(", "));
    }

    reason
}
