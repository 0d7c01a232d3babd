//! Scoring weights and state bands.
//!
//! Every number the scorer adds or subtracts lives here so a change to the
//! policy shows up as a one-line diff.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Averages below this are the challenging band.
pub const CHALLENGING_BELOW: f64 = 4.0;

/// Averages above this are the growth band.
pub const GROWTH_ABOVE: f64 = 7.0;

/// Upper bound on any single weight. Keeps every total finite.
pub const MAX_WEIGHT: f64 = 1_000_000.0;

/// Weights for each additive scoring term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(default)]
pub struct ScoringWeights {
    /// Multiplier applied to a block's explore weight
    pub explore_multiplier: f64,
    /// Bonus for blocks with any weekday guidance
    pub phase_fit: f64,
    /// Bonus when the block's day type matches the state band
    pub state_alignment: f64,
    /// Multiplier applied to a block's effectiveness score
    pub effectiveness_multiplier: f64,
    /// Penalty for blocks completed in the recency window
    pub recency_penalty: f64,
    /// Bonus for blocks with an open assignment
    pub assignment_boost: f64,
    /// Bonus for blocks carrying context tags
    pub context_tags: f64,
    /// How many of the latest step-done events count as recent
    pub recency_window: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            explore_multiplier: 30.0,
            phase_fit: 25.0,
            state_alignment: 10.0,
            effectiveness_multiplier: 15.0,
            recency_penalty: 40.0,
            assignment_boost: 15.0,
            context_tags: 5.0,
            recency_window: 3,
        }
    }
}

impl ScoringWeights {
    /// Whether every weight is finite and within `0..=MAX_WEIGHT`.
    pub fn is_valid(&self) -> bool {
        [
            self.explore_multiplier,
            self.phase_fit,
            self.state_alignment,
            self.effectiveness_multiplier,
            self.recency_penalty,
            self.assignment_boost,
            self.context_tags,
        ]
        .iter()
        .all(|w| (0.0..=MAX_WEIGHT).contains(w))
    }
}

/// Regulation band inferred from a state average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum StateBand {
    Challenging,
    Stable,
    Growth,
}

impl StateBand {
    /// Classify an average. Both 4.0 and 7.0 are stable.
    pub fn from_average(avg: f64) -> Self {
        if avg < CHALLENGING_BELOW {
            Self::Challenging
        } else if avg > GROWTH_ABOVE {
            Self::Growth
        } else {
            Self::Stable
        }
    }

    /// Day type a block must carry to align with this band.
    pub fn day_type(&self) -> &'static str {
        match self {
            Self::Challenging => "challenging",
            Self::Stable => "stable",
            Self::Growth => "growth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(StateBand::from_average(4.0), StateBand::Stable);
        assert_eq!(StateBand::from_average(7.0), StateBand::Stable);
        assert_eq!(StateBand::from_average(3.99), StateBand::Challenging);
        assert_eq!(StateBand::from_average(7.01), StateBand::Growth);
    }

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.explore_multiplier, 30.0);
        assert_eq!(weights.recency_penalty, 40.0);
        assert_eq!(weights.recency_window, 3);
        assert!(weights.is_valid());

        let broken = ScoringWeights {
            phase_fit: f64::NAN,
            ..Default::default()
        };
        assert!(!broken.is_valid());

        let huge = ScoringWeights {
            explore_multiplier: 1e308,
            ..Default::default()
        };
        assert!(!huge.is_valid());
    }
}
