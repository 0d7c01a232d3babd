//! Block scoring.
//!
//! Each block's score is the sum of independent additive terms:
//!
//! | Term            | Value                                             |
//! |-----------------|---------------------------------------------------|
//! | explore         | `explore_weight × 30`, weight clamped to 0-1      |
//! | phase fit       | `+25` if any weekday guidance is present          |
//! | state alignment | `+10` if the day type matches the state band      |
//! | effectiveness   | `effectiveness_score × 15`, state present only    |
//! | recency         | `−40` if completed in the last 3 step-done events |
//! | assignment      | `+15` if an open assignment exists                |
//! | context tags    | `+5` if the block has any context tags            |
//!
//! Equal scores keep catalog order (`sort_order`, then `id`), so the same
//! inputs always rank identically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::era::Phase;
use crate::types::{Assignment, Block, Event, ScoredBlock, StateSnapshot, DEFAULT_EXPLORE_WEIGHT};
use crate::weights::{ScoringWeights, StateBand};

/// True if any of the seven weekday entries of the block's ERA guidance is
/// non-empty. Does not look at any phase.
pub fn has_phase_content(block: &Block) -> bool {
    block.era.as_ref().is_some_and(|era| era.has_any())
}

/// Per-term contributions to one block's score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ScoreBreakdown {
    pub explore: f64,
    pub phase_fit: f64,
    pub state_alignment: f64,
    pub effectiveness: f64,
    /// Zero or negative
    pub recency: f64,
    pub assignment: f64,
    pub context_tags: f64,
}

impl ScoreBreakdown {
    /// Sum of all terms.
    pub fn total(&self) -> f64 {
        self.explore
            + self.phase_fit
            + self.state_alignment
            + self.effectiveness
            + self.recency
            + self.assignment
            + self.context_tags
    }
}

/// Inputs shared by every block in one scoring pass.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    /// Usable state, `None` when absent or not finite
    pub state: Option<&'a StateSnapshot>,
    /// Block ids from the most recent step-done events, newest first
    pub recently_completed: Vec<&'a str>,
    /// Block ids with a pending or active assignment
    pub assigned: BTreeSet<&'a str>,
}

impl<'a> ScoringContext<'a> {
    /// Build a context from raw collaborator data.
    ///
    /// `recent_events` must be newest first.
    pub fn new(
        state: Option<&'a StateSnapshot>,
        recent_events: &'a [Event],
        assignments: &'a [Assignment],
        recency_window: usize,
    ) -> Self {
        let recently_completed = recent_events
            .iter()
            .filter_map(Event::completed_block_id)
            .take(recency_window)
            .collect();

        let assigned = assignments
            .iter()
            .filter(|a| a.status.is_open())
            .map(|a| a.block_id.as_str())
            .collect();

        Self {
            state: state.filter(|s| s.is_finite()),
            recently_completed,
            assigned,
        }
    }
}

/// Deterministic rule-based scorer.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    /// Create an engine with the default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom weights.
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Get the weights.
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score every block and return them best first.
    pub fn score_blocks(
        &self,
        blocks: &[Block],
        state: Option<&StateSnapshot>,
        recent_events: &[Event],
        assignments: &[Assignment],
        phase: Phase,
    ) -> Vec<ScoredBlock> {
        let ctx =
            ScoringContext::new(state, recent_events, assignments, self.weights.recency_window);

        let mut scored: Vec<ScoredBlock> = blocks
            .iter()
            .map(|block| ScoredBlock {
                block: block.clone(),
                score: self.breakdown(block, &ctx).total(),
            })
            .collect();

        scored.sort_by(rank_order);

        debug!(
            phase = %phase,
            candidates = scored.len(),
            top_block = scored.first().map(|s| s.block.id.as_str()).unwrap_or("-"),
            "Scored blocks"
        );

        scored
    }

    /// Score a single block, term by term.
    pub fn breakdown(&self, block: &Block, ctx: &ScoringContext<'_>) -> ScoreBreakdown {
        let w = &self.weights;

        let explore_weight = unit(block.explore_weight).unwrap_or(DEFAULT_EXPLORE_WEIGHT);

        let mut breakdown = ScoreBreakdown {
            explore: explore_weight * w.explore_multiplier,
            ..Default::default()
        };

        if has_phase_content(block) {
            breakdown.phase_fit = w.phase_fit;
        }

        if let Some(state) = ctx.state {
            let band = StateBand::from_average(state.average());
            if block.has_day_type(band.day_type()) {
                breakdown.state_alignment = w.state_alignment;
            }

            if let Some(effectiveness) = block.effectiveness_score.and_then(unit) {
                breakdown.effectiveness = effectiveness * w.effectiveness_multiplier;
            }
        }

        if ctx.recently_completed.contains(&block.id.as_str()) {
            breakdown.recency = -w.recency_penalty;
        }

        if ctx.assigned.contains(block.id.as_str()) {
            breakdown.assignment = w.assignment_boost;
        }

        if !block.context_tags.is_empty() {
            breakdown.context_tags = w.context_tags;
        }

        breakdown
    }
}

/// Clamp a 0-1 input. `None` when not a number at all.
fn unit(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

/// Score descending, then catalog order.
fn rank_order(a: &ScoredBlock, b: &ScoredBlock) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.block.sort_order.cmp(&b.block.sort_order))
        .then_with(|| a.block.id.cmp(&b.block.id))
}

/// Score with default weights.
pub fn score_blocks(
    blocks: &[Block],
    state: Option<&StateSnapshot>,
    recent_events: &[Event],
    assignments: &[Assignment],
    phase: Phase,
) -> Vec<ScoredBlock> {
    ScoringEngine::new().score_blocks(blocks, state, recent_events, assignments, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::era::{EraContent, EraDay};
    use crate::types::AssignmentStatus;

    const EPS: f64 = 1e-9;

    fn plain(id: &str) -> Block {
        Block::new(id, format!("Block {id}"))
    }

    fn score_of(scored: &[ScoredBlock], id: &str) -> f64 {
        scored
            .iter()
            .find(|s| s.block.id == id)
            .map(|s| s.score)
            .unwrap()
    }

    #[test]
    fn test_empty_catalog() {
        for phase in Phase::ALL {
            assert!(score_blocks(&[], None, &[], &[], phase).is_empty());
        }
    }

    #[test]
    fn test_explore_weight_difference() {
        let blocks = vec![plain("a").with_explore_weight(1.0), plain("b")];
        let scored = score_blocks(&blocks, None, &[], &[], Phase::Experience);

        assert!((score_of(&scored, "a") - score_of(&scored, "b") - 15.0).abs() < EPS);
        assert_eq!(scored[0].block.id, "a");
    }

    #[test]
    fn test_recency_penalty() {
        let blocks = vec![plain("a"), plain("b")];
        let events = vec![Event::step_done("a")];
        let scored = score_blocks(&blocks, None, &events, &[], Phase::Recognize);

        assert!((score_of(&scored, "b") - score_of(&scored, "a") - 40.0).abs() < EPS);
    }

    #[test]
    fn test_recency_window_counts_only_step_done() {
        let blocks = vec![plain("a"), plain("d")];
        // Newest first; "d" is the fourth step-done event and falls outside
        // the window even though unrelated events are interleaved.
        let events = vec![
            Event::step_done("a"),
            Event::new("era.step.started").with_data("block_id", "x"),
            Event::step_done("b"),
            Event::step_done("c"),
            Event::step_done("d"),
        ];
        let ctx = ScoringContext::new(None, &events, &[], 3);
        assert_eq!(ctx.recently_completed, vec!["a", "b", "c"]);

        let scored = score_blocks(&blocks, None, &events, &[], Phase::Align);
        assert!((score_of(&scored, "d") - score_of(&scored, "a") - 40.0).abs() < EPS);
    }

    #[test]
    fn test_assignment_boost_open_only() {
        let blocks = vec![plain("a"), plain("b"), plain("c")];
        let assignments = vec![
            Assignment::new("a", Phase::Experience, AssignmentStatus::Active),
            Assignment::new("c", Phase::Experience, AssignmentStatus::Completed),
        ];
        let scored = score_blocks(&blocks, None, &[], &assignments, Phase::Experience);

        assert!((score_of(&scored, "a") - score_of(&scored, "b") - 15.0).abs() < EPS);
        assert!((score_of(&scored, "c") - score_of(&scored, "b")).abs() < EPS);
    }

    #[test]
    fn test_has_phase_content_ignores_phase() {
        assert!(!has_phase_content(&plain("a")));
        assert!(!has_phase_content(
            &plain("a").with_era(EraContent::default().with_day(EraDay::FriLens, ""))
        ));

        for day in EraDay::ALL {
            let block = plain("a").with_era(EraContent::default().with_day(day, "x"));
            assert!(has_phase_content(&block), "{:?}", day);
        }

        // A Sunday-only block still fits every phase.
        let block = plain("a").with_era(EraContent::default().with_day(EraDay::SunReflect, "x"));
        for phase in Phase::ALL {
            let scored = score_blocks(std::slice::from_ref(&block), None, &[], &[], phase);
            assert!((scored[0].score - 40.0).abs() < EPS);
        }
    }

    #[test]
    fn test_state_band_boundaries() {
        let blocks = vec![
            plain("c").with_day_type("challenging"),
            plain("s").with_day_type("stable"),
            plain("g").with_day_type("growth"),
        ];
        let engine = ScoringEngine::new();

        let aligned = |avg: f64| -> Vec<String> {
            let state = StateSnapshot::new(avg, avg, avg);
            let ctx = ScoringContext::new(Some(&state), &[], &[], 3);
            blocks
                .iter()
                .filter(|b| engine.breakdown(b, &ctx).state_alignment > 0.0)
                .map(|b| b.id.clone())
                .collect()
        };

        assert_eq!(aligned(4.0), vec!["s"]);
        assert_eq!(aligned(7.0), vec!["s"]);
        assert_eq!(aligned(3.99), vec!["c"]);
        assert_eq!(aligned(7.01), vec!["g"]);
    }

    #[test]
    fn test_effectiveness_independent_of_band() {
        let engine = ScoringEngine::new();
        let block = plain("a").with_effectiveness(0.6);

        for avg in [2.0, 5.0, 9.0] {
            let state = StateSnapshot::new(avg, avg, avg);
            let ctx = ScoringContext::new(Some(&state), &[], &[], 3);
            assert!((engine.breakdown(&block, &ctx).effectiveness - 9.0).abs() < EPS);
        }

        // Without a state the effectiveness term does not apply.
        let ctx = ScoringContext::new(None, &[], &[], 3);
        assert_eq!(engine.breakdown(&block, &ctx).effectiveness, 0.0);
    }

    #[test]
    fn test_end_to_end_score() {
        let block = plain("calm-breath")
            .with_day_type("stable")
            .with_context_tag("calm")
            .with_effectiveness(0.6)
            .with_era(EraContent::default().with_day(EraDay::MonSeed, "x"));
        let state = StateSnapshot::new(5.0, 6.0, 5.0);

        let scored = score_blocks(&[block], Some(&state), &[], &[], Phase::Experience);
        assert!((scored[0].score - 64.0).abs() < EPS);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let blocks = vec![
            plain("z").with_sort_order(2),
            plain("b").with_sort_order(1),
            plain("a").with_sort_order(1),
        ];

        for _ in 0..5 {
            let ids: Vec<_> = score_blocks(&blocks, None, &[], &[], Phase::Align)
                .into_iter()
                .map(|s| s.block.id)
                .collect();
            assert_eq!(ids, vec!["a", "b", "z"]);
        }
    }

    #[test]
    fn test_non_finite_inputs_stay_finite() {
        let blocks = vec![
            plain("a").with_explore_weight(f64::NAN),
            plain("b").with_effectiveness(f64::INFINITY),
        ];
        let state = StateSnapshot::new(f64::NAN, 5.0, 5.0);
        let scored = score_blocks(&blocks, Some(&state), &[], &[], Phase::Experience);

        assert!(scored.iter().all(|s| s.score.is_finite()));
        assert!((score_of(&scored, "a") - 15.0).abs() < EPS);
    }

    #[test]
    fn test_extreme_inputs_are_clamped() {
        let blocks = vec![
            plain("big").with_explore_weight(1e308),
            plain("mixed")
                .with_explore_weight(1e308)
                .with_effectiveness(-1e308),
            plain("neg")
                .with_explore_weight(-1e308)
                .with_effectiveness(1e308),
        ];
        let state = StateSnapshot::new(5.0, 5.0, 5.0);
        let scored = score_blocks(&blocks, Some(&state), &[], &[], Phase::Align);

        assert!(scored.iter().all(|s| s.score.is_finite()));
        assert!((score_of(&scored, "big") - 30.0).abs() < EPS);
        assert!((score_of(&scored, "mixed") - 30.0).abs() < EPS);
        assert!((score_of(&scored, "neg") - 15.0).abs() < EPS);
    }

    #[test]
    fn test_breakdown_matches_total() {
        let block = plain("a")
            .with_day_type("growth")
            .with_context_tag("x")
            .with_effectiveness(0.2);
        let state = StateSnapshot::new(9.0, 9.0, 9.0);
        let events = vec![Event::step_done("a")];
        let assignments = vec![Assignment::new("a", Phase::Align, AssignmentStatus::Pending)];

        let engine = ScoringEngine::new();
        let ctx = ScoringContext::new(Some(&state), &events, &assignments, 3);
        let breakdown = engine.breakdown(&block, &ctx);
        let scored = engine.score_blocks(
            std::slice::from_ref(&block),
            Some(&state),
            &events,
            &assignments,
            Phase::Align,
        );

        assert_eq!(breakdown.recency, -40.0);
        assert_eq!(breakdown.assignment, 15.0);
        assert_eq!(breakdown.state_alignment, 10.0);
        assert!((breakdown.total() - scored[0].score).abs() < EPS);
    }

    #[test]
    fn test_custom_weights() {
        let engine = ScoringEngine::with_weights(ScoringWeights {
            context_tags: 50.0,
            ..Default::default()
        });
        let blocks = vec![plain("a").with_explore_weight(1.0), plain("b").with_context_tag("t")];
        let scored = engine.score_blocks(&blocks, None, &[], &[], Phase::Experience);
        assert_eq!(scored[0].block.id, "b");
    }
}
