//! ERA phases and weekday guidance.
//!
//! A block carries up to seven pieces of weekday guidance (`mon_seed` through
//! `sun_reflect`). Each weekday belongs to one of the ERA phases, except
//! Sunday which is the integration day.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::types::ValidationError;

/// ERA phase a recommendation is framed for.
///
/// The phase changes presentation only; it never filters which blocks are
/// eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Experience,
    Recognize,
    Align,
}

impl Phase {
    /// All phases in journey order.
    pub const ALL: [Phase; 3] = [Phase::Experience, Phase::Recognize, Phase::Align];

    /// Wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::Recognize => "recognize",
            Self::Align => "align",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    /// Parses the exact lowercase wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "experience" => Ok(Self::Experience),
            "recognize" => Ok(Self::Recognize),
            "align" => Ok(Self::Align),
            other => Err(ValidationError::InvalidPhase(other.to_string())),
        }
    }
}

/// One of the seven weekday slots of a block's ERA guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EraDay {
    MonSeed,
    TueEmbody,
    WedRoot,
    ThuAdapt,
    FriLens,
    SatIntegrate,
    SunReflect,
}

impl EraDay {
    /// Weekday order, Monday first.
    pub const ALL: [EraDay; 7] = [
        EraDay::MonSeed,
        EraDay::TueEmbody,
        EraDay::WedRoot,
        EraDay::ThuAdapt,
        EraDay::FriLens,
        EraDay::SatIntegrate,
        EraDay::SunReflect,
    ];

    /// Day for a zero-based weekday index (0 = Monday).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Field name used in stored block records.
    pub fn key(&self) -> &'static str {
        match self {
            Self::MonSeed => "mon_seed",
            Self::TueEmbody => "tue_embody",
            Self::WedRoot => "wed_root",
            Self::ThuAdapt => "thu_adapt",
            Self::FriLens => "fri_lens",
            Self::SatIntegrate => "sat_integrate",
            Self::SunReflect => "sun_reflect",
        }
    }

    /// Human-readable label, e.g. "Monday: Seed".
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MonSeed => "Monday: Seed",
            Self::TueEmbody => "Tuesday: Embody",
            Self::WedRoot => "Wednesday: Root",
            Self::ThuAdapt => "Thursday: Adapt",
            Self::FriLens => "Friday: Lens",
            Self::SatIntegrate => "Saturday: Integrate",
            Self::SunReflect => "Sunday: Reflect",
        }
    }

    /// Phase this day frames, or `None` for the Sunday integration day.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::MonSeed | Self::TueEmbody => Some(Phase::Experience),
            Self::WedRoot | Self::ThuAdapt => Some(Phase::Recognize),
            Self::FriLens | Self::SatIntegrate => Some(Phase::Align),
            Self::SunReflect => None,
        }
    }
}

/// Per-weekday guidance text for a block.
///
/// An empty string is treated the same as a missing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EraContent {
    #[serde(default)]
    pub mon_seed: Option<String>,
    #[serde(default)]
    pub tue_embody: Option<String>,
    #[serde(default)]
    pub wed_root: Option<String>,
    #[serde(default)]
    pub thu_adapt: Option<String>,
    #[serde(default)]
    pub fri_lens: Option<String>,
    #[serde(default)]
    pub sat_integrate: Option<String>,
    #[serde(default)]
    pub sun_reflect: Option<String>,
}

impl EraContent {
    /// Guidance for a day, if present and non-empty.
    pub fn get(&self, day: EraDay) -> Option<&str> {
        let slot = match day {
            EraDay::MonSeed => &self.mon_seed,
            EraDay::TueEmbody => &self.tue_embody,
            EraDay::WedRoot => &self.wed_root,
            EraDay::ThuAdapt => &self.thu_adapt,
            EraDay::FriLens => &self.fri_lens,
            EraDay::SatIntegrate => &self.sat_integrate,
            EraDay::SunReflect => &self.sun_reflect,
        };
        slot.as_deref().filter(|text| !text.is_empty())
    }

    /// Set guidance for a day.
    pub fn with_day(mut self, day: EraDay, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match day {
            EraDay::MonSeed => self.mon_seed = text,
            EraDay::TueEmbody => self.tue_embody = text,
            EraDay::WedRoot => self.wed_root = text,
            EraDay::ThuAdapt => self.thu_adapt = text,
            EraDay::FriLens => self.fri_lens = text,
            EraDay::SatIntegrate => self.sat_integrate = text,
            EraDay::SunReflect => self.sun_reflect = text,
        }
        self
    }

    /// Whether any weekday carries guidance.
    pub fn has_any(&self) -> bool {
        EraDay::ALL.iter().any(|day| self.get(*day).is_some())
    }

    /// Days with guidance that frame the given phase.
    ///
    /// Informational only; scoring does not consult it.
    pub fn days_for_phase(&self, phase: Phase) -> Vec<EraDay> {
        EraDay::ALL
            .iter()
            .copied()
            .filter(|day| day.phase() == Some(phase) && self.get(*day).is_some())
            .collect()
    }
}
