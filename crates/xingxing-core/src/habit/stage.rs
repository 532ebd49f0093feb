//! Habit maturity stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Last streak day that still counts as [`HabitStage::Start`].
pub const START_LAST_DAY: u32 = 7;
/// Last streak day that still counts as [`HabitStage::Persist`].
pub const PERSIST_LAST_DAY: u32 = 21;
/// First streak day of [`HabitStage::Graduated`].
pub const GRADUATION_DAY: u32 = 66;

/// Habit maturity bucket derived from the consecutive-day streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitStage {
    #[default]
    Start,
    Persist,
    Stable,
    Graduated,
}

impl HabitStage {
    /// Stage for a streak length: 1-7 start, 8-21 persist, 22-65 stable, 66+ graduated.
    ///
    /// A zero streak only exists on freshly created tasks and maps to `Start`.
    pub fn for_streak(consecutive_days: u32) -> Self {
        match consecutive_days {
            0..=START_LAST_DAY => HabitStage::Start,
            8..=PERSIST_LAST_DAY => HabitStage::Persist,
            22..=65 => HabitStage::Stable,
            _ => HabitStage::Graduated,
        }
    }

    /// Point multiplier in tenths (15 = 1.5x).
    pub fn multiplier_tenths(self) -> u32 {
        match self {
            HabitStage::Start => 15,
            HabitStage::Persist => 10,
            HabitStage::Stable => 8,
            HabitStage::Graduated => 10,
        }
    }

    /// `round(points * multiplier)`, half rounded up.
    pub fn apply_multiplier(self, points: u32) -> u32 {
        let scaled = u64::from(points) * u64::from(self.multiplier_tenths());
        u32::try_from((scaled + 5) / 10).unwrap_or(u32::MAX)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HabitStage::Start => "start",
            HabitStage::Persist => "persist",
            HabitStage::Stable => "stable",
            HabitStage::Graduated => "graduated",
        }
    }
}

impl fmt::Display for HabitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(HabitStage::Start),
            "persist" => Ok(HabitStage::Persist),
            "stable" => Ok(HabitStage::Stable),
            "graduated" => Ok(HabitStage::Graduated),
            other => Err(ValidationError::invalid("stage", format!("unknown stage '{other}'"))),
        }
    }
}
