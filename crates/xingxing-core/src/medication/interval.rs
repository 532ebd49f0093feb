use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DrugId;

/// Advisory result of a re-dose check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCheck {
    pub safe: bool,
    pub minutes_remaining: u32,
}

impl IntervalCheck {
    const SAFE: IntervalCheck = IntervalCheck {
        safe: true,
        minutes_remaining: 0,
    };
}

/// Compare the time since `last_dose` with the drug's minimum interval.
///
/// Never fails and never blocks: an unsafe result is a warning for the UI.
/// Remaining time is rounded up to whole minutes. A last dose later than
/// `now` counts as just given, so the wait never exceeds the interval.
pub fn check_medication_interval(
    last_dose: Option<DateTime<Utc>>,
    drug: DrugId,
    now: DateTime<Utc>,
) -> IntervalCheck {
    let (Some(last), Some(interval)) = (last_dose, drug.info().min_interval_minutes) else {
        return IntervalCheck::SAFE;
    };

    let elapsed_secs = (now - last).num_seconds().max(0);
    let remaining_secs = i64::from(interval) * 60 - elapsed_secs;
    if remaining_secs <= 0 {
        return IntervalCheck::SAFE;
    }

    let minutes = (remaining_secs + 59) / 60;
    let check = IntervalCheck {
        safe: false,
        minutes_remaining: u32::try_from(minutes).unwrap_or(interval),
    };
    tracing::warn!(drug = %drug, minutes_remaining = check.minutes_remaining, "dose interval not yet elapsed");
    check
}
