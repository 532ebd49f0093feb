//! Habit settlement engine.
//!
//! Turns a "complete task" event into a new [`TaskState`] plus a point award,
//! and reverses the most recent completion for "undo". Everything here is a
//! pure function of its inputs: no clock, no storage, no globals. Callers own
//! persistence and must keep the pre-completion snapshot if they want undo.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::stage::{HabitStage, GRADUATION_DAY, PERSIST_LAST_DAY, START_LAST_DAY};
use crate::error::{ConfirmError, SettleError};

/// Settlement-relevant subset of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub consecutive_days: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub completed_today: bool,
    pub stage: HabitStage,
    /// Base points configured by a parent.
    pub points: u32,
    pub total_completions: u32,
    #[serde(default)]
    pub requires_parent_confirm: bool,
    #[serde(default)]
    pub parent_confirmed: bool,
}

impl TaskState {
    /// State of a freshly created task.
    pub fn new(points: u32) -> Self {
        Self {
            consecutive_days: 0,
            last_completed_date: None,
            completed_today: false,
            stage: HabitStage::Start,
            points,
            total_completions: 0,
            requires_parent_confirm: false,
            parent_confirmed: false,
        }
    }

    pub fn with_parent_confirm(mut self, required: bool) -> Self {
        self.requires_parent_confirm = required;
        self
    }

    /// Whether a settlement already happened on `today`.
    ///
    /// The cached flag and the stored date are both honoured, so a stale
    /// flag can only block completion until [`refresh_daily_status`] runs.
    pub fn is_completed_on(&self, today: NaiveDate) -> bool {
        self.completed_today || self.last_completed_date == Some(today)
    }
}

/// One streak milestone and the bonus it pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub day: u32,
    pub bonus: u32,
    /// Also fire on every multiple of `day`.
    #[serde(default)]
    pub repeat: bool,
}

impl Milestone {
    pub const fn once(day: u32, bonus: u32) -> Self {
        Self {
            day,
            bonus,
            repeat: false,
        }
    }

    pub const fn every(day: u32, bonus: u32) -> Self {
        Self {
            day,
            bonus,
            repeat: true,
        }
    }

    fn matches(&self, streak: u32) -> bool {
        match self.day {
            0 => false,
            day if self.repeat => streak % day == 0,
            day => streak == day,
        }
    }
}

/// Milestone bonus table. The first matching milestone wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRules {
    pub milestones: Vec<Milestone>,
}

impl Default for SettlementRules {
    fn default() -> Self {
        Self {
            milestones: vec![
                Milestone::once(START_LAST_DAY, 20),
                Milestone::once(PERSIST_LAST_DAY, 20),
                Milestone::once(GRADUATION_DAY, 20),
            ],
        }
    }
}

impl SettlementRules {
    /// Bonus for reaching `streak`; zero unless a milestone matches.
    pub fn bonus_for(&self, streak: u32) -> u32 {
        self.milestones
            .iter()
            .find(|m| m.matches(streak))
            .map_or(0, |m| m.bonus)
    }
}

/// What a settlement did, for the caller to persist and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub new_streak: u32,
    pub new_stage: HabitStage,
    pub stage_changed: bool,
    pub earned_points: u32,
    pub bonus_points: u32,
    /// True only on the transition into `Graduated`.
    pub graduated: bool,
    /// Points must not be applied until a parent confirms.
    pub awaiting_confirm: bool,
}

impl SettlementOutcome {
    pub fn total_points(&self) -> u32 {
        self.earned_points.saturating_add(self.bonus_points)
    }
}

/// Result of [`settle_completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Snapshot to hand back to [`undo_completion`].
    pub previous: TaskState,
    pub task: TaskState,
    pub outcome: SettlementOutcome,
}

/// Settle a completion of `task` on `today`.
///
/// # Errors
/// [`SettleError::AlreadyCompleted`] if the task was already settled today.
pub fn settle_completion(
    task: &TaskState,
    today: NaiveDate,
    rules: &SettlementRules,
) -> Result<Settlement, SettleError> {
    if task.is_completed_on(today) {
        return Err(SettleError::AlreadyCompleted);
    }

    let continues = task
        .last_completed_date
        .and_then(|last| last.succ_opt())
        .is_some_and(|next| next == today);
    let new_streak = if continues {
        task.consecutive_days.saturating_add(1)
    } else {
        1
    };

    let new_stage = HabitStage::for_streak(new_streak);
    let stage_changed = new_stage != task.stage;
    let outcome = SettlementOutcome {
        new_streak,
        new_stage,
        stage_changed,
        earned_points: new_stage.apply_multiplier(task.points),
        bonus_points: rules.bonus_for(new_streak),
        graduated: stage_changed && new_stage == HabitStage::Graduated,
        awaiting_confirm: task.requires_parent_confirm,
    };

    let mut next = task.clone();
    next.consecutive_days = new_streak;
    next.last_completed_date = Some(today);
    next.completed_today = true;
    next.stage = new_stage;
    next.total_completions = task.total_completions.saturating_add(1);
    if task.requires_parent_confirm {
        next.parent_confirmed = false;
    }

    tracing::debug!(
        streak = new_streak,
        stage = %new_stage,
        earned = outcome.earned_points,
        bonus = outcome.bonus_points,
        awaiting_confirm = outcome.awaiting_confirm,
        "settled completion"
    );

    Ok(Settlement {
        previous: task.clone(),
        task: next,
        outcome,
    })
}

/// Reverse the most recent completion, restoring `previous`.
///
/// `previous` must be the snapshot returned by the settlement being undone.
///
/// # Errors
/// [`SettleError::NothingToUndo`] if `current` was not completed today or
/// `previous` is not its immediate predecessor.
pub fn undo_completion(
    current: &TaskState,
    previous: &TaskState,
    today: NaiveDate,
) -> Result<TaskState, SettleError> {
    if !current.completed_today || current.last_completed_date != Some(today) {
        return Err(SettleError::NothingToUndo);
    }
    if previous.total_completions.checked_add(1) != Some(current.total_completions) {
        return Err(SettleError::NothingToUndo);
    }

    let mut restored = previous.clone();
    restored.completed_today = false;
    // Edits made after the completion (e.g. a parent changing points) survive.
    restored.points = current.points;
    restored.requires_parent_confirm = current.requires_parent_confirm;

    tracing::debug!(
        streak = restored.consecutive_days,
        stage = %restored.stage,
        "undid completion"
    );
    Ok(restored)
}

/// Record a parent's confirmation of today's completion.
///
/// # Errors
/// See [`ConfirmError`].
pub fn confirm_completion(task: &TaskState, today: NaiveDate) -> Result<TaskState, ConfirmError> {
    if !task.requires_parent_confirm {
        return Err(ConfirmError::NotRequired);
    }
    if !task.completed_today || task.last_completed_date != Some(today) {
        return Err(ConfirmError::NotCompleted);
    }
    if task.parent_confirmed {
        return Err(ConfirmError::AlreadyConfirmed);
    }
    let mut next = task.clone();
    next.parent_confirmed = true;
    Ok(next)
}

/// Re-derive the cached `completed_today` flag for a new calendar day.
pub fn refresh_daily_status(task: &TaskState, today: NaiveDate) -> TaskState {
    let mut next = task.clone();
    next.completed_today = task.last_completed_date == Some(today);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn task_with_streak(streak: u32, last: Option<NaiveDate>, points: u32) -> TaskState {
        TaskState {
            consecutive_days: streak,
            last_completed_date: last,
            completed_today: false,
            stage: HabitStage::for_streak(streak),
            points,
            total_completions: streak,
            requires_parent_confirm: false,
            parent_confirmed: false,
        }
    }

    #[test]
    fn first_completion_starts_streak() {
        let task = TaskState::new(10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_streak, 1);
        assert_eq!(s.outcome.new_stage, HabitStage::Start);
        assert!(!s.outcome.stage_changed);
        assert_eq!(s.outcome.earned_points, 15);
        assert_eq!(s.outcome.bonus_points, 0);
        assert_eq!(s.task.total_completions, 1);
        assert_eq!(s.task.last_completed_date, Some(day(10)));
        assert!(s.task.completed_today);
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let task = task_with_streak(3, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_streak, 4);
    }

    #[test]
    fn gap_resets_streak_to_one() {
        let task = task_with_streak(12, Some(day(8)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_streak, 1);
        assert_eq!(s.outcome.new_stage, HabitStage::Start);
        assert!(s.outcome.stage_changed);
        assert!(!s.outcome.graduated);
    }

    #[test]
    fn future_last_date_resets_streak() {
        let task = task_with_streak(5, Some(day(20)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_streak, 1);
    }

    #[test]
    fn day_seven_pays_week_bonus_without_stage_change() {
        let task = task_with_streak(6, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_streak, 7);
        assert_eq!(s.outcome.new_stage, HabitStage::Start);
        assert_eq!(s.outcome.earned_points, 15);
        assert_eq!(s.outcome.bonus_points, 20);
        assert!(!s.outcome.stage_changed);
        assert_eq!(s.outcome.total_points(), 35);
    }

    #[test]
    fn day_eight_moves_to_persist() {
        let task = task_with_streak(7, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.outcome.new_stage, HabitStage::Persist);
        assert!(s.outcome.stage_changed);
        assert_eq!(s.outcome.earned_points, 10);
        assert_eq!(s.outcome.bonus_points, 0);
    }

    #[test]
    fn day_sixty_six_graduates_once() {
        let rules = SettlementRules {
            milestones: vec![Milestone::once(66, 100)],
        };
        let task = task_with_streak(65, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &rules).unwrap();
        assert_eq!(s.outcome.new_stage, HabitStage::Graduated);
        assert!(s.outcome.graduated);
        assert_eq!(s.outcome.earned_points, 10);
        assert_eq!(s.outcome.bonus_points, 100);

        let mut next = s.task.clone();
        next.completed_today = false;
        let s2 = settle_completion(&next, day(11), &rules).unwrap();
        assert_eq!(s2.outcome.new_streak, 67);
        assert!(!s2.outcome.graduated);
        assert!(!s2.outcome.stage_changed);
        assert_eq!(s2.outcome.bonus_points, 0);
    }

    #[test]
    fn bonus_only_on_milestones() {
        let rules = SettlementRules {
            milestones: vec![Milestone::once(7, 1), Milestone::once(21, 2), Milestone::once(66, 3)],
        };
        assert_eq!(rules.bonus_for(7), 1);
        assert_eq!(rules.bonus_for(21), 2);
        assert_eq!(rules.bonus_for(66), 3);
        for streak in [1, 3, 6, 8, 14, 22, 28, 65, 67, 70] {
            assert_eq!(rules.bonus_for(streak), 0, "streak {streak}");
        }
        assert_eq!(SettlementRules::default().bonus_for(21), 20);
    }

    #[test]
    fn repeating_schedule_with_day_three_bonus() {
        let rules = SettlementRules {
            milestones: vec![Milestone::once(3, 5), Milestone::every(7, 20)],
        };
        assert_eq!(rules.bonus_for(3), 5);
        for streak in [7, 14, 21, 28, 63, 70] {
            assert_eq!(rules.bonus_for(streak), 20, "streak {streak}");
        }
        for streak in [1, 2, 4, 6, 8, 13, 22] {
            assert_eq!(rules.bonus_for(streak), 0, "streak {streak}");
        }

        let task = task_with_streak(13, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &rules).unwrap();
        assert_eq!(s.outcome.new_streak, 14);
        assert_eq!(s.outcome.bonus_points, 20);
    }

    #[test]
    fn first_matching_milestone_wins_and_zero_day_never_fires() {
        let rules = SettlementRules {
            milestones: vec![Milestone::once(14, 50), Milestone::every(7, 20), Milestone::every(0, 99)],
        };
        assert_eq!(rules.bonus_for(14), 50);
        assert_eq!(rules.bonus_for(21), 20);
        assert_eq!(rules.bonus_for(5), 0);
        assert_eq!(SettlementRules { milestones: vec![] }.bonus_for(7), 0);
    }

    #[test]
    fn same_day_repeat_is_rejected() {
        let task = TaskState::new(10);
        let rules = SettlementRules::default();
        let first = settle_completion(&task, day(10), &rules).unwrap();
        let err = settle_completion(&first.task, day(10), &rules).unwrap_err();
        assert_eq!(err, SettleError::AlreadyCompleted);
    }

    #[test]
    fn stale_date_without_flag_still_blocks_repeat() {
        let mut task = task_with_streak(2, Some(day(10)), 10);
        task.completed_today = false;
        let err = settle_completion(&task, day(10), &SettlementRules::default()).unwrap_err();
        assert_eq!(err, SettleError::AlreadyCompleted);
    }

    #[test]
    fn parent_confirm_defers_award() {
        let mut task = TaskState::new(10).with_parent_confirm(true);
        task.parent_confirmed = true;
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert!(s.outcome.awaiting_confirm);
        assert_eq!(s.outcome.earned_points, 15);
        assert!(!s.task.parent_confirmed);
    }

    #[test]
    fn undo_restores_previous_snapshot() {
        let task = task_with_streak(21, Some(day(9)), 10);
        let s = settle_completion(&task, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(s.task.stage, HabitStage::Stable);
        let restored = undo_completion(&s.task, &s.previous, day(10)).unwrap();
        assert_eq!(restored, task);
    }

    #[test]
    fn undo_without_completion_fails() {
        let task = task_with_streak(3, Some(day(9)), 10);
        assert_eq!(
            undo_completion(&task, &task, day(10)).unwrap_err(),
            SettleError::NothingToUndo
        );
    }

    #[test]
    fn undo_rejects_stale_snapshot() {
        let rules = SettlementRules::default();
        let first = settle_completion(&TaskState::new(10), day(9), &rules).unwrap();
        let mut after_first = first.task.clone();
        after_first.completed_today = false;
        let second = settle_completion(&after_first, day(10), &rules).unwrap();
        assert_eq!(
            undo_completion(&second.task, &first.previous, day(10)).unwrap_err(),
            SettleError::NothingToUndo
        );
    }

    #[test]
    fn undo_on_later_day_fails() {
        let s = settle_completion(&TaskState::new(10), day(9), &SettlementRules::default()).unwrap();
        assert_eq!(
            undo_completion(&s.task, &s.previous, day(10)).unwrap_err(),
            SettleError::NothingToUndo
        );
    }

    #[test]
    fn confirm_flow() {
        let rules = SettlementRules::default();
        let task = TaskState::new(10).with_parent_confirm(true);
        assert_eq!(
            confirm_completion(&task, day(10)).unwrap_err(),
            ConfirmError::NotCompleted
        );
        let s = settle_completion(&task, day(10), &rules).unwrap();
        let confirmed = confirm_completion(&s.task, day(10)).unwrap();
        assert!(confirmed.parent_confirmed);
        assert_eq!(
            confirm_completion(&confirmed, day(10)).unwrap_err(),
            ConfirmError::AlreadyConfirmed
        );

        let plain = settle_completion(&TaskState::new(10), day(10), &rules).unwrap();
        assert_eq!(
            confirm_completion(&plain.task, day(10)).unwrap_err(),
            ConfirmError::NotRequired
        );
    }

    #[test]
    fn refresh_clears_yesterdays_flag() {
        let s = settle_completion(&TaskState::new(10), day(9), &SettlementRules::default()).unwrap();
        assert!(refresh_daily_status(&s.task, day(9)).completed_today);
        let refreshed = refresh_daily_status(&s.task, day(10));
        assert!(!refreshed.completed_today);
        let next = settle_completion(&refreshed, day(10), &SettlementRules::default()).unwrap();
        assert_eq!(next.outcome.new_streak, 2);
    }
}
