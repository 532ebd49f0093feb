//! Property tests for the settlement engine and the interval check.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use xingxing_core::{
    check_medication_interval, settle_completion, undo_completion, DrugId, HabitStage,
    SettleError, SettlementRules, TaskState,
};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn arb_stage() -> impl Strategy<Value = HabitStage> {
    prop_oneof![
        Just(HabitStage::Start),
        Just(HabitStage::Persist),
        Just(HabitStage::Stable),
        Just(HabitStage::Graduated),
    ]
}

/// A task that has not been completed on `today`.
fn arb_task(today: NaiveDate) -> impl Strategy<Value = TaskState> {
    (
        0u32..200,
        prop::option::of(1i64..400),
        arb_stage(),
        0u32..1_000,
        0u32..5_000,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            move |(streak, days_ago, stage, points, total, confirm, confirmed)| TaskState {
                consecutive_days: streak,
                last_completed_date: days_ago.map(|d| today - Duration::days(d)),
                completed_today: false,
                stage,
                points,
                total_completions: total,
                requires_parent_confirm: confirm,
                parent_confirmed: confirmed,
            },
        )
}

fn task_and_day() -> impl Strategy<Value = (TaskState, NaiveDate)> {
    arb_date().prop_flat_map(|today| (arb_task(today), Just(today)))
}

proptest! {
    #[test]
    fn streak_continues_only_after_yesterday((task, today) in task_and_day()) {
        let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
        let yesterday = today.pred_opt().unwrap();
        if task.last_completed_date == Some(yesterday) {
            prop_assert_eq!(s.outcome.new_streak, task.consecutive_days + 1);
        } else {
            prop_assert_eq!(s.outcome.new_streak, 1);
        }
    }

    #[test]
    fn stage_matches_table((task, today) in task_and_day()) {
        let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
        let expected = match s.outcome.new_streak {
            1..=7 => HabitStage::Start,
            8..=21 => HabitStage::Persist,
            22..=65 => HabitStage::Stable,
            _ => HabitStage::Graduated,
        };
        prop_assert_eq!(s.outcome.new_stage, expected);
        prop_assert_eq!(s.task.stage, expected);
        prop_assert_eq!(s.outcome.stage_changed, expected != task.stage);
        prop_assert_eq!(
            s.outcome.graduated,
            expected == HabitStage::Graduated && task.stage != HabitStage::Graduated
        );
    }

    #[test]
    fn earned_points_follow_multiplier((task, today) in task_and_day()) {
        let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
        let multiplier = match s.outcome.new_stage {
            HabitStage::Start => 1.5,
            HabitStage::Persist | HabitStage::Graduated => 1.0,
            HabitStage::Stable => 0.8,
        };
        let expected = (f64::from(task.points) * multiplier + 1e-9).round() as u32;
        prop_assert_eq!(s.outcome.earned_points, expected);
    }

    #[test]
    fn bonus_only_on_milestone_days((task, today) in task_and_day()) {
        let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
        let milestone = matches!(s.outcome.new_streak, 7 | 21 | 66);
        prop_assert_eq!(s.outcome.bonus_points > 0, milestone);
    }

    #[test]
    fn second_settlement_same_day_fails((task, today) in task_and_day()) {
        let rules = SettlementRules::default();
        let first = settle_completion(&task, today, &rules).unwrap();
        let before = first.task.clone();
        prop_assert_eq!(
            settle_completion(&first.task, today, &rules).unwrap_err(),
            SettleError::AlreadyCompleted
        );
        prop_assert_eq!(first.task, before);
    }

    #[test]
    fn undo_inverts_settle((task, today) in task_and_day()) {
        let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
        prop_assert_eq!(s.task.total_completions, task.total_completions + 1);
        let restored = undo_completion(&s.task, &s.previous, today).unwrap();
        prop_assert_eq!(restored, task);
    }

    #[test]
    fn interval_check_is_consistent(minutes_ago in 0i64..3_000, seconds in 0i64..60) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let last = now - Duration::minutes(minutes_ago) - Duration::seconds(seconds);
        let check = check_medication_interval(Some(last), DrugId::Ibuprofen, now);
        let elapsed_secs = minutes_ago * 60 + seconds;
        prop_assert_eq!(check.safe, elapsed_secs >= 360 * 60);
        if check.safe {
            prop_assert_eq!(check.minutes_remaining, 0);
        } else {
            let remaining_secs = 360 * 60 - elapsed_secs;
            prop_assert_eq!(i64::from(check.minutes_remaining), (remaining_secs + 59) / 60);
        }
    }

    #[test]
    fn interval_wait_never_exceeds_interval(offset_secs in -200_000i64..200_000) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let last = now + Duration::seconds(offset_secs);
        for drug in DrugId::ALL {
            let check = check_medication_interval(Some(last), drug, now);
            let interval = drug.info().min_interval_minutes.unwrap_or(0);
            prop_assert!(check.minutes_remaining <= interval);
            prop_assert_eq!(check.safe, check.minutes_remaining == 0);
        }
    }
}

#[test]
fn day_seven_scenario() {
    let today = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
    let task = TaskState {
        consecutive_days: 6,
        last_completed_date: today.pred_opt(),
        completed_today: false,
        stage: HabitStage::Start,
        points: 10,
        total_completions: 6,
        requires_parent_confirm: false,
        parent_confirmed: false,
    };
    let s = settle_completion(&task, today, &SettlementRules::default()).unwrap();
    assert_eq!(s.outcome.new_streak, 7);
    assert_eq!(s.outcome.new_stage, HabitStage::Start);
    assert_eq!(s.outcome.earned_points, 15);
    assert!(s.outcome.bonus_points > 0);
    assert!(!s.outcome.stage_changed);
}

#[test]
fn interval_examples() {
    let now = Utc.with_ymd_and_hms(2024, 9, 10, 20, 0, 0).unwrap();
    let ok = check_medication_interval(
        Some(now - Duration::hours(6) - Duration::minutes(1)),
        DrugId::Ibuprofen,
        now,
    );
    assert!(ok.safe);
    assert_eq!(ok.minutes_remaining, 0);

    let early = check_medication_interval(Some(now - Duration::hours(3)), DrugId::Ibuprofen, now);
    assert!(!early.safe);
    assert_eq!(early.minutes_remaining, 180);
}
