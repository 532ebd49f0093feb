//! Habit tracker: drives the settlement engine against [`HabitDb`].
//!
//! Each operation reads the current task, runs the pure engine, and writes
//! the result (new state, undo snapshot, point log) in one immediate
//! transaction, so a concurrent writer cannot land between read and write.
//!
//! ## Usage
//! ```rust,ignore
//! let config = Config::load()?;
//! let db = HabitDb::open()?;
//! let tracker = HabitTracker::new(&db, config.settlement_rules());
//! let receipt = tracker.complete_task(&task_id, today)?;
//! println!("+{} points", receipt.outcome.total_points());
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ConfirmError, CoreError, Result, SettleError, ValidationError};
use crate::habit::{
    self, NewTask, Operator, PointLog, PointLogKind, SettlementOutcome, SettlementRules, Task,
    TaskState,
};
use crate::medication::{check_medication_interval, DrugId, IntervalCheck, MedicationRecord};
use crate::storage::habit_db::TaskSnapshot;
use crate::storage::HabitDb;

/// Result of a completion or confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReceipt {
    pub task: Task,
    pub outcome: SettlementOutcome,
    /// `None` while the award waits for parent confirmation.
    pub point_log: Option<PointLog>,
    pub balance: i64,
}

/// Result of recording a dose: the record plus the advisory check made
/// against the previous dose.
#[derive(Debug, Clone, Serialize)]
pub struct DoseReceipt {
    pub record: MedicationRecord,
    pub interval: IntervalCheck,
}

pub struct HabitTracker<'a> {
    db: &'a HabitDb,
    rules: SettlementRules,
}

fn task_not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        kind: "task",
        id: id.to_string(),
    }
}

fn completion_reason(task: &Task, outcome: &SettlementOutcome) -> String {
    if outcome.bonus_points > 0 {
        format!(
            "Completed task: {} (day {} streak bonus +{})",
            task.name, outcome.new_streak, outcome.bonus_points
        )
    } else {
        format!("Completed task: {}", task.name)
    }
}

impl<'a> HabitTracker<'a> {
    pub fn new(db: &'a HabitDb, rules: SettlementRules) -> Self {
        Self { db, rules }
    }

    fn build_task(input: NewTask) -> Task {
        Task {
            id: Uuid::new_v4().to_string(),
            child_id: input.child_id,
            name: input.name,
            category: input.category,
            frequency: input.frequency,
            icon: input.icon,
            description: input.description,
            is_active: true,
            state: TaskState::new(input.points).with_parent_confirm(input.requires_parent_confirm),
            created_at: Utc::now(),
        }
    }

    /// Create a task in its initial state.
    ///
    /// # Errors
    /// Validation errors for empty names, or database errors.
    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        input.validate()?;
        let task = Self::build_task(input);
        self.db.insert_task(&task)?;
        tracing::info!(task_id = %task.id, child_id = %task.child_id, "created task");
        Ok(task)
    }

    /// Create several tasks atomically, e.g. from templates.
    ///
    /// # Errors
    /// If any input fails validation nothing is written.
    pub fn create_tasks(&self, inputs: Vec<NewTask>) -> Result<Vec<Task>> {
        if inputs.is_empty() {
            return Err(ValidationError::invalid("tasks", "at least one task is required").into());
        }
        self.db.transaction(|db| {
            let mut created = Vec::with_capacity(inputs.len());
            for input in inputs {
                input.validate()?;
                let task = Self::build_task(input);
                db.insert_task(&task)?;
                created.push(task);
            }
            tracing::info!(count = created.len(), "imported tasks");
            Ok(created)
        })
    }

    /// Load a task with `completed_today` re-derived for `today`.
    fn load_task(&self, id: &str, today: NaiveDate) -> Result<Task> {
        let mut task = self.db.get_task(id)?.ok_or_else(|| task_not_found(id))?;
        task.state = habit::refresh_daily_status(&task.state, today);
        Ok(task)
    }

    /// Complete a task for `today` and apply the award unless it awaits confirmation.
    ///
    /// # Errors
    /// [`SettleError::AlreadyCompleted`] (recoverable), not-found, inactive
    /// task, or database errors. Nothing is written on error.
    pub fn complete_task(&self, task_id: &str, today: NaiveDate) -> Result<CompletionReceipt> {
        self.db.transaction(|db| {
            let task = self.load_task(task_id, today)?;
            if !task.is_active {
                return Err(ValidationError::invalid("task", "task is inactive").into());
            }
            let settlement = habit::settle_completion(&task.state, today, &self.rules)?;

            let point_log = if settlement.outcome.awaiting_confirm {
                None
            } else {
                let log = PointLog {
                    id: Uuid::new_v4().to_string(),
                    child_id: task.child_id.clone(),
                    task_id: Some(task.id.clone()),
                    kind: PointLogKind::Earn,
                    points: i64::from(settlement.outcome.total_points()),
                    reason: completion_reason(&task, &settlement.outcome),
                    operator: Operator::Child,
                    created_at: Utc::now(),
                };
                db.insert_point_log(&log)?;
                Some(log)
            };

            db.update_task_state(&task.id, &settlement.task)?;
            db.save_snapshot(&TaskSnapshot {
                task_id: task.id.clone(),
                state: settlement.previous.clone(),
                taken_on: today,
                point_log_id: point_log.as_ref().map(|l| l.id.clone()),
            })?;

            let balance = db.balance(&task.child_id)?;
            tracing::info!(
                task_id = %task.id,
                streak = settlement.outcome.new_streak,
                points = settlement.outcome.total_points(),
                awaiting_confirm = settlement.outcome.awaiting_confirm,
                "completed task"
            );
            Ok(CompletionReceipt {
                task: Task {
                    state: settlement.task,
                    ..task
                },
                outcome: settlement.outcome,
                point_log,
                balance,
            })
        })
    }

    /// Undo today's completion, removing any points it awarded.
    ///
    /// # Errors
    /// [`SettleError::NothingToUndo`] (recoverable), not-found, or database errors.
    pub fn undo_completion(&self, task_id: &str, today: NaiveDate) -> Result<Task> {
        self.db.transaction(|db| {
            let task = self.load_task(task_id, today)?;
            let snapshot = db
                .load_snapshot(task_id)?
                .filter(|s| s.taken_on == today)
                .ok_or(SettleError::NothingToUndo)?;
            let restored = habit::undo_completion(&task.state, &snapshot.state, today)?;

            if let Some(log_id) = &snapshot.point_log_id {
                db.delete_point_log(log_id)?;
            }
            db.update_task_state(task_id, &restored)?;
            db.clear_snapshot(task_id)?;

            tracing::info!(task_id = %task_id, streak = restored.consecutive_days, "undid completion");
            Ok(Task {
                state: restored,
                ..task
            })
        })
    }

    /// Confirm a completion that was waiting for a parent and apply its award.
    ///
    /// # Errors
    /// [`ConfirmError`] (recoverable), not-found, or database errors.
    pub fn confirm_completion(&self, task_id: &str, today: NaiveDate) -> Result<CompletionReceipt> {
        self.db.transaction(|db| {
            let task = self.load_task(task_id, today)?;
            let confirmed = habit::confirm_completion(&task.state, today)?;
            let mut snapshot = db
                .load_snapshot(task_id)?
                .filter(|s| s.taken_on == today)
                .ok_or(ConfirmError::NotCompleted)?;

            // Replaying the settlement from the snapshot reproduces the deferred award.
            let mut outcome = habit::settle_completion(&snapshot.state, today, &self.rules)?.outcome;
            outcome.awaiting_confirm = false;

            let log = PointLog {
                id: Uuid::new_v4().to_string(),
                child_id: task.child_id.clone(),
                task_id: Some(task.id.clone()),
                kind: PointLogKind::Earn,
                points: i64::from(outcome.total_points()),
                reason: format!("Parent confirmed: {}", completion_reason(&task, &outcome)),
                operator: Operator::Parent,
                created_at: Utc::now(),
            };
            db.insert_point_log(&log)?;
            db.update_task_state(task_id, &confirmed)?;
            snapshot.point_log_id = Some(log.id.clone());
            db.save_snapshot(&snapshot)?;

            let balance = db.balance(&task.child_id)?;
            tracing::info!(task_id = %task_id, points = log.points, "confirmed completion");
            Ok(CompletionReceipt {
                task: Task {
                    state: confirmed,
                    ..task
                },
                outcome,
                point_log: Some(log),
                balance,
            })
        })
    }

    /// Re-derive `completed_today` for every task. Returns how many changed.
    ///
    /// # Errors
    /// Database errors.
    pub fn refresh_daily_status(&self, today: NaiveDate) -> Result<usize> {
        self.db.transaction(|db| {
            let mut changed = 0;
            for task in db.list_tasks(None)? {
                let refreshed = habit::refresh_daily_status(&task.state, today);
                if refreshed != task.state {
                    db.update_task_state(&task.id, &refreshed)?;
                    changed += 1;
                }
            }
            tracing::debug!(changed, %today, "refreshed daily status");
            Ok(changed)
        })
    }

    /// Deactivate or reactivate a task without touching its streak.
    ///
    /// # Errors
    /// Not-found or database errors.
    pub fn set_active(&self, task_id: &str, active: bool) -> Result<()> {
        if !self.db.set_task_active(task_id, active)? {
            return Err(task_not_found(task_id));
        }
        Ok(())
    }

    /// Delete a task together with its point logs and snapshot.
    ///
    /// # Errors
    /// Not-found or database errors.
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        if !self.db.delete_task(task_id)? {
            return Err(task_not_found(task_id));
        }
        tracing::info!(task_id = %task_id, "deleted task");
        Ok(())
    }

    /// Manual parent adjustment of a child's balance.
    ///
    /// # Errors
    /// Validation error for a zero delta, or database errors.
    pub fn adjust_points(&self, child_id: &str, delta: i64, reason: &str) -> Result<PointLog> {
        if delta == 0 {
            return Err(ValidationError::invalid("points", "adjustment must be non-zero").into());
        }
        let log = PointLog {
            id: Uuid::new_v4().to_string(),
            child_id: child_id.to_string(),
            task_id: None,
            kind: PointLogKind::Adjust,
            points: delta,
            reason: reason.to_string(),
            operator: Operator::Parent,
            created_at: Utc::now(),
        };
        self.db.insert_point_log(&log)?;
        tracing::info!(child_id = %child_id, delta, "adjusted points");
        Ok(log)
    }

    /// Spend points from a child's balance, e.g. on a reward.
    ///
    /// # Errors
    /// Validation error for a zero amount or an overdrawn balance, or
    /// database errors.
    pub fn spend_points(&self, child_id: &str, amount: u32, reason: &str) -> Result<PointLog> {
        if amount == 0 {
            return Err(ValidationError::invalid("points", "amount must be positive").into());
        }
        self.db.transaction(|db| {
            let balance = db.balance(child_id)?;
            if balance < i64::from(amount) {
                return Err(ValidationError::InsufficientPoints {
                    balance,
                    requested: amount,
                }
                .into());
            }
            let log = PointLog {
                id: Uuid::new_v4().to_string(),
                child_id: child_id.to_string(),
                task_id: None,
                kind: PointLogKind::Spend,
                points: -i64::from(amount),
                reason: reason.to_string(),
                operator: Operator::Child,
                created_at: Utc::now(),
            };
            db.insert_point_log(&log)?;
            tracing::info!(child_id = %child_id, amount, "spent points");
            Ok(log)
        })
    }

    /// Advisory interval check against the child's most recent dose.
    ///
    /// # Errors
    /// Database errors.
    pub fn check_dose(&self, child_id: &str, drug: DrugId, now: DateTime<Utc>) -> Result<IntervalCheck> {
        let last = self.db.last_dose(child_id, drug)?;
        Ok(check_medication_interval(
            last.map(|r| r.administered_at),
            drug,
            now,
        ))
    }

    /// Record a dose. The interval check is reported, never enforced.
    ///
    /// # Errors
    /// Validation error for a negative dose, or database errors.
    pub fn record_dose(
        &self,
        child_id: &str,
        drug: DrugId,
        dose_mg: f64,
        administered_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<DoseReceipt> {
        if !dose_mg.is_finite() || dose_mg < 0.0 {
            return Err(ValidationError::invalid("dose_mg", "must be zero or positive").into());
        }
        self.db.transaction(|db| {
            let last = db.last_dose(child_id, drug)?;
            let interval =
                check_medication_interval(last.map(|r| r.administered_at), drug, administered_at);
            let record = MedicationRecord {
                id: Uuid::new_v4().to_string(),
                child_id: child_id.to_string(),
                drug,
                dose_mg,
                administered_at,
                note,
            };
            db.insert_medication(&record)?;
            tracing::info!(child_id = %child_id, drug = %drug, safe = interval.safe, "recorded dose");
            Ok(DoseReceipt { record, interval })
        })
    }
}
