//! Habit tracking: stages, the settlement engine, and the persisted task record.

pub mod settlement;
pub mod stage;
mod task;
pub mod templates;

pub use settlement::{
    confirm_completion, refresh_daily_status, settle_completion, undo_completion, Milestone,
    Settlement, SettlementOutcome, SettlementRules, TaskState,
};
pub use stage::HabitStage;
pub use task::{Frequency, NewTask, Operator, PointLog, PointLogKind, Task, TaskCategory};
pub use templates::{find_template, templates_for, AgeGroup, TaskTemplate, TASK_TEMPLATES};
