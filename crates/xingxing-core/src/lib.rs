//! # Xingxing Core Library
//!
//! Core logic for Xingxing, a children's habit and health tracker. The CLI
//! binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Habit Settlement Engine**: pure functions that turn a task completion
//!   into streak, stage and point changes, and reverse the latest one
//! - **Medication**: drug registry, advisory re-dose interval check, and the
//!   weight/age-based dosage calculator
//! - **Storage**: SQLite persistence and TOML-based configuration
//! - **Tracker**: runs the engine against storage inside transactions
//!
//! ## Key Components
//!
//! - [`settle_completion`] / [`undo_completion`]: the settlement engine
//! - [`check_medication_interval`]: dose interval safety check
//! - [`HabitDb`]: task, point log and dose persistence
//! - [`HabitTracker`]: read-settle-write orchestration
//! - [`Config`]: application configuration management

pub mod error;
pub mod habit;
pub mod medication;
pub mod storage;
pub mod tracker;

pub use error::{ConfigError, ConfirmError, CoreError, DatabaseError, SettleError, ValidationError};
pub use habit::{
    confirm_completion, find_template, refresh_daily_status, settle_completion, templates_for,
    undo_completion, AgeGroup, Frequency, HabitStage, Milestone, NewTask, Operator, PointLog,
    PointLogKind, Settlement, SettlementOutcome, SettlementRules, Task, TaskCategory, TaskState,
    TaskTemplate,
};
pub use medication::{
    calculate_dose, check_medication_interval, DosageResult, DoseWarning, DrugId, IntervalCheck,
    MedicationRecord,
};
pub use storage::{Config, HabitDb};
pub use tracker::{CompletionReceipt, DoseReceipt, HabitTracker};
