use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::settlement::TaskState;
use crate::error::ValidationError;

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Life,
    Study,
    Manner,
    Chore,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Life => "life",
            TaskCategory::Study => "study",
            TaskCategory::Manner => "manner",
            TaskCategory::Chore => "chore",
        }
    }
}

impl FromStr for TaskCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "life" => Ok(TaskCategory::Life),
            "study" => Ok(TaskCategory::Study),
            "manner" => Ok(TaskCategory::Manner),
            "chore" => Ok(TaskCategory::Chore),
            other => Err(ValidationError::invalid(
                "category",
                format!("expected life, study, manner or chore, got '{other}'"),
            )),
        }
    }
}

/// How often a task is expected to be done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Anytime,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Anytime => "anytime",
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "anytime" => Ok(Frequency::Anytime),
            other => Err(ValidationError::invalid(
                "frequency",
                format!("expected daily, weekly or anytime, got '{other}'"),
            )),
        }
    }
}

/// A child's habit task as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub child_id: String,
    pub name: String,
    pub category: TaskCategory,
    pub frequency: Frequency,
    pub icon: String,
    pub description: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
}

/// Parent input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub child_id: String,
    pub name: String,
    pub category: TaskCategory,
    pub frequency: Frequency,
    pub points: u32,
    pub icon: String,
    pub description: String,
    pub requires_parent_confirm: bool,
}

impl NewTask {
    pub fn new(child_id: impl Into<String>, name: impl Into<String>, points: u32) -> Self {
        Self {
            child_id: child_id.into(),
            name: name.into(),
            category: TaskCategory::Life,
            frequency: Frequency::Daily,
            points,
            icon: String::new(),
            description: String::new(),
            requires_parent_confirm: false,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        if self.child_id.trim().is_empty() {
            return Err(ValidationError::invalid("child_id", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointLogKind {
    Earn,
    Spend,
    Adjust,
}

impl PointLogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointLogKind::Earn => "earn",
            PointLogKind::Spend => "spend",
            PointLogKind::Adjust => "adjust",
        }
    }
}

/// Who triggered a point change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Child,
    Parent,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Child => "child",
            Operator::Parent => "parent",
        }
    }
}

/// One entry in a child's point ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLog {
    pub id: String,
    pub child_id: String,
    pub task_id: Option<String>,
    pub kind: PointLogKind,
    /// Signed delta applied to the balance.
    pub points: i64,
    pub reason: String,
    pub operator: Operator,
    pub created_at: DateTime<Utc>,
}
