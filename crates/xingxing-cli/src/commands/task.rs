use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use xingxing_core::{
    find_template, refresh_daily_status, templates_for, AgeGroup, CoreError, Frequency,
    HabitTracker, NewTask, TaskCategory, ValidationError,
};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new habit task
    Add {
        /// Task name
        name: String,
        /// Child the task belongs to
        #[arg(long)]
        child: String,
        /// Base points per completion
        #[arg(long, default_value = "10")]
        points: u32,
        /// Category: life, study, manner, chore
        #[arg(long, default_value = "life")]
        category: TaskCategory,
        /// Frequency: daily, weekly, anytime
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
        /// Display icon
        #[arg(long, default_value = "")]
        icon: String,
        /// Task description
        #[arg(long, default_value = "")]
        description: String,
        /// Hold the award until a parent confirms
        #[arg(long)]
        confirm: bool,
    },
    /// List built-in task templates
    Templates {
        /// Only templates for this age group (3-5, 6-8, 9-12)
        #[arg(long)]
        age: Option<AgeGroup>,
    },
    /// Create tasks from built-in templates in one step
    Import {
        /// Child the tasks belong to
        #[arg(long)]
        child: String,
        /// Import every template for this age group
        #[arg(long, conflicts_with = "template")]
        age: Option<AgeGroup>,
        /// Template ID to import (repeatable)
        #[arg(long = "template", required_unless_present = "age")]
        template: Vec<String>,
        /// Hold the awards until a parent confirms
        #[arg(long)]
        confirm: bool,
    },
    /// List tasks
    List {
        /// Only tasks for this child
        #[arg(long)]
        child: Option<String>,
        /// Include inactive tasks
        #[arg(long)]
        all: bool,
    },
    /// Show a single task
    Show {
        /// Task ID
        id: String,
    },
    /// Mark a task as done for today
    Complete {
        /// Task ID
        id: String,
    },
    /// Revert today's completion of a task
    Undo {
        /// Task ID
        id: String,
    },
    /// Parent confirmation of a pending completion
    Confirm {
        /// Task ID
        id: String,
    },
    /// Pause a task without losing its streak
    Deactivate {
        /// Task ID
        id: String,
    },
    /// Resume a paused task
    Activate {
        /// Task ID
        id: String,
    },
    /// Delete a task and its point history
    Delete {
        /// Task ID
        id: String,
    },
    /// Recompute the completed-today flag for every task
    Refresh,
}

pub fn run(action: TaskAction, today: NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
    let (db, config) = super::open()?;
    let tracker = HabitTracker::new(&db, config.settlement_rules());

    match action {
        TaskAction::Add {
            name,
            child,
            points,
            category,
            frequency,
            icon,
            description,
            confirm,
        } => {
            let task = tracker.create_task(NewTask {
                category,
                frequency,
                icon,
                description,
                requires_parent_confirm: confirm,
                ..NewTask::new(child, name, points)
            })?;
            super::print_json(&task)?;
        }
        TaskAction::Templates { age } => {
            let templates: Vec<_> = templates_for(age).collect();
            super::print_json(&templates)?;
        }
        TaskAction::Import {
            child,
            age,
            template,
            confirm,
        } => {
            let selected = if template.is_empty() {
                templates_for(age).collect::<Vec<_>>()
            } else {
                template
                    .iter()
                    .map(|id| {
                        find_template(id).ok_or_else(|| ValidationError::InvalidValue {
                            field: "template".to_string(),
                            message: format!("unknown template '{id}'"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };
            let inputs = selected
                .into_iter()
                .map(|t| NewTask {
                    requires_parent_confirm: confirm,
                    ..t.to_new_task(&child)
                })
                .collect();
            let tasks = tracker.create_tasks(inputs)?;
            super::print_json(&tasks)?;
        }
        TaskAction::List { child, all } => {
            let tasks: Vec<_> = db
                .list_tasks(child.as_deref())?
                .into_iter()
                .filter(|t| all || t.is_active)
                .map(|mut t| {
                    t.state = refresh_daily_status(&t.state, today);
                    t
                })
                .collect();
            super::print_json(&tasks)?;
        }
        TaskAction::Show { id } => {
            let mut task = db
                .get_task(&id)?
                .ok_or(CoreError::NotFound { kind: "task", id })?;
            task.state = refresh_daily_status(&task.state, today);
            super::print_json(&task)?;
        }
        TaskAction::Complete { id } => {
            let receipt = tracker.complete_task(&id, today)?;
            super::print_json(&receipt)?;
        }
        TaskAction::Undo { id } => {
            let task = tracker.undo_completion(&id, today)?;
            super::print_json(&task)?;
        }
        TaskAction::Confirm { id } => {
            let receipt = tracker.confirm_completion(&id, today)?;
            super::print_json(&receipt)?;
        }
        TaskAction::Deactivate { id } => {
            tracker.set_active(&id, false)?;
            println!("task {id} deactivated");
        }
        TaskAction::Activate { id } => {
            tracker.set_active(&id, true)?;
            println!("task {id} activated");
        }
        TaskAction::Delete { id } => {
            tracker.delete_task(&id)?;
            println!("task {id} deleted");
        }
        TaskAction::Refresh => {
            let changed = tracker.refresh_daily_status(today)?;
            super::print_json(&json!({ "date": today, "changed": changed }))?;
        }
    }
    Ok(())
}
