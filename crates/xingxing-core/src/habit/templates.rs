//! Built-in task templates a parent can import in one step.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::task::{NewTask, TaskCategory};
use crate::error::ValidationError;

/// Age bracket a template is suited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "3-5")]
    Preschool,
    #[serde(rename = "6-8")]
    Early,
    #[serde(rename = "9-12")]
    Middle,
}

impl AgeGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            AgeGroup::Preschool => "3-5",
            AgeGroup::Early => "6-8",
            AgeGroup::Middle => "9-12",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3-5" => Ok(AgeGroup::Preschool),
            "6-8" => Ok(AgeGroup::Early),
            "9-12" => Ok(AgeGroup::Middle),
            other => Err(ValidationError::invalid(
                "age_group",
                format!("'{other}' is not one of 3-5, 6-8, 9-12"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: TaskCategory,
    pub points: u32,
    pub icon: &'static str,
    pub description: &'static str,
    pub age_groups: &'static [AgeGroup],
}

const fn template(
    id: &'static str,
    name: &'static str,
    category: TaskCategory,
    points: u32,
    icon: &'static str,
    description: &'static str,
    age_groups: &'static [AgeGroup],
) -> TaskTemplate {
    TaskTemplate {
        id,
        name,
        category,
        points,
        icon,
        description,
        age_groups,
    }
}

use self::AgeGroup::{Early, Middle, Preschool};
use super::task::TaskCategory::{Chore, Life, Manner, Study};

pub static TASK_TEMPLATES: &[TaskTemplate] = &[
    template("brush_teeth", "Brush teeth", Life, 10, "😁", "Brush morning and night", &[Preschool, Early]),
    template("get_dressed", "Get dressed", Life, 10, "🎀", "Put on clothes without help", &[Preschool]),
    template("tidy_toys", "Tidy toys", Life, 15, "🧸", "Put toys back after playing", &[Preschool, Early]),
    template("wash_hands", "Wash hands", Life, 5, "🫧", "Before meals and after the toilet", &[Preschool]),
    template("eat_alone", "Eat without help", Life, 10, "🍙", "Finish the meal without picking", &[Preschool]),
    template("make_bed", "Make the bed", Life, 10, "🌤️", "Tidy the bed after getting up", &[Early, Middle]),
    template("homework", "Finish homework on time", Study, 20, "📒", "Finish the day's homework on time", &[Early, Middle]),
    template("read_30", "Read for 30 minutes", Study, 15, "🦉", "Read for 30 minutes every day", &[Early, Middle]),
    template("pack_bag", "Pack the school bag", Study, 10, "🎒", "Pack tomorrow's bag before bed", &[Early, Middle]),
    template("story_time", "Listen to a story", Study, 10, "🧚", "Listen to a whole story", &[Preschool]),
    template("share_learning", "Share what I learned", Study, 10, "💡", "Tell the family something learned today", &[Early, Middle]),
    template("say_thanks", "Say thank you", Manner, 5, "💖", "Say thanks when helped", &[Preschool, Early]),
    template("greet", "Greet first", Manner, 5, "🤗", "Greet elders first", &[Preschool, Early, Middle]),
    template("share_toys", "Share toys", Manner, 10, "💝", "Share toys with friends", &[Preschool, Early]),
    template("wait_patiently", "Wait patiently", Manner, 10, "🐢", "Stay patient in line", &[Preschool, Early]),
    template("take_out_trash", "Take out the trash", Chore, 10, "🌱", "Help take the trash out", &[Preschool, Early]),
    template("housework", "Help with housework", Chore, 15, "✨", "Sweep the floor or wipe the table", &[Early, Middle]),
    template("set_table", "Set the table", Chore, 10, "🥣", "Lay out bowls and chopsticks before meals", &[Early, Middle]),
    template("wash_socks", "Wash my socks", Chore, 15, "🧺", "Wash the day's small clothes", &[Middle]),
];

/// Templates suited to `age`, or all of them.
pub fn templates_for(age: Option<AgeGroup>) -> impl Iterator<Item = &'static TaskTemplate> {
    TASK_TEMPLATES
        .iter()
        .filter(move |t| age.map_or(true, |a| t.age_groups.contains(&a)))
}

/// Find a built-in template by id.
pub fn find_template(id: &str) -> Option<&'static TaskTemplate> {
    TASK_TEMPLATES.iter().find(|t| t.id == id)
}

impl TaskTemplate {
    pub fn to_new_task(&self, child_id: &str) -> NewTask {
        NewTask {
            category: self.category,
            icon: self.icon.to_string(),
            description: self.description.to_string(),
            ..NewTask::new(child_id, self.name, self.points)
        }
    }
}
