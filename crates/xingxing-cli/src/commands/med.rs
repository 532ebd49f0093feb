use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::json;
use xingxing_core::{calculate_dose, Config, DrugId, HabitTracker, ValidationError};

#[derive(Subcommand)]
pub enum MedAction {
    /// List the drug registry
    Drugs,
    /// Check whether it is safe to give another dose
    Check {
        /// Drug ID (e.g. ibuprofen)
        drug: DrugId,
        /// Child ID; falls back to medication.default_child_id
        #[arg(long)]
        child: Option<String>,
        /// Time of the intended dose (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Calculate a dose from weight and age
    Dose {
        /// Drug ID
        drug: DrugId,
        /// Body weight in kg
        #[arg(long)]
        weight: f64,
        /// Age in months
        #[arg(long)]
        age_months: u32,
        /// Formulation ID; defaults to the drug's first formulation
        #[arg(long)]
        formulation: Option<String>,
    },
    /// Record an administered dose
    Record {
        /// Drug ID
        drug: DrugId,
        /// Dose in mg
        #[arg(long)]
        dose_mg: f64,
        /// Child ID; falls back to medication.default_child_id
        #[arg(long)]
        child: Option<String>,
        /// Administration time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },
    /// Show a child's dose history, newest first
    History {
        /// Child ID; falls back to medication.default_child_id
        #[arg(long)]
        child: Option<String>,
    },
}

fn resolve_child(child: Option<String>, config: &Config) -> Result<String, ValidationError> {
    child
        .or_else(|| config.medication.default_child_id.clone())
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "child".to_string(),
            message: "pass --child or set medication.default_child_id".to_string(),
        })
}

pub fn run(action: MedAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MedAction::Drugs => {
            let drugs: Vec<_> = DrugId::ALL.iter().map(|d| d.info()).collect();
            super::print_json(&drugs)?;
        }
        MedAction::Dose {
            drug,
            weight,
            age_months,
            formulation,
        } => {
            let formulation = match formulation {
                Some(id) => id,
                None => drug
                    .info()
                    .formulations
                    .first()
                    .map(|f| f.id.to_string())
                    .unwrap_or_default(),
            };
            let result = calculate_dose(drug, weight, age_months, &formulation)?;
            super::print_json(&result)?;
        }
        MedAction::Check { drug, child, at } => {
            let (db, config) = super::open()?;
            let child = resolve_child(child, &config)?;
            let tracker = HabitTracker::new(&db, config.settlement_rules());
            let check = tracker.check_dose(&child, drug, at.unwrap_or_else(Utc::now))?;
            super::print_json(&json!({ "child_id": child, "drug": drug, "check": check }))?;
        }
        MedAction::Record {
            drug,
            dose_mg,
            child,
            at,
            note,
        } => {
            let (db, config) = super::open()?;
            let child = resolve_child(child, &config)?;
            let tracker = HabitTracker::new(&db, config.settlement_rules());
            let receipt =
                tracker.record_dose(&child, drug, dose_mg, at.unwrap_or_else(Utc::now), note)?;
            if !receipt.interval.safe {
                eprintln!(
                    "warning: dose recorded {} minutes before the minimum interval",
                    receipt.interval.minutes_remaining
                );
            }
            super::print_json(&receipt)?;
        }
        MedAction::History { child } => {
            let (db, config) = super::open()?;
            let child = resolve_child(child, &config)?;
            super::print_json(&db.list_medication(&child)?)?;
        }
    }
    Ok(())
}
