use clap::Subcommand;
use serde_json::json;
use xingxing_core::HabitTracker;

#[derive(Subcommand)]
pub enum PointsAction {
    /// Show a child's point balance
    Balance {
        /// Child ID
        child: String,
    },
    /// Show a child's point ledger, newest first
    Log {
        /// Child ID
        child: String,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Spend points, e.g. on a reward
    Spend {
        /// Child ID
        child: String,
        /// Points to spend
        amount: u32,
        /// Reason shown in the ledger
        #[arg(long, default_value = "reward")]
        reason: String,
    },
    /// Manually add or remove points
    Adjust {
        /// Child ID
        child: String,
        /// Signed point delta (e.g. 5 or -3)
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        /// Reason shown in the ledger
        #[arg(long, default_value = "manual adjustment")]
        reason: String,
    },
}

pub fn run(action: PointsAction) -> Result<(), Box<dyn std::error::Error>> {
    let (db, config) = super::open()?;

    match action {
        PointsAction::Balance { child } => {
            let balance = db.balance(&child)?;
            super::print_json(&json!({ "child_id": child, "balance": balance }))?;
        }
        PointsAction::Log { child, limit } => {
            let mut logs = db.list_point_logs(&child)?;
            if let Some(limit) = limit {
                logs.truncate(limit);
            }
            super::print_json(&logs)?;
        }
        PointsAction::Spend {
            child,
            amount,
            reason,
        } => {
            let tracker = HabitTracker::new(&db, config.settlement_rules());
            let log = tracker.spend_points(&child, amount, &reason)?;
            let balance = db.balance(&child)?;
            super::print_json(&json!({ "log": log, "balance": balance }))?;
        }
        PointsAction::Adjust {
            child,
            delta,
            reason,
        } => {
            let tracker = HabitTracker::new(&db, config.settlement_rules());
            let log = tracker.adjust_points(&child, delta, &reason)?;
            let balance = db.balance(&child)?;
            super::print_json(&json!({ "log": log, "balance": balance }))?;
        }
    }
    Ok(())
}
