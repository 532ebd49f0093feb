//! SQLite-based storage for tasks, undo snapshots, point logs, and doses.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;

use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result};
use crate::habit::{
    Frequency, HabitStage, Operator, PointLog, PointLogKind, Task, TaskCategory, TaskState,
};
use crate::medication::{DrugId, MedicationRecord};

// === Helper Functions ===

const TASK_COLUMNS: &str = "id, child_id, name, category, frequency, icon, description, is_active,
     points, consecutive_days, last_completed_date, completed_today, stage, total_completions,
     requires_parent_confirm, parent_confirmed, created_at";

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| s.parse::<NaiveDate>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_point_log_kind(s: &str) -> Option<PointLogKind> {
    match s {
        "earn" => Some(PointLogKind::Earn),
        "spend" => Some(PointLogKind::Spend),
        "adjust" => Some(PointLogKind::Adjust),
        _ => None,
    }
}

fn parse_operator(s: &str) -> Option<Operator> {
    match s {
        "child" => Some(Operator::Child),
        "parent" => Some(Operator::Parent),
        _ => None,
    }
}

fn corrupt(idx: usize, column: &'static str, value: String) -> rusqlite::Error {
    conversion_error(idx, DatabaseError::CorruptValue { column, value })
}

/// Build a Task from a row selected with [`TASK_COLUMNS`].
fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let category: String = row.get(3)?;
    let frequency: String = row.get(4)?;
    let stage: String = row.get(12)?;

    Ok(Task {
        id: row.get(0)?,
        child_id: row.get(1)?,
        name: row.get(2)?,
        category: category
            .parse::<TaskCategory>()
            .map_err(|e| conversion_error(3, e))?,
        frequency: frequency
            .parse::<Frequency>()
            .map_err(|e| conversion_error(4, e))?,
        icon: row.get(5)?,
        description: row.get(6)?,
        is_active: row.get(7)?,
        state: TaskState {
            points: row.get(8)?,
            consecutive_days: row.get(9)?,
            last_completed_date: parse_date(row, 10)?,
            completed_today: row.get(11)?,
            stage: stage.parse::<HabitStage>().map_err(|e| conversion_error(12, e))?,
            total_completions: row.get(13)?,
            requires_parent_confirm: row.get(14)?,
            parent_confirmed: row.get(15)?,
        },
        created_at: parse_datetime(row, 16)?,
    })
}

fn row_to_point_log(row: &rusqlite::Row) -> rusqlite::Result<PointLog> {
    let kind: String = row.get(3)?;
    let operator: String = row.get(6)?;
    Ok(PointLog {
        id: row.get(0)?,
        child_id: row.get(1)?,
        task_id: row.get(2)?,
        kind: parse_point_log_kind(&kind).ok_or_else(|| corrupt(3, "kind", kind.clone()))?,
        points: row.get(4)?,
        reason: row.get(5)?,
        operator: parse_operator(&operator).ok_or_else(|| corrupt(6, "operator", operator.clone()))?,
        created_at: parse_datetime(row, 7)?,
    })
}

fn row_to_medication(row: &rusqlite::Row) -> rusqlite::Result<MedicationRecord> {
    let drug: String = row.get(2)?;
    Ok(MedicationRecord {
        id: row.get(0)?,
        child_id: row.get(1)?,
        drug: drug.parse::<DrugId>().map_err(|e| conversion_error(2, e))?,
        dose_mg: row.get(3)?,
        administered_at: parse_datetime(row, 4)?,
        note: row.get(5)?,
    })
}

/// Pre-completion state kept for single-step undo.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub state: TaskState,
    pub taken_on: NaiveDate,
    /// Earn log written by the completion, if points were applied.
    pub point_log_id: Option<String>,
}

/// SQLite database for habit storage.
///
/// Stores tasks, their undo snapshots, the point ledger and medication doses.
pub struct HabitDb {
    conn: Connection,
}

impl HabitDb {
    /// Open the database at `~/.config/xingxing/xingxing.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("xingxing.db"))
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside an immediate transaction; any error rolls everything back.
    ///
    /// # Errors
    /// Returns the error from `f`, or a database error from begin/commit.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // === Tasks ===

    pub fn insert_task(&self, task: &Task) -> Result<()> {
        let s = &task.state;
        self.conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                task.id,
                task.child_id,
                task.name,
                task.category.as_str(),
                task.frequency.as_str(),
                task.icon,
                task.description,
                task.is_active,
                s.points,
                s.consecutive_days,
                s.last_completed_date.map(|d| d.to_string()),
                s.completed_today,
                s.stage.as_str(),
                s.total_completions,
                s.requires_parent_confirm,
                s.parent_confirmed,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// List tasks ordered by creation, optionally for one child.
    pub fn list_tasks(&self, child_id: Option<&str>) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE (?1 IS NULL OR child_id = ?1)
             ORDER BY created_at, id"
        ))?;
        let tasks = stmt
            .query_map(params![child_id], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Overwrite the settlement fields of a task. Returns false if it does not exist.
    pub fn update_task_state(&self, id: &str, s: &TaskState) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET
                points = ?2, consecutive_days = ?3, last_completed_date = ?4,
                completed_today = ?5, stage = ?6, total_completions = ?7,
                requires_parent_confirm = ?8, parent_confirmed = ?9
             WHERE id = ?1",
            params![
                id,
                s.points,
                s.consecutive_days,
                s.last_completed_date.map(|d| d.to_string()),
                s.completed_today,
                s.stage.as_str(),
                s.total_completions,
                s.requires_parent_confirm,
                s.parent_confirmed,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn set_task_active(&self, id: &str, active: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        Ok(changed > 0)
    }

    /// Delete a task; its snapshot and point logs cascade.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // === Undo snapshots ===

    pub fn save_snapshot(&self, snapshot: &TaskSnapshot) -> Result<()> {
        let json = serde_json::to_string(&snapshot.state)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO task_snapshots (task_id, state_json, taken_on, point_log_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.task_id,
                json,
                snapshot.taken_on.to_string(),
                snapshot.point_log_id,
            ],
        )?;
        Ok(())
    }

    pub fn load_snapshot(&self, task_id: &str) -> Result<Option<TaskSnapshot>> {
        let row = self
            .conn
            .query_row(
                "SELECT state_json, taken_on, point_log_id FROM task_snapshots WHERE task_id = ?1",
                params![task_id],
                |row| {
                    let json: String = row.get(0)?;
                    let taken_on = parse_date(row, 1)?
                        .ok_or_else(|| corrupt(1, "taken_on", "NULL".to_string()))?;
                    let point_log_id: Option<String> = row.get(2)?;
                    Ok((json, taken_on, point_log_id))
                },
            )
            .optional()?;

        match row {
            Some((json, taken_on, point_log_id)) => Ok(Some(TaskSnapshot {
                task_id: task_id.to_string(),
                state: serde_json::from_str(&json)?,
                taken_on,
                point_log_id,
            })),
            None => Ok(None),
        }
    }

    pub fn clear_snapshot(&self, task_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM task_snapshots WHERE task_id = ?1", params![task_id])?;
        Ok(())
    }

    // === Point ledger ===

    pub fn insert_point_log(&self, log: &PointLog) -> Result<()> {
        self.conn.execute(
            "INSERT INTO point_logs (id, child_id, task_id, kind, points, reason, operator, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                log.id,
                log.child_id,
                log.task_id,
                log.kind.as_str(),
                log.points,
                log.reason,
                log.operator.as_str(),
                log.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_point_log(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM point_logs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Point logs for a child, newest first.
    pub fn list_point_logs(&self, child_id: &str) -> Result<Vec<PointLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, child_id, task_id, kind, points, reason, operator, created_at
             FROM point_logs WHERE child_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let logs = stmt
            .query_map(params![child_id], row_to_point_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Sum of a child's point log entries.
    pub fn balance(&self, child_id: &str) -> Result<i64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(points), 0) FROM point_logs WHERE child_id = ?1",
            params![child_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // === Medication ===

    pub fn insert_medication(&self, record: &MedicationRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO medication_records (id, child_id, drug, dose_mg, administered_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.child_id,
                record.drug.as_str(),
                record.dose_mg,
                record.administered_at.to_rfc3339(),
                record.note,
            ],
        )?;
        Ok(())
    }

    /// Most recent dose of `drug` for a child.
    pub fn last_dose(&self, child_id: &str, drug: DrugId) -> Result<Option<MedicationRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, child_id, drug, dose_mg, administered_at, note
                 FROM medication_records WHERE child_id = ?1 AND drug = ?2
                 ORDER BY administered_at DESC LIMIT 1",
                params![child_id, drug.as_str()],
                row_to_medication,
            )
            .optional()?;
        Ok(record)
    }

    /// Dose history for a child, newest first.
    pub fn list_medication(&self, child_id: &str) -> Result<Vec<MedicationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, child_id, drug, dose_mg, administered_at, note
             FROM medication_records WHERE child_id = ?1
             ORDER BY administered_at DESC",
        )?;
        let records = stmt
            .query_map(params![child_id], row_to_medication)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn make_test_task(child: &str) -> Task {
        Task {
            id: Uuid::new_v4().to_string(),
            child_id: child.to_string(),
            name: "Brush teeth".to_string(),
            category: TaskCategory::Life,
            frequency: Frequency::Daily,
            icon: "🪥".to_string(),
            description: String::new(),
            is_active: true,
            state: TaskState::new(10),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        }
    }

    fn earn_log(child: &str, task_id: Option<&str>, points: i64) -> PointLog {
        PointLog {
            id: Uuid::new_v4().to_string(),
            child_id: child.to_string(),
            task_id: task_id.map(str::to_string),
            kind: PointLogKind::Earn,
            points,
            reason: "test".to_string(),
            operator: Operator::Child,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn task_roundtrip() {
        let db = HabitDb::open_memory().unwrap();
        let mut task = make_test_task("kid");
        task.state.last_completed_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        task.state.stage = HabitStage::Persist;
        task.state.requires_parent_confirm = true;
        db.insert_task(&task).unwrap();

        let loaded = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        assert!(db.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn list_filters_by_child() {
        let db = HabitDb::open_memory().unwrap();
        db.insert_task(&make_test_task("a")).unwrap();
        db.insert_task(&make_test_task("a")).unwrap();
        db.insert_task(&make_test_task("b")).unwrap();
        assert_eq!(db.list_tasks(Some("a")).unwrap().len(), 2);
        assert_eq!(db.list_tasks(None).unwrap().len(), 3);
    }

    #[test]
    fn update_state_persists() {
        let db = HabitDb::open_memory().unwrap();
        let task = make_test_task("kid");
        db.insert_task(&task).unwrap();
        let mut state = task.state.clone();
        state.consecutive_days = 9;
        state.stage = HabitStage::Persist;
        assert!(db.update_task_state(&task.id, &state).unwrap());
        assert_eq!(db.get_task(&task.id).unwrap().unwrap().state, state);
        assert!(!db.update_task_state("missing", &state).unwrap());
    }

    #[test]
    fn delete_cascades_to_logs_and_snapshot() {
        let db = HabitDb::open_memory().unwrap();
        let task = make_test_task("kid");
        db.insert_task(&task).unwrap();
        db.insert_point_log(&earn_log("kid", Some(&task.id), 15)).unwrap();
        db.insert_point_log(&earn_log("kid", None, 5)).unwrap();
        db.save_snapshot(&TaskSnapshot {
            task_id: task.id.clone(),
            state: task.state.clone(),
            taken_on: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            point_log_id: None,
        })
        .unwrap();

        assert!(db.delete_task(&task.id).unwrap());
        assert_eq!(db.balance("kid").unwrap(), 5);
        assert!(db.load_snapshot(&task.id).unwrap().is_none());
    }

    #[test]
    fn snapshot_roundtrip_and_replace() {
        let db = HabitDb::open_memory().unwrap();
        let task = make_test_task("kid");
        db.insert_task(&task).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut snap = TaskSnapshot {
            task_id: task.id.clone(),
            state: task.state.clone(),
            taken_on: day,
            point_log_id: Some("log-1".to_string()),
        };
        db.save_snapshot(&snap).unwrap();
        snap.point_log_id = None;
        db.save_snapshot(&snap).unwrap();
        assert_eq!(db.load_snapshot(&task.id).unwrap(), Some(snap));
        db.clear_snapshot(&task.id).unwrap();
        assert!(db.load_snapshot(&task.id).unwrap().is_none());
    }

    #[test]
    fn balance_sums_signed_entries() {
        let db = HabitDb::open_memory().unwrap();
        assert_eq!(db.balance("kid").unwrap(), 0);
        db.insert_point_log(&earn_log("kid", None, 15)).unwrap();
        db.insert_point_log(&earn_log("kid", None, -4)).unwrap();
        db.insert_point_log(&earn_log("other", None, 100)).unwrap();
        assert_eq!(db.balance("kid").unwrap(), 11);
        assert_eq!(db.list_point_logs("kid").unwrap().len(), 2);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = HabitDb::open_memory().unwrap();
        let task = make_test_task("kid");
        let result: Result<()> = db.transaction(|db| {
            db.insert_task(&task)?;
            Err(crate::error::CoreError::NotFound { kind: "task", id: "x".into() })
        });
        assert!(result.is_err());
        assert!(db.get_task(&task.id).unwrap().is_none());
    }

    #[test]
    fn last_dose_picks_newest_for_drug() {
        let db = HabitDb::open_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        for (hours, drug) in [(0, DrugId::Ibuprofen), (2, DrugId::Ibuprofen), (3, DrugId::Acetaminophen)] {
            db.insert_medication(&MedicationRecord {
                id: Uuid::new_v4().to_string(),
                child_id: "kid".to_string(),
                drug,
                dose_mg: 70.0,
                administered_at: base + Duration::hours(hours),
                note: None,
            })
            .unwrap();
        }
        let last = db.last_dose("kid", DrugId::Ibuprofen).unwrap().unwrap();
        assert_eq!(last.administered_at, base + Duration::hours(2));
        assert!(db.last_dose("kid", DrugId::Cetirizine).unwrap().is_none());
        assert_eq!(db.list_medication("kid").unwrap().len(), 3);
    }
}
