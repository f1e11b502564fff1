//! SQLite persistence for finalized workout summaries.
//!
//! The engine never touches this module; the host hands each summary from
//! `SessionAggregator::stop` to a [`SummarySink`].

use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::session::{RepetitionRecord, SessionSummary};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Destination for finished session summaries.
pub trait SummarySink {
    /// Persist `summary`, returning its storage identifier.
    fn persist(&mut self, summary: &SessionSummary) -> Result<i64>;
}

/// A stored workout without its per-rep detail.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRow {
    pub id: i64,
    pub exercise: String,
    pub rep_count: i64,
    pub mean_accuracy: f64,
    pub duration_secs: f64,
    pub calories: i64,
    pub recorded_at: DateTime<Local>,
}

/// Aggregates across all stored workouts of one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseStats {
    pub exercise: String,
    pub total_workouts: i64,
    pub total_reps: i64,
    pub total_duration_secs: f64,
    pub average_accuracy: f64,
    pub best_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overview {
    pub total_workouts: i64,
    pub total_reps: i64,
    pub total_duration_secs: f64,
    pub average_accuracy: f64,
}

#[derive(Debug)]
pub struct WorkoutStore {
    conn: Connection,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS workouts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exercise TEXT NOT NULL,
        started_at_ms INTEGER NOT NULL,
        ended_at_ms INTEGER NOT NULL,
        duration_secs REAL NOT NULL,
        rep_count INTEGER NOT NULL,
        mean_accuracy REAL NOT NULL,
        calories INTEGER NOT NULL,
        intensity TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS repetitions (
        workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
        sequence INTEGER NOT NULL,
        accuracy INTEGER NOT NULL,
        angles TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        PRIMARY KEY (workout_id, sequence)
    );
    CREATE INDEX IF NOT EXISTS idx_workouts_exercise ON workouts(exercise, recorded_at);
"#;

impl WorkoutStore {
    /// Open the store at the default state directory.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("repcount_workouts.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening workout store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store a summary and its repetitions in one transaction.
    pub fn save_summary(&mut self, summary: &SessionSummary) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO workouts
            (exercise, started_at_ms, ended_at_ms, duration_secs, rep_count,
             mean_accuracy, calories, intensity, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                summary.exercise,
                summary.started_at_ms as i64,
                summary.ended_at_ms as i64,
                summary.duration_secs,
                summary.rep_count as i64,
                summary.mean_accuracy,
                summary.calories_burned(),
                summary.intensity().to_string(),
                Local::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        for record in &summary.records {
            tx.execute(
                r#"
                INSERT INTO repetitions (workout_id, sequence, accuracy, angles, timestamp_ms)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    id,
                    record.sequence,
                    record.accuracy,
                    serde_json::to_string(&record.angles)?,
                    record.timestamp_ms as i64,
                ],
            )?;
        }

        tx.commit()?;
        info!(id, exercise = %summary.exercise, reps = summary.rep_count, "workout saved");
        Ok(id)
    }

    /// Reload a full summary, including its repetitions in completion order.
    pub fn load_summary(&self, id: i64) -> Result<Option<SessionSummary>> {
        let header = self
            .conn
            .query_row(
                r#"
                SELECT exercise, started_at_ms, ended_at_ms, duration_secs, rep_count, mean_accuracy
                FROM workouts WHERE id = ?1
                "#,
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((exercise, started, ended, duration_secs, rep_count, mean_accuracy)) = header
        else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT sequence, accuracy, angles, timestamp_ms
            FROM repetitions WHERE workout_id = ?1
            ORDER BY sequence
            "#,
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (sequence, accuracy, angles, timestamp_ms) = row?;
            records.push(RepetitionRecord {
                sequence,
                accuracy,
                angles: serde_json::from_str(&angles)?,
                timestamp_ms: timestamp_ms as u64,
            });
        }

        Ok(Some(SessionSummary {
            exercise,
            started_at_ms: started as u64,
            ended_at_ms: ended as u64,
            duration_secs,
            rep_count: rep_count as usize,
            mean_accuracy,
            records,
        }))
    }

    /// Most recent workouts first.
    pub fn recent(&self, limit: usize) -> Result<Vec<WorkoutRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, exercise, rep_count, mean_accuracy, duration_secs, calories, recorded_at
            FROM workouts
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let recorded_at: String = row.get(6)?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        6,
                        "recorded_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(WorkoutRow {
                id: row.get(0)?,
                exercise: row.get(1)?,
                rep_count: row.get(2)?,
                mean_accuracy: row.get(3)?,
                duration_secs: row.get(4)?,
                calories: row.get(5)?,
                recorded_at,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Per-exercise totals, ordered by exercise identifier.
    pub fn exercise_stats(&self) -> Result<Vec<ExerciseStats>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                exercise,
                COUNT(*),
                SUM(rep_count),
                SUM(duration_secs),
                AVG(mean_accuracy),
                MAX(mean_accuracy)
            FROM workouts
            GROUP BY exercise
            ORDER BY exercise
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ExerciseStats {
                exercise: row.get(0)?,
                total_workouts: row.get(1)?,
                total_reps: row.get(2)?,
                total_duration_secs: row.get(3)?,
                average_accuracy: row.get(4)?,
                best_accuracy: row.get(5)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn overview(&self) -> Result<Overview> {
        let overview = self.conn.query_row(
            r#"
            SELECT COUNT(*), SUM(rep_count), SUM(duration_secs), AVG(mean_accuracy)
            FROM workouts
            "#,
            [],
            |row| {
                Ok(Overview {
                    total_workouts: row.get(0)?,
                    total_reps: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    total_duration_secs: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    average_accuracy: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                })
            },
        )?;
        Ok(overview)
    }

    /// Remove every stored workout (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM repetitions", [])?;
        self.conn.execute("DELETE FROM workouts", [])?;
        Ok(())
    }
}

impl SummarySink for WorkoutStore {
    fn persist(&mut self, summary: &SessionSummary) -> Result<i64> {
        self.save_summary(summary)
    }
}
