use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::models::{
    Goal, GoalPatch, Measurement, MeasurementPatch, NewGoal, NewMeasurement, NewUser, NewWorkout,
    User, UserPatch, Workout, WorkoutPatch,
};
use crate::store::{SUPPORTED_YEARS, Storage, check_instants};

const USER_COLUMNS: &str = "id, username, password, display_name, profile_image";
const WORKOUT_COLUMNS: &str = "id, user_id, type, name, date, duration, distance, calories, notes";
const MEASUREMENT_COLUMNS: &str =
    "id, user_id, date, weight, body_fat, chest, waist, hips, arms, thighs, notes";
const GOAL_COLUMNS: &str =
    "id, user_id, title, description, type, target, current, unit, deadline, completed, created_at";

/// Durable storage backed by SQLite.
///
/// Every operation is a single statement. Inserts and updates use `RETURNING`
/// so the stored row comes back in the same round trip.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.init()?;
        debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                "PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL,
                    display_name TEXT,
                    profile_image TEXT
                );

                CREATE TABLE IF NOT EXISTS workouts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    type TEXT NOT NULL,
                    name TEXT NOT NULL,
                    date TEXT NOT NULL,
                    duration INTEGER NOT NULL,
                    distance REAL,
                    calories INTEGER,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS measurements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    date TEXT NOT NULL,
                    weight REAL,
                    body_fat REAL,
                    chest REAL,
                    waist REAL,
                    hips REAL,
                    arms REAL,
                    thighs REAL,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS goals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    title TEXT NOT NULL,
                    description TEXT,
                    type TEXT NOT NULL,
                    target REAL NOT NULL,
                    current REAL NOT NULL,
                    unit TEXT NOT NULL,
                    deadline TEXT,
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_workouts_user_date ON workouts(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_measurements_user_date ON measurements(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_goals_user_created ON goals(user_id, created_at);",
            )
            .context("Failed to initialise schema")
    }

    // --- Row mapping helpers ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            display_name: row.get(3)?,
            profile_image: row.get(4)?,
        })
    }

    fn workout_from_row(row: &rusqlite::Row) -> rusqlite::Result<Workout> {
        Ok(Workout {
            id: row.get(0)?,
            user_id: row.get(1)?,
            workout_type: parse_column(row, 2)?,
            name: row.get(3)?,
            date: timestamp_column(row, 4)?,
            duration: row.get(5)?,
            distance: row.get(6)?,
            calories: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn measurement_from_row(row: &rusqlite::Row) -> rusqlite::Result<Measurement> {
        Ok(Measurement {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: timestamp_column(row, 2)?,
            weight: row.get(3)?,
            body_fat: row.get(4)?,
            chest: row.get(5)?,
            waist: row.get(6)?,
            hips: row.get(7)?,
            arms: row.get(8)?,
            thighs: row.get(9)?,
            notes: row.get(10)?,
        })
    }

    fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        let deadline: Option<String> = row.get(8)?;
        Ok(Goal {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            goal_type: parse_column(row, 4)?,
            target: row.get(5)?,
            current: row.get(6)?,
            unit: row.get(7)?,
            deadline: deadline.map(|s| parse_timestamp(8, &s)).transpose()?,
            completed: row.get(9)?,
            created_at: timestamp_column(row, 10)?,
        })
    }

    // --- Generic single-statement helpers ---

    fn select_one<T>(
        &self,
        table: &str,
        columns: &str,
        id: i64,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        let sql = format!("SELECT {columns} FROM {table} WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], map).optional()?)
    }

    fn select_by_user<T>(
        &self,
        table: &str,
        columns: &str,
        user_id: i64,
        order_by: &str,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let sql = format!("SELECT {columns} FROM {table} WHERE user_id = ?1 ORDER BY {order_by}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id], map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `UPDATE ... SET <changes> WHERE id = ? RETURNING <columns>`, or a plain
    /// select when there is nothing to change.
    fn update_returning<T>(
        &self,
        table: &str,
        columns: &str,
        id: i64,
        changes: Vec<(&'static str, Value)>,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<Option<T>> {
        if changes.is_empty() {
            let sql = format!("SELECT {columns} FROM {table} WHERE id = ?1");
            return self.conn.query_row(&sql, params![id], map).optional();
        }
        let assignments = changes
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} SET {assignments} WHERE id = ?{} RETURNING {columns}",
            changes.len() + 1
        );
        let values = changes
            .into_iter()
            .map(|(_, v)| v)
            .chain(std::iter::once(Value::Integer(id)));
        self.conn
            .query_row(&sql, params_from_iter(values), map)
            .optional()
    }

    fn delete_row(&self, table: &str, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
        Ok(rows > 0)
    }
}

impl Storage for Database {
    // --- Users ---

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.select_one("users", USER_COLUMNS, id, Self::user_from_row)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![username], Self::user_from_row)
            .optional()?)
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO users (username, password, display_name, profile_image)
                     VALUES (?1, ?2, ?3, ?4) RETURNING {USER_COLUMNS}"
                ),
                params![
                    user.username,
                    user.password,
                    user.display_name,
                    user.profile_image
                ],
                Self::user_from_row,
            )
            .map_err(|e| classify(e, None, Some(&user.username)))
    }

    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<Option<User>> {
        let mut changes = Vec::new();
        if let Some(ref v) = patch.username {
            changes.push(("username", Value::Text(v.clone())));
        }
        if let Some(ref v) = patch.password {
            changes.push(("password", Value::Text(v.clone())));
        }
        if let Some(ref v) = patch.display_name {
            changes.push(("display_name", text(v.as_ref())));
        }
        if let Some(ref v) = patch.profile_image {
            changes.push(("profile_image", text(v.as_ref())));
        }
        self.update_returning("users", USER_COLUMNS, id, changes, Self::user_from_row)
            .map_err(|e| classify(e, None, patch.username.as_deref()))
    }

    fn count_users(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    // --- Workouts ---

    fn get_workouts(&self, user_id: i64) -> Result<Vec<Workout>> {
        self.select_by_user(
            "workouts",
            WORKOUT_COLUMNS,
            user_id,
            "date DESC, id DESC",
            Self::workout_from_row,
        )
    }

    fn get_workout(&self, id: i64) -> Result<Option<Workout>> {
        self.select_one("workouts", WORKOUT_COLUMNS, id, Self::workout_from_row)
    }

    fn create_workout(&self, workout: &NewWorkout) -> Result<Workout> {
        check_instants([Some(workout.date)])?;
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO workouts (user_id, type, name, date, duration, distance, calories, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {WORKOUT_COLUMNS}"
                ),
                params![
                    workout.user_id,
                    workout.workout_type.as_str(),
                    workout.name,
                    format_timestamp(&workout.date),
                    workout.duration,
                    workout.distance,
                    workout.calories,
                    workout.notes,
                ],
                Self::workout_from_row,
            )
            .map_err(|e| classify(e, Some(workout.user_id), None))
    }

    fn update_workout(&self, id: i64, patch: &WorkoutPatch) -> Result<Option<Workout>> {
        check_instants([patch.date])?;
        let mut changes = Vec::new();
        if let Some(v) = patch.user_id {
            changes.push(("user_id", Value::Integer(v)));
        }
        if let Some(v) = patch.workout_type {
            changes.push(("type", Value::Text(v.as_str().to_string())));
        }
        if let Some(ref v) = patch.name {
            changes.push(("name", Value::Text(v.clone())));
        }
        if let Some(ref v) = patch.date {
            changes.push(("date", Value::Text(format_timestamp(v))));
        }
        if let Some(v) = patch.duration {
            changes.push(("duration", Value::Integer(v)));
        }
        if let Some(v) = patch.distance {
            changes.push(("distance", real(v)));
        }
        if let Some(v) = patch.calories {
            changes.push(("calories", v.map_or(Value::Null, Value::Integer)));
        }
        if let Some(ref v) = patch.notes {
            changes.push(("notes", text(v.as_ref())));
        }
        self.update_returning(
            "workouts",
            WORKOUT_COLUMNS,
            id,
            changes,
            Self::workout_from_row,
        )
        .map_err(|e| classify(e, patch.user_id, None))
    }

    fn delete_workout(&self, id: i64) -> Result<bool> {
        self.delete_row("workouts", id)
    }

    // --- Measurements ---

    fn get_measurements(&self, user_id: i64) -> Result<Vec<Measurement>> {
        self.select_by_user(
            "measurements",
            MEASUREMENT_COLUMNS,
            user_id,
            "date DESC, id DESC",
            Self::measurement_from_row,
        )
    }

    fn get_measurement(&self, id: i64) -> Result<Option<Measurement>> {
        self.select_one(
            "measurements",
            MEASUREMENT_COLUMNS,
            id,
            Self::measurement_from_row,
        )
    }

    fn get_latest_measurement(&self, user_id: i64) -> Result<Option<Measurement>> {
        let sql = format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE user_id = ?1
             ORDER BY date DESC, id DESC LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![user_id], Self::measurement_from_row)
            .optional()?)
    }

    fn create_measurement(&self, measurement: &NewMeasurement) -> Result<Measurement> {
        check_instants([Some(measurement.date)])?;
        let m = &measurement.metrics;
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO measurements (user_id, date, weight, body_fat, chest, waist, hips, arms, thighs, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {MEASUREMENT_COLUMNS}"
                ),
                params![
                    measurement.user_id,
                    format_timestamp(&measurement.date),
                    m.weight,
                    m.body_fat,
                    m.chest,
                    m.waist,
                    m.hips,
                    m.arms,
                    m.thighs,
                    measurement.notes,
                ],
                Self::measurement_from_row,
            )
            .map_err(|e| classify(e, Some(measurement.user_id), None))
    }

    fn update_measurement(&self, id: i64, patch: &MeasurementPatch) -> Result<Option<Measurement>> {
        check_instants([patch.date])?;
        let mut changes = Vec::new();
        if let Some(v) = patch.user_id {
            changes.push(("user_id", Value::Integer(v)));
        }
        if let Some(ref v) = patch.date {
            changes.push(("date", Value::Text(format_timestamp(v))));
        }
        let metrics = [
            ("weight", patch.weight),
            ("body_fat", patch.body_fat),
            ("chest", patch.chest),
            ("waist", patch.waist),
            ("hips", patch.hips),
            ("arms", patch.arms),
            ("thighs", patch.thighs),
        ];
        for (column, update) in metrics {
            if let Some(v) = update {
                changes.push((column, real(v)));
            }
        }
        if let Some(ref v) = patch.notes {
            changes.push(("notes", text(v.as_ref())));
        }
        self.update_returning(
            "measurements",
            MEASUREMENT_COLUMNS,
            id,
            changes,
            Self::measurement_from_row,
        )
        .map_err(|e| classify(e, patch.user_id, None))
    }

    fn delete_measurement(&self, id: i64) -> Result<bool> {
        self.delete_row("measurements", id)
    }

    // --- Goals ---

    fn get_goals(&self, user_id: i64) -> Result<Vec<Goal>> {
        self.select_by_user(
            "goals",
            GOAL_COLUMNS,
            user_id,
            "created_at ASC, id ASC",
            Self::goal_from_row,
        )
    }

    fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        self.select_one("goals", GOAL_COLUMNS, id, Self::goal_from_row)
    }

    fn create_goal(&self, goal: &NewGoal) -> Result<Goal> {
        check_instants([goal.deadline, goal.created_at])?;
        let created_at = goal.created_at.unwrap_or_else(Utc::now);
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO goals (user_id, title, description, type, target, current, unit, deadline, completed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {GOAL_COLUMNS}"
                ),
                params![
                    goal.user_id,
                    goal.title,
                    goal.description,
                    goal.goal_type.as_str(),
                    goal.target,
                    goal.current,
                    goal.unit,
                    goal.deadline.as_ref().map(format_timestamp),
                    goal.completed,
                    format_timestamp(&created_at),
                ],
                Self::goal_from_row,
            )
            .map_err(|e| classify(e, Some(goal.user_id), None))
    }

    fn update_goal(&self, id: i64, patch: &GoalPatch) -> Result<Option<Goal>> {
        check_instants([patch.deadline.flatten(), patch.created_at])?;
        let mut changes = Vec::new();
        if let Some(v) = patch.user_id {
            changes.push(("user_id", Value::Integer(v)));
        }
        if let Some(ref v) = patch.title {
            changes.push(("title", Value::Text(v.clone())));
        }
        if let Some(ref v) = patch.description {
            changes.push(("description", text(v.as_ref())));
        }
        if let Some(v) = patch.goal_type {
            changes.push(("type", Value::Text(v.as_str().to_string())));
        }
        if let Some(v) = patch.target {
            changes.push(("target", Value::Real(v)));
        }
        if let Some(v) = patch.current {
            changes.push(("current", Value::Real(v)));
        }
        if let Some(ref v) = patch.unit {
            changes.push(("unit", Value::Text(v.clone())));
        }
        if let Some(v) = patch.deadline {
            let value = v.map_or(Value::Null, |d| Value::Text(format_timestamp(&d)));
            changes.push(("deadline", value));
        }
        if let Some(v) = patch.completed {
            changes.push(("completed", Value::Integer(i64::from(v))));
        }
        if let Some(ref v) = patch.created_at {
            changes.push(("created_at", Value::Text(format_timestamp(v))));
        }
        self.update_returning("goals", GOAL_COLUMNS, id, changes, Self::goal_from_row)
            .map_err(|e| classify(e, patch.user_id, None))
    }

    fn delete_goal(&self, id: i64) -> Result<bool> {
        self.delete_row("goals", id)
    }
}

// --- Value conversion ---

/// Fixed-width RFC 3339 in UTC with nanoseconds. Within [`SUPPORTED_YEARS`] the
/// text order matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_timestamp(idx, &s)
}

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    s.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn text(v: Option<&String>) -> Value {
    v.map_or(Value::Null, |s| Value::Text(s.clone()))
}

fn real(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

/// Map constraint failures onto the store's error kinds; anything else means
/// the medium itself failed.
fn classify(err: rusqlite::Error, user_id: Option<i64>, username: Option<&str>) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    if let Some(id) = user_id {
                        return StoreError::UnknownUser(id);
                    }
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    if let Some(name) = username {
                        return StoreError::DuplicateUsername(name.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    StoreError::from(err)
}
