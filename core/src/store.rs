//! The storage capability shared by the volatile and durable backends.
//!
//! Callers receive a `&dyn Storage` (or a boxed one) built once at startup and
//! never need to know which backend is active. Both backends order results
//! the same way and report the same errors for the same inputs.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Utc};

use crate::error::{Result, StoreError};
use crate::models::{
    Goal, GoalPatch, Measurement, MeasurementPatch, NewGoal, NewMeasurement, NewUser, NewWorkout,
    User, UserPatch, Workout, WorkoutPatch,
};

/// Calendar years an instant may fall in. Both backends refuse anything else.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 0..=9999;

/// Fails with [`StoreError::InstantOutOfRange`] on the first instant outside
/// [`SUPPORTED_YEARS`]. `None` entries are skipped.
pub fn check_instants(instants: impl IntoIterator<Item = Option<DateTime<Utc>>>) -> Result<()> {
    let outside = instants
        .into_iter()
        .flatten()
        .find(|ts| !SUPPORTED_YEARS.contains(&ts.year()));
    match outside {
        Some(ts) => Err(StoreError::InstantOutOfRange(ts)),
        None => Ok(()),
    }
}

pub trait Storage: Send {
    // --- Users ---

    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<Option<User>>;
    fn count_users(&self) -> Result<i64>;

    // --- Workouts ---

    /// Most recent first; ties on `date` go to the higher id.
    fn get_workouts(&self, user_id: i64) -> Result<Vec<Workout>>;
    fn get_workout(&self, id: i64) -> Result<Option<Workout>>;
    fn create_workout(&self, workout: &NewWorkout) -> Result<Workout>;
    fn update_workout(&self, id: i64, patch: &WorkoutPatch) -> Result<Option<Workout>>;
    fn delete_workout(&self, id: i64) -> Result<bool>;

    // --- Measurements ---

    /// Most recent first; ties on `date` go to the higher id.
    fn get_measurements(&self, user_id: i64) -> Result<Vec<Measurement>>;
    fn get_measurement(&self, id: i64) -> Result<Option<Measurement>>;
    /// Same record as the head of [`Storage::get_measurements`].
    fn get_latest_measurement(&self, user_id: i64) -> Result<Option<Measurement>>;
    fn create_measurement(&self, measurement: &NewMeasurement) -> Result<Measurement>;
    fn update_measurement(&self, id: i64, patch: &MeasurementPatch) -> Result<Option<Measurement>>;
    fn delete_measurement(&self, id: i64) -> Result<bool>;

    // --- Goals ---

    /// Oldest first by `created_at`; ties go to the lower id.
    fn get_goals(&self, user_id: i64) -> Result<Vec<Goal>>;
    fn get_goal(&self, id: i64) -> Result<Option<Goal>>;
    fn create_goal(&self, goal: &NewGoal) -> Result<Goal>;
    fn update_goal(&self, id: i64, patch: &GoalPatch) -> Result<Option<Goal>>;
    fn delete_goal(&self, id: i64) -> Result<bool>;
}
