//! Volatile storage kept entirely in process memory.
//!
//! One map per entity plus a private next-id counter per entity. Ids start at
//! 1 and are never handed out twice, even after a delete. State is lost when
//! the process exits.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::{Result, StoreError};
use crate::models::{
    Goal, GoalPatch, Measurement, MeasurementPatch, NewGoal, NewMeasurement, NewUser, NewWorkout,
    User, UserPatch, Workout, WorkoutPatch,
};
use crate::store::{Storage, check_instants};

struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn remove(&mut self, id: i64) -> bool {
        self.rows.remove(&id).is_some()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    workouts: Table<Workout>,
    measurements: Table<Measurement>,
    goals: Table<Goal>,
}

impl Tables {
    fn require_user(&self, user_id: i64) -> Result<()> {
        if self.users.rows.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownUser(user_id))
        }
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .rows
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

#[derive(Default)]
pub struct MemStorage {
    tables: Mutex<Tables>,
}

impl MemStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

impl Storage for MemStorage {
    // --- Users ---

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut tables = self.lock()?;
        if tables.username_taken(&user.username, None) {
            return Err(StoreError::DuplicateUsername(user.username.clone()));
        }
        Ok(tables.users.insert_with(|id| User::from_new(id, user)))
    }

    fn update_user(&self, id: i64, patch: &UserPatch) -> Result<Option<User>> {
        let mut tables = self.lock()?;
        let Some(mut user) = tables.users.get(id) else {
            return Ok(None);
        };
        if let Some(ref name) = patch.username {
            if tables.username_taken(name, Some(id)) {
                return Err(StoreError::DuplicateUsername(name.clone()));
            }
        }
        user.apply(patch);
        tables.users.rows.insert(id, user.clone());
        Ok(Some(user))
    }

    fn count_users(&self) -> Result<i64> {
        Ok(i64::try_from(self.lock()?.users.rows.len()).unwrap_or(i64::MAX))
    }

    // --- Workouts ---

    fn get_workouts(&self, user_id: i64) -> Result<Vec<Workout>> {
        let tables = self.lock()?;
        let mut workouts: Vec<Workout> = tables
            .workouts
            .rows
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        workouts.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(workouts)
    }

    fn get_workout(&self, id: i64) -> Result<Option<Workout>> {
        Ok(self.lock()?.workouts.get(id))
    }

    fn create_workout(&self, workout: &NewWorkout) -> Result<Workout> {
        check_instants([Some(workout.date)])?;
        let mut tables = self.lock()?;
        tables.require_user(workout.user_id)?;
        Ok(tables
            .workouts
            .insert_with(|id| Workout::from_new(id, workout)))
    }

    fn update_workout(&self, id: i64, patch: &WorkoutPatch) -> Result<Option<Workout>> {
        check_instants([patch.date])?;
        let mut tables = self.lock()?;
        let Some(mut workout) = tables.workouts.get(id) else {
            return Ok(None);
        };
        if let Some(user_id) = patch.user_id {
            tables.require_user(user_id)?;
        }
        workout.apply(patch);
        tables.workouts.rows.insert(id, workout.clone());
        Ok(Some(workout))
    }

    fn delete_workout(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.workouts.remove(id))
    }

    // --- Measurements ---

    fn get_measurements(&self, user_id: i64) -> Result<Vec<Measurement>> {
        let tables = self.lock()?;
        let mut measurements: Vec<Measurement> = tables
            .measurements
            .rows
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        measurements.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(measurements)
    }

    fn get_measurement(&self, id: i64) -> Result<Option<Measurement>> {
        Ok(self.lock()?.measurements.get(id))
    }

    fn get_latest_measurement(&self, user_id: i64) -> Result<Option<Measurement>> {
        let tables = self.lock()?;
        Ok(tables
            .measurements
            .rows
            .values()
            .filter(|m| m.user_id == user_id)
            .max_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)))
            .cloned())
    }

    fn create_measurement(&self, measurement: &NewMeasurement) -> Result<Measurement> {
        check_instants([Some(measurement.date)])?;
        let mut tables = self.lock()?;
        tables.require_user(measurement.user_id)?;
        Ok(tables
            .measurements
            .insert_with(|id| Measurement::from_new(id, measurement)))
    }

    fn update_measurement(&self, id: i64, patch: &MeasurementPatch) -> Result<Option<Measurement>> {
        check_instants([patch.date])?;
        let mut tables = self.lock()?;
        let Some(mut measurement) = tables.measurements.get(id) else {
            return Ok(None);
        };
        if let Some(user_id) = patch.user_id {
            tables.require_user(user_id)?;
        }
        measurement.apply(patch);
        tables.measurements.rows.insert(id, measurement.clone());
        Ok(Some(measurement))
    }

    fn delete_measurement(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.measurements.remove(id))
    }

    // --- Goals ---

    fn get_goals(&self, user_id: i64) -> Result<Vec<Goal>> {
        let tables = self.lock()?;
        let mut goals: Vec<Goal> = tables
            .goals
            .rows
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(goals)
    }

    fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        Ok(self.lock()?.goals.get(id))
    }

    fn create_goal(&self, goal: &NewGoal) -> Result<Goal> {
        check_instants([goal.deadline, goal.created_at])?;
        let mut tables = self.lock()?;
        tables.require_user(goal.user_id)?;
        let now = Utc::now();
        Ok(tables.goals.insert_with(|id| Goal::from_new(id, goal, now)))
    }

    fn update_goal(&self, id: i64, patch: &GoalPatch) -> Result<Option<Goal>> {
        check_instants([patch.deadline.flatten(), patch.created_at])?;
        let mut tables = self.lock()?;
        let Some(mut goal) = tables.goals.get(id) else {
            return Ok(None);
        };
        if let Some(user_id) = patch.user_id {
            tables.require_user(user_id)?;
        }
        goal.apply(patch);
        tables.goals.rows.insert(id, goal.clone());
        Ok(Some(goal))
    }

    fn delete_goal(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.goals.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::contract;

    #[test]
    fn test_create_then_get() {
        contract::create_then_get(&MemStorage::new());
    }

    #[test]
    fn test_sub_second_dates_survive() {
        contract::sub_second_dates_survive(&MemStorage::new());
    }

    #[test]
    fn test_empty_patch_is_noop() {
        contract::empty_patch_is_noop(&MemStorage::new());
    }

    #[test]
    fn test_update_merges_and_persists() {
        contract::update_merges_and_persists(&MemStorage::new());
    }

    #[test]
    fn test_missing_ids_report_absence() {
        contract::missing_ids_report_absence(&MemStorage::new());
    }

    #[test]
    fn test_delete_then_ids_not_reused() {
        contract::delete_then_ids_not_reused(&MemStorage::new());
    }

    #[test]
    fn test_by_user_ordering() {
        contract::by_user_ordering(&MemStorage::new());
    }

    #[test]
    fn test_ties_break_on_id() {
        contract::ties_break_on_id(&MemStorage::new());
    }

    #[test]
    fn test_latest_measurement_is_head() {
        contract::latest_measurement_is_head(&MemStorage::new());
    }

    #[test]
    fn test_referential_integrity() {
        contract::referential_integrity(&MemStorage::new());
    }

    #[test]
    fn test_usernames_are_unique() {
        contract::usernames_are_unique(&MemStorage::new());
    }

    #[test]
    fn test_out_of_range_dates_refused() {
        contract::instants_outside_supported_years_are_refused(&MemStorage::new());
    }

    #[test]
    fn test_supported_year_bounds_round_trip() {
        contract::first_and_last_supported_years_round_trip(&MemStorage::new());
    }

    #[test]
    fn test_backends_produce_identical_traces() {
        let volatile = contract::script_trace(&MemStorage::new());
        let durable = contract::script_trace(&Database::open_in_memory().unwrap());
        assert_eq!(volatile.len(), durable.len());
        for (i, (v, d)) in volatile.iter().zip(&durable).enumerate() {
            assert_eq!(v, d, "step {i} differs between backends");
        }
    }

    #[test]
    fn test_usable_through_trait_object() {
        let store: Box<dyn Storage> = Box::new(MemStorage::new());
        let user = store.create_user(&contract::new_user("alex")).unwrap();
        assert_eq!(store.count_users().unwrap(), 1);
        assert_eq!(store.get_user(user.id).unwrap().unwrap().username, "alex");
    }
}
