use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes "field absent" (`None`) from "field explicitly null" (`Some(None)`)
/// when deserializing partial updates.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Running,
    Cycling,
    Swimming,
    Hiit,
    Strength,
    Other,
}

impl WorkoutType {
    pub const ALL: &[WorkoutType] = &[
        Self::Running,
        Self::Cycling,
        Self::Swimming,
        Self::Hiit,
        Self::Strength,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
            Self::Hiit => "hiit",
            Self::Strength => "strength",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownVariant {
                kind: "workout type",
                value: s.to_string(),
                expected: Self::ALL.iter().map(|t| t.as_str()).collect(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Lower is better: progress is measured approaching the target from above.
    Weight,
    Running,
    Frequency,
    Other,
}

impl GoalType {
    pub const ALL: &[GoalType] = &[Self::Weight, Self::Running, Self::Frequency, Self::Other];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Running => "running",
            Self::Frequency => "frequency",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownVariant {
                kind: "goal type",
                value: s.to_string(),
                expected: Self::ALL.iter().map(|t| t.as_str()).collect(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{value}'. Must be one of: {}", expected.join(", "))]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: Vec<&'static str>,
}

// --- Users ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub profile_image: Option<Option<String>>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.display_name.is_none()
            && self.profile_image.is_none()
    }
}

impl User {
    #[must_use]
    pub fn from_new(id: i64, new: &NewUser) -> Self {
        Self {
            id,
            username: new.username.clone(),
            password: new.password.clone(),
            display_name: new.display_name.clone(),
            profile_image: new.profile_image.clone(),
        }
    }

    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(ref v) = patch.username {
            self.username.clone_from(v);
        }
        if let Some(ref v) = patch.password {
            self.password.clone_from(v);
        }
        if let Some(ref v) = patch.display_name {
            self.display_name.clone_from(v);
        }
        if let Some(ref v) = patch.profile_image {
            self.profile_image.clone_from(v);
        }
    }
}

/// User as shown to clients: never carries the password.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            profile_image: user.profile_image,
        }
    }
}

// --- Workouts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub name: String,
    pub date: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    /// Miles.
    pub distance: Option<f64>,
    pub calories: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkout {
    pub user_id: i64,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub name: String,
    pub date: DateTime<Utc>,
    pub duration: i64,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub calories: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct WorkoutPatch {
    pub user_id: Option<i64>,
    #[serde(rename = "type")]
    pub workout_type: Option<WorkoutType>,
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub distance: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub calories: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

impl WorkoutPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.workout_type.is_none()
            && self.name.is_none()
            && self.date.is_none()
            && self.duration.is_none()
            && self.distance.is_none()
            && self.calories.is_none()
            && self.notes.is_none()
    }
}

impl Workout {
    #[must_use]
    pub fn from_new(id: i64, new: &NewWorkout) -> Self {
        Self {
            id,
            user_id: new.user_id,
            workout_type: new.workout_type,
            name: new.name.clone(),
            date: new.date,
            duration: new.duration,
            distance: new.distance,
            calories: new.calories,
            notes: new.notes.clone(),
        }
    }

    pub fn apply(&mut self, patch: &WorkoutPatch) {
        if let Some(v) = patch.user_id {
            self.user_id = v;
        }
        if let Some(v) = patch.workout_type {
            self.workout_type = v;
        }
        if let Some(ref v) = patch.name {
            self.name.clone_from(v);
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
        if let Some(v) = patch.duration {
            self.duration = v;
        }
        if let Some(v) = patch.distance {
            self.distance = v;
        }
        if let Some(v) = patch.calories {
            self.calories = v;
        }
        if let Some(ref v) = patch.notes {
            self.notes.clone_from(v);
        }
    }
}

// --- Measurements ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: i64,
    pub user_id: i64,
    pub date: DateTime<Utc>,
    /// Pounds.
    pub weight: Option<f64>,
    /// Percentage, 0–100.
    pub body_fat: Option<f64>,
    pub chest: Option<f64>,
    pub waist: Option<f64>,
    pub hips: Option<f64>,
    pub arms: Option<f64>,
    pub thighs: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetrics {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub body_fat: Option<f64>,
    #[serde(default)]
    pub chest: Option<f64>,
    #[serde(default)]
    pub waist: Option<f64>,
    #[serde(default)]
    pub hips: Option<f64>,
    #[serde(default)]
    pub arms: Option<f64>,
    #[serde(default)]
    pub thighs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    pub user_id: i64,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: BodyMetrics,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct MeasurementPatch {
    pub user_id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub body_fat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub chest: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub waist: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub hips: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub arms: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub thighs: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

impl MeasurementPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.date.is_none()
            && self.weight.is_none()
            && self.body_fat.is_none()
            && self.chest.is_none()
            && self.waist.is_none()
            && self.hips.is_none()
            && self.arms.is_none()
            && self.thighs.is_none()
            && self.notes.is_none()
    }
}

impl Measurement {
    #[must_use]
    pub fn from_new(id: i64, new: &NewMeasurement) -> Self {
        let m = &new.metrics;
        Self {
            id,
            user_id: new.user_id,
            date: new.date,
            weight: m.weight,
            body_fat: m.body_fat,
            chest: m.chest,
            waist: m.waist,
            hips: m.hips,
            arms: m.arms,
            thighs: m.thighs,
            notes: new.notes.clone(),
        }
    }

    pub fn apply(&mut self, patch: &MeasurementPatch) {
        if let Some(v) = patch.user_id {
            self.user_id = v;
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
        let metrics = [
            (&mut self.weight, patch.weight),
            (&mut self.body_fat, patch.body_fat),
            (&mut self.chest, patch.chest),
            (&mut self.waist, patch.waist),
            (&mut self.hips, patch.hips),
            (&mut self.arms, patch.arms),
            (&mut self.thighs, patch.thighs),
        ];
        for (field, update) in metrics {
            if let Some(v) = update {
                *field = v;
            }
        }
        if let Some(ref v) = patch.notes {
            self.notes.clone_from(v);
        }
    }
}

// --- Goals ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target: f64,
    pub current: f64,
    pub unit: String,
    /// `None` means open-ended or recurring.
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target: f64,
    pub current: f64,
    pub unit: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    /// Defaults to the time of creation when absent.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::option_option)]
pub struct GoalPatch {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub goal_type: Option<GoalType>,
    pub target: Option<f64>,
    pub current: Option<f64>,
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl GoalPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.goal_type.is_none()
            && self.target.is_none()
            && self.current.is_none()
            && self.unit.is_none()
            && self.deadline.is_none()
            && self.completed.is_none()
            && self.created_at.is_none()
    }

    /// Patch that only marks the goal as completed.
    #[must_use]
    pub fn complete() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }
}

impl Goal {
    /// Build the stored record; `now` stands in for a missing `created_at`.
    #[must_use]
    pub fn from_new(id: i64, new: &NewGoal, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            title: new.title.clone(),
            description: new.description.clone(),
            goal_type: new.goal_type,
            target: new.target,
            current: new.current,
            unit: new.unit.clone(),
            deadline: new.deadline,
            completed: new.completed,
            created_at: new.created_at.unwrap_or(now),
        }
    }

    pub fn apply(&mut self, patch: &GoalPatch) {
        if let Some(v) = patch.user_id {
            self.user_id = v;
        }
        if let Some(ref v) = patch.title {
            self.title.clone_from(v);
        }
        if let Some(ref v) = patch.description {
            self.description.clone_from(v);
        }
        if let Some(v) = patch.goal_type {
            self.goal_type = v;
        }
        if let Some(v) = patch.target {
            self.target = v;
        }
        if let Some(v) = patch.current {
            self.current = v;
        }
        if let Some(ref v) = patch.unit {
            self.unit.clone_from(v);
        }
        if let Some(v) = patch.deadline {
            self.deadline = v;
        }
        if let Some(v) = patch.completed {
            self.completed = v;
        }
        if let Some(v) = patch.created_at {
            self.created_at = v;
        }
    }
}
