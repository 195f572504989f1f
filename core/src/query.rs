//! Filters applied to by-user listings before display.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::models::{Goal, UnknownVariant, Workout, WorkoutType};

/// Narrow a workout list by type and/or a case-insensitive text search over
/// name, type, and notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkoutFilter {
    #[serde(rename = "type")]
    pub workout_type: Option<WorkoutType>,
    #[serde(rename = "q")]
    pub query: Option<String>,
}

impl WorkoutFilter {
    #[must_use]
    pub fn matches(&self, workout: &Workout) -> bool {
        if self.workout_type.is_some_and(|t| t != workout.workout_type) {
            return false;
        }
        let Some(query) = self.query.as_deref().map(str::trim) else {
            return true;
        };
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        workout.name.to_lowercase().contains(&needle)
            || workout.workout_type.as_str().contains(&needle)
            || workout
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }

    /// Keep matching workouts, preserving order.
    #[must_use]
    pub fn apply(&self, workouts: Vec<Workout>) -> Vec<Workout> {
        workouts.into_iter().filter(|w| self.matches(w)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl GoalStatusFilter {
    pub const ALL: &[GoalStatusFilter] = &[Self::All, Self::Active, Self::Completed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn matches(self, goal: &Goal) -> bool {
        match self {
            Self::All => true,
            Self::Active => !goal.completed,
            Self::Completed => goal.completed,
        }
    }

    #[must_use]
    pub fn apply(self, goals: Vec<Goal>) -> Vec<Goal> {
        goals.into_iter().filter(|g| self.matches(g)).collect()
    }
}

impl fmt::Display for GoalStatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatusFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| UnknownVariant {
                kind: "goal status",
                value: s.to_string(),
                expected: Self::ALL.iter().map(|f| f.as_str()).collect(),
            })
    }
}
