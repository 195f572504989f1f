//! Input checks applied before records reach the store.

use anyhow::{Result, bail};

use fitlog_core::models::{
    BodyMetrics, GoalPatch, MeasurementPatch, NewGoal, NewMeasurement, NewWorkout, WorkoutPatch,
};

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} must not be empty");
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        bail!("{field} must be a finite number");
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        bail!("{field} must not be negative");
    }
    Ok(())
}

fn duration(value: i64) -> Result<()> {
    if value <= 0 {
        bail!("duration must be greater than 0");
    }
    Ok(())
}

fn calories(value: i64) -> Result<()> {
    if value < 0 {
        bail!("calories must not be negative");
    }
    Ok(())
}

fn body_fat(value: f64) -> Result<()> {
    non_negative("bodyFat", value)?;
    if value > 100.0 {
        bail!("bodyFat must be between 0 and 100");
    }
    Ok(())
}

pub(crate) fn new_workout(w: &NewWorkout) -> Result<()> {
    non_empty("name", &w.name)?;
    duration(w.duration)?;
    if let Some(d) = w.distance {
        non_negative("distance", d)?;
    }
    if let Some(c) = w.calories {
        calories(c)?;
    }
    Ok(())
}

pub(crate) fn workout_patch(p: &WorkoutPatch) -> Result<()> {
    if let Some(ref name) = p.name {
        non_empty("name", name)?;
    }
    if let Some(d) = p.duration {
        duration(d)?;
    }
    if let Some(Some(d)) = p.distance {
        non_negative("distance", d)?;
    }
    if let Some(Some(c)) = p.calories {
        calories(c)?;
    }
    Ok(())
}

fn metrics(values: impl IntoIterator<Item = (&'static str, Option<f64>)>) -> Result<()> {
    for (field, value) in values {
        let Some(v) = value else { continue };
        if field == "bodyFat" {
            body_fat(v)?;
        } else {
            non_negative(field, v)?;
        }
    }
    Ok(())
}

pub(crate) fn new_measurement(m: &NewMeasurement) -> Result<()> {
    let BodyMetrics {
        weight,
        body_fat,
        chest,
        waist,
        hips,
        arms,
        thighs,
    } = &m.metrics;
    metrics([
        ("weight", *weight),
        ("bodyFat", *body_fat),
        ("chest", *chest),
        ("waist", *waist),
        ("hips", *hips),
        ("arms", *arms),
        ("thighs", *thighs),
    ])
}

pub(crate) fn measurement_patch(p: &MeasurementPatch) -> Result<()> {
    metrics([
        ("weight", p.weight.flatten()),
        ("bodyFat", p.body_fat.flatten()),
        ("chest", p.chest.flatten()),
        ("waist", p.waist.flatten()),
        ("hips", p.hips.flatten()),
        ("arms", p.arms.flatten()),
        ("thighs", p.thighs.flatten()),
    ])
}

pub(crate) fn new_goal(g: &NewGoal) -> Result<()> {
    non_empty("title", &g.title)?;
    non_empty("unit", &g.unit)?;
    finite("target", g.target)?;
    finite("current", g.current)?;
    Ok(())
}

pub(crate) fn goal_patch(p: &GoalPatch) -> Result<()> {
    if let Some(ref title) = p.title {
        non_empty("title", title)?;
    }
    if let Some(ref unit) = p.unit {
        non_empty("unit", unit)?;
    }
    if let Some(t) = p.target {
        finite("target", t)?;
    }
    if let Some(c) = p.current {
        finite("current", c)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fitlog_core::models::{GoalType, WorkoutType};

    fn workout() -> NewWorkout {
        NewWorkout {
            user_id: 1,
            workout_type: WorkoutType::Running,
            name: "Run".to_string(),
            date: Utc::now(),
            duration: 30,
            distance: Some(3.0),
            calories: Some(300),
            notes: None,
        }
    }

    #[test]
    fn test_valid_workout() {
        assert!(new_workout(&workout()).is_ok());
    }

    #[test]
    fn test_workout_duration_must_be_positive() {
        let mut w = workout();
        w.duration = 0;
        assert_eq!(
            new_workout(&w).unwrap_err().to_string(),
            "duration must be greater than 0"
        );
    }

    #[test]
    fn test_workout_rejects_blank_name_and_negatives() {
        let mut w = workout();
        w.name = "  ".to_string();
        assert!(new_workout(&w).is_err());

        let mut w = workout();
        w.distance = Some(-1.0);
        assert!(new_workout(&w).is_err());

        let mut w = workout();
        w.calories = Some(-5);
        assert!(new_workout(&w).is_err());
    }

    #[test]
    fn test_workout_patch_checks_present_fields_only() {
        assert!(workout_patch(&WorkoutPatch::default()).is_ok());
        let patch = WorkoutPatch {
            distance: Some(None),
            ..WorkoutPatch::default()
        };
        assert!(workout_patch(&patch).is_ok());
        let patch = WorkoutPatch {
            duration: Some(-10),
            ..WorkoutPatch::default()
        };
        assert!(workout_patch(&patch).is_err());
    }

    #[test]
    fn test_body_fat_range() {
        let mut m = NewMeasurement {
            user_id: 1,
            date: Utc::now(),
            metrics: BodyMetrics {
                body_fat: Some(100.0),
                ..BodyMetrics::default()
            },
            notes: None,
        };
        assert!(new_measurement(&m).is_ok());
        m.metrics.body_fat = Some(100.5);
        assert_eq!(
            new_measurement(&m).unwrap_err().to_string(),
            "bodyFat must be between 0 and 100"
        );
        m.metrics.body_fat = None;
        m.metrics.waist = Some(-2.0);
        assert_eq!(
            new_measurement(&m).unwrap_err().to_string(),
            "waist must not be negative"
        );
    }

    #[test]
    fn test_measurement_patch() {
        let patch = MeasurementPatch {
            weight: Some(Some(f64::NAN)),
            ..MeasurementPatch::default()
        };
        assert!(measurement_patch(&patch).is_err());
        let patch = MeasurementPatch {
            body_fat: Some(None),
            ..MeasurementPatch::default()
        };
        assert!(measurement_patch(&patch).is_ok());
    }

    #[test]
    fn test_goal_requires_title_and_unit() {
        let mut g = NewGoal {
            user_id: 1,
            title: "Run more".to_string(),
            description: None,
            goal_type: GoalType::Running,
            target: 10.0,
            current: 0.0,
            unit: "miles".to_string(),
            deadline: None,
            completed: false,
            created_at: None,
        };
        assert!(new_goal(&g).is_ok());
        g.unit = String::new();
        assert!(new_goal(&g).is_err());

        let patch = GoalPatch {
            title: Some(String::new()),
            ..GoalPatch::default()
        };
        assert!(goal_patch(&patch).is_err());
        assert!(goal_patch(&GoalPatch::complete()).is_ok());
    }
}
