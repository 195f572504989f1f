use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::debug;

use fitlog_core::Storage;
use fitlog_core::models::{NewWorkout, User, Workout, WorkoutType};
use fitlog_core::query::WorkoutFilter;

use super::helpers::{format_date, parse_date, print_json, truncate};
use crate::validate;

pub(crate) struct WorkoutInput {
    pub workout_type: String,
    pub name: String,
    pub duration: i64,
    pub distance: Option<f64>,
    pub calories: Option<i64>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

pub(crate) fn cmd_workout_add(
    store: &dyn Storage,
    user: &User,
    input: WorkoutInput,
    json: bool,
) -> Result<()> {
    let workout_type: WorkoutType = input.workout_type.parse()?;
    let new = NewWorkout {
        user_id: user.id,
        workout_type,
        name: input.name,
        date: parse_date(input.date.as_deref())?,
        duration: input.duration,
        distance: input.distance,
        calories: input.calories,
        notes: input.notes,
    };
    validate::new_workout(&new)?;

    let workout = store.create_workout(&new)?;
    debug!(id = workout.id, user_id = user.id, "workout logged");

    if json {
        print_json(&workout)?;
    } else {
        println!(
            "Logged {} ({}, {} min) on {}",
            workout.name,
            workout.workout_type,
            workout.duration,
            format_date(workout.date)
        );
    }
    Ok(())
}

pub(crate) fn cmd_workout_list(
    store: &dyn Storage,
    user: &User,
    workout_type: Option<&str>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let filter = WorkoutFilter {
        workout_type: workout_type.map(str::parse::<WorkoutType>).transpose()?,
        query: search,
    };
    let workouts = filter.apply(store.get_workouts(user.id)?);

    if json {
        print_json(&workouts)?;
    } else if workouts.is_empty() {
        eprintln!("No workouts found. Use `fitlog workout add` to log one.");
    } else {
        print_workout_table(&workouts);
    }
    Ok(())
}

pub(crate) fn cmd_workout_delete(store: &dyn Storage, id: i64, json: bool) -> Result<()> {
    if !store.delete_workout(id)? {
        bail!("Workout {id} not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout {id}");
    }
    Ok(())
}

fn print_workout_table(workouts: &[Workout]) {
    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Type")]
        workout_type: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Min")]
        duration: i64,
        #[tabled(rename = "Miles")]
        distance: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<WorkoutRow> = workouts
        .iter()
        .map(|w| WorkoutRow {
            id: w.id,
            date: format_date(w.date),
            workout_type: w.workout_type.to_string(),
            name: truncate(&w.name, 30),
            duration: w.duration,
            distance: w.distance.map_or("-".into(), |d| format!("{d:.1}")),
            calories: w.calories.map_or("-".into(), |c| c.to_string()),
            notes: w.notes.as_deref().map(|n| truncate(n, 30)).unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitlog_core::memory::MemStorage;
    use fitlog_core::seed::{DEMO_USERNAME, seed_demo_data};

    fn seeded() -> (MemStorage, User) {
        let store = MemStorage::new();
        seed_demo_data(&store, chrono::Utc::now()).unwrap();
        let user = store.get_user_by_username(DEMO_USERNAME).unwrap().unwrap();
        (store, user)
    }

    fn input(workout_type: &str, duration: i64) -> WorkoutInput {
        WorkoutInput {
            workout_type: workout_type.to_string(),
            name: "Laps".to_string(),
            duration,
            distance: Some(1.0),
            calories: None,
            date: Some("yesterday".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_add_workout() {
        let (store, user) = seeded();
        cmd_workout_add(&store, &user, input("swimming", 40), true).unwrap();
        let workouts = store.get_workouts(user.id).unwrap();
        assert_eq!(workouts.len(), 3);
        let types: Vec<WorkoutType> = workouts.iter().map(|w| w.workout_type).collect();
        assert!(types.contains(&WorkoutType::Swimming));
    }

    #[test]
    fn test_add_rejects_bad_type_and_duration() {
        let (store, user) = seeded();
        let err = cmd_workout_add(&store, &user, input("yoga", 40), true).unwrap_err();
        assert!(err.to_string().contains("Invalid workout type 'yoga'"));
        assert!(cmd_workout_add(&store, &user, input("running", 0), true).is_err());
        assert_eq!(store.get_workouts(user.id).unwrap().len(), 2);
    }

    #[test]
    fn test_list_with_unknown_type_fails() {
        let (store, user) = seeded();
        assert!(cmd_workout_list(&store, &user, Some("yoga"), None, true).is_err());
        assert!(cmd_workout_list(&store, &user, Some("running"), None, true).is_ok());
    }

    #[test]
    fn test_delete_missing_workout_fails() {
        let (store, user) = seeded();
        let id = store.get_workouts(user.id).unwrap()[0].id;
        cmd_workout_delete(&store, id, true).unwrap();
        let err = cmd_workout_delete(&store, id, true).unwrap_err();
        assert_eq!(err.to_string(), format!("Workout {id} not found"));
    }
}
