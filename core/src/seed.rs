use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{
    BodyMetrics, GoalType, NewGoal, NewMeasurement, NewUser, NewWorkout, WorkoutType,
};
use crate::store::Storage;

pub const DEMO_USERNAME: &str = "alex";

/// Populate an empty store with a demo user and some activity.
///
/// Does nothing if any user already exists. Returns whether data was inserted.
pub fn seed_demo_data(store: &dyn Storage, now: DateTime<Utc>) -> Result<bool> {
    let existing = store.count_users()?;
    if existing > 0 {
        debug!(users = existing, "store already populated, skipping seed");
        return Ok(false);
    }

    let user = store.create_user(&NewUser {
        username: DEMO_USERNAME.to_string(),
        password: "password".to_string(),
        display_name: Some("Alex Johnson".to_string()),
        profile_image: Some(String::new()),
    })?;

    for workout in demo_workouts(user.id, now) {
        store.create_workout(&workout)?;
    }

    store.create_measurement(&NewMeasurement {
        user_id: user.id,
        date: now,
        metrics: BodyMetrics {
            weight: Some(172.0),
            body_fat: Some(18.0),
            chest: Some(42.0),
            waist: Some(34.0),
            hips: Some(40.0),
            arms: Some(14.0),
            thighs: Some(22.0),
        },
        notes: Some("Morning measurement".to_string()),
    })?;

    for goal in demo_goals(user.id, now) {
        store.create_goal(&goal)?;
    }

    info!(user_id = user.id, username = %user.username, "seeded demo data");
    Ok(true)
}

fn demo_workouts(user_id: i64, now: DateTime<Utc>) -> [NewWorkout; 2] {
    [
        NewWorkout {
            user_id,
            workout_type: WorkoutType::Running,
            name: "Morning Run".to_string(),
            date: now,
            duration: 27,
            distance: Some(3.2),
            calories: Some(320),
            notes: Some("Felt good today".to_string()),
        },
        NewWorkout {
            user_id,
            workout_type: WorkoutType::Cycling,
            name: "Cycling Session".to_string(),
            date: now - Duration::days(1),
            duration: 45,
            distance: Some(8.5),
            calories: Some(450),
            notes: Some("Hilly route".to_string()),
        },
    ]
}

fn demo_goals(user_id: i64, now: DateTime<Utc>) -> [NewGoal; 3] {
    [
        NewGoal {
            user_id,
            title: "Run 5K under 25 minutes".to_string(),
            description: Some("Improve running speed".to_string()),
            goal_type: GoalType::Running,
            target: 25.0,
            current: 27.0,
            unit: "minutes".to_string(),
            deadline: Some(now + Duration::days(7)),
            completed: false,
            created_at: Some(now),
        },
        NewGoal {
            user_id,
            title: "Lose 10 pounds".to_string(),
            description: Some("Weight loss goal".to_string()),
            goal_type: GoalType::Weight,
            target: 165.0,
            current: 172.0,
            unit: "lbs".to_string(),
            deadline: Some(now + Duration::days(25)),
            completed: false,
            created_at: Some(now),
        },
        NewGoal {
            user_id,
            title: "Workout 5 days a week".to_string(),
            description: Some("Consistency goal".to_string()),
            goal_type: GoalType::Frequency,
            target: 5.0,
            current: 3.0,
            unit: "days".to_string(),
            deadline: None,
            completed: false,
            created_at: Some(now),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::memory::MemStorage;
    use crate::metrics::{TimeRemaining, progress_percent, time_remaining};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap()
    }

    fn assert_seeds_once(store: &dyn Storage) {
        assert!(seed_demo_data(store, now()).unwrap());
        assert!(!seed_demo_data(store, now()).unwrap());
        assert_eq!(store.count_users().unwrap(), 1);

        let user = store.get_user_by_username(DEMO_USERNAME).unwrap().unwrap();
        assert_eq!(store.get_workouts(user.id).unwrap().len(), 2);
        assert_eq!(store.get_measurements(user.id).unwrap().len(), 1);
        assert_eq!(store.get_goals(user.id).unwrap().len(), 3);
    }

    #[test]
    fn test_seed_is_idempotent_in_memory() {
        assert_seeds_once(&MemStorage::new());
    }

    #[test]
    fn test_seed_is_idempotent_on_disk() {
        assert_seeds_once(&Database::open_in_memory().unwrap());
    }

    #[test]
    fn test_seed_skips_store_with_any_user() {
        let store = MemStorage::new();
        store
            .create_user(&NewUser {
                username: "sam".to_string(),
                password: "pw".to_string(),
                display_name: None,
                profile_image: None,
            })
            .unwrap();
        assert!(!seed_demo_data(&store, now()).unwrap());
        assert!(store.get_user_by_username(DEMO_USERNAME).unwrap().is_none());
    }

    #[test]
    fn test_seeded_records() {
        let store = MemStorage::new();
        seed_demo_data(&store, now()).unwrap();
        let user = store.get_user_by_username(DEMO_USERNAME).unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alex Johnson"));
        assert_eq!(user.profile_image.as_deref(), Some(""));

        let workouts = store.get_workouts(user.id).unwrap();
        assert_eq!(workouts[0].name, "Morning Run");
        assert_eq!(workouts[1].name, "Cycling Session");
        assert_eq!(workouts[1].date, now() - Duration::days(1));

        let latest = store.get_latest_measurement(user.id).unwrap().unwrap();
        assert_eq!(latest.weight, Some(172.0));
        assert_eq!(latest.body_fat, Some(18.0));

        let goals = store.get_goals(user.id).unwrap();
        let types: Vec<GoalType> = goals.iter().map(|g| g.goal_type).collect();
        assert_eq!(
            types,
            [GoalType::Running, GoalType::Weight, GoalType::Frequency]
        );
        assert!(goals.iter().all(|g| !g.completed && g.created_at == now()));

        let progress: Vec<u8> = goals.iter().map(progress_percent).collect();
        assert_eq!(progress, [100, 50, 60]);

        let remaining: Vec<TimeRemaining> = goals
            .iter()
            .map(|g| time_remaining(g.deadline, now()))
            .collect();
        let expected = [
            TimeRemaining::Days(7),
            TimeRemaining::Days(25),
            TimeRemaining::Ongoing,
        ];
        assert_eq!(remaining, expected);
    }
}
