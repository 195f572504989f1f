use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::debug;

use fitlog_core::Storage;
use fitlog_core::models::{BodyMetrics, Measurement, NewMeasurement, User};

use super::helpers::{format_date, format_opt, parse_date, print_json};
use crate::validate;

pub(crate) fn cmd_measure_add(
    store: &dyn Storage,
    user: &User,
    metrics: BodyMetrics,
    date: Option<&str>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let new = NewMeasurement {
        user_id: user.id,
        date: parse_date(date)?,
        metrics,
        notes,
    };
    validate::new_measurement(&new)?;

    let measurement = store.create_measurement(&new)?;
    debug!(
        id = measurement.id,
        user_id = user.id,
        "measurement recorded"
    );

    if json {
        print_json(&measurement)?;
    } else {
        let date = format_date(measurement.date);
        println!("Recorded measurement {} on {date}", measurement.id);
        print_measurement_detail(&measurement);
    }
    Ok(())
}

pub(crate) fn cmd_measure_list(store: &dyn Storage, user: &User, json: bool) -> Result<()> {
    let measurements = store.get_measurements(user.id)?;

    if json {
        print_json(&measurements)?;
    } else if measurements.is_empty() {
        eprintln!("No measurements found. Use `fitlog measure add` to record one.");
    } else {
        print_measurement_table(&measurements);
    }
    Ok(())
}

pub(crate) fn cmd_measure_latest(store: &dyn Storage, user: &User, json: bool) -> Result<()> {
    let Some(latest) = store.get_latest_measurement(user.id)? else {
        bail!("No measurements found. Use `fitlog measure add` to record one.");
    };

    if json {
        print_json(&latest)?;
    } else {
        println!("Latest measurement ({})", format_date(latest.date));
        print_measurement_detail(&latest);
    }
    Ok(())
}

pub(crate) fn cmd_measure_delete(store: &dyn Storage, id: i64, json: bool) -> Result<()> {
    if !store.delete_measurement(id)? {
        bail!("Measurement {id} not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted measurement {id}");
    }
    Ok(())
}

fn print_measurement_detail(m: &Measurement) {
    let fields = [
        ("Weight", m.weight, " lbs"),
        ("Body fat", m.body_fat, "%"),
        ("Chest", m.chest, " in"),
        ("Waist", m.waist, " in"),
        ("Hips", m.hips, " in"),
        ("Arms", m.arms, " in"),
        ("Thighs", m.thighs, " in"),
    ];
    for (label, value, unit) in fields {
        if value.is_some() {
            println!("  {label:<9} {}", format_opt(value, unit));
        }
    }
    if let Some(ref n) = m.notes {
        println!("  Notes:    {n}");
    }
}

fn print_measurement_table(measurements: &[Measurement]) {
    #[derive(Tabled)]
    struct MeasurementRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Body fat")]
        body_fat: String,
        #[tabled(rename = "Chest")]
        chest: String,
        #[tabled(rename = "Waist")]
        waist: String,
        #[tabled(rename = "Hips")]
        hips: String,
        #[tabled(rename = "Arms")]
        arms: String,
        #[tabled(rename = "Thighs")]
        thighs: String,
    }

    let rows: Vec<MeasurementRow> = measurements
        .iter()
        .map(|m| MeasurementRow {
            id: m.id,
            date: format_date(m.date),
            weight: format_opt(m.weight, ""),
            body_fat: format_opt(m.body_fat, "%"),
            chest: format_opt(m.chest, ""),
            waist: format_opt(m.waist, ""),
            hips: format_opt(m.hips, ""),
            arms: format_opt(m.arms, ""),
            thighs: format_opt(m.thighs, ""),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..9)).with(Alignment::right()))
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

    #[test]
    fn test_add_becomes_latest() {
        let (store, user) = seeded();
        let metrics = BodyMetrics {
            weight: Some(170.5),
            ..BodyMetrics::default()
        };
        cmd_measure_add(&store, &user, metrics, Some("tomorrow"), None, true).unwrap();
        let latest = store.get_latest_measurement(user.id).unwrap().unwrap();
        assert_eq!(latest.weight, Some(170.5));
        assert_eq!(latest.body_fat, None);
    }

    #[test]
    fn test_add_rejects_out_of_range_body_fat() {
        let (store, user) = seeded();
        let metrics = BodyMetrics {
            body_fat: Some(140.0),
            ..BodyMetrics::default()
        };
        assert!(cmd_measure_add(&store, &user, metrics, None, None, true).is_err());
        assert_eq!(store.get_measurements(user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_latest_without_measurements_fails_in_both_modes() {
        let store = MemStorage::new();
        let user = store
            .create_user(&fitlog_core::models::NewUser {
                username: "sam".to_string(),
                password: "pw".to_string(),
                display_name: None,
                profile_image: None,
            })
            .unwrap();
        for json in [false, true] {
            let err = cmd_measure_latest(&store, &user, json).unwrap_err();
            assert!(err.to_string().starts_with("No measurements found"));
        }
    }

    #[test]
    fn test_delete_missing_measurement_fails() {
        let (store, _) = seeded();
        assert!(cmd_measure_delete(&store, 99, false).is_err());
    }
}
