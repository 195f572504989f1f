use anyhow::{Result, bail};
use chrono::Utc;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::debug;

use fitlog_core::Storage;
use fitlog_core::metrics::GoalStatus;
use fitlog_core::models::{Goal, GoalPatch, GoalType, NewGoal, User};
use fitlog_core::query::GoalStatusFilter;

use super::helpers::{format_date, parse_deadline, print_json, truncate};
use crate::validate;

pub(crate) struct GoalInput {
    pub title: String,
    pub goal_type: String,
    pub target: f64,
    pub current: f64,
    pub unit: String,
    pub deadline: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub(crate) struct GoalChanges {
    pub title: Option<String>,
    pub target: Option<f64>,
    pub current: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<String>,
    pub description: Option<String>,
}

pub(crate) fn cmd_goal_add(
    store: &dyn Storage,
    user: &User,
    input: GoalInput,
    json: bool,
) -> Result<()> {
    let goal_type: GoalType = input.goal_type.parse()?;
    let deadline = match input.deadline.as_deref() {
        Some(d) => parse_deadline(d)?,
        None => None,
    };
    let new = NewGoal {
        user_id: user.id,
        title: input.title,
        description: input.description,
        goal_type,
        target: input.target,
        current: input.current,
        unit: input.unit,
        deadline,
        completed: false,
        created_at: None,
    };
    validate::new_goal(&new)?;

    let goal = store.create_goal(&new)?;
    debug!(id = goal.id, user_id = user.id, "goal created");
    print_goal(goal, json)
}

pub(crate) fn cmd_goal_list(
    store: &dyn Storage,
    user: &User,
    status: &str,
    json: bool,
) -> Result<()> {
    let filter: GoalStatusFilter = status.parse()?;
    let now = Utc::now();
    let statuses: Vec<GoalStatus> = filter
        .apply(store.get_goals(user.id)?)
        .into_iter()
        .map(|g| GoalStatus::new(g, now))
        .collect();

    if json {
        print_json(&statuses)?;
    } else if statuses.is_empty() {
        match filter {
            GoalStatusFilter::All => eprintln!("No goals found. Use `fitlog goal add` to set one."),
            _ => eprintln!("No {filter} goals found."),
        }
    } else {
        print_goal_table(&statuses);
    }
    Ok(())
}

pub(crate) fn cmd_goal_update(
    store: &dyn Storage,
    id: i64,
    changes: GoalChanges,
    json: bool,
) -> Result<()> {
    let patch = GoalPatch {
        title: changes.title,
        target: changes.target,
        current: changes.current,
        unit: changes.unit,
        deadline: changes.deadline.as_deref().map(parse_deadline).transpose()?,
        description: changes.description.map(|d| Some(d).filter(|d| !d.is_empty())),
        ..GoalPatch::default()
    };
    if patch.is_empty() {
        bail!("Nothing to update. Pass at least one of --title, --target, --current, --unit, --deadline, --description");
    }
    validate::goal_patch(&patch)?;

    let Some(goal) = store.update_goal(id, &patch)? else {
        bail!("Goal {id} not found");
    };
    print_goal(goal, json)
}

pub(crate) fn cmd_goal_complete(store: &dyn Storage, id: i64, json: bool) -> Result<()> {
    let Some(goal) = store.update_goal(id, &GoalPatch::complete())? else {
        bail!("Goal {id} not found");
    };
    debug!(id, "goal completed");
    print_goal(goal, json)
}

pub(crate) fn cmd_goal_delete(store: &dyn Storage, id: i64, json: bool) -> Result<()> {
    if !store.delete_goal(id)? {
        bail!("Goal {id} not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted goal {id}");
    }
    Ok(())
}

fn print_goal(goal: Goal, json: bool) -> Result<()> {
    let status = GoalStatus::new(goal, Utc::now());
    if json {
        return print_json(&status);
    }
    let g = &status.goal;
    let suffix = if g.completed { " (completed)" } else { "" };
    println!("Goal {}: {}{suffix}", g.id, g.title);
    println!(
        "  {} {} / {} {}  {}%  {}",
        g.goal_type, g.current, g.target, g.unit, status.progress, status.time_remaining
    );
    if let Some(ref d) = g.description {
        println!("  {d}");
    }
    Ok(())
}

fn print_goal_table(statuses: &[GoalStatus]) {
    #[derive(Tabled)]
    struct GoalRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Type")]
        goal_type: String,
        #[tabled(rename = "Current")]
        current: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Progress")]
        progress: String,
        #[tabled(rename = "Deadline")]
        deadline: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<GoalRow> = statuses
        .iter()
        .map(|s| GoalRow {
            id: s.goal.id,
            title: truncate(&s.goal.title, 30),
            goal_type: s.goal.goal_type.to_string(),
            current: format!("{} {}", s.goal.current, s.goal.unit),
            target: format!("{} {}", s.goal.target, s.goal.unit),
            progress: format!("{}%", s.progress),
            deadline: s.goal.deadline.map_or_else(|| "-".to_string(), format_date),
            status: if s.goal.completed {
                "Completed".to_string()
            } else {
                s.time_remaining.to_string()
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
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
        seed_demo_data(&store, Utc::now()).unwrap();
        let user = store.get_user_by_username(DEMO_USERNAME).unwrap().unwrap();
        (store, user)
    }

    #[test]
    fn test_add_goal_without_deadline() {
        let (store, user) = seeded();
        let input = GoalInput {
            title: "Swim 1 mile".to_string(),
            goal_type: "other".to_string(),
            target: 1.0,
            current: 0.25,
            unit: "miles".to_string(),
            deadline: Some("none".to_string()),
            description: None,
        };
        cmd_goal_add(&store, &user, input, true).unwrap();
        let goals = store.get_goals(user.id).unwrap();
        assert_eq!(goals.len(), 4);
        let added = goals.iter().find(|g| g.title == "Swim 1 mile").unwrap();
        assert_eq!(added.deadline, None);
        assert!(!added.completed);
    }

    #[test]
    fn test_update_clears_deadline_and_description() {
        let (store, user) = seeded();
        let goal = store.get_goals(user.id).unwrap()[0].clone();
        assert!(goal.deadline.is_some());

        let changes = GoalChanges {
            current: Some(26.0),
            deadline: Some("none".to_string()),
            description: Some(String::new()),
            ..GoalChanges::default()
        };
        cmd_goal_update(&store, goal.id, changes, true).unwrap();

        let updated = store.get_goal(goal.id).unwrap().unwrap();
        assert_eq!(updated.current, 26.0);
        assert_eq!(updated.deadline, None);
        assert_eq!(updated.description, None);
        assert_eq!(updated.title, goal.title);
    }

    #[test]
    fn test_update_requires_a_change() {
        let (store, user) = seeded();
        let id = store.get_goals(user.id).unwrap()[0].id;
        assert!(cmd_goal_update(&store, id, GoalChanges::default(), true).is_err());
    }

    #[test]
    fn test_complete_then_filter() {
        let (store, user) = seeded();
        let id = store.get_goals(user.id).unwrap()[1].id;
        cmd_goal_complete(&store, id, true).unwrap();
        assert!(store.get_goal(id).unwrap().unwrap().completed);

        let active = GoalStatusFilter::Active.apply(store.get_goals(user.id).unwrap());
        assert_eq!(active.len(), 2);
        assert!(cmd_goal_list(&store, &user, "completed", false).is_ok());
        assert!(cmd_goal_list(&store, &user, "finished", false).is_err());
    }

    #[test]
    fn test_missing_goal_reports_not_found() {
        let (store, _) = seeded();
        assert_eq!(
            cmd_goal_complete(&store, 42, true).unwrap_err().to_string(),
            "Goal 42 not found"
        );
        assert!(cmd_goal_delete(&store, 42, true).is_err());
    }
}
