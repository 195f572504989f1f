mod commands;
mod config;
mod server;
mod validate;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    GoalChanges, GoalInput, WorkoutInput, cmd_goal_add, cmd_goal_complete, cmd_goal_delete,
    cmd_goal_list, cmd_goal_update, cmd_measure_add, cmd_measure_delete, cmd_measure_latest,
    cmd_measure_list, cmd_seed, cmd_workout_add, cmd_workout_delete, cmd_workout_list,
    resolve_user,
};
use crate::config::Config;
use fitlog_core::Storage;
use fitlog_core::db::Database;
use fitlog_core::memory::MemStorage;
use fitlog_core::models::BodyMetrics;
use fitlog_core::seed::{DEMO_USERNAME, seed_demo_data};

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "Track workouts, body measurements, and fitness goals"
)]
struct Cli {
    /// Use a throwaway in-memory store instead of the database file (not with `seed`)
    #[arg(long, global = true)]
    memory: bool,
    /// Username to act as
    #[arg(short, long, global = true, default_value = DEMO_USERNAME)]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Skip demo data seeding on startup
        #[arg(long)]
        no_seed: bool,
    },
    /// Insert demo data if the store has no users yet
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log and review workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Record body measurements
    Measure {
        #[command(subcommand)]
        command: MeasureCommands,
    },
    /// Set and track goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Log a workout
    Add {
        /// Workout type: running, cycling, swimming, hiit, strength, other
        #[arg(value_name = "TYPE")]
        workout_type: String,
        /// Workout name (e.g. "Morning Run")
        name: String,
        /// Duration in minutes
        #[arg(short, long)]
        duration: i64,
        /// Distance in miles
        #[arg(long)]
        distance: Option<f64>,
        /// Calories burned
        #[arg(long)]
        calories: Option<i64>,
        /// Date (YYYY-MM-DD, RFC 3339, or today/yesterday/tomorrow; default: now)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List workouts, newest first
    List {
        /// Only show this workout type
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        workout_type: Option<String>,
        /// Case-insensitive search over name, type, and notes
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout by ID
    Delete {
        /// Workout ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MeasureCommands {
    /// Record a measurement (any subset of metrics)
    Add {
        /// Body weight in lbs
        #[arg(long)]
        weight: Option<f64>,
        /// Body fat percentage (0-100)
        #[arg(long)]
        body_fat: Option<f64>,
        /// Chest in inches
        #[arg(long)]
        chest: Option<f64>,
        /// Waist in inches
        #[arg(long)]
        waist: Option<f64>,
        /// Hips in inches
        #[arg(long)]
        hips: Option<f64>,
        /// Arms in inches
        #[arg(long)]
        arms: Option<f64>,
        /// Thighs in inches
        #[arg(long)]
        thighs: Option<f64>,
        /// Date (YYYY-MM-DD, RFC 3339, or today/yesterday/tomorrow; default: now)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List measurements, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent measurement
    Latest {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a measurement by ID
    Delete {
        /// Measurement ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Goal type: weight, running, frequency, other
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        goal_type: String,
        /// Target value
        #[arg(long, allow_negative_numbers = true)]
        target: f64,
        /// Current value
        #[arg(long, allow_negative_numbers = true)]
        current: f64,
        /// Unit for target and current (e.g. lbs, minutes, days)
        #[arg(long)]
        unit: String,
        /// Deadline (YYYY-MM-DD, RFC 3339, or "none" for an ongoing goal)
        #[arg(long)]
        deadline: Option<String>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List goals with progress and time remaining
    List {
        /// Which goals to show: active, completed, all
        #[arg(long, default_value = "all")]
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a goal
    Update {
        /// Goal ID
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        target: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        current: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        /// New deadline, or "none" to make the goal ongoing
        #[arg(long)]
        deadline: Option<String>,
        /// New description (empty string clears it)
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a goal as completed
    Complete {
        /// Goal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a goal by ID
    Delete {
        /// Goal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_store(memory: bool) -> Result<Box<dyn Storage>> {
    if memory {
        debug!("using in-memory store");
        return Ok(Box::new(MemStorage::new()));
    }
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;
    debug!(path = %config.db_path.display(), "using database");
    Ok(Box::new(db))
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    if cli.memory && matches!(cli.command, Commands::Seed { .. }) {
        bail!("`seed` has no effect with --memory: the in-memory store is discarded on exit");
    }
    let store = open_store(cli.memory)?;

    // A fresh in-memory store has no users, so give one-off commands something to act on.
    if cli.memory && !matches!(cli.command, Commands::Serve { .. } | Commands::Seed { .. }) {
        seed_demo_data(store.as_ref(), chrono::Utc::now())
            .context("failed to seed in-memory store")?;
    }

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_seed,
        } => {
            if !no_seed {
                seed_demo_data(store.as_ref(), chrono::Utc::now())
                    .context("failed to seed demo data")?;
            }
            server::start_server(store, port, &bind).await
        }
        Commands::Seed { json } => cmd_seed(store.as_ref(), json),
        Commands::Workout { command } => {
            let store = store.as_ref();
            let user = resolve_user(store, &cli.user)?;
            match command {
                WorkoutCommands::Add {
                    workout_type,
                    name,
                    duration,
                    distance,
                    calories,
                    date,
                    notes,
                    json,
                } => cmd_workout_add(
                    store,
                    &user,
                    WorkoutInput {
                        workout_type,
                        name,
                        duration,
                        distance,
                        calories,
                        date,
                        notes,
                    },
                    json,
                ),
                WorkoutCommands::List {
                    workout_type,
                    search,
                    json,
                } => cmd_workout_list(store, &user, workout_type.as_deref(), search, json),
                WorkoutCommands::Delete { id, json } => cmd_workout_delete(store, id, json),
            }
        }
        Commands::Measure { command } => {
            let store = store.as_ref();
            let user = resolve_user(store, &cli.user)?;
            match command {
                MeasureCommands::Add {
                    weight,
                    body_fat,
                    chest,
                    waist,
                    hips,
                    arms,
                    thighs,
                    date,
                    notes,
                    json,
                } => cmd_measure_add(
                    store,
                    &user,
                    BodyMetrics {
                        weight,
                        body_fat,
                        chest,
                        waist,
                        hips,
                        arms,
                        thighs,
                    },
                    date.as_deref(),
                    notes,
                    json,
                ),
                MeasureCommands::List { json } => cmd_measure_list(store, &user, json),
                MeasureCommands::Latest { json } => cmd_measure_latest(store, &user, json),
                MeasureCommands::Delete { id, json } => cmd_measure_delete(store, id, json),
            }
        }
        Commands::Goal { command } => {
            let store = store.as_ref();
            let user = resolve_user(store, &cli.user)?;
            match command {
                GoalCommands::Add {
                    title,
                    goal_type,
                    target,
                    current,
                    unit,
                    deadline,
                    description,
                    json,
                } => cmd_goal_add(
                    store,
                    &user,
                    GoalInput {
                        title,
                        goal_type,
                        target,
                        current,
                        unit,
                        deadline,
                        description,
                    },
                    json,
                ),
                GoalCommands::List { status, json } => cmd_goal_list(store, &user, &status, json),
                GoalCommands::Update {
                    id,
                    title,
                    target,
                    current,
                    unit,
                    deadline,
                    description,
                    json,
                } => cmd_goal_update(
                    store,
                    id,
                    GoalChanges {
                        title,
                        target,
                        current,
                        unit,
                        deadline,
                        description,
                    },
                    json,
                ),
                GoalCommands::Complete { id, json } => cmd_goal_complete(store, id, json),
                GoalCommands::Delete { id, json } => cmd_goal_delete(store, id, json),
            }
        }
    }
}
