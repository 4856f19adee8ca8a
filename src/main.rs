use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use valtrix::Config;
use valtrix::gamification::MetricTotals;

mod cli;

#[derive(Parser)]
#[command(name = "valtrix")]
#[command(about = "Valtrix - sales gamification and offline sync")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.valtrix/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A day's activity counts
#[derive(clap::Args)]
struct ActivityArgs {
    #[arg(long, default_value_t = 0)]
    contacts: u64,

    #[arg(long, default_value_t = 0)]
    calls: u64,

    #[arg(long, default_value_t = 0)]
    meetings: u64,

    #[arg(long, default_value_t = 0)]
    deals: u64,

    #[arg(long, default_value_t = 0.0)]
    revenue: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file and seed the achievement catalog
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Insert built-in achievements missing from the database
    Seed,

    /// Record streak activity for a user
    Streak {
        user: String,

        /// Streak type (defaults to the check-in streak)
        #[arg(long = "type")]
        streak_type: Option<String>,

        /// Activity date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Zero a user's current streak run
    ResetStreak {
        user: String,

        #[arg(long = "type")]
        streak_type: Option<String>,
    },

    /// Award points to a user
    Award { user: String, points: u64 },

    /// Process a daily check-in
    CheckIn {
        user: String,

        /// Check-in date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        activity: ActivityArgs,
    },

    /// List achievements with unlock state and progress
    Achievements {
        user: String,

        /// Only show unlocked achievements
        #[arg(long)]
        unlocked: bool,
    },

    /// Show points, level and totals
    Profile { user: String },

    /// Inspect or edit the offline operation queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Show pending operations
    List,

    /// Queue an operation for later sync
    Add {
        /// create, update or delete
        kind: String,
        entity: String,
        /// JSON payload
        #[arg(default_value = "{}")]
        data: String,
    },

    /// Remove one pending operation
    Drop { id: Uuid },

    /// Remove all pending operations
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(Config::global_config_path);
    run(cli.command, &config_path)
}

fn run(command: Commands, config_path: &Path) -> Result<()> {
    let config = || Config::load_or_init(config_path);

    match command {
        Commands::Init { force } => cli::init::init_command(config_path, force),
        Commands::Seed => cli::gamification::seed_command(&config()?),
        Commands::Streak {
            user,
            streak_type,
            date,
        } => cli::gamification::streak_command(&config()?, &user, streak_type, date),
        Commands::ResetStreak { user, streak_type } => {
            cli::gamification::reset_streak_command(&config()?, &user, streak_type)
        }
        Commands::Award { user, points } => {
            cli::gamification::award_command(&config()?, &user, points)
        }
        Commands::CheckIn {
            user,
            date,
            activity,
        } => {
            let activity = MetricTotals {
                contacts: activity.contacts,
                calls: activity.calls,
                meetings: activity.meetings,
                deals: activity.deals,
                revenue: activity.revenue,
            };
            cli::gamification::check_in_command(&config()?, &user, date, activity)
        }
        Commands::Achievements { user, unlocked } => {
            cli::gamification::achievements_command(&config()?, &user, unlocked)
        }
        Commands::Profile { user } => cli::gamification::profile_command(&config()?, &user),
        Commands::Queue { command } => match command {
            QueueCommands::List => cli::queue::list_command(&config()?),
            QueueCommands::Add { kind, entity, data } => {
                cli::queue::add_command(&config()?, &kind, &entity, &data)
            }
            QueueCommands::Drop { id } => cli::queue::drop_command(&config()?, id),
            QueueCommands::Clear => cli::queue::clear_command(&config()?),
        },
    }
}
