use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "focusguard-ctl")]
#[command(about = "FocusGuard usage enforcement control tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage monitored applications
    App {
        #[command(subcommand)]
        action: AppAction,
    },

    /// Show engine state and today's statistics
    Status,

    /// Show statistics for recent days
    Stats {
        #[arg(short, long, default_value_t = 7, help = "Number of days to show")]
        days: u32,
    },

    /// Present a problem for the blocked application
    Challenge,

    /// Answer the presented problem
    Answer {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Take a break instead of solving a problem
    Break,

    /// Skip the presented problem
    Skip,

    /// Set the problem difficulty (EASY, MEDIUM or HARD)
    Difficulty { level: String },

    /// Reset today's statistics
    ResetStats,

    /// Reset today's usage for every application
    ResetUsage,
}

#[derive(Subcommand)]
enum AppAction {
    List,
    Add {
        package_id: String,
        #[arg(short, long, help = "Display name, defaults to the package id")]
        name: Option<String>,
        #[arg(short, long, help = "Daily limit in minutes")]
        limit: u32,
    },
    Remove {
        package_id: String,
    },
    SetLimit {
        package_id: String,
        minutes: u32,
    },
    Enable {
        package_id: String,
    },
    Disable {
        package_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::App { action } => match action {
            AppAction::List => commands::apps::list().await?,
            AppAction::Add { package_id, name, limit } => {
                commands::apps::add(&package_id, name.as_deref(), limit).await?
            }
            AppAction::Remove { package_id } => commands::apps::remove(&package_id).await?,
            AppAction::SetLimit { package_id, minutes } => {
                commands::apps::set_limit(&package_id, minutes).await?
            }
            AppAction::Enable { package_id } => {
                commands::apps::set_enabled(&package_id, true).await?
            }
            AppAction::Disable { package_id } => {
                commands::apps::set_enabled(&package_id, false).await?
            }
        },
        Commands::Status => commands::status::show().await?,
        Commands::Stats { days } => commands::stats::recent(days).await?,
        Commands::Challenge => commands::challenge::request().await?,
        Commands::Answer { value } => commands::challenge::answer(value).await?,
        Commands::Break => commands::challenge::take_break().await?,
        Commands::Skip => commands::challenge::skip().await?,
        Commands::Difficulty { level } => commands::challenge::set_difficulty(&level).await?,
        Commands::ResetStats => commands::stats::reset_today().await?,
        Commands::ResetUsage => commands::apps::reset_usage().await?,
    }

    Ok(())
}
