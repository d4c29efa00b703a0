pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "habitgrid",
    about = "Habit tracker, weekly timetable and task manager"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive first-run setup.
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    /// Runs the HTTP API and the daily cleanup job in the foreground.
    Serve,
    /// Creates the starter habits for an owner.
    Seed {
        #[arg(long)]
        owner: String,
    },
    Streak {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Purges expired completed tasks for one owner, or for everyone.
    Cleanup {
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
