//! CLI argument parsing for schedclient

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sc")]
#[command(author, version, about = "Client for the AI schedule generation service", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a schedule in one shot (prompts for clarification answers)
    Run {
        /// Calendar file to schedule around
        #[arg(short, long)]
        file: PathBuf,

        /// Task list text
        #[arg(short, long, conflicts_with = "tasks_file")]
        tasks: Option<String>,

        /// Read the task list from a file instead
        #[arg(long)]
        tasks_file: Option<PathBuf>,

        /// Day to schedule for (YYYY-MM-DD, defaults to the saved
        /// preference)
        #[arg(short, long)]
        day: Option<String>,

        /// Export the accepted schedule to this path when done
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the client log
    Logs {
        /// Follow the log file
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Path of the log file written by `setup_logging`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schedclient")
        .join("logs")
        .join("schedclient.log")
}
