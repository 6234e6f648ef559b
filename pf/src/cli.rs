//! CLI argument parsing for prefstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pf")]
#[command(author, version, about = "Scheduling-preference store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the current preference record
    Show,

    /// Set one field and save the whole record back
    Set {
        /// Field name (target-day, start-time, end-time, schedule-breaks,
        /// schedule-meals, break-length, break-frequency, meal-prefs,
        /// specific-times, task-preference)
        #[arg(required = true)]
        field: String,

        /// New value ("true"/"false" for the switch fields)
        #[arg(required = true)]
        value: String,
    },

    /// Delete the saved record (a fresh default is created on next save)
    Reset,

    /// Print the blob path
    Path,
}
