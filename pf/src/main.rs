use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use prefstore::PrefStore;
use prefstore::cli::{Cli, Command};
use prefstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("prefstore starting");

    let store = PrefStore::open(&config.store_path)?;

    match cli.command {
        Command::Show => match store.load()? {
            Some(prefs) => {
                println!("{}", "Preferences".cyan());
                println!("  target-day:       {}", prefs.target_day);
                println!("  start-time:       {}", prefs.start_time);
                println!("  end-time:         {}", prefs.end_time);
                println!("  schedule-breaks:  {}", prefs.schedule_breaks);
                println!("  schedule-meals:   {}", prefs.schedule_meals);
                println!("  break-length:     {}", prefs.break_length);
                println!("  break-frequency:  {}", prefs.break_frequency);
                println!("  meal-prefs:       {}", prefs.meal_prefs);
                println!("  specific-times:   {}", prefs.specific_times);
                println!("  task-preference:  {}", prefs.task_preference);
            }
            None => println!("No preferences saved yet (defaults apply on first save)"),
        },
        Command::Set { field, value } => {
            let mut prefs = store.load()?.unwrap_or_default();
            prefs.set_field(&field, &value)?;
            prefs.validate()?;
            store.save(&prefs)?;
            println!("{} {} = {}", "✓".green(), field, value);
        }
        Command::Reset => {
            store.clear()?;
            println!("{} Preferences reset", "✓".green());
        }
        Command::Path => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}
