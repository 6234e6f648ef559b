//! SchedClient - session-driven schedule generation client
//!
//! CLI entry point: interactive shell by default, one-shot batch mode
//! with `sc run`.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use prefstore::{PrefStore, Preferences};
use schedclient::cli::{Cli, Command, get_log_path};
use schedclient::config::Config;
use schedclient::repl::ReplSession;
use schedclient::{HttpApi, Phase, SessionMachine};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // The shell owns the terminal, so logs go to a file
    let log_path = get_log_path();
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir).context("Failed to create log directory")?;
    }

    // Log level priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    info!("SchedClient loaded config: service={}", config.service.base_url);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run {
            file,
            tasks,
            tasks_file,
            day,
            output,
        }) => {
            debug!(file = %file.display(), ?day, "main: matched Run command");
            cmd_run(&config, file, tasks, tasks_file, day, output).await
        }
        Some(Command::Logs { follow, lines }) => {
            debug!(follow, lines, "main: matched Logs command");
            cmd_logs(follow, lines).await
        }
        None => {
            debug!("main: no command specified, launching shell");
            cmd_shell(&config).await
        }
    }
}

/// Build the machine the shell and batch mode share
fn build_machine(config: &Config) -> Result<Arc<SessionMachine>> {
    let api = Arc::new(HttpApi::from_config(&config.service).context("Failed to create service client")?);
    let store = Arc::new(PrefStore::open(&config.storage.preferences_path).context("Failed to open preference store")?);
    Ok(Arc::new(SessionMachine::new(api, store)))
}

/// Launch the interactive shell (default command)
async fn cmd_shell(config: &Config) -> Result<()> {
    debug!("cmd_shell: called");
    let machine = build_machine(config)?;
    let mut repl = ReplSession::new(
        machine,
        config.service.base_url.clone(),
        config.storage.export_path.clone(),
    );
    repl.run().await
}

/// Drive one full generation to completion (batch mode)
async fn cmd_run(
    config: &Config,
    file: PathBuf,
    tasks: Option<String>,
    tasks_file: Option<PathBuf>,
    day: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    debug!("cmd_run: called");
    let tasks_text = match (tasks, tasks_file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path).context(format!("Failed to read {}", path.display()))?,
        (None, None) => return Err(eyre::eyre!("Provide the task list with --tasks or --tasks-file")),
    };

    if let Some(ref day) = day {
        chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| eyre::eyre!("invalid --day '{}' (want YYYY-MM-DD): {}", day, e))?;
    }

    let machine = build_machine(config)?;

    let snapshot = machine.start().await.context("Could not establish a session")?;
    println!("Session established ({})", snapshot.session_id.as_deref().unwrap_or("?"));

    let mut prefs = match snapshot.preferences {
        Some(prefs) => prefs,
        None => {
            debug!("cmd_run: no saved preferences, using defaults");
            println!("No saved preferences; using defaults (customize with the 'pf' tool)");
            Preferences::default()
        }
    };
    if let Some(day) = day {
        prefs.target_day = day;
    }
    machine.set_preferences(prefs)?;

    machine.set_calendar_file(&file);
    machine.set_tasks_text(tasks_text);

    println!("Generating schedule...");
    let mut snapshot = machine.generate().await?;

    // The service may need answers before it can produce a schedule
    while snapshot.phase == Phase::AwaitingClarification {
        println!();
        println!("The service needs clarification (empty answer to skip):");
        for (i, question) in snapshot.questions.iter().enumerate() {
            print!("  {} ", question);
            std::io::stdout().flush()?;
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            let answer = answer.trim();
            if !answer.is_empty() {
                machine.set_answer(i, answer)?;
            }
        }
        println!("Submitting answers...");
        snapshot = machine.submit_answers().await?;
    }

    println!();
    println!("Schedule:");
    for entry in snapshot.schedule.iter().flatten() {
        println!("  {} - {}", entry.start_time, entry.duration);
        println!("    {}", entry.description);
    }

    if let Some(dest) = output {
        machine.accept()?;
        let written = machine.export(&dest).await?;
        println!();
        println!("✓ Exported {} bytes to {}", written, dest.display());
    } else {
        println!();
        println!("Run `sc` without a subcommand to revise interactively, or re-run with --output to export.");
    }

    Ok(())
}

/// Show logs
async fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    debug!(follow, lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        debug!(?log_path, "cmd_logs: log file does not exist");
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        debug!(?log_path, "cmd_logs: following log file");
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        // Use tail -f for following
        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        debug!(?log_path, lines, "cmd_logs: reading last N lines");
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = if all_lines.len() > lines { all_lines.len() - lines } else { 0 };

        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
