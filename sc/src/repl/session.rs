//! Interactive REPL shell
//!
//! Thin by design: every command maps onto one machine intent, and every
//! command ends by rendering the machine's snapshot. No transition logic
//! lives here.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use prefstore::Preferences;

use crate::session::{Phase, SessionError, SessionMachine, Snapshot};

/// Interactive REPL session
pub struct ReplSession {
    machine: Arc<SessionMachine>,
    service_url: String,
    export_path: PathBuf,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(machine: Arc<SessionMachine>, service_url: String, export_path: PathBuf) -> Self {
        Self {
            machine,
            service_url,
            export_path,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        // Establish the session up front; on failure the user keeps a
        // retry affordance ('start').
        match self.machine.start().await {
            Ok(snapshot) => self.render(&snapshot),
            Err(e) => {
                self.render_error(&e);
                println!("Type {} to retry connecting.", "start".yellow());
            }
        }

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    match self.dispatch(input).await {
                        CommandResult::Continue => continue,
                        CommandResult::Quit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Handle one command line
    async fn dispatch(&mut self, input: &str) -> CommandResult {
        let (cmd, rest) = match input.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match cmd {
            "help" | "h" => self.print_help(),
            "quit" | "q" | "exit" => return CommandResult::Quit,
            "status" => {
                let snapshot = self.machine.snapshot();
                self.render(&snapshot);
            }
            "start" => self.apply(self.machine.start().await),
            "prefs" => self.cmd_prefs(rest),
            "file" => {
                if rest.is_empty() {
                    println!("{} usage: file <path-to-calendar.ics>", "?".yellow());
                } else {
                    let snapshot = self.machine.set_calendar_file(rest);
                    self.render(&snapshot);
                }
            }
            "tasks" => {
                if rest.is_empty() {
                    println!("{} usage: tasks <task list text>", "?".yellow());
                } else {
                    let snapshot = self.machine.set_tasks_text(rest);
                    self.render(&snapshot);
                }
            }
            "generate" | "gen" => self.apply(self.machine.generate().await),
            "answer" => self.cmd_answer(rest),
            "submit" => self.apply(self.machine.submit_answers().await),
            "feedback" => {
                if rest.is_empty() {
                    println!("{} usage: feedback <revision instruction>", "?".yellow());
                } else {
                    self.machine.set_feedback(rest);
                    self.apply(self.machine.submit_feedback().await);
                }
            }
            "accept" => self.apply(self.machine.accept()),
            "export" => {
                let dest = if rest.is_empty() {
                    self.export_path.clone()
                } else {
                    PathBuf::from(rest)
                };
                match self.machine.export(&dest).await {
                    Ok(written) => {
                        println!("{} Exported {} bytes to {}", "✓".green(), written, dest.display());
                    }
                    Err(e) => self.render_error(&e),
                }
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "help".yellow());
            }
        }

        CommandResult::Continue
    }

    /// Show or edit preferences
    fn cmd_prefs(&self, rest: &str) {
        let parts: Vec<&str> = rest.splitn(3, ' ').collect();
        match parts.as_slice() {
            [""] => {
                let snapshot = self.machine.snapshot();
                match snapshot.preferences {
                    Some(prefs) => print_preferences(&prefs),
                    None => {
                        println!("No preferences configured yet.");
                        println!("Set one with {} to save defaults plus your change.", "prefs set <field> <value>".yellow());
                    }
                }
            }
            ["set", field, value] => {
                let mut prefs = self.machine.snapshot().preferences.unwrap_or_default();
                let edited = prefs
                    .set_field(field, value)
                    .and_then(|_| prefs.validate())
                    .map_err(|e| SessionError::Store(e.to_string()));
                match edited {
                    Ok(()) => self.apply(self.machine.set_preferences(prefs)),
                    Err(e) => self.render_error(&e),
                }
            }
            _ => {
                println!("{} usage: prefs | prefs set <field> <value>", "?".yellow());
                println!("Fields: {}", Preferences::FIELDS.join(", "));
            }
        }
    }

    /// Record one clarification answer (1-based index as displayed)
    fn cmd_answer(&self, rest: &str) {
        let usage = || println!("{} usage: answer <question number> <text>", "?".yellow());
        let Some((index, text)) = rest.split_once(' ') else {
            usage();
            return;
        };
        let Ok(number) = index.parse::<usize>() else {
            usage();
            return;
        };
        if number == 0 {
            usage();
            return;
        }
        self.apply(self.machine.set_answer(number - 1, text.trim()));
    }

    /// Render an intent outcome
    fn apply(&self, result: Result<Snapshot, SessionError>) {
        match result {
            Ok(snapshot) => self.render(&snapshot),
            Err(e) => self.render_error(&e),
        }
    }

    /// Render the snapshot for the current phase
    fn render(&self, snapshot: &Snapshot) {
        println!("{} {}", "phase:".dimmed(), snapshot.phase.to_string().bright_cyan());

        match snapshot.phase {
            Phase::Idle => {
                println!("Not connected. Type {} to connect.", "start".yellow());
            }
            Phase::Ready => {
                let file = snapshot
                    .calendar_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                let tasks = if snapshot.tasks_text.is_empty() {
                    "(none)".to_string()
                } else {
                    format!("{} chars", snapshot.tasks_text.len())
                };
                let prefs = if snapshot.preferences.is_some() { "configured" } else { "(none)" };
                println!("  calendar: {}", file);
                println!("  tasks:    {}", tasks);
                println!("  prefs:    {}", prefs);
                println!("Type {} when all three are set.", "generate".yellow());
            }
            Phase::AwaitingClarification => {
                println!();
                println!("{}", "The service needs clarification:".bright_cyan());
                for (i, question) in snapshot.questions.iter().enumerate() {
                    let answer = snapshot.answers.get(&i).map(String::as_str).unwrap_or("");
                    let answer = if answer.is_empty() { "(unanswered)".dimmed().to_string() } else { answer.to_string() };
                    println!("  {}. {}", i + 1, question);
                    println!("     {}", answer);
                }
                println!(
                    "Answer with {}, then {} (partial answers are fine).",
                    "answer <n> <text>".yellow(),
                    "submit".yellow()
                );
            }
            Phase::ScheduleReady | Phase::Accepted => {
                println!();
                println!("{}", "Schedule:".bright_cyan());
                for entry in snapshot.schedule.iter().flatten() {
                    println!("  {} - {}", entry.start_time.bright_white(), entry.duration);
                    println!("    {}", entry.description.dimmed());
                }
                if snapshot.phase == Phase::ScheduleReady {
                    println!(
                        "Revise with {}, approve with {}, or {}.",
                        "feedback <text>".yellow(),
                        "accept".yellow(),
                        "export".yellow()
                    );
                } else {
                    println!("Accepted. {} writes the calendar file.", "export".yellow());
                }
            }
            // Transient phases are only visible from concurrent snapshots
            Phase::AwaitingSession | Phase::Generating | Phase::Revising => {
                println!("  working...");
            }
        }
    }

    /// Render a transition error; inputs stay editable
    fn render_error(&self, error: &SessionError) {
        println!("{} {}", "Error:".red(), error);
        if let Some(api) = error.api_error()
            && !api.is_service_side()
        {
            println!("  Is the service running at {}?", self.service_url.yellow());
        }
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "SchedClient Interactive Shell".bright_cyan().bold());
        println!("Service: {}", self.service_url);
        println!("Type {} for help, {} to quit", "help".yellow(), "quit".yellow());
        println!();
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:26} Connect (or retry connecting) to the service", "start".yellow());
        println!("  {:26} Show preferences", "prefs".yellow());
        println!("  {:26} Change one preference field", "prefs set <field> <value>".yellow());
        println!("  {:26} Select the calendar file", "file <path>".yellow());
        println!("  {:26} Set the task list", "tasks <text>".yellow());
        println!("  {:26} Request a schedule", "generate".yellow());
        println!("  {:26} Answer a clarification question", "answer <n> <text>".yellow());
        println!("  {:26} Submit the answers", "submit".yellow());
        println!("  {:26} Revise the schedule", "feedback <text>".yellow());
        println!("  {:26} Approve the schedule", "accept".yellow());
        println!("  {:26} Download the calendar file", "export [path]".yellow());
        println!("  {:26} Show the current state", "status".yellow());
        println!("  {:26} Exit", "quit".yellow());
        println!();
    }
}

fn print_preferences(prefs: &Preferences) {
    println!("{}", "Preferences:".bright_cyan());
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

/// Result of handling a command
enum CommandResult {
    Continue,
    Quit,
}
