//! Core PrefStore implementation

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// User scheduling preferences
///
/// Field names serialize in camelCase because the record travels verbatim
/// inside the `preferences` object of a generation request. All free-text
/// fields default to empty; the work window defaults to 07:00-18:00 and
/// the target day to the current calendar date at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Day the schedule is generated for (`YYYY-MM-DD`)
    pub target_day: String,
    /// Work-window start (`HH:MM`)
    pub start_time: String,
    /// Work-window end (`HH:MM`)
    pub end_time: String,
    /// Whether the service should place breaks
    pub schedule_breaks: bool,
    /// Whether the service should place meals
    pub schedule_meals: bool,
    /// Desired break length, free text (e.g. "20m")
    pub break_length: String,
    /// Desired break frequency, free text (e.g. "at least 2 a day")
    pub break_frequency: String,
    /// Meal constraints, free text
    pub meal_prefs: String,
    /// Fixed-time constraints for tasks, free text
    pub specific_times: String,
    /// Any other scheduling constraint, free text
    pub task_preference: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            target_day: chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
            start_time: crate::DEFAULT_START_TIME.to_string(),
            end_time: crate::DEFAULT_END_TIME.to_string(),
            schedule_breaks: true,
            schedule_meals: true,
            break_length: String::new(),
            break_frequency: String::new(),
            meal_prefs: String::new(),
            specific_times: String::new(),
            task_preference: String::new(),
        }
    }
}

impl Preferences {
    /// Names accepted by [`Preferences::set_field`]
    pub const FIELDS: [&'static str; 10] = [
        "target-day",
        "start-time",
        "end-time",
        "schedule-breaks",
        "schedule-meals",
        "break-length",
        "break-frequency",
        "meal-prefs",
        "specific-times",
        "task-preference",
    ];

    /// Set one field by its kebab-case name
    ///
    /// Callers still save the WHOLE record afterwards; this only edits the
    /// in-memory value.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let parse_switch = |v: &str| -> Result<bool> {
            v.parse::<bool>()
                .map_err(|_| eyre!("expected true or false, got '{}'", v))
        };

        match field {
            "target-day" => self.target_day = value.to_string(),
            "start-time" => self.start_time = value.to_string(),
            "end-time" => self.end_time = value.to_string(),
            "schedule-breaks" => self.schedule_breaks = parse_switch(value)?,
            "schedule-meals" => self.schedule_meals = parse_switch(value)?,
            "break-length" => self.break_length = value.to_string(),
            "break-frequency" => self.break_frequency = value.to_string(),
            "meal-prefs" => self.meal_prefs = value.to_string(),
            "specific-times" => self.specific_times = value.to_string(),
            "task-preference" => self.task_preference = value.to_string(),
            other => return Err(eyre!("unknown field '{}' (known: {})", other, Self::FIELDS.join(", "))),
        }
        Ok(())
    }

    /// Check the structured fields parse
    ///
    /// Free-text fields are never validated - the service interprets them.
    pub fn validate(&self) -> Result<()> {
        chrono::NaiveDate::parse_from_str(&self.target_day, "%Y-%m-%d")
            .map_err(|e| eyre!("invalid target-day '{}' (want YYYY-MM-DD): {}", self.target_day, e))?;
        chrono::NaiveTime::parse_from_str(&self.start_time, "%H:%M")
            .map_err(|e| eyre!("invalid start-time '{}' (want HH:MM): {}", self.start_time, e))?;
        chrono::NaiveTime::parse_from_str(&self.end_time, "%H:%M")
            .map_err(|e| eyre!("invalid end-time '{}' (want HH:MM): {}", self.end_time, e))?;
        Ok(())
    }
}

/// Durable store for a single [`Preferences`] record
///
/// `save` always replaces the whole record atomically: the blob is written
/// to a temp file in the same directory and renamed over the target, under
/// an exclusive advisory lock, so no partial write is ever visible.
pub struct PrefStore {
    path: PathBuf,
}

impl PrefStore {
    /// Open a store backed by the given blob path, creating parent dirs
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create preference directory")?;
        }
        debug!(?path, "Opened preference store");
        Ok(Self { path })
    }

    /// Path of the blob file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last-saved record, or `None` if none exists
    pub fn load(&self) -> Result<Option<Preferences>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No preference record on disk");
            return Ok(None);
        }
        let blob = fs::read_to_string(&self.path)
            .context(format!("Failed to read preferences from {}", self.path.display()))?;
        let prefs = serde_json::from_str(&blob)
            .context(format!("Corrupt preference record at {}", self.path.display()))?;
        Ok(Some(prefs))
    }

    /// Replace the durable record wholesale
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let lock = self.lock_exclusive()?;

        let blob = serde_json::to_vec_pretty(prefs).context("Failed to serialize preferences")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &blob).context(format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).context(format!("Failed to replace {}", self.path.display()))?;

        lock.unlock().ok();
        info!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }

    /// Remove the durable record, if any
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove preference record")?;
            info!(path = %self.path.display(), "Cleared preferences");
        }
        Ok(())
    }

    fn lock_exclusive(&self) -> Result<fs::File> {
        let lock_path = self.path.with_extension("lock");
        let file = fs::File::create(&lock_path).context(format!("Failed to create {}", lock_path.display()))?;
        file.lock_exclusive()
            .context("Failed to take exclusive preference lock")?;
        Ok(file)
    }
}
