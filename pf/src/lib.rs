//! PrefStore - durable user scheduling-preference storage
//!
//! Holds the preference record the schedule client attaches to every
//! generation request. The record is persisted as a single opaque JSON
//! blob and always replaced wholesale - individual fields are never
//! patched in place, so a stale on-disk field can never resurrect after
//! a save.
//!
//! # Layout
//!
//! ```text
//! ~/.config/schedclient/
//! ├── preferences.json       # the blob
//! └── preferences.lock       # advisory lock taken around writes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use prefstore::{PrefStore, Preferences};
//!
//! let store = PrefStore::open("~/.config/schedclient/preferences.json")?;
//! let mut prefs = store.load()?.unwrap_or_default();
//! prefs.start_time = "08:30".to_string();
//! prefs.validate()?;
//! store.save(&prefs)?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{PrefStore, Preferences};

/// Default work-window start (`HH:MM`)
pub const DEFAULT_START_TIME: &str = "07:00";

/// Default work-window end (`HH:MM`)
pub const DEFAULT_END_TIME: &str = "18:00";
