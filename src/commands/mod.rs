//! Command-line command handlers for dosewatch.
//!
//! One-shot commands either talk to the running daemon over the control
//! socket (`take`, `snooze`, `dismiss`, `reload`) or work on the medication
//! file directly (`list`, `add`, `edit`, `remove`, `status`, `adherence`).

pub mod action;
pub mod adherence;
pub mod help;
pub mod medication;
pub mod reload;
pub mod simulate;
pub mod status;

use anyhow::Result;

use crate::config::Config;
use crate::store::JsonFileStore;

/// Open the medication file named by the current configuration.
pub(crate) fn open_store() -> Result<JsonFileStore> {
    let config = Config::load()?;
    JsonFileStore::open(config.data_file_path()?)
}

/// `87%`, or `-` when nothing has been resolved yet.
pub(crate) fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(value) => format!("{:.0}%", value),
        None => "-".to_string(),
    }
}
