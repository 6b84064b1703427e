//! Configuration system for dosewatch.
//!
//! Settings live in `dosewatch.toml` under `$XDG_CONFIG_HOME/dosewatch/`, or in
//! the directory given with `--config`. A commented default file is written the
//! first time the daemon starts.
//!
//! ```toml
//! #[Alarm]
//! sound = "default"           # Alarm sound: default, gentle, classic, modern, nature, custom
//! volume = 80                 # Alarm volume (0-100, 0 = muted)
//! snooze_duration = 10        # Snooze duration in minutes (1-120)
//! repeat_count = 3            # How often the alarm repeats (1-10)
//! vibrate = true              # Show the vibrate marker with each alarm
//! desktop_notifications = true # Also send a desktop notification
//!
//! #[Engine]
//! tick_interval = 30          # Seconds between schedule checks (10-60)
//! # data_file = "~/meds.json" # Medication data file (default: $XDG_DATA_HOME/dosewatch/medications.json)
//! ```
//!
//! Every field is optional; missing fields take the defaults from
//! [`crate::common::constants`]. Values are validated with ranged errors.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;


use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::emitter::AlarmSettings;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use watcher::start_config_watcher;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub sound: Option<String>,
    pub volume: Option<u32>,
    pub snooze_duration: Option<u32>, // minutes
    pub repeat_count: Option<u32>,
    pub vibrate: Option<bool>,
    pub desktop_notifications: Option<bool>,
    pub tick_interval: Option<u64>, // seconds
    pub data_file: Option<String>,
}

impl Config {
    /// Settings handed to the alarm emitters.
    pub fn alarm_settings(&self) -> AlarmSettings {
        AlarmSettings {
            sound: self
                .sound
                .clone()
                .unwrap_or_else(|| DEFAULT_SOUND.to_string()),
            volume: self.volume.unwrap_or(DEFAULT_VOLUME),
            snooze_duration_minutes: self.snooze_duration.unwrap_or(DEFAULT_SNOOZE_DURATION),
            repeat_count: self.repeat_count.unwrap_or(DEFAULT_REPEAT_COUNT),
            vibrate: self.vibrate.unwrap_or(DEFAULT_VIBRATE),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL))
    }

    pub fn desktop_notifications(&self) -> bool {
        self.desktop_notifications
            .unwrap_or(DEFAULT_DESKTOP_NOTIFICATIONS)
    }

    /// Location of the medication data file. `~/` is expanded.
    pub fn data_file_path(&self) -> Result<PathBuf> {
        match self.data_file.as_deref() {
            Some(path) => {
                if let Some(rest) = path.strip_prefix("~/") {
                    let home = dirs::home_dir().context("Could not determine home directory")?;
                    Ok(home.join(rest))
                } else {
                    Ok(PathBuf::from(path))
                }
            }
            None => {
                let data_dir = dirs::data_dir().context("Could not determine data directory")?;
                Ok(data_dir.join("dosewatch").join(DATA_FILE_NAME))
            }
        }
    }

    /// Load configuration using the module's load function
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn log_config(&self) {
        let settings = self.alarm_settings();

        log_block_start!("Loaded configuration");
        log_indented!("Sound: {} (volume {}%)", settings.sound, settings.volume);
        log_indented!(
            "Snooze: {} minutes, repeat {} times",
            settings.snooze_duration_minutes,
            settings.repeat_count
        );
        log_indented!(
            "Vibrate: {}, desktop notifications: {}",
            settings.vibrate,
            self.desktop_notifications()
        );
        log_indented!("Checking every {} seconds", self.tick_interval().as_secs());
        if let Ok(path) = self.data_file_path() {
            log_indented!("Data file: {}", private_path(&path));
        }
    }
}
