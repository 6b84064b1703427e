//! Default configuration file generation.
//!
//! Writes a commented `dosewatch.toml` with every setting at its default, so
//! users can see what is available without reading the docs.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create the default config file at `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_section("Alarm")
        .add_setting(
            "sound",
            &format!("\"{DEFAULT_SOUND}\""),
            &format!("Alarm sound: {}", KNOWN_SOUNDS.join(", ")),
        )
        .add_setting(
            "volume",
            &DEFAULT_VOLUME.to_string(),
            &format!("Alarm volume ({MINIMUM_VOLUME}-{MAXIMUM_VOLUME}, 0 = muted)"),
        )
        .add_setting(
            "snooze_duration",
            &DEFAULT_SNOOZE_DURATION.to_string(),
            &format!(
                "Snooze duration in minutes ({MINIMUM_SNOOZE_DURATION}-{MAXIMUM_SNOOZE_DURATION})"
            ),
        )
        .add_setting(
            "repeat_count",
            &DEFAULT_REPEAT_COUNT.to_string(),
            &format!("How often the alarm repeats ({MINIMUM_REPEAT_COUNT}-{MAXIMUM_REPEAT_COUNT})"),
        )
        .add_setting(
            "vibrate",
            &DEFAULT_VIBRATE.to_string(),
            "Show the vibrate marker with each alarm",
        )
        .add_setting(
            "desktop_notifications",
            &DEFAULT_DESKTOP_NOTIFICATIONS.to_string(),
            "Also send a desktop notification",
        )
        .add_section("Engine")
        .add_setting(
            "tick_interval",
            &DEFAULT_TICK_INTERVAL.to_string(),
            &format!(
                "Seconds between schedule checks ({MINIMUM_TICK_INTERVAL}-{MAXIMUM_TICK_INTERVAL})"
            ),
        )
        .build();

    content.push_str(
        "\n# data_file = \"~/medications.json\" # Default: $XDG_DATA_HOME/dosewatch/medications.json\n",
    );
    content
}

/// Aligned `key = value  # comment` lines grouped under `#[Section]` headers.
struct ConfigBuilder {
    entries: Vec<Entry>,
}

enum Entry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(Entry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Setting { line, .. } => Some(line.len()),
                Entry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut lines = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Section(header) => {
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(header);
                }
                Entry::Setting { line, comment } => {
                    lines.push(format!("{line:width$}{comment}"));
                }
            }
        }

        lines.join("\n")
    }
}
