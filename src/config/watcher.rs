//! File watching module for hot config reloading.
//!
//! Watches the directory holding `dosewatch.toml` and posts a
//! [`ControlMessage::Reload`] when the file changes. The directory is watched
//! instead of the file because editors often replace files on save.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::constants::CONFIG_FILE_NAME;
use crate::common::utils::private_path;
use crate::io::signals::ControlMessage;

/// Editors write in several steps; collapse bursts into one reload.
const DEBOUNCE_MS: u64 = 500;

/// Whether an event path refers to the config file, including editor temp
/// files that are renamed over it.
fn affects_config(event_path: &Path, config_path: &Path) -> bool {
    if event_path == config_path {
        return true;
    }
    event_path.parent() == config_path.parent()
        && event_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(CONFIG_FILE_NAME))
}

/// Start watching `config_path` on a background thread.
pub fn start_config_watcher(
    config_path: PathBuf,
    sender: Sender<ControlMessage>,
    debug_enabled: bool,
) -> Result<()> {
    let Some(dir) = config_path.parent().map(Path::to_path_buf) else {
        return Ok(());
    };
    if !dir.is_dir() {
        if debug_enabled {
            log_pipe!();
            log_debug!("No configuration directory to watch for hot reload");
        }
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res
                && matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                )
            {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch directory: {}", private_path(&dir)))?;

    if debug_enabled {
        log_pipe!();
        log_debug!("Watching {} for changes", private_path(&config_path));
    }

    thread::spawn(move || {
        // The watcher stops when dropped, keep it in the thread
        let _watcher = watcher;
        let mut last_reload = Instant::now() - Duration::from_millis(DEBOUNCE_MS);

        for event in rx {
            if !event.paths.iter().any(|p| affects_config(p, &config_path)) {
                continue;
            }
            if last_reload.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
                continue;
            }

            if debug_enabled {
                log_pipe!();
                log_info!("Configuration file change detected");
            }

            if sender.send(ControlMessage::Reload).is_err() {
                break;
            }
            last_reload = Instant::now();
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affects_config_matches_editor_temp_files() {
        let config = Path::new("/home/u/.config/dosewatch/dosewatch.toml");
        assert!(affects_config(config, config));
        assert!(affects_config(
            Path::new("/home/u/.config/dosewatch/dosewatch.toml.swp"),
            config
        ));
        assert!(!affects_config(
            Path::new("/home/u/.config/dosewatch/other.toml"),
            config
        ));
        assert!(!affects_config(
            Path::new("/tmp/dosewatch.toml"),
            config
        ));
    }
}
