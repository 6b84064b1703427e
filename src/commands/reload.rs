//! Implementation of the reload command.
//!
//! Validates the configuration first, then sends SIGUSR2 to the running
//! daemon so it re-reads `dosewatch.toml`.

use anyhow::{Context, Result};

use crate::io::lock::{running_instance_pid, signal_reload};

pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    // Fail here with a clear message instead of in the daemon's log
    crate::config::Config::load().context("Configuration is invalid, not reloading")?;

    match running_instance_pid() {
        Some(pid) => {
            signal_reload(pid)?;
            log_block_start!("Sent reload signal to dosewatch (PID: {pid})");
            if debug_enabled {
                log_pipe!();
                log_debug!("SIGUSR2 delivered to {pid}");
            }
        }
        None => {
            log_pipe!();
            log_warning!("dosewatch is not running");
            log_indented!("The new configuration is used on the next start");
        }
    }

    log_end!();
    Ok(())
}
