//! Implementation of the simulate command.
//!
//! Installs a simulated time source so the daemon can be run across a span
//! of time (for example a whole day of doses) in seconds.

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use std::sync::Arc;

use crate::common::logger::{Log, LoggerGuard};
use crate::time::source::{self, SimulatedTimeSource};

/// Set up simulated time. Must run before anything logs so timestamps are
/// simulated from the first line.
///
/// `multiplier` 0 fast-forwards. Returns the file logging guard when `--log`
/// was given; keep it alive until the simulation ends.
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    log_to_file: bool,
    debug_enabled: bool,
) -> Result<Option<LoggerGuard>> {
    let start =
        source::parse_datetime(start_time).map_err(|e| anyhow!("Invalid start time: {e}"))?;
    let end = source::parse_datetime(end_time).map_err(|e| anyhow!("Invalid end time: {e}"))?;

    if end <= start {
        bail!("End time must be after start time");
    }

    let sim_source = Arc::new(SimulatedTimeSource::new(start, end, multiplier));
    source::init_time_source(sim_source);

    let guard = if log_to_file {
        let log_filename = format!(
            "dosewatch-simulation-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        println!("Writing simulation output to {log_filename}");
        Some(Log::start_file_logging(log_filename)?)
    } else {
        None
    };

    log_version!();
    log_block_start!("Simulation Mode");
    log_decorated!(
        "Simulating from {} to {}",
        start.format("%Y-%m-%d %H:%M:%S"),
        end.format("%Y-%m-%d %H:%M:%S")
    );

    let duration = end.signed_duration_since(start);
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );
    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        log_indented!(
            "Time acceleration: {}x (about {:.1} seconds)",
            multiplier,
            duration.num_seconds() as f64 / multiplier
        );
    }
    log_indented!("Alarms are not answered during a simulation and stay active");

    if debug_enabled {
        log_pipe!();
        log_debug!("Simulated time source initialized");
    }

    Ok(guard)
}
