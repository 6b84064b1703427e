//! Alarm actions sent to the running daemon: `take`, `snooze`, `dismiss`.
//!
//! `take <medication>` also works without a daemon; the dose is then written
//! straight to the medication file.

use anyhow::{Result, bail};

use crate::config::validation::validate_snooze_minutes;
use crate::io::control::{ControlClient, ControlRequest, ControlResponse};
use crate::store::MedicationStore;

fn report(response: &ControlResponse) -> Result<()> {
    if !response.ok {
        bail!("{}", response.message);
    }

    log_block_start!("{}", response.message);
    if let Some(active) = &response.active {
        log_indented!(
            "Alarm still active for {} (scheduled {})",
            active.medication_name,
            active.scheduled_time
        );
    }
    for snooze in &response.snoozes {
        log_indented!(
            "Snoozed reminder {} due at {}",
            snooze.medication_id,
            snooze.fire_at.format("%H:%M")
        );
    }
    log_end!();
    Ok(())
}

fn send(request: ControlRequest) -> Result<()> {
    let client = ControlClient::new();
    if !client.is_daemon_running() {
        bail!("dosewatch is not running. Start it with: dosewatch");
    }
    let response = client.send(&request)?;
    report(&response)
}

pub fn handle_take_command(query: Option<&str>) -> Result<()> {
    let client = ControlClient::new();

    let Some(query) = query else {
        return send(ControlRequest::Take {
            medication_id: None,
        });
    };

    let mut store = super::open_store()?;
    let id = super::medication::resolve_medication_id(&store, query)?;

    if client.is_daemon_running() {
        let response = client.send(&ControlRequest::Take {
            medication_id: Some(id),
        })?;
        return report(&response);
    }

    // No daemon, record directly
    let log = store.record_taken(&id, crate::time::source::now())?;
    let name = store.get(&id).map(|m| m.name).unwrap_or(id);
    log_block_start!(
        "Recorded {} as taken at {}",
        name,
        log.taken_at.format("%H:%M")
    );
    log_end!();
    Ok(())
}

pub fn handle_snooze_command(minutes: Option<u32>) -> Result<()> {
    if let Some(minutes) = minutes {
        validate_snooze_minutes(minutes)?;
    }
    send(ControlRequest::Snooze { minutes })
}

pub fn handle_dismiss_command() -> Result<()> {
    send(ControlRequest::Dismiss)
}
