//! Core engine loop.
//!
//! [`Core`] owns the store, the emitter chain and the [`AlarmScheduler`], and
//! drives them from one thread. Every wake-up it refreshes the store, runs a
//! scheduler tick, then sleeps until the next tick, the next snooze or local
//! midnight, whichever comes first. Signals, config changes and socket
//! requests arrive as [`ControlMessage`]s and interrupt the sleep.

pub mod adherence;
pub mod scheduler;
pub mod snooze;
pub mod status;

use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::common::utils::{pluralize, private_path};
use crate::config::{self, Config};
use crate::config::validation::validate_snooze_minutes;
use crate::emitter::{AlarmEmitter, AlarmSettings};
use crate::io::control::{ActiveAlarmView, ControlRequest, ControlResponse, SnoozeView};
use crate::io::signals::{ControlMessage, ControlState};
use crate::store::MedicationStore;
use crate::time::source::{TimeSource, until_next_midnight};

use scheduler::{AlarmScheduler, AlarmTrigger, TickOutcome};

/// Everything needed to build a [`Core`].
pub struct CoreParams {
    pub store: Box<dyn MedicationStore>,
    pub emitter: Box<dyn AlarmEmitter>,
    pub config: Config,
    /// Config file re-read on reload. `None` keeps the initial config.
    pub config_path: Option<PathBuf>,
    pub control: ControlState,
    pub time_source: Arc<dyn TimeSource>,
    pub debug_enabled: bool,
}

pub struct Core {
    store: Box<dyn MedicationStore>,
    emitter: Box<dyn AlarmEmitter>,
    config: Config,
    settings: AlarmSettings,
    config_path: Option<PathBuf>,
    control: ControlState,
    time_source: Arc<dyn TimeSource>,
    scheduler: AlarmScheduler,
    debug_enabled: bool,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let settings = params.config.alarm_settings();
        Self {
            store: params.store,
            emitter: params.emitter,
            settings,
            config: params.config,
            config_path: params.config_path,
            control: params.control,
            time_source: params.time_source,
            scheduler: AlarmScheduler::new(params.debug_enabled),
            debug_enabled: params.debug_enabled,
        }
    }

    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &dyn MedicationStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    /// Run until shutdown is requested or simulated time ends.
    pub fn execute(&mut self) -> Result<()> {
        while self.control.is_running() {
            self.tick_once();

            if self.time_source.is_ended() {
                if self.debug_enabled {
                    log_debug!("Simulated time reached its end");
                }
                break;
            }

            let wait = self.sleep_duration(self.time_source.now());
            if let Some(message) = self.wait_for_message(wait) {
                self.handle_message(message);
            }
            while let Ok(message) = self.control.receiver.try_recv() {
                self.handle_message(message);
            }
        }

        // Helper threads watch the same flag
        self.control.stop();
        self.scheduler.shutdown(self.emitter.as_mut());
        Ok(())
    }

    /// One scheduler pass at the current time.
    pub fn tick_once(&mut self) -> TickOutcome {
        match self.store.refresh() {
            Ok(true) if self.debug_enabled => {
                log_debug!("Medication data changed on disk");
            }
            Ok(_) => {}
            Err(e) => {
                log_pipe!();
                log_warning!("Could not reload medication data: {e:#}");
                log_indented!("Keeping the previously loaded medications");
            }
        }

        let now = self.time_source.now();
        let outcome = self.scheduler.tick(
            now,
            self.store.as_ref(),
            self.emitter.as_mut(),
            &self.settings,
        );

        if let TickOutcome::Fired(alarm) = &outcome {
            log_block_start!(
                "Time to take {} (scheduled {})",
                alarm.medication_name,
                alarm.scheduled_time
            );
            match alarm.trigger {
                AlarmTrigger::Snoozed => log_indented!("Snoozed reminder"),
                AlarmTrigger::Queued => log_indented!("Held back by an earlier reminder"),
                AlarmTrigger::Scheduled => {}
            }
            log_indented!("Answer with: dosewatch take | snooze | dismiss");
        }

        outcome
    }

    /// Time until the next wake-up: the tick interval, cut short by a pending
    /// snooze or the day boundary.
    pub fn sleep_duration(&self, now: DateTime<Local>) -> Duration {
        let mut wait = self.config.tick_interval().min(until_next_midnight(now));

        if let Some(fire_at) = self.scheduler.next_snooze_time()
            && fire_at > now
            && let Ok(until_snooze) = (fire_at - now).to_std()
        {
            wait = wait.min(until_snooze);
        }

        wait
    }

    fn wait_for_message(&mut self, wait: Duration) -> Option<ControlMessage> {
        if self.time_source.is_simulated() {
            self.time_source.sleep(wait);
            return self.control.receiver.try_recv().ok();
        }

        match self.control.receiver.recv_timeout(wait) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // Every sender is gone, fall back to plain sleeping
                std::thread::sleep(wait);
                None
            }
        }
    }

    pub fn handle_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Reload => self.reload_config(),
            ControlMessage::Shutdown => {
                if self.debug_enabled {
                    log_debug!("Shutdown requested");
                }
                self.control.stop();
            }
            ControlMessage::Action { request, reply } => {
                let response = self.handle_request(request);
                if reply.send(response).is_err() && self.debug_enabled {
                    log_debug!("Control client went away before the reply");
                }
            }
        }
    }

    /// Apply one user action and describe the resulting state.
    pub fn handle_request(&mut self, request: ControlRequest) -> ControlResponse {
        let now = self.time_source.now();

        let result: Result<String> = match request {
            ControlRequest::Take { medication_id } => self.take(medication_id, now),
            ControlRequest::Snooze { minutes } => self.snooze(minutes, now),
            ControlRequest::Dismiss => self
                .scheduler
                .dismiss(self.emitter.as_mut())
                .map(|alarm| {
                    log_block_start!("Dismissed reminder for {}", alarm.medication_name);
                    format!("Dismissed {}", alarm.medication_name)
                })
                .map_err(Into::into),
            ControlRequest::State => Ok(self.describe_state()),
        };

        match result {
            Ok(message) => self.response(true, message),
            Err(e) => self.response(false, format!("{e:#}")),
        }
    }

    fn take(&mut self, medication_id: Option<String>, now: DateTime<Local>) -> Result<String> {
        let log = match medication_id {
            Some(id) => self.scheduler.record_taken(
                &id,
                now,
                self.store.as_mut(),
                self.emitter.as_mut(),
            )?,
            None => {
                self.scheduler
                    .take_now(now, self.store.as_mut(), self.emitter.as_mut())?
            }
        };

        let name = self
            .store
            .get(&log.medication_id)
            .map(|m| m.name)
            .unwrap_or_else(|| log.medication_id.clone());

        log_block_start!("Recorded {} as taken at {}", name, log.taken_at.format("%H:%M"));
        Ok(format!(
            "Recorded {} as taken at {}",
            name,
            log.taken_at.format("%H:%M")
        ))
    }

    fn snooze(&mut self, minutes: Option<u32>, now: DateTime<Local>) -> Result<String> {
        let minutes = minutes.unwrap_or(self.settings.snooze_duration_minutes);
        validate_snooze_minutes(minutes)?;

        let name = self
            .scheduler
            .active()
            .map(|alarm| alarm.medication_name.clone());
        let entry = self.scheduler.snooze(now, minutes, self.emitter.as_mut())?;
        let name = name.unwrap_or_else(|| entry.medication_id.clone());

        log_block_start!(
            "Snoozed {} until {}",
            name,
            entry.deferred_fire_time.format("%H:%M")
        );
        Ok(format!(
            "Snoozed {} until {}",
            name,
            entry.deferred_fire_time.format("%H:%M")
        ))
    }

    fn describe_state(&self) -> String {
        match self.scheduler.active() {
            Some(alarm) => format!(
                "Alarm active for {} (scheduled {})",
                alarm.medication_name, alarm.scheduled_time
            ),
            None if self.scheduler.snoozes().is_empty() => "No active alarm".to_string(),
            None => format!(
                "No active alarm, {}",
                pluralize(
                    self.scheduler.snoozes().len(),
                    "snoozed reminder",
                    "snoozed reminders"
                )
            ),
        }
    }

    fn response(&self, ok: bool, message: String) -> ControlResponse {
        let mut snoozes: Vec<SnoozeView> =
            self.scheduler.snoozes().iter().map(SnoozeView::from).collect();
        snoozes.sort_by_key(|s| s.fire_at);

        ControlResponse {
            ok,
            message,
            active: self.scheduler.active().map(ActiveAlarmView::from),
            snoozes,
        }
    }

    /// Re-read the config file. A broken file keeps the running settings.
    fn reload_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            if self.debug_enabled {
                log_debug!("Reload requested but no config file is in use");
            }
            return;
        };

        match config::load_from_path(&path) {
            Ok(new_config) => {
                if new_config == self.config {
                    if self.debug_enabled {
                        log_debug!("Configuration unchanged");
                    }
                    return;
                }

                if let (Ok(old), Ok(new)) =
                    (self.config.data_file_path(), new_config.data_file_path())
                    && old != new
                {
                    log_pipe!();
                    log_warning!("data_file changed to {}", private_path(&new));
                    log_indented!("Restart dosewatch to switch medication files");
                }

                log_block_start!("Configuration reloaded");
                self.settings = new_config.alarm_settings();
                self.config = new_config;
                if self.debug_enabled {
                    self.config.log_config();
                }
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Configuration reload failed: {e:#}");
                log_indented!("Keeping the previous settings");
            }
        }
    }
}
