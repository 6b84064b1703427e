//! Alarm scheduler.
//!
//! Owns the single active alarm, the set of doses already triggered today and
//! the snooze book. Nothing else mutates that state; the engine loop calls
//! [`AlarmScheduler::tick`] on every wake-up and forwards user actions to the
//! public methods here.
//!
//! Each tick first resolves the status of every medication in scope, then
//! fires at most one alarm. Doses that come due while another alarm is active
//! wait in a queue and ring, oldest first, once the alarm clears.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate};
use std::collections::HashSet;

use super::snooze::{SnoozeBook, SnoozeEntry};
use super::status::{minutes_of_day, resolve_status};
use crate::common::constants::TRIGGER_WINDOW_MINUTES;
use crate::emitter::{AlarmEmitter, AlarmSettings};
use crate::error::ReminderError;
use crate::model::{DoseLog, DoseSlot, DoseStatus, Medication, ScheduledTime};
use crate::store::MedicationStore;

/// A dose that has already raised its scheduled alarm.
///
/// The scheduled time is part of the key so that editing a medication's time
/// arms the new time on the same day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub medication_id: String,
    pub day: NaiveDate,
    pub slot: DoseSlot,
    pub at: ScheduledTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTrigger {
    Scheduled,
    Snoozed,
    /// Came due while another alarm was active.
    Queued,
}

/// The one alarm waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlarm {
    pub medication_id: String,
    pub medication_name: String,
    pub scheduled_time: ScheduledTime,
    pub fired_at: DateTime<Local>,
    pub trigger: AlarmTrigger,
}

impl ActiveAlarm {
    pub fn day(&self) -> NaiveDate {
        self.fired_at.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new alarm was raised this tick.
    Fired(ActiveAlarm),
    /// An earlier alarm is still unresolved; nothing new may fire.
    AlarmPending,
    Idle,
}

struct Candidate {
    medication: Medication,
    schedule: ScheduledTime,
    status: DoseStatus,
}

#[derive(Debug, Default)]
pub struct AlarmScheduler {
    active: Option<ActiveAlarm>,
    triggered: HashSet<TriggerKey>,
    /// Doses held back by the active alarm, in the order they came due.
    queued: Vec<TriggerKey>,
    snoozes: SnoozeBook,
    current_day: Option<NaiveDate>,
    /// Medications already warned about a malformed time today.
    warned: HashSet<String>,
    debug_enabled: bool,
}

impl AlarmScheduler {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            ..Self::default()
        }
    }

    pub fn active(&self) -> Option<&ActiveAlarm> {
        self.active.as_ref()
    }

    pub fn snoozes(&self) -> &SnoozeBook {
        &self.snoozes
    }

    pub fn is_triggered(&self, key: &TriggerKey) -> bool {
        self.triggered.contains(key)
    }

    pub fn queued(&self) -> &[TriggerKey] {
        &self.queued
    }

    pub fn triggered_count(&self) -> usize {
        self.triggered.len()
    }

    pub fn current_day(&self) -> Option<NaiveDate> {
        self.current_day
    }

    /// Earliest pending snooze, so the loop can wake for it.
    pub fn next_snooze_time(&self) -> Option<DateTime<Local>> {
        self.snoozes.next_fire_time()
    }

    /// Evaluate all doses at `now` and fire at most one alarm.
    pub fn tick(
        &mut self,
        now: DateTime<Local>,
        store: &dyn MedicationStore,
        emitter: &mut dyn AlarmEmitter,
        settings: &AlarmSettings,
    ) -> TickOutcome {
        let today = now.date_naive();
        self.roll_over(today, emitter);

        let candidates = self.resolve_all(now, store);
        self.discard_stale_snoozes(now, &candidates);

        let outcome = match self.active {
            Some(_) => TickOutcome::AlarmPending,
            None => self.fire_next(now, &candidates, emitter, settings),
        };

        if self.active.is_some() {
            self.queue_blocked(now, &candidates);
        }
        outcome
    }

    fn fire_next(
        &mut self,
        now: DateTime<Local>,
        candidates: &[Candidate],
        emitter: &mut dyn AlarmEmitter,
        settings: &AlarmSettings,
    ) -> TickOutcome {
        if let Some(candidate) = self.take_queued(now, candidates) {
            return self.fire(candidate, now, AlarmTrigger::Queued, emitter, settings);
        }

        for candidate in candidates {
            let id = candidate.medication.id.as_str();

            if let Some(snooze) = self.snoozes.get(id) {
                // A pending snooze replaces the scheduled trigger
                if snooze.is_due(now) && candidate.status != DoseStatus::Taken {
                    self.snoozes.remove(id);
                    return self.fire(candidate, now, AlarmTrigger::Snoozed, emitter, settings);
                }
                continue;
            }

            if candidate.status != DoseStatus::Upcoming {
                continue;
            }

            if let Some(key) = self.due_key(candidate, now)
                && self.triggered.insert(key)
            {
                return self.fire(candidate, now, AlarmTrigger::Scheduled, emitter, settings);
            }
        }

        TickOutcome::Idle
    }

    /// Trigger key of a dose inside its trigger window, if any.
    fn due_key(&self, candidate: &Candidate, now: DateTime<Local>) -> Option<TriggerKey> {
        let offset = minutes_of_day(now) - candidate.schedule.minutes_since_midnight();
        (0..=TRIGGER_WINDOW_MINUTES)
            .contains(&offset)
            .then(|| TriggerKey {
                medication_id: candidate.medication.id.clone(),
                day: now.date_naive(),
                slot: candidate.medication.slot(),
                at: candidate.schedule,
            })
    }

    /// Hold back every dose that came due behind the active alarm.
    fn queue_blocked(&mut self, now: DateTime<Local>, candidates: &[Candidate]) {
        for candidate in candidates {
            if candidate.status != DoseStatus::Upcoming
                || self.snoozes.get(&candidate.medication.id).is_some()
            {
                continue;
            }

            if let Some(key) = self.due_key(candidate, now)
                && !self.triggered.contains(&key)
                && !self.queued.contains(&key)
            {
                if self.debug_enabled {
                    log_debug!("Queued '{}' behind the active alarm", candidate.medication.name);
                }
                self.queued.push(key);
            }
        }
    }

    /// Pop the oldest queued dose that still needs a reminder, consuming its
    /// trigger key. Entries for doses taken, snoozed or re-timed meanwhile
    /// are dropped.
    fn take_queued<'a>(
        &mut self,
        now: DateTime<Local>,
        candidates: &'a [Candidate],
    ) -> Option<&'a Candidate> {
        let today = now.date_naive();

        while !self.queued.is_empty() {
            let key = self.queued.remove(0);
            if key.day != today
                || self.triggered.contains(&key)
                || self.snoozes.get(&key.medication_id).is_some()
            {
                continue;
            }

            let Some(candidate) = candidates.iter().find(|c| {
                c.medication.id == key.medication_id
                    && c.schedule == key.at
                    && c.status != DoseStatus::Taken
            }) else {
                continue;
            };

            self.triggered.insert(key);
            return Some(candidate);
        }

        None
    }

    /// Resolve every medication in scope before anything fires.
    fn resolve_all(&mut self, now: DateTime<Local>, store: &dyn MedicationStore) -> Vec<Candidate> {
        let today = now.date_naive();
        let mut candidates = Vec::new();

        for medication in store.list_todays_medications(today) {
            let schedule = match medication.schedule() {
                Ok(schedule) => schedule,
                Err(e) => {
                    if self.warned.insert(medication.id.clone()) {
                        log_pipe!();
                        log_warning!("Skipping '{}': {e}", medication.name);
                    }
                    continue;
                }
            };

            let logs = store.logs_for_day(&medication.id, today);
            let Ok(status) = resolve_status(&medication, &logs, now) else {
                continue;
            };

            candidates.push(Candidate {
                medication,
                schedule,
                status,
            });
        }

        candidates
    }

    /// Drop snoozes for doses that were taken, or for medications that left
    /// today's list.
    fn discard_stale_snoozes(&mut self, now: DateTime<Local>, candidates: &[Candidate]) {
        let stale: Vec<String> = self
            .snoozes
            .iter()
            .filter(|entry| {
                match candidates
                    .iter()
                    .find(|c| c.medication.id == entry.medication_id)
                {
                    Some(candidate) => candidate.status == DoseStatus::Taken,
                    None => entry.is_due(now),
                }
            })
            .map(|entry| entry.medication_id.clone())
            .collect();

        for id in stale {
            self.snoozes.remove(&id);
            if self.debug_enabled {
                log_debug!("Discarded snooze for medication {id}");
            }
        }
    }

    fn fire(
        &mut self,
        candidate: &Candidate,
        now: DateTime<Local>,
        trigger: AlarmTrigger,
        emitter: &mut dyn AlarmEmitter,
        settings: &AlarmSettings,
    ) -> TickOutcome {
        let alarm = ActiveAlarm {
            medication_id: candidate.medication.id.clone(),
            medication_name: candidate.medication.name.clone(),
            scheduled_time: candidate.schedule,
            fired_at: now,
            trigger,
        };
        self.active = Some(alarm.clone());

        if let Err(e) = emitter.play(settings, &alarm.medication_name) {
            log_warning!("Alarm sound failed: {e}");
            log_indented!("The reminder stays active");
        }

        TickOutcome::Fired(alarm)
    }

    /// Reset per-day state when the calendar day changes. Returns true if a
    /// reset happened.
    pub fn roll_over(&mut self, today: NaiveDate, emitter: &mut dyn AlarmEmitter) -> bool {
        match self.current_day {
            Some(day) if day == today => return false,
            None => {
                self.current_day = Some(today);
                return false;
            }
            Some(_) => {}
        }

        self.triggered.retain(|key| key.day == today);
        self.queued.retain(|key| key.day == today);
        let dropped = self.snoozes.clear_before(today);
        self.warned.clear();

        if let Some(alarm) = self.active.take_if(|alarm| alarm.day() != today) {
            emitter.stop();
            log_block_start!("New day: clearing unanswered alarm for {}", alarm.medication_name);
        }

        if self.debug_enabled {
            log_debug!("Day changed to {today}, dropped {dropped} snoozes");
        }

        self.current_day = Some(today);
        true
    }

    /// Defer the active alarm by `minutes`.
    pub fn snooze(
        &mut self,
        now: DateTime<Local>,
        minutes: u32,
        emitter: &mut dyn AlarmEmitter,
    ) -> Result<SnoozeEntry, ReminderError> {
        let alarm = self.active.take().ok_or(ReminderError::NoActiveAlarm)?;
        emitter.stop();

        let entry = SnoozeEntry {
            medication_id: alarm.medication_id,
            deferred_fire_time: now + ChronoDuration::minutes(i64::from(minutes)),
            day: alarm.fired_at.date_naive(),
        };
        self.snoozes.insert(entry.clone());
        Ok(entry)
    }

    /// Silence the active alarm without recording anything.
    pub fn dismiss(&mut self, emitter: &mut dyn AlarmEmitter) -> Result<ActiveAlarm, ReminderError> {
        let alarm = self.active.take().ok_or(ReminderError::NoActiveAlarm)?;
        emitter.stop();
        Ok(alarm)
    }

    /// Record the active alarm's dose as taken.
    ///
    /// The alarm is only cleared once the log is written; a store failure
    /// leaves it active so the user can retry.
    pub fn take_now(
        &mut self,
        now: DateTime<Local>,
        store: &mut dyn MedicationStore,
        emitter: &mut dyn AlarmEmitter,
    ) -> Result<DoseLog, ReminderError> {
        let alarm = self.active.as_ref().ok_or(ReminderError::NoActiveAlarm)?;
        let log = store.record_taken(&alarm.medication_id, now)?;

        emitter.stop();
        self.snoozes.remove(&log.medication_id);
        self.active = None;
        Ok(log)
    }

    /// Record a dose taken from another surface.
    ///
    /// Goes through [`take_now`](Self::take_now) when that medication's alarm
    /// is active; otherwise writes the log and drops any pending snooze.
    pub fn record_taken(
        &mut self,
        medication_id: &str,
        now: DateTime<Local>,
        store: &mut dyn MedicationStore,
        emitter: &mut dyn AlarmEmitter,
    ) -> Result<DoseLog, ReminderError> {
        if self
            .active
            .as_ref()
            .is_some_and(|alarm| alarm.medication_id == medication_id)
        {
            return self.take_now(now, store, emitter);
        }

        let log = store.record_taken(medication_id, now)?;
        self.snoozes.remove(medication_id);
        Ok(log)
    }

    /// Stop everything on shutdown.
    pub fn shutdown(&mut self, emitter: &mut dyn AlarmEmitter) {
        emitter.stop();
        self.active = None;
    }
}
