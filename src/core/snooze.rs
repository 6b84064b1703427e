//! Deferred re-trigger requests.

use chrono::{DateTime, Local, NaiveDate};
use std::collections::HashMap;

/// A snoozed alarm waiting to fire again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnoozeEntry {
    pub medication_id: String,
    pub deferred_fire_time: DateTime<Local>,
    /// Day the snoozed dose belongs to.
    pub day: NaiveDate,
}

impl SnoozeEntry {
    /// Due once the deferred time is reached. An entry that is overdue (the
    /// process was busy or asleep) stays due so it still fires once.
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now >= self.deferred_fire_time
    }
}

/// Snooze entries keyed by medication id. One entry per medication.
#[derive(Debug, Default)]
pub struct SnoozeBook {
    entries: HashMap<String, SnoozeEntry>,
}

impl SnoozeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry`, replacing an older one for the same medication.
    pub fn insert(&mut self, entry: SnoozeEntry) {
        self.entries.insert(entry.medication_id.clone(), entry);
    }

    pub fn get(&self, medication_id: &str) -> Option<&SnoozeEntry> {
        self.entries.get(medication_id)
    }

    pub fn remove(&mut self, medication_id: &str) -> Option<SnoozeEntry> {
        self.entries.remove(medication_id)
    }

    /// Drop entries that belong to a day before `today`.
    pub fn clear_before(&mut self, today: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.day >= today);
        before - self.entries.len()
    }

    /// The earliest deferred fire time still pending.
    pub fn next_fire_time(&self) -> Option<DateTime<Local>> {
        self.entries.values().map(|e| e.deferred_fire_time).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnoozeEntry> {
        self.entries.values()
    }
}
