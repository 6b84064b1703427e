//! Medication store: owns medication definitions and dose logs.
//!
//! The engine consumes the store through [`MedicationStore`]. Two
//! implementations exist: [`MemoryStore`] for tests and simulations, and
//! [`JsonFileStore`] which persists everything to a single JSON file.
//! Deleting a medication cascades to its logs.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ReminderError;
use crate::model::{DoseLog, LogStatus, Medication, MedicationPatch, NewMedication};

#[cfg_attr(test, mockall::automock)]
pub trait MedicationStore: Send {
    /// Every medication, in insertion order.
    fn all(&self) -> Vec<Medication>;

    fn get(&self, id: &str) -> Option<Medication>;

    fn add(&mut self, new: NewMedication, now: DateTime<Local>) -> Result<Medication, ReminderError>;

    fn update(
        &mut self,
        id: &str,
        patch: MedicationPatch,
        now: DateTime<Local>,
    ) -> Result<Medication, ReminderError>;

    /// Remove a medication and all of its logs.
    fn remove(&mut self, id: &str) -> Result<Medication, ReminderError>;

    /// Medications in scope for `today`, in store order.
    fn list_todays_medications(&self, today: NaiveDate) -> Vec<Medication> {
        self.all()
            .into_iter()
            .filter(|medication| medication.is_in_scope(today))
            .collect()
    }

    /// Logs of one medication whose `taken_at` falls on `day`.
    fn logs_for_day(&self, medication_id: &str, day: NaiveDate) -> Vec<DoseLog>;

    /// All logs with `taken_at` between `from` and `to`, inclusive.
    fn logs_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DoseLog>;

    /// Write a taken log for the medication's current dose slot.
    fn record_taken(
        &mut self,
        medication_id: &str,
        taken_at: DateTime<Local>,
    ) -> Result<DoseLog, ReminderError>;

    /// Pick up changes made by other processes. Returns true if anything changed.
    fn refresh(&mut self) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Everything the store holds. This is also the on-disk JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationData {
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub logs: Vec<DoseLog>,
}

impl MedicationData {
    fn find(&self, id: &str) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == id)
    }

    fn add(&mut self, new: NewMedication, now: DateTime<Local>) -> Medication {
        let medication = Medication::from_new(new_id(), new, now);
        self.medications.push(medication.clone());
        medication
    }

    fn update(
        &mut self,
        id: &str,
        patch: MedicationPatch,
        now: DateTime<Local>,
    ) -> Result<Medication, ReminderError> {
        let medication = self
            .medications
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ReminderError::MedicationNotFound(id.to_string()))?;
        medication.apply(patch, now);
        Ok(medication.clone())
    }

    fn remove(&mut self, id: &str) -> Result<Medication, ReminderError> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ReminderError::MedicationNotFound(id.to_string()))?;
        self.logs.retain(|log| log.medication_id != id);
        Ok(self.medications.remove(index))
    }

    fn logs_for_day(&self, medication_id: &str, day: NaiveDate) -> Vec<DoseLog> {
        self.logs
            .iter()
            .filter(|log| log.medication_id == medication_id && log.day() == day)
            .cloned()
            .collect()
    }

    fn logs_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DoseLog> {
        self.logs
            .iter()
            .filter(|log| (from..=to).contains(&log.day()))
            .cloned()
            .collect()
    }

    fn record_taken(
        &mut self,
        medication_id: &str,
        taken_at: DateTime<Local>,
    ) -> Result<DoseLog, ReminderError> {
        let medication = self
            .find(medication_id)
            .ok_or_else(|| ReminderError::MedicationNotFound(medication_id.to_string()))?;
        let log = DoseLog {
            id: new_id(),
            medication_id: medication.id.clone(),
            taken_at,
            scheduled_time: medication.scheduled_time.clone(),
            slot: Some(medication.slot()),
            status: LogStatus::Taken,
        };
        self.logs.push(log.clone());
        Ok(log)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
