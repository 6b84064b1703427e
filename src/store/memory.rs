//! In-memory store used by tests and the `simulate` command.

use chrono::{DateTime, Local, NaiveDate};

use super::{MedicationData, MedicationStore};
use crate::error::ReminderError;
use crate::model::{DoseLog, Medication, MedicationPatch, NewMedication};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: MedicationData,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: MedicationData) -> Self {
        Self {
            data,
            fail_writes: false,
        }
    }

    /// Make every mutating call fail with `StoreWrite`, leaving data untouched.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn data(&self) -> &MedicationData {
        &self.data
    }

    fn check_writable(&self) -> Result<(), ReminderError> {
        if self.fail_writes {
            return Err(ReminderError::StoreWrite("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl MedicationStore for MemoryStore {
    fn all(&self) -> Vec<Medication> {
        self.data.medications.clone()
    }

    fn get(&self, id: &str) -> Option<Medication> {
        self.data.find(id).cloned()
    }

    fn add(&mut self, new: NewMedication, now: DateTime<Local>) -> Result<Medication, ReminderError> {
        self.check_writable()?;
        Ok(self.data.add(new, now))
    }

    fn update(
        &mut self,
        id: &str,
        patch: MedicationPatch,
        now: DateTime<Local>,
    ) -> Result<Medication, ReminderError> {
        self.check_writable()?;
        self.data.update(id, patch, now)
    }

    fn remove(&mut self, id: &str) -> Result<Medication, ReminderError> {
        self.check_writable()?;
        self.data.remove(id)
    }

    fn logs_for_day(&self, medication_id: &str, day: NaiveDate) -> Vec<DoseLog> {
        self.data.logs_for_day(medication_id, day)
    }

    fn logs_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DoseLog> {
        self.data.logs_between(from, to)
    }

    fn record_taken(
        &mut self,
        medication_id: &str,
        taken_at: DateTime<Local>,
    ) -> Result<DoseLog, ReminderError> {
        self.check_writable()?;
        self.data.record_taken(medication_id, taken_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DoseSlot, MedicationStatus, ScheduledTime};
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn new_med(name: &str, start: u32) -> NewMedication {
        NewMedication::new(name, "1 tablet", ScheduledTime::new(8, 0).unwrap(), day(start))
    }

    #[test]
    fn test_list_todays_medications_filters_scope() {
        let mut store = MemoryStore::new();
        let active = store.add(new_med("Active", 1), at(1, 7, 0)).unwrap();
        let future = store.add(new_med("Future", 20), at(1, 7, 0)).unwrap();
        let paused = store.add(new_med("Paused", 1), at(1, 7, 0)).unwrap();
        store
            .update(
                &paused.id,
                MedicationPatch {
                    status: Some(MedicationStatus::Paused),
                    ..Default::default()
                },
                at(1, 7, 5),
            )
            .unwrap();

        let today: Vec<String> = store
            .list_todays_medications(day(10))
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(today, vec![active.id]);
        assert!(!today.contains(&future.id));
    }

    #[test]
    fn test_record_taken_echoes_schedule_and_slot() {
        let mut store = MemoryStore::new();
        let med = store.add(new_med("Aspirin", 1), at(1, 7, 0)).unwrap();
        let log = store.record_taken(&med.id, at(10, 8, 2)).unwrap();

        assert_eq!(log.scheduled_time, "08:00");
        assert_eq!(log.slot, Some(DoseSlot::PRIMARY));
        assert_eq!(store.logs_for_day(&med.id, day(10)), vec![log]);
        assert!(store.logs_for_day(&med.id, day(11)).is_empty());
    }

    #[test]
    fn test_record_taken_unknown_medication() {
        let mut store = MemoryStore::new();
        assert_eq!(
            store.record_taken("missing", at(10, 8, 0)),
            Err(ReminderError::MedicationNotFound("missing".into()))
        );
    }

    #[test]
    fn test_remove_cascades_logs() {
        let mut store = MemoryStore::new();
        let keep = store.add(new_med("Keep", 1), at(1, 7, 0)).unwrap();
        let removed = store.add(new_med("Drop", 1), at(1, 7, 0)).unwrap();
        store.record_taken(&keep.id, at(10, 8, 0)).unwrap();
        store.record_taken(&removed.id, at(10, 8, 0)).unwrap();

        store.remove(&removed.id).unwrap();

        let logs = store.logs_between(day(1), day(30));
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].medication_id, keep.id);
        assert!(store.get(&removed.id).is_none());
    }

    #[test]
    fn test_failed_write_leaves_data_untouched() {
        let mut store = MemoryStore::new();
        let med = store.add(new_med("Aspirin", 1), at(1, 7, 0)).unwrap();
        store.set_fail_writes(true);

        assert!(matches!(
            store.record_taken(&med.id, at(10, 8, 0)),
            Err(ReminderError::StoreWrite(_))
        ));
        assert!(store.logs_between(day(1), day(30)).is_empty());
    }
}
