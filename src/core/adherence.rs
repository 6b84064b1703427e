//! Adherence statistics built on the status resolver.
//!
//! Today's doses use the live status. On earlier days there is no "later":
//! a dose without a log counts as missed.

use chrono::{DateTime, Days, Local, NaiveDate};

use super::status::resolve_status;
use crate::model::{DoseLog, DoseStatus, Medication};
use crate::store::MedicationStore;

#[derive(Debug, Clone, PartialEq)]
pub struct DoseEntry {
    pub medication_id: String,
    pub name: String,
    pub dosage: String,
    pub scheduled_time: String,
    pub status: DoseStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub doses: Vec<DoseEntry>,
}

impl DaySummary {
    pub fn count(&self, status: DoseStatus) -> usize {
        self.doses.iter().filter(|d| d.status == status).count()
    }

    /// Taken share of resolved doses; `None` while nothing is resolved.
    pub fn percent(&self) -> Option<f64> {
        percent(self.count(DoseStatus::Taken), self.count(DoseStatus::Missed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdherenceReport {
    /// Oldest first, ending with today.
    pub days: Vec<DaySummary>,
}

impl AdherenceReport {
    pub fn taken(&self) -> usize {
        self.days.iter().map(|d| d.count(DoseStatus::Taken)).sum()
    }

    pub fn missed(&self) -> usize {
        self.days.iter().map(|d| d.count(DoseStatus::Missed)).sum()
    }

    pub fn percent(&self) -> Option<f64> {
        percent(self.taken(), self.missed())
    }

    /// Consecutive fully taken days counting back from today.
    ///
    /// Days without doses are skipped, and a today that still has upcoming
    /// doses neither extends nor breaks the streak.
    pub fn streak(&self) -> usize {
        let mut streak = 0;
        for day in self.days.iter().rev() {
            if day.count(DoseStatus::Missed) > 0 {
                break;
            }
            if day.count(DoseStatus::Upcoming) == 0 && day.count(DoseStatus::Taken) > 0 {
                streak += 1;
            }
        }
        streak
    }
}

fn percent(taken: usize, missed: usize) -> Option<f64> {
    let resolved = taken + missed;
    (resolved > 0).then(|| taken as f64 * 100.0 / resolved as f64)
}

fn entry_for(
    medication: &Medication,
    day: NaiveDate,
    logs: &[DoseLog],
    now: DateTime<Local>,
) -> Option<DoseEntry> {
    let status = if day == now.date_naive() {
        resolve_status(medication, logs, now).ok()?
    } else {
        medication.schedule().ok()?;
        if logs.iter().any(|log| log.day() == day && log.matches(medication)) {
            DoseStatus::Taken
        } else {
            DoseStatus::Missed
        }
    };

    Some(DoseEntry {
        medication_id: medication.id.clone(),
        name: medication.name.clone(),
        dosage: medication.dosage.clone(),
        scheduled_time: medication.scheduled_time.clone(),
        status,
    })
}

fn summarize(
    medications: &[Medication],
    logs: &[DoseLog],
    day: NaiveDate,
    now: DateTime<Local>,
) -> DaySummary {
    let doses = medications
        .iter()
        .filter(|m| m.is_in_scope(day))
        .filter_map(|m| entry_for(m, day, logs, now))
        .collect();
    DaySummary { day, doses }
}

/// Status of every dose due today.
pub fn summarize_today(store: &dyn MedicationStore, now: DateTime<Local>) -> DaySummary {
    let today = now.date_naive();
    summarize(&store.all(), &store.logs_between(today, today), today, now)
}

/// Per-day summaries for the `days` days ending today.
pub fn summarize_window(
    store: &dyn MedicationStore,
    days: u32,
    now: DateTime<Local>,
) -> AdherenceReport {
    let today = now.date_naive();
    let span = u64::from(days.max(1) - 1);
    let first = today.checked_sub_days(Days::new(span)).unwrap_or(today);

    let medications = store.all();
    let logs = store.logs_between(first, today);

    let days = first
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|day| summarize(&medications, &logs, day, now))
        .collect();

    AdherenceReport { days }
}
