//! Dose logs and the derived daily dose status.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::medication::{DoseSlot, Medication};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Taken,
}

/// Record of a dose being taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseLog {
    pub id: String,
    pub medication_id: String,
    pub taken_at: DateTime<Local>,
    /// The medication's scheduled time when the dose was logged.
    pub scheduled_time: String,
    /// Absent in logs written before slots existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<DoseSlot>,
    pub status: LogStatus,
}

impl DoseLog {
    pub fn day(&self) -> NaiveDate {
        self.taken_at.date_naive()
    }

    /// Whether this log accounts for the medication's dose.
    ///
    /// Logs with a slot match by slot; legacy logs fall back to comparing the
    /// scheduled time text.
    pub fn matches(&self, medication: &Medication) -> bool {
        if self.medication_id != medication.id {
            return false;
        }
        match self.slot {
            Some(slot) => slot == medication.slot(),
            None => self.scheduled_time == medication.scheduled_time,
        }
    }
}

/// Per-medication, per-day status. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    Upcoming,
    Taken,
    Missed,
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DoseStatus::Upcoming => "upcoming",
            DoseStatus::Taken => "taken",
            DoseStatus::Missed => "missed",
        })
    }
}
