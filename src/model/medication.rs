//! Medication definitions and their daily dose anchor.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReminderError;

/// Local time of day a dose is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledTime {
    pub hour: u8,
    pub minute: u8,
}

impl ScheduledTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Parse `H:MM` or `HH:MM`.
    pub fn parse(value: &str) -> Option<Self> {
        let (hour, minute) = value.trim().split_once(':')?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return None;
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(hour.parse().ok()?, minute.parse().ok()?)
    }

    pub fn minutes_since_midnight(&self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }
}

impl fmt::Display for ScheduledTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Stable identity of a dose within a day.
///
/// Only one daily anchor is modeled per medication, so every medication has
/// the primary slot. Logs carry the slot so that editing the scheduled time
/// keeps earlier logs matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoseSlot(pub u8);

impl DoseSlot {
    pub const PRIMARY: DoseSlot = DoseSlot(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Twice,
    Thrice,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Medication lifecycle, distinct from the daily dose status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Active,
    Completed,
    Paused,
}

macro_rules! lowercase_enum_str {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "Unknown {} '{}' (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

lowercase_enum_str!(Frequency { Once => "once", Twice => "twice", Thrice => "thrice", Daily => "daily" });
lowercase_enum_str!(RiskLevel { Low => "low", Medium => "medium", High => "high" });
lowercase_enum_str!(MedicationStatus { Active => "active", Completed => "completed", Paused => "paused" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    /// Raw `HH:MM` text. Kept unparsed so a malformed value survives a load
    /// and only excludes the medication from triggering.
    pub scheduled_time: String,
    pub frequency: Frequency,
    pub risk_level: RiskLevel,
    pub status: MedicationStatus,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Medication {
    /// Build a stored medication from user input.
    pub fn from_new(id: String, new: NewMedication, now: DateTime<Local>) -> Self {
        Self {
            id,
            name: new.name,
            dosage: new.dosage,
            scheduled_time: new.scheduled_time.to_string(),
            frequency: new.frequency,
            risk_level: new.risk_level,
            status: new.status,
            start_date: new.start_date,
            end_date: new.end_date,
            instructions: new.instructions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn schedule(&self) -> Result<ScheduledTime, ReminderError> {
        ScheduledTime::parse(&self.scheduled_time).ok_or_else(|| {
            ReminderError::InvalidScheduledTime {
                medication_id: self.id.clone(),
                value: self.scheduled_time.clone(),
            }
        })
    }

    pub fn slot(&self) -> DoseSlot {
        DoseSlot::PRIMARY
    }

    /// Active, started, and not yet ended on `today`.
    pub fn is_in_scope(&self, today: NaiveDate) -> bool {
        self.status == MedicationStatus::Active
            && self.start_date <= today
            && self.end_date.is_none_or(|end| end >= today)
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, patch: MedicationPatch, now: DateTime<Local>) {
        let MedicationPatch {
            name,
            dosage,
            scheduled_time,
            frequency,
            risk_level,
            status,
            start_date,
            end_date,
            instructions,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(dosage) = dosage {
            self.dosage = dosage;
        }
        if let Some(time) = scheduled_time {
            self.scheduled_time = time.to_string();
        }
        if let Some(frequency) = frequency {
            self.frequency = frequency;
        }
        if let Some(risk_level) = risk_level {
            self.risk_level = risk_level;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(start_date) = start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            self.end_date = end_date;
        }
        if let Some(instructions) = instructions {
            self.instructions = instructions;
        }
        self.updated_at = now;
    }
}

/// User input for a new medication.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub scheduled_time: ScheduledTime,
    pub frequency: Frequency,
    pub risk_level: RiskLevel,
    pub status: MedicationStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub instructions: Option<String>,
}

impl NewMedication {
    /// Active, once a day, low risk, starting `start_date`.
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        scheduled_time: ScheduledTime,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
            scheduled_time,
            frequency: Frequency::Once,
            risk_level: RiskLevel::Low,
            status: MedicationStatus::Active,
            start_date,
            end_date: None,
            instructions: None,
        }
    }
}

/// Partial update of a medication. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationPatch {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub scheduled_time: Option<ScheduledTime>,
    pub frequency: Option<Frequency>,
    pub risk_level: Option<RiskLevel>,
    pub status: Option<MedicationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub instructions: Option<Option<String>>,
}

impl MedicationPatch {
    pub fn is_empty(&self) -> bool {
        *self == MedicationPatch::default()
    }
}
