//! Medication and dose log data model.

mod dose;
mod medication;

pub use dose::{DoseLog, DoseStatus, LogStatus};
pub use medication::{
    DoseSlot, Frequency, Medication, MedicationPatch, MedicationStatus, NewMedication, RiskLevel,
    ScheduledTime,
};
