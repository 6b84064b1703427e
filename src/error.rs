//! Domain errors of the reminder engine.
//!
//! Application layers wrap these in `anyhow::Error`; the engine and store use
//! the typed variants so callers can tell a retryable store failure apart from
//! a missing alarm.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// A medication's `scheduled_time` is not a valid `HH:MM` value.
    InvalidScheduledTime {
        medication_id: String,
        value: String,
    },
    /// No medication with this id exists in the store.
    MedicationNotFound(String),
    /// A user action needs an active alarm but none is set.
    NoActiveAlarm,
    /// Writing to the medication store failed; nothing was recorded.
    StoreWrite(String),
    /// The alarm emitter could not play or notify.
    Emitter(String),
}

impl fmt::Display for ReminderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderError::InvalidScheduledTime {
                medication_id,
                value,
            } => write!(
                f,
                "Medication {medication_id} has an invalid scheduled time '{value}' (expected HH:MM)"
            ),
            ReminderError::MedicationNotFound(id) => write!(f, "Medication '{id}' not found"),
            ReminderError::NoActiveAlarm => write!(f, "No alarm is currently active"),
            ReminderError::StoreWrite(reason) => {
                write!(f, "Failed to write medication store: {reason}")
            }
            ReminderError::Emitter(reason) => write!(f, "Alarm emitter failed: {reason}"),
        }
    }
}

impl std::error::Error for ReminderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ReminderError::InvalidScheduledTime {
            medication_id: "abc".to_string(),
            value: "25:99".to_string(),
        };
        assert!(err.to_string().contains("25:99"));
        assert_eq!(
            ReminderError::NoActiveAlarm.to_string(),
            "No alarm is currently active"
        );
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = ReminderError::MedicationNotFound("x".into()).into();
        assert_eq!(
            err.downcast_ref::<ReminderError>(),
            Some(&ReminderError::MedicationNotFound("x".into()))
        );
    }
}
