//! Daily dose status resolution.
//!
//! This is the only place that decides whether a dose is upcoming, taken or
//! missed. Every view and the scheduler go through [`resolve_status`].

use chrono::{DateTime, Local, Timelike};

use crate::common::constants::GRACE_MINUTES;
use crate::error::ReminderError;
use crate::model::{DoseLog, DoseStatus, Medication};

/// Minutes since local midnight, ignoring seconds.
pub fn minutes_of_day(now: DateTime<Local>) -> i64 {
    i64::from(now.hour()) * 60 + i64::from(now.minute())
}

/// Status of `medication`'s dose on `now`'s calendar day.
///
/// Logs for other medications or other days are ignored. A log for the
/// dose makes it taken regardless of the time; otherwise the dose is upcoming
/// until the grace period after the scheduled time has passed.
pub fn resolve_status(
    medication: &Medication,
    logs: &[DoseLog],
    now: DateTime<Local>,
) -> Result<DoseStatus, ReminderError> {
    let scheduled_minutes = medication.schedule()?.minutes_since_midnight();
    let today = now.date_naive();

    if logs
        .iter()
        .any(|log| log.day() == today && log.matches(medication))
    {
        return Ok(DoseStatus::Taken);
    }

    if minutes_of_day(now) > scheduled_minutes + GRACE_MINUTES {
        Ok(DoseStatus::Missed)
    } else {
        Ok(DoseStatus::Upcoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DoseSlot, LogStatus, NewMedication, ScheduledTime};
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
    }

    fn medication(time: &str) -> Medication {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut med = Medication::from_new(
            "med-1".into(),
            NewMedication::new("Aspirin", "100 mg", ScheduledTime::new(0, 0).unwrap(), start),
            at(1, 0, 0),
        );
        med.scheduled_time = time.to_string();
        med
    }

    fn log(medication_id: &str, taken_at: DateTime<Local>, time: &str, slot: Option<DoseSlot>) -> DoseLog {
        DoseLog {
            id: "log-1".into(),
            medication_id: medication_id.into(),
            taken_at,
            scheduled_time: time.into(),
            slot,
            status: LogStatus::Taken,
        }
    }

    #[test]
    fn test_within_grace_is_upcoming() {
        let med = medication("08:00");
        assert_eq!(resolve_status(&med, &[], at(10, 7, 0)), Ok(DoseStatus::Upcoming));
        assert_eq!(resolve_status(&med, &[], at(10, 8, 1)), Ok(DoseStatus::Upcoming));
        assert_eq!(resolve_status(&med, &[], at(10, 8, 30)), Ok(DoseStatus::Upcoming));
    }

    #[test]
    fn test_after_grace_is_missed() {
        let med = medication("08:00");
        assert_eq!(resolve_status(&med, &[], at(10, 8, 31)), Ok(DoseStatus::Missed));
    }

    #[test]
    fn test_matching_log_is_taken_regardless_of_time() {
        let med = medication("08:00");
        let logs = [log("med-1", at(10, 7, 55), "08:00", None)];
        assert_eq!(resolve_status(&med, &logs, at(10, 7, 56)), Ok(DoseStatus::Taken));
        assert_eq!(resolve_status(&med, &logs, at(10, 23, 59)), Ok(DoseStatus::Taken));
    }

    #[test]
    fn test_slot_log_survives_time_edit() {
        let mut med = medication("08:00");
        let logs = [log("med-1", at(10, 8, 0), "08:00", Some(DoseSlot::PRIMARY))];
        med.scheduled_time = "21:00".into();
        assert_eq!(resolve_status(&med, &logs, at(10, 21, 0)), Ok(DoseStatus::Taken));
    }

    #[test]
    fn test_legacy_log_matches_by_time_text() {
        let mut med = medication("08:00");
        let logs = [log("med-1", at(10, 8, 0), "08:00", None)];
        med.scheduled_time = "21:00".into();
        assert_eq!(resolve_status(&med, &logs, at(10, 21, 0)), Ok(DoseStatus::Upcoming));
    }

    #[test]
    fn test_ignores_other_medications_and_days() {
        let med = medication("08:00");
        let logs = [
            log("other", at(10, 8, 0), "08:00", Some(DoseSlot::PRIMARY)),
            log("med-1", at(9, 8, 0), "08:00", Some(DoseSlot::PRIMARY)),
        ];
        assert_eq!(resolve_status(&med, &logs, at(10, 9, 0)), Ok(DoseStatus::Missed));
    }

    #[test]
    fn test_malformed_time_is_an_error() {
        let med = medication("8 o'clock");
        assert!(matches!(
            resolve_status(&med, &[], at(10, 8, 0)),
            Err(ReminderError::InvalidScheduledTime { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic(
            sched_h in 0u8..24, sched_m in 0u8..60,
            now_h in 0u32..24, now_m in 0u32..60,
            with_log in any::<bool>(),
        ) {
            let med = medication(&ScheduledTime::new(sched_h, sched_m).unwrap().to_string());
            let now = at(10, now_h, now_m);
            let logs: Vec<DoseLog> = if with_log {
                vec![log("med-1", now, &med.scheduled_time, Some(DoseSlot::PRIMARY))]
            } else {
                Vec::new()
            };

            let first = resolve_status(&med, &logs, now).unwrap();
            let second = resolve_status(&med, &logs, now).unwrap();
            prop_assert_eq!(first, second);

            let late = minutes_of_day(now) > i64::from(sched_h) * 60 + i64::from(sched_m) + GRACE_MINUTES;
            let expected = match (with_log, late) {
                (true, _) => DoseStatus::Taken,
                (false, true) => DoseStatus::Missed,
                (false, false) => DoseStatus::Upcoming,
            };
            prop_assert_eq!(first, expected);
        }
    }
}
