use chrono::{DateTime, Duration as ChronoDuration, Local};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use dosewatch::common::logger::Log;
use dosewatch::core::scheduler::{AlarmScheduler, AlarmTrigger, TickOutcome};
use dosewatch::core::status::minutes_of_day;
use dosewatch::emitter::AlarmSettings;
use dosewatch::store::MedicationStore;
use dosewatch::testing::{RecordingEmitter, june, store_with};

/// What the user does right after an alarm rings.
#[derive(Debug, Clone)]
enum Answer {
    Ignore,
    Snooze(u32),
    Dismiss,
    Take,
}

fn answer_strategy() -> impl Strategy<Value = Answer> {
    prop_oneof![
        Just(Answer::Ignore),
        (1u32..=30).prop_map(Answer::Snooze),
        Just(Answer::Dismiss),
        Just(Answer::Take),
    ]
}

fn schedule_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..24, 0u32..60), 1..6)
}

fn minute(m: i64) -> DateTime<Local> {
    june(10, 0, 0) + ChronoDuration::minutes(m)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Walk one day minute by minute and answer every alarm. A dose that
    /// comes due behind another alarm must ring before the scheduler goes idle.
    #[test]
    fn test_alarm_invariants_over_a_day(
        times in schedule_strategy(),
        answers in prop::collection::vec(answer_strategy(), 32),
    ) {
        Log::set_enabled(false);

        let entries: Vec<(String, String)> = times
            .iter()
            .enumerate()
            .map(|(i, (h, m))| (format!("Med{i}"), format!("{h:02}:{m:02}")))
            .collect();
        let refs: Vec<(&str, &str)> = entries
            .iter()
            .map(|(name, time)| (name.as_str(), time.as_str()))
            .collect();
        let (mut store, ids) = store_with(&refs);
        let scheduled: HashMap<String, i64> = ids
            .iter()
            .zip(&times)
            .map(|(id, (h, m))| (id.clone(), i64::from(*h) * 60 + i64::from(*m)))
            .collect();

        let mut scheduler = AlarmScheduler::new(false);
        let mut emitter = RecordingEmitter::new();
        let settings = AlarmSettings::default();

        let mut scheduled_fires: HashMap<String, usize> = HashMap::new();
        let mut snoozed_until: HashMap<String, DateTime<Local>> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        // Doses that came due behind another alarm and have not rung yet
        let mut waiting: HashSet<String> = HashSet::new();
        let mut answers = answers.into_iter().cycle();

        for m in 0..24 * 60 {
            let now = minute(m);
            let had_active = scheduler.active().is_some();

            let due_now: Vec<String> = scheduled
                .iter()
                .filter(|(id, at)| {
                    (0..=1).contains(&(minutes_of_day(now) - **at))
                        && !scheduled_fires.contains_key(*id)
                })
                .map(|(id, _)| id.clone())
                .collect();

            let outcome = scheduler.tick(now, &store, &mut emitter, &settings);
            let rang = match &outcome {
                TickOutcome::Fired(alarm) => Some(alarm.medication_id.clone()),
                _ => None,
            };
            for id in due_now {
                if rang.as_ref() != Some(&id) {
                    waiting.insert(id);
                }
            }

            match outcome {
                TickOutcome::Fired(alarm) => {
                    prop_assert!(!had_active, "fired while another alarm was active");
                    prop_assert!(!taken.contains(&alarm.medication_id), "fired after take");

                    match alarm.trigger {
                        AlarmTrigger::Scheduled | AlarmTrigger::Queued => {
                            let count = scheduled_fires
                                .entry(alarm.medication_id.clone())
                                .or_default();
                            *count += 1;
                            prop_assert_eq!(*count, 1, "scheduled alarm fired twice");

                            let offset = minutes_of_day(now) - scheduled[&alarm.medication_id];
                            if alarm.trigger == AlarmTrigger::Scheduled {
                                prop_assert!((0..=1).contains(&offset), "fired at offset {}", offset);
                            } else {
                                prop_assert!(offset >= 0, "queued dose fired early");
                                prop_assert!(
                                    waiting.contains(&alarm.medication_id),
                                    "queued dose was never held back"
                                );
                            }
                            waiting.remove(&alarm.medication_id);
                        }
                        AlarmTrigger::Snoozed => {
                            let due = snoozed_until.remove(&alarm.medication_id);
                            prop_assert!(due.is_some_and(|due| now >= due), "snooze fired early");
                        }
                    }

                    match answers.next().unwrap_or(Answer::Ignore) {
                        Answer::Ignore => {}
                        Answer::Snooze(minutes) => {
                            let entry = scheduler.snooze(now, minutes, &mut emitter).unwrap();
                            snoozed_until.insert(entry.medication_id, entry.deferred_fire_time);
                        }
                        Answer::Dismiss => {
                            scheduler.dismiss(&mut emitter).unwrap();
                        }
                        Answer::Take => {
                            let log = scheduler.take_now(now, &mut store, &mut emitter).unwrap();
                            taken.insert(log.medication_id);
                        }
                    }
                }
                TickOutcome::AlarmPending => prop_assert!(had_active),
                TickOutcome::Idle => {
                    prop_assert!(scheduler.active().is_none());
                    prop_assert!(waiting.is_empty(), "idle while doses wait: {:?}", waiting);
                }
            }

            prop_assert!(scheduler.snoozes().len() <= ids.len());
        }

        for id in &taken {
            prop_assert_eq!(store.logs_for_day(id, now_day()).len(), 1);
        }
    }
}

fn now_day() -> chrono::NaiveDate {
    june(10, 0, 0).date_naive()
}
