use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::thread;

use dosewatch::common::logger::Log;
use dosewatch::config::Config;
use dosewatch::core::scheduler::{AlarmScheduler, AlarmTrigger, TickOutcome};
use dosewatch::core::status::resolve_status;
use dosewatch::core::{Core, CoreParams};
use dosewatch::emitter::AlarmSettings;
use dosewatch::io::control::{ControlClient, ControlRequest, ControlServer};
use dosewatch::io::signals::{ControlMessage, ControlState};
use dosewatch::model::DoseStatus;
use dosewatch::store::{MedicationStore, MemoryStore};
use dosewatch::testing::{EmitterEvent, ManualTimeSource, RecordingEmitter, june, store_with};
use dosewatch::time::source::RealTimeSource;

fn status_of(store: &MemoryStore, id: &str, now: chrono::DateTime<chrono::Local>) -> DoseStatus {
    let medication = store.get(id).expect("medication exists");
    let logs = store.logs_for_day(id, now.date_naive());
    resolve_status(&medication, &logs, now).expect("valid schedule")
}

fn core_with(
    store: MemoryStore,
    emitter: RecordingEmitter,
    clock: Arc<ManualTimeSource>,
) -> Core {
    Core::new(CoreParams {
        store: Box::new(store),
        emitter: Box::new(emitter),
        config: Config::default(),
        config_path: None,
        control: ControlState::new(),
        time_source: clock,
        debug_enabled: false,
    })
}

#[test]
fn test_fire_snooze_refire_take() {
    Log::set_enabled(false);
    let (mut store, ids) = store_with(&[("Aspirin", "09:00")]);
    let id = &ids[0];
    let mut emitter = RecordingEmitter::new();
    let settings = AlarmSettings::default();
    let mut scheduler = AlarmScheduler::new(false);

    // 08:59: upcoming, nothing rings
    let now = june(10, 8, 59);
    assert_eq!(status_of(&store, id, now), DoseStatus::Upcoming);
    assert_eq!(
        scheduler.tick(now, &store, &mut emitter, &settings),
        TickOutcome::Idle
    );
    assert!(scheduler.active().is_none());

    // 09:00: fires once
    let now = june(10, 9, 0);
    let outcome = scheduler.tick(now, &store, &mut emitter, &settings);
    let alarm = match outcome {
        TickOutcome::Fired(alarm) => alarm,
        other => panic!("expected the alarm to fire, got {other:?}"),
    };
    assert_eq!(alarm.medication_id, *id);
    assert_eq!(alarm.trigger, AlarmTrigger::Scheduled);
    assert_eq!(emitter.played(), vec!["Aspirin".to_string()]);

    // Still 09:00 on the next tick: no second alarm
    assert_eq!(
        scheduler.tick(now, &store, &mut emitter, &settings),
        TickOutcome::AlarmPending
    );
    assert_eq!(emitter.played().len(), 1);

    // Snooze for 10 minutes
    let entry = scheduler
        .snooze(now, 10, &mut emitter)
        .expect("alarm is active");
    assert_eq!(entry.medication_id, *id);
    assert_eq!(entry.deferred_fire_time, june(10, 9, 10));
    assert!(scheduler.active().is_none());

    // 09:05: snooze not due yet
    assert_eq!(
        scheduler.tick(june(10, 9, 5), &store, &mut emitter, &settings),
        TickOutcome::Idle
    );

    // 09:10: re-fires from the snooze
    let outcome = scheduler.tick(june(10, 9, 10), &store, &mut emitter, &settings);
    let alarm = match outcome {
        TickOutcome::Fired(alarm) => alarm,
        other => panic!("expected the snooze to re-fire, got {other:?}"),
    };
    assert_eq!(alarm.trigger, AlarmTrigger::Snoozed);
    assert_eq!(emitter.played().len(), 2);

    // Take it
    let log = scheduler
        .take_now(june(10, 9, 11), &mut store, &mut emitter)
        .expect("dose recorded");
    assert_eq!(log.medication_id, *id);
    assert!(scheduler.active().is_none());
    assert!(scheduler.snoozes().is_empty());
    assert_eq!(emitter.events().last(), Some(&EmitterEvent::Stop));

    for (hour, minute) in [(9, 12), (12, 0), (23, 59)] {
        let now = june(10, hour, minute);
        assert_eq!(status_of(&store, id, now), DoseStatus::Taken);
        assert_eq!(
            scheduler.tick(now, &store, &mut emitter, &settings),
            TickOutcome::Idle
        );
    }
    assert_eq!(emitter.played().len(), 2);
}

#[test]
fn test_engine_runs_simulated_morning() {
    Log::set_enabled(false);
    let (store, _) = store_with(&[("Aspirin", "09:00"), ("Vitamin D", "09:30")]);
    let emitter = RecordingEmitter::new();
    let clock = Arc::new(ManualTimeSource::new(june(10, 8, 50)).with_end(june(10, 10, 0)));

    let mut core = core_with(store, emitter.clone(), clock);
    core.execute().expect("engine loop");

    // The 09:00 alarm is never answered, so it blocks the 09:30 one
    assert_eq!(emitter.played(), vec!["Aspirin".to_string()]);
    assert_eq!(emitter.events().last(), Some(&EmitterEvent::Stop));
    assert!(core.scheduler().active().is_none());
}

#[test]
fn test_engine_answers_requests_between_ticks() {
    Log::set_enabled(false);
    let (store, ids) = store_with(&[("Aspirin", "09:00"), ("Vitamin D", "09:30")]);
    let emitter = RecordingEmitter::new();
    let clock = Arc::new(ManualTimeSource::new(june(10, 9, 0)));
    let mut core = core_with(store, emitter.clone(), clock.clone());

    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));

    let response = core.handle_request(ControlRequest::Snooze { minutes: Some(5) });
    assert!(response.ok, "{}", response.message);
    assert!(response.active.is_none());
    assert_eq!(response.snoozes.len(), 1);
    assert_eq!(response.snoozes[0].fire_at, june(10, 9, 5));

    clock.set(june(10, 9, 5));
    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));

    let response = core.handle_request(ControlRequest::Take {
        medication_id: None,
    });
    assert!(response.ok, "{}", response.message);
    assert!(response.active.is_none());
    assert!(response.snoozes.is_empty());
    assert_eq!(core.store().logs_for_day(&ids[0], june(10, 0, 0).date_naive()).len(), 1);

    clock.set(june(10, 9, 30));
    let TickOutcome::Fired(alarm) = core.tick_once() else {
        panic!("second medication should fire once the first is taken");
    };
    assert_eq!(alarm.medication_id, ids[1]);

    let response = core.handle_request(ControlRequest::Dismiss);
    assert!(response.ok);
    assert!(core.scheduler().active().is_none());

    // Dismissed doses do not ring again the same day
    clock.set(june(10, 9, 31));
    assert_eq!(core.tick_once(), TickOutcome::Idle);
    assert_eq!(emitter.played().len(), 3);
}

#[test]
fn test_dose_due_behind_alarm_rings_after_it_clears() {
    Log::set_enabled(false);
    let (store, ids) = store_with(&[("Aspirin", "09:00"), ("Vitamin D", "09:00")]);
    let emitter = RecordingEmitter::new();
    let clock = Arc::new(ManualTimeSource::new(june(10, 9, 0)));
    let mut core = core_with(store, emitter.clone(), clock.clone());

    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));
    clock.set(june(10, 9, 5));
    assert_eq!(core.tick_once(), TickOutcome::AlarmPending);

    let response = core.handle_request(ControlRequest::Take {
        medication_id: None,
    });
    assert!(response.ok, "{}", response.message);

    let alarm = match core.tick_once() {
        TickOutcome::Fired(alarm) => alarm,
        other => panic!("expected the held-back dose to ring, got {other:?}"),
    };
    assert_eq!(alarm.medication_id, ids[1]);
    assert_eq!(alarm.trigger, AlarmTrigger::Queued);
    assert_eq!(
        emitter.played(),
        vec!["Aspirin".to_string(), "Vitamin D".to_string()]
    );
}

#[test]
fn test_next_day_rings_again() {
    Log::set_enabled(false);
    let (store, ids) = store_with(&[("Aspirin", "09:00")]);
    let emitter = RecordingEmitter::new();
    let clock = Arc::new(ManualTimeSource::new(june(10, 9, 0)));
    let mut core = core_with(store, emitter.clone(), clock.clone());

    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));
    let response = core.handle_request(ControlRequest::Take {
        medication_id: Some(ids[0].clone()),
    });
    assert!(response.ok, "{}", response.message);

    clock.set(june(10, 23, 59));
    assert_eq!(core.tick_once(), TickOutcome::Idle);

    clock.advance(ChronoDuration::minutes(1));
    assert_eq!(core.tick_once(), TickOutcome::Idle);
    assert_eq!(core.scheduler().current_day(), Some(june(11, 0, 0).date_naive()));

    clock.set(june(11, 9, 0));
    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));
    assert_eq!(emitter.played().len(), 2);
}

#[test]
fn test_unanswered_alarm_cleared_at_midnight() {
    Log::set_enabled(false);
    let (store, _) = store_with(&[("Aspirin", "23:30")]);
    let emitter = RecordingEmitter::new();
    let clock = Arc::new(ManualTimeSource::new(june(10, 23, 30)));
    let mut core = core_with(store, emitter.clone(), clock.clone());

    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));
    clock.set(june(11, 0, 0));
    assert_eq!(core.tick_once(), TickOutcome::Idle);
    assert!(core.scheduler().active().is_none());
    assert_eq!(emitter.events().last(), Some(&EmitterEvent::Stop));
}

#[test]
fn test_playback_failure_keeps_alarm_active() {
    Log::set_enabled(false);
    let (store, _) = store_with(&[("Aspirin", "09:00")]);
    let emitter = RecordingEmitter::failing();
    let clock = Arc::new(ManualTimeSource::new(june(10, 9, 0)));
    let mut core = core_with(store, emitter.clone(), clock);

    assert!(matches!(core.tick_once(), TickOutcome::Fired(_)));
    assert!(core.scheduler().active().is_some());

    let response = core.handle_request(ControlRequest::State);
    assert!(response.ok);
    assert!(response.active.is_some());
}

#[test]
fn test_store_failure_keeps_alarm_for_retry() {
    Log::set_enabled(false);
    let (mut store, ids) = store_with(&[("Aspirin", "09:00")]);
    let mut emitter = RecordingEmitter::new();
    let settings = AlarmSettings::default();
    let mut scheduler = AlarmScheduler::new(false);

    assert!(matches!(
        scheduler.tick(june(10, 9, 0), &store, &mut emitter, &settings),
        TickOutcome::Fired(_)
    ));

    store.set_fail_writes(true);
    assert!(
        scheduler
            .take_now(june(10, 9, 1), &mut store, &mut emitter)
            .is_err()
    );
    assert!(scheduler.active().is_some());
    assert!(store.logs_for_day(&ids[0], june(10, 0, 0).date_naive()).is_empty());

    store.set_fail_writes(false);
    scheduler
        .take_now(june(10, 9, 2), &mut store, &mut emitter)
        .expect("retry succeeds");
    assert!(scheduler.active().is_none());
    assert_eq!(status_of(&store, &ids[0], june(10, 9, 3)), DoseStatus::Taken);
}

#[test]
fn test_control_socket_round_trip() {
    Log::set_enabled(false);
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("dosewatch.sock");

    let control = ControlState::new();
    let sender = control.sender.clone();
    let running = control.running.clone();

    let server = ControlServer::bind(socket.clone()).unwrap();
    let server_handle = server.spawn(sender.clone(), running, false);

    let engine = thread::spawn(move || {
        let mut core = Core::new(CoreParams {
            store: Box::new(MemoryStore::new()),
            emitter: Box::new(RecordingEmitter::new()),
            config: Config::default(),
            config_path: None,
            control,
            time_source: Arc::new(RealTimeSource),
            debug_enabled: false,
        });
        core.execute()
    });

    let client = ControlClient::at(&socket);
    assert!(client.is_daemon_running());

    let response = client.send(&ControlRequest::State).unwrap();
    assert!(response.ok);
    assert_eq!(response.message, "No active alarm");
    assert!(response.active.is_none());

    let response = client.send(&ControlRequest::Dismiss).unwrap();
    assert!(!response.ok);

    sender.send(ControlMessage::Shutdown).unwrap();
    engine.join().unwrap().unwrap();
    server_handle.join().unwrap();
}
