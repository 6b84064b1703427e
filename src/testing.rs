//! Test fixtures shared by unit and integration tests.
//!
//! Available with the `testing-support` feature.

use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::sync::{Arc, Mutex};

use crate::emitter::{AlarmEmitter, AlarmSettings};
use crate::model::{NewMedication, ScheduledTime};
use crate::store::{MedicationStore, MemoryStore};

pub use crate::time::source::ManualTimeSource;

/// Local time on a June 2025 day.
pub fn june(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2025, 6, day, hour, minute, 0)
        .single()
        .expect("valid fixture time")
}

pub fn june_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).expect("valid fixture date")
}

/// Active, once-daily medication starting on 1 June 2025.
pub fn medication(name: &str, time: &str) -> NewMedication {
    NewMedication::new(
        name,
        "1 tablet",
        ScheduledTime::parse(time).expect("valid fixture time"),
        june_date(1),
    )
}

/// A memory store holding one medication per `(name, time)`; returns the ids
/// in the same order.
pub fn store_with(medications: &[(&str, &str)]) -> (MemoryStore, Vec<String>) {
    let mut store = MemoryStore::new();
    let ids = medications
        .iter()
        .map(|(name, time)| {
            store
                .add(medication(name, time), june(1, 0, 0))
                .expect("memory store add")
                .id
        })
        .collect();
    (store, ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterEvent {
    Play { label: String },
    Stop,
}

/// Emitter that records calls. Clones share the same event list, so a test
/// can keep one clone while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<EmitterEvent>>>,
    fail_play: bool,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `play` fails after being recorded.
    pub fn failing() -> Self {
        Self {
            fail_play: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<EmitterEvent> {
        self.events.lock().expect("emitter events lock").clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EmitterEvent::Play { label } => Some(label),
                EmitterEvent::Stop => None,
            })
            .collect()
    }
}

impl AlarmEmitter for RecordingEmitter {
    fn play(&mut self, _settings: &AlarmSettings, label: &str) -> Result<()> {
        self.events
            .lock()
            .expect("emitter events lock")
            .push(EmitterEvent::Play {
                label: label.to_string(),
            });
        if self.fail_play {
            bail!("no audio device");
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.events
            .lock()
            .expect("emitter events lock")
            .push(EmitterEvent::Stop);
    }
}
