//! Local control channel between CLI commands and the running daemon.
//!
//! Newline-delimited JSON over a Unix socket. A client sends one
//! [`ControlRequest`] line and reads one [`ControlResponse`] line back.
//!
//! ```text
//! -> {"action":"snooze","minutes":15}
//! <- {"ok":true,"message":"Snoozed Aspirin until 09:15","active":null,"snoozes":[...]}
//! ```

mod client;
mod server;

pub use client::ControlClient;
pub use server::{ControlServer, socket_path};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::scheduler::{ActiveAlarm, AlarmTrigger};
use crate::core::snooze::SnoozeEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlRequest {
    /// Take the active alarm's dose, or a specific medication's dose.
    Take {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medication_id: Option<String>,
    },
    /// Snooze the active alarm; the configured duration when `minutes` is absent.
    Snooze {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minutes: Option<u32>,
    },
    Dismiss,
    State,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlarmView {
    pub medication_id: String,
    pub medication_name: String,
    pub scheduled_time: String,
    pub fired_at: DateTime<Local>,
    pub snoozed: bool,
}

impl From<&ActiveAlarm> for ActiveAlarmView {
    fn from(alarm: &ActiveAlarm) -> Self {
        Self {
            medication_id: alarm.medication_id.clone(),
            medication_name: alarm.medication_name.clone(),
            scheduled_time: alarm.scheduled_time.to_string(),
            fired_at: alarm.fired_at,
            snoozed: alarm.trigger == AlarmTrigger::Snoozed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeView {
    pub medication_id: String,
    pub fire_at: DateTime<Local>,
}

impl From<&SnoozeEntry> for SnoozeView {
    fn from(entry: &SnoozeEntry) -> Self {
        Self {
            medication_id: entry.medication_id.clone(),
            fire_at: entry.deferred_fire_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    pub message: String,
    pub active: Option<ActiveAlarmView>,
    #[serde(default)]
    pub snoozes: Vec<SnoozeView>,
}

impl ControlResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            active: None,
            snoozes: Vec::new(),
        }
    }
}
