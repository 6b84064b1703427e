//! Alarm emitters: the side effects of a fired alarm.
//!
//! The scheduler only knows the two-method [`AlarmEmitter`] contract. `stop`
//! must be idempotent and safe to call when nothing is playing. A failing
//! `play` never cancels the alarm; the scheduler logs it and keeps the alarm
//! active.

mod notify;
mod terminal;

pub use notify::{DbusPermission, DesktopNotifier};
pub use terminal::TerminalEmitter;

use anyhow::Result;

use crate::common::constants::{
    DEFAULT_REPEAT_COUNT, DEFAULT_SNOOZE_DURATION, DEFAULT_SOUND, DEFAULT_VIBRATE, DEFAULT_VOLUME,
};

/// User preferences for how an alarm is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSettings {
    pub sound: String,
    /// 0-100, 0 mutes the sound.
    pub volume: u32,
    pub snooze_duration_minutes: u32,
    pub repeat_count: u32,
    pub vibrate: bool,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound: DEFAULT_SOUND.to_string(),
            volume: DEFAULT_VOLUME,
            snooze_duration_minutes: DEFAULT_SNOOZE_DURATION,
            repeat_count: DEFAULT_REPEAT_COUNT,
            vibrate: DEFAULT_VIBRATE,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait AlarmEmitter: Send {
    /// Begin sound, vibration or notification for `label`.
    fn play(&mut self, settings: &AlarmSettings, label: &str) -> Result<()>;

    /// Halt everything started by `play`.
    fn stop(&mut self);
}

/// Fans one alarm out to several emitters.
///
/// `play` succeeds when at least one child succeeds; otherwise the first
/// error is returned.
#[derive(Default)]
pub struct CompositeEmitter {
    emitters: Vec<Box<dyn AlarmEmitter>>,
}

impl CompositeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, emitter: impl AlarmEmitter + 'static) -> Self {
        self.push(Box::new(emitter));
        self
    }

    pub fn push(&mut self, emitter: Box<dyn AlarmEmitter>) {
        self.emitters.push(emitter);
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}

impl AlarmEmitter for CompositeEmitter {
    fn play(&mut self, settings: &AlarmSettings, label: &str) -> Result<()> {
        let mut first_error = None;
        let mut any_ok = self.emitters.is_empty();

        for emitter in &mut self.emitters {
            match emitter.play(settings, label) {
                Ok(()) => any_ok = true,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if !any_ok => Err(e),
            _ => Ok(()),
        }
    }

    fn stop(&mut self) {
        for emitter in &mut self.emitters {
            emitter.stop();
        }
    }
}

/// Outcome of asking the desktop for permission to show notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// No notification service could be reached.
    Unavailable,
}

#[cfg_attr(test, mockall::automock)]
pub trait NotificationPermission {
    /// Current state without prompting.
    fn check(&self) -> PermissionState;

    /// Ask for permission if the platform supports asking.
    fn request(&mut self) -> PermissionState;
}

/// Assemble the emitter chain for the daemon.
///
/// The terminal emitter is always present. The desktop notifier is added only
/// when notifications are enabled and permission is granted; anything else
/// just suppresses that side effect.
pub fn build_emitter(
    desktop_notifications: bool,
    permission: &mut dyn NotificationPermission,
    debug_enabled: bool,
) -> CompositeEmitter {
    let mut emitter = CompositeEmitter::new().with(TerminalEmitter::new());

    if !desktop_notifications {
        return emitter;
    }

    // Only prompt when not already granted
    let state = match permission.check() {
        PermissionState::Granted => PermissionState::Granted,
        _ => permission.request(),
    };

    match state {
        PermissionState::Granted => {
            emitter.push(Box::new(DesktopNotifier::new()));
            if debug_enabled {
                log_debug!("Desktop notifications enabled");
            }
        }
        PermissionState::Denied => {
            log_pipe!();
            log_warning!("Desktop notifications were denied");
            log_indented!("Alarms will only ring in the terminal");
        }
        PermissionState::Unavailable => {
            log_pipe!();
            log_warning!("No desktop notification service found");
            log_indented!("Alarms will only ring in the terminal");
        }
    }

    emitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn failing() -> MockAlarmEmitter {
        let mut mock = MockAlarmEmitter::new();
        mock.expect_play().returning(|_, _| Err(anyhow!("no audio")));
        mock.expect_stop().return_const(());
        mock
    }

    fn working() -> MockAlarmEmitter {
        let mut mock = MockAlarmEmitter::new();
        mock.expect_play().times(1).returning(|_, _| Ok(()));
        mock.expect_stop().times(1).return_const(());
        mock
    }

    #[test]
    fn test_composite_succeeds_if_any_child_succeeds() {
        let mut emitter = CompositeEmitter::new().with(failing()).with(working());
        assert!(emitter.play(&AlarmSettings::default(), "Aspirin").is_ok());
        emitter.stop();
    }

    #[test]
    fn test_composite_reports_first_error_when_all_fail() {
        let mut emitter = CompositeEmitter::new().with(failing()).with(failing());
        let err = emitter.play(&AlarmSettings::default(), "Aspirin").unwrap_err();
        assert_eq!(err.to_string(), "no audio");
    }

    #[test]
    fn test_build_emitter_respects_permission() {
        crate::common::logger::Log::set_enabled(false);

        let mut denied = MockNotificationPermission::new();
        denied.expect_check().times(1).return_const(PermissionState::Denied);
        denied.expect_request().times(1).return_const(PermissionState::Denied);
        assert_eq!(build_emitter(true, &mut denied, false).len(), 1);

        let mut granted = MockNotificationPermission::new();
        granted.expect_check().times(1).return_const(PermissionState::Unavailable);
        granted.expect_request().times(1).return_const(PermissionState::Granted);
        assert_eq!(build_emitter(true, &mut granted, false).len(), 2);

        let mut untouched = MockNotificationPermission::new();
        untouched.expect_check().never();
        untouched.expect_request().never();
        assert_eq!(build_emitter(false, &mut untouched, false).len(), 1);
    }

    #[test]
    fn test_build_emitter_skips_prompt_when_already_granted() {
        let mut permission = MockNotificationPermission::new();
        permission.expect_check().times(1).return_const(PermissionState::Granted);
        permission.expect_request().never();
        assert_eq!(build_emitter(true, &mut permission, false).len(), 2);
    }

    #[test]
    fn test_default_settings_match_constants() {
        let settings = AlarmSettings::default();
        assert_eq!(settings.sound, "default");
        assert_eq!(settings.volume, 80);
        assert_eq!(settings.snooze_duration_minutes, 10);
        assert_eq!(settings.repeat_count, 3);
        assert!(settings.vibrate);
    }
}
