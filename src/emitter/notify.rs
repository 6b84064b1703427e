//! Desktop notifications over the freedesktop notification service.
//!
//! Uses zbus's blocking API against `org.freedesktop.Notifications` on the
//! session bus. The connection is opened lazily on the first alarm so a
//! missing session bus never blocks the daemon from starting.

use anyhow::{Context, Result};
use std::collections::HashMap;
use zbus::blocking::Connection;
use zbus::zvariant::Value;

use super::{AlarmEmitter, AlarmSettings, NotificationPermission, PermissionState};

const APP_NAME: &str = "dosewatch";
const SUMMARY: &str = "Medication Reminder";

/// Urgency levels of the notification spec.
const URGENCY_CRITICAL: u8 = 2;

/// D-Bus proxy trait for the freedesktop Notifications interface.
#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: &HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;

    /// Returns (name, vendor, version, spec_version).
    fn get_server_information(&self) -> zbus::Result<(String, String, String, String)>;
}

fn session_proxy(connection: &Connection) -> Result<NotificationsProxyBlocking<'_>> {
    NotificationsProxyBlocking::new(connection).context("Failed to create notifications proxy")
}

/// Shows one persistent notification per alarm. Repeated alarms replace the
/// previous notification instead of stacking.
#[derive(Default)]
pub struct DesktopNotifier {
    connection: Option<Connection>,
    /// Id of the notification currently shown, 0 when none.
    current_id: u32,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection =
                Connection::session().context("Failed to connect to session D-Bus")?;
            self.connection = Some(connection);
        }
        self.connection
            .as_ref()
            .context("Session D-Bus connection unavailable")
    }
}

impl AlarmEmitter for DesktopNotifier {
    fn play(&mut self, _settings: &AlarmSettings, label: &str) -> Result<()> {
        let replaces_id = self.current_id;
        let body = format!("Time to take {label}");
        let urgency = Value::from(URGENCY_CRITICAL);
        let hints: HashMap<&str, &Value<'_>> = HashMap::from([("urgency", &urgency)]);

        let id = {
            let proxy = session_proxy(self.connection()?)?;
            // Timeout 0: stay until the user acts on the alarm
            proxy
                .notify(APP_NAME, replaces_id, "", SUMMARY, &body, &[], &hints, 0)
                .context("Failed to send desktop notification")?
        };

        self.current_id = id;
        Ok(())
    }

    fn stop(&mut self) {
        if self.current_id == 0 {
            return;
        }
        let id = std::mem::take(&mut self.current_id);
        if let Some(connection) = self.connection.as_ref()
            && let Ok(proxy) = session_proxy(connection)
        {
            // Already closed by the user is fine
            let _ = proxy.close_notification(id);
        }
    }
}

/// Permission check against the session notification service.
///
/// The freedesktop service has no permission prompt: a reachable server
/// counts as granted.
#[derive(Debug, Default)]
pub struct DbusPermission {
    state: Option<PermissionState>,
}

impl DbusPermission {
    pub fn new() -> Self {
        Self::default()
    }

    fn probe() -> PermissionState {
        let Ok(connection) = Connection::session() else {
            return PermissionState::Unavailable;
        };
        match session_proxy(&connection).and_then(|proxy| {
            proxy
                .get_server_information()
                .context("Notification server did not answer")
        }) {
            Ok(_) => PermissionState::Granted,
            Err(_) => PermissionState::Unavailable,
        }
    }
}

impl NotificationPermission for DbusPermission {
    fn check(&self) -> PermissionState {
        self.state.unwrap_or(PermissionState::Unavailable)
    }

    fn request(&mut self) -> PermissionState {
        let state = Self::probe();
        self.state = Some(state);
        state
    }
}
