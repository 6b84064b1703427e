//! Application coordinator for the reminder daemon.
//!
//! Acquires the resources the engine needs (config, instance lock, signal
//! handler, config watcher, control socket, medication store, emitter chain),
//! hands them to [`Core`] and releases them on the way out.
//!
//! - Normal startup: `Dosewatch::new(debug_enabled).run()`
//! - Simulation: `Dosewatch::new(debug_enabled).without_lock().run()`

use anyhow::{Context, Result};

use crate::{
    common::utils::{pluralize, private_path},
    config::{self, Config},
    core::{Core, CoreParams},
    emitter::{DbusPermission, build_emitter},
    io::control::{ControlServer, socket_path},
    io::lock::acquire_lock,
    io::signals::setup_signal_handler,
    store::{JsonFileStore, MedicationStore},
};

/// Builder for running the reminder daemon.
///
/// ```no_run
/// use dosewatch::Dosewatch;
///
/// # fn main() -> anyhow::Result<()> {
/// Dosewatch::new(false).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Dosewatch {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
}

impl Dosewatch {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
        }
    }

    /// Skip the instance lock and the control socket (simulation runs next
    /// to a real daemon).
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Run until a shutdown signal arrives (or simulated time ends).
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Debug mode enabled");
            }
        }

        let config = Config::load().context("Configuration failed")?;

        // Held until the end of this function
        let _lock = if self.create_lock {
            Some(acquire_lock()?)
        } else {
            None
        };

        let control = setup_signal_handler(self.debug_enabled)?;

        let config_path = config::get_config_path()?;
        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", private_path(&custom_dir));
        }
        if let Err(e) = config::start_config_watcher(
            config_path.clone(),
            control.sender.clone(),
            self.debug_enabled,
        ) {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Use 'dosewatch reload' after editing the config");
        }

        config.log_config();

        let data_path = config.data_file_path()?;
        let store = JsonFileStore::open(data_path.clone())?;
        log_block_start!(
            "Loaded {} from {}",
            pluralize(store.all().len(), "medication", "medications"),
            private_path(&data_path)
        );

        let mut permission = DbusPermission::new();
        let emitter = build_emitter(
            config.desktop_notifications(),
            &mut permission,
            self.debug_enabled,
        );

        let server_handle = if self.create_lock {
            match ControlServer::bind(socket_path()) {
                Ok(server) => Some(server.spawn(
                    control.sender.clone(),
                    control.running.clone(),
                    self.debug_enabled,
                )),
                Err(e) => {
                    log_pipe!();
                    log_warning!("Control socket unavailable: {e:#}");
                    log_indented!("take, snooze and dismiss will not reach this instance");
                    None
                }
            }
        } else {
            None
        };

        log_block_start!("Watching for scheduled doses...");

        let mut core = Core::new(CoreParams {
            store: Box::new(store),
            emitter: Box::new(emitter),
            config,
            config_path: Some(config_path),
            control,
            time_source: crate::time::source::global(),
            debug_enabled: self.debug_enabled,
        });
        let result = core.execute();

        if let Some(handle) = server_handle
            && handle.join().is_err()
        {
            log_warning!("Control server thread panicked");
        }

        log_block_start!("Shutting down dosewatch...");
        log_end!();
        result
    }
}
