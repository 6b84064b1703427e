//! Signal handling and the engine's message channel.
//!
//! Every thread that needs to talk to the engine loop (signal handler, config
//! watcher, control socket server) holds a clone of the channel sender and
//! posts a [`ControlMessage`]. The loop is the only consumer and applies the
//! messages between ticks.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::io::control::{ControlRequest, ControlResponse};

#[derive(Debug)]
pub enum ControlMessage {
    /// Reload configuration (SIGUSR2, config file change)
    Reload,
    /// Stop the loop (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
    /// A user action from the control socket. The loop answers on `reply`.
    Action {
        request: ControlRequest,
        reply: Sender<ControlResponse>,
    },
}

/// Channel ends and run flag shared between the loop and its helper threads.
pub struct ControlState {
    /// Cleared when the application should stop
    pub running: Arc<AtomicBool>,
    pub receiver: Receiver<ControlMessage>,
    pub sender: Sender<ControlMessage>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlState {
    /// A fresh channel with no signal handler attached. Used by tests and
    /// simulations.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            receiver,
            sender,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Register process signals and forward them into a new [`ControlState`].
pub fn setup_signal_handler(debug_enabled: bool) -> Result<ControlState> {
    let state = ControlState::new();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = Arc::clone(&state.running);
    let sender = state.sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let message = match sig {
                SIGUSR2 => {
                    log_pipe!();
                    log_info!("Received reload signal");
                    ControlMessage::Reload
                }
                _ => {
                    if debug_enabled {
                        log_pipe!();
                        log_debug!("Received shutdown signal {sig}");
                    }
                    running.store(false, Ordering::SeqCst);
                    ControlMessage::Shutdown
                }
            };

            let shutdown = matches!(message, ControlMessage::Shutdown);
            if sender.send(message).is_err() || shutdown {
                // Loop is gone, or asked to go
                break;
            }
        }
    });

    Ok(state)
}
