//! Unix socket server for the control channel.
//!
//! Runs on its own thread. Each connection carries one request; the server
//! forwards it to the engine loop as a [`ControlMessage::Action`] and writes
//! back whatever the loop answers.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{ControlRequest, ControlResponse};
use crate::common::constants::{CONTROL_REPLY_TIMEOUT_SECS, SOCKET_FILE_NAME};
use crate::common::utils::{private_path, runtime_dir};
use crate::io::signals::ControlMessage;

/// Where the daemon listens.
pub fn socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_FILE_NAME)
}

pub struct ControlServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl ControlServer {
    /// Bind the socket, replacing a stale socket file.
    pub fn bind(socket_path: PathBuf) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path).with_context(|| {
                format!("Failed to remove stale socket {}", private_path(&socket_path))
            })?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create socket directory {}", private_path(parent))
            })?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind {}", private_path(&socket_path)))?;
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Start serving on a background thread.
    pub fn spawn(
        self,
        sender: Sender<ControlMessage>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            if let Err(e) = self.run(sender, running, debug_enabled) {
                log_pipe!();
                log_warning!("Control server stopped: {e}");
            }
        })
    }

    fn run(
        self,
        sender: Sender<ControlMessage>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<()> {
        if debug_enabled {
            log_debug!("Control server listening on {}", private_path(&self.socket_path));
        }

        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = serve_client(stream, &sender, debug_enabled)
                        && debug_enabled
                    {
                        log_debug!("Control client error: {e}");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(e).context("Failed to accept control connection"),
            }
        }

        Ok(())
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Read one request from `stream`, relay it to the loop and write the reply.
pub(crate) fn serve_client(
    stream: UnixStream,
    sender: &Sender<ControlMessage>,
    debug_enabled: bool,
) -> Result<()> {
    stream
        .set_nonblocking(false)
        .context("Failed to set client stream to blocking mode")?;
    stream.set_read_timeout(Some(Duration::from_secs(CONTROL_REPLY_TIMEOUT_SECS)))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read control request")?;

    let response = match serde_json::from_str::<ControlRequest>(line.trim()) {
        Ok(request) => {
            if debug_enabled {
                log_debug!("Control request: {request:?}");
            }
            relay(request, sender)
        }
        Err(e) => ControlResponse::failure(format!("Invalid request: {e}")),
    };

    let json = serde_json::to_string(&response).context("Failed to serialize response")?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn relay(request: ControlRequest, sender: &Sender<ControlMessage>) -> ControlResponse {
    let (reply, answer) = mpsc::channel();
    if sender
        .send(ControlMessage::Action { request, reply })
        .is_err()
    {
        return ControlResponse::failure("dosewatch is shutting down");
    }

    answer
        .recv_timeout(Duration::from_secs(CONTROL_REPLY_TIMEOUT_SECS))
        .unwrap_or_else(|_| ControlResponse::failure("dosewatch did not answer in time"))
}
