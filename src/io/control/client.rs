//! Client side of the control channel, used by the one-shot CLI commands.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::server::socket_path;
use super::{ControlRequest, ControlResponse};
use crate::common::constants::CONTROL_REPLY_TIMEOUT_SECS;
use crate::common::utils::private_path;

pub struct ControlClient {
    path: PathBuf,
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlClient {
    pub fn new() -> Self {
        Self::at(socket_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a daemon is accepting connections.
    pub fn is_daemon_running(&self) -> bool {
        UnixStream::connect(&self.path).is_ok()
    }

    /// Send one request and wait for the answer.
    pub fn send(&self, request: &ControlRequest) -> Result<ControlResponse> {
        let stream = UnixStream::connect(&self.path).with_context(|| {
            format!(
                "Failed to connect to {}. Is dosewatch running?",
                private_path(&self.path)
            )
        })?;

        // The server waits up to the same timeout for the engine, allow a margin
        let timeout = Duration::from_secs(CONTROL_REPLY_TIMEOUT_SECS + 1);
        stream
            .set_read_timeout(Some(timeout))
            .context("Failed to set read timeout on control socket")?;

        let mut writer = stream.try_clone().context("Failed to clone control stream")?;
        let json = serde_json::to_string(request).context("Failed to serialize request")?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        let mut line = String::new();
        BufReader::new(stream)
            .read_line(&mut line)
            .context("Failed to read control response")?;

        if line.trim().is_empty() {
            bail!("Received an empty response from dosewatch");
        }

        serde_json::from_str(line.trim())
            .with_context(|| format!("Failed to parse control response: {}", line.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_daemon() {
        let dir = tempdir().unwrap();
        let client = ControlClient::at(dir.path().join("missing.sock"));
        assert!(!client.is_daemon_running());
        assert!(client.send(&ControlRequest::State).is_err());
    }
}
