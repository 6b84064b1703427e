//! Structured logging system with visual formatting.
//!
//! This module provides the box-drawing output style used by every dosewatch
//! command and by the reminder daemon. Messages are routed either to stdout or,
//! when file logging is active (`dosewatch simulate --log`), to a background
//! writer thread that strips ANSI colors.
//!
//! The logger supports runtime enable/disable functionality for quiet operation
//! during automated processes or testing.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Option<Sender<LogMessage>>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// - **`log_block_start!`**: begins a new conceptual block (alarm fired, config
///   loaded, shutdown). Prints an empty pipe `┃` followed by `┣ message`.
/// - **`log_decorated!`**: a line that belongs to the current block, `┣ message`.
/// - **`log_indented!`**: nested detail below a block line, `┃   message`.
/// - **`log_pipe!`**: a single `┃` spacer, used before a semantic message such as
///   `log_warning!` when it opens a new block.
/// - **`log_version!`** / **`log_end!`**: the header and the final `╹` marker.
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**:
///   semantic messages with a colored `[LEVEL]` tag.
pub struct Log;

impl Log {
    /// Enable or disable logging temporarily.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Start file logging to the specified path.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(Some(tx.clone()))
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown while running on simulated time.
    ///
    /// Returns an empty string outside of simulation so regular output stays
    /// identical to what users see from the daemon.
    pub fn get_timestamp_prefix() -> String {
        if crate::time::source::is_initialized() && crate::time::source::is_simulated() {
            format!("[{}] ", crate::time::source::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Guard for file logging that ensures clean shutdown.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Line layouts understood by [`emit`].
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Decorated,
    Indented,
    BlockStart,
    Warning,
    Error,
    ErrorExit,
    Info,
    Debug,
    Critical,
}

impl Layout {
    fn render(self, prefix: &str, message: &str) -> String {
        match self {
            Layout::Decorated => format!("{prefix}┣ {message}\n"),
            Layout::Indented => format!("{prefix}┃   {message}\n"),
            Layout::BlockStart => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            Layout::Warning => format!("{prefix}┣[\x1b[33mWARNING\x1b[0m] {message}\n"),
            Layout::Error => format!("{prefix}┣[\x1b[31mERROR\x1b[0m] {message}\n"),
            Layout::ErrorExit => {
                format!("{prefix}┃\n{prefix}┗[\x1b[31mERROR\x1b[0m] {message}\n")
            }
            Layout::Info => format!("{prefix}┣[\x1b[32mINFO\x1b[0m] {message}\n"),
            Layout::Debug => format!("{prefix}┣[\x1b[32mDEBUG\x1b[0m] {message}\n"),
            Layout::Critical => format!("{prefix}┣[\x1b[31mCRITICAL\x1b[0m] {message}\n"),
        }
    }
}

/// Format and route one log line. Used by the logging macros.
#[doc(hidden)]
pub fn emit(layout: Layout, message: fmt::Arguments<'_>) {
    if !Log::is_enabled() {
        return;
    }
    let prefix = Log::get_timestamp_prefix();
    write_output(&layout.render(&prefix, &message.to_string()));
}

/// Emit a fixed line (pipe, version header, end marker).
#[doc(hidden)]
pub fn emit_raw(line: &str) {
    if !Log::is_enabled() {
        return;
    }
    let prefix = Log::get_timestamp_prefix();
    write_output(&format!("{prefix}{line}\n"));
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Route already formatted output to the log file or stdout.
pub fn write_output(text: &str) {
    if let Some(Some(tx)) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Decorated, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Decorated, format_args!("{}", $expr))
    };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Indented, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Indented, format_args!("{}", $expr))
    };
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::BlockStart, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::BlockStart, format_args!("{}", $expr))
    };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::common::logger::emit_raw("┃")
    };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::common::logger::emit_raw(&format!(
            "┏ dosewatch v{} ━━╸",
            env!("CARGO_PKG_VERSION")
        ))
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::common::logger::emit_raw("╹")
    };
}

/// Log a warning message with pipe prefix and yellow-colored text.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Warning, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Warning, format_args!("{}", $expr))
    };
}

/// Log an error message with pipe prefix and red-colored text.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Error, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Error, format_args!("{}", $expr))
    };
}

/// Log an error that terminates the current flow, closing the block with `┗`.
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::ErrorExit, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::ErrorExit, format_args!("{}", $expr))
    };
}

/// Log an informational message with pipe prefix and green-colored text.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Info, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Info, format_args!("{}", $expr))
    };
}

/// Log a debug/operational message.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Debug, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Debug, format_args!("{}", $expr))
    };
}

/// Log a critical message with pipe prefix and red-colored text.
#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Critical, format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::common::logger::emit($crate::common::logger::Layout::Critical, format_args!("{}", $expr))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let colored = "┣[\x1b[33mWARNING\x1b[0m] careful";
        assert_eq!(strip_ansi_codes(colored), "┣[WARNING] careful");
    }

    #[test]
    fn test_layout_rendering() {
        assert_eq!(Layout::Decorated.render("", "hello"), "┣ hello\n");
        assert_eq!(Layout::Indented.render("", "detail"), "┃   detail\n");
        assert_eq!(
            Layout::BlockStart.render("[09:00:00] ", "block"),
            "[09:00:00] ┃\n[09:00:00] ┣ block\n"
        );
        assert!(Layout::Error.render("", "x").contains("ERROR"));
    }
}
