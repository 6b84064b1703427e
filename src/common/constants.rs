//! Application-wide constants and default values.

// # Dose timing

/// Minutes after the scheduled time during which a dose is still "upcoming".
pub const GRACE_MINUTES: i64 = 30;

/// Minutes after the scheduled (or snoozed) time during which an alarm may fire.
pub const TRIGGER_WINDOW_MINUTES: i64 = 1;

// # Alarm settings defaults

pub const DEFAULT_SOUND: &str = "default";
pub const DEFAULT_VOLUME: u32 = 80;
pub const DEFAULT_SNOOZE_DURATION: u32 = 10; // minutes
pub const DEFAULT_REPEAT_COUNT: u32 = 3;
pub const DEFAULT_VIBRATE: bool = true;
pub const DEFAULT_DESKTOP_NOTIFICATIONS: bool = true;

/// Built-in alarm sounds. "custom" refers to a user supplied file.
pub const KNOWN_SOUNDS: [&str; 6] = ["default", "gentle", "classic", "modern", "nature", "custom"];

pub const MINIMUM_VOLUME: u32 = 0;
pub const MAXIMUM_VOLUME: u32 = 100;
pub const MINIMUM_SNOOZE_DURATION: u32 = 1;
pub const MAXIMUM_SNOOZE_DURATION: u32 = 120;
pub const MINIMUM_REPEAT_COUNT: u32 = 1;
pub const MAXIMUM_REPEAT_COUNT: u32 = 10;

// # Engine timing

pub const DEFAULT_TICK_INTERVAL: u64 = 30; // seconds
pub const MINIMUM_TICK_INTERVAL: u64 = 10;
pub const MAXIMUM_TICK_INTERVAL: u64 = 60;

/// Pause between bell repetitions of the terminal emitter.
pub const BELL_REPEAT_GAP_MS: u64 = 1000;

/// How long the control server waits for the engine to answer a request.
pub const CONTROL_REPLY_TIMEOUT_SECS: u64 = 5;

// # Statistics

pub const DEFAULT_ADHERENCE_DAYS: u32 = 7;
pub const MAXIMUM_ADHERENCE_DAYS: u32 = 366;

// # Files

pub const CONFIG_FILE_NAME: &str = "dosewatch.toml";
pub const DATA_FILE_NAME: &str = "medications.json";
pub const LOCK_FILE_NAME: &str = "dosewatch.lock";
pub const SOCKET_FILE_NAME: &str = "dosewatch.sock";

// # Exit codes

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
