//! Time source abstraction for supporting both real-time and simulated time.
//!
//! The reminder engine never reads the wall clock directly: it is handed an
//! `Arc<dyn TimeSource>` and asks it for the current time and for the "sleep
//! until next tick" primitive. Tests drive a [`ManualTimeSource`], the
//! `simulate` command drives a [`SimulatedTimeSource`], and the daemon uses
//! [`RealTimeSource`].
//!
//! A process-wide source is also kept for the logger's simulation timestamps.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

/// Global time source instance, defaults to RealTimeSource
static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current local time
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated time source for time-accelerated execution.
///
/// - Linear acceleration: each sleep takes `duration / multiplier` of real time.
/// - Fast-forward (multiplier = 0.0): sleeps return almost immediately and the
///   clock jumps by the requested duration.
///
/// The clock never moves past `end_time`.
pub struct SimulatedTimeSource {
    end_time: DateTime<Local>,
    time_multiplier: f64,
    current: Mutex<DateTime<Local>>,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source.
    ///
    /// Negative multipliers fall back to one simulated hour per real second.
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, multiplier: f64) -> Self {
        let time_multiplier = if multiplier < 0.0 { 3600.0 } else { multiplier };
        Self {
            end_time,
            time_multiplier,
            current: Mutex::new(start_time.min(end_time)),
        }
    }

    /// Whether the clock jumps instead of scaling real sleeps.
    pub fn is_fast_forward(&self) -> bool {
        self.time_multiplier == 0.0
    }

    fn current(&self) -> DateTime<Local> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        self.current()
    }

    fn sleep(&self, duration: StdDuration) {
        let now = self.current();
        if now >= self.end_time {
            return;
        }

        let remaining = (self.end_time - now).to_std().unwrap_or(StdDuration::ZERO);
        let step = duration.min(remaining);

        if self.is_fast_forward() {
            // Minimal sleep to let other threads run and logs flush
            std::thread::sleep(StdDuration::from_millis(1));
        } else {
            std::thread::sleep(StdDuration::from_secs_f64(
                step.as_secs_f64() / self.time_multiplier,
            ));
        }

        let advanced = now + ChronoDuration::milliseconds(step.as_millis() as i64);
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard = advanced.min(self.end_time);
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current() >= self.end_time
    }
}

/// Hand-driven clock for tests. Sleeping advances the clock instantly.
#[cfg(any(test, feature = "testing-support"))]
pub struct ManualTimeSource {
    current: Mutex<DateTime<Local>>,
    end_time: Option<DateTime<Local>>,
}

#[cfg(any(test, feature = "testing-support"))]
impl ManualTimeSource {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(start),
            end_time: None,
        }
    }

    /// Make `is_ended` report true once the clock reaches `end`.
    pub fn with_end(mut self, end: DateTime<Local>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn set(&self, time: DateTime<Local>) {
        *self.current.lock().unwrap() = time;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut guard = self.current.lock().unwrap();
        *guard += by;
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap()
    }

    fn sleep(&self, duration: StdDuration) {
        self.advance(ChronoDuration::milliseconds(duration.as_millis() as i64));
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.end_time.is_some_and(|end| self.now() >= end)
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

/// The global time source, defaulting to real time.
pub fn global() -> Arc<dyn TimeSource> {
    TIME_SOURCE
        .get_or_init(|| Arc::new(RealTimeSource))
        .clone()
}

/// Get the current time from the global time source
pub fn now() -> DateTime<Local> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)).now()
}

/// Check if we're running in simulation mode
pub fn is_simulated() -> bool {
    TIME_SOURCE
        .get_or_init(|| Arc::new(RealTimeSource))
        .is_simulated()
}

/// Duration from `now` until the next local midnight.
///
/// Falls back to one hour when the next midnight does not exist in the local
/// timezone (DST transitions at midnight).
pub fn until_next_midnight(now: DateTime<Local>) -> StdDuration {
    let next_day = now.date_naive().succ_opt().unwrap_or(NaiveDate::MAX);
    match start_of_day(next_day) {
        Some(midnight) => (midnight - now).to_std().unwrap_or(StdDuration::ZERO),
        None => StdDuration::from_secs(3600),
    }
}

/// The first instant of `day` in local time.
pub fn start_of_day(day: NaiveDate) -> Option<DateTime<Local>> {
    let naive = day.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&naive).earliest()
}

/// Parse a datetime string in the format "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DD HH:MM"
pub fn parse_datetime(s: &str) -> Result<DateTime<Local>, String> {
    use chrono::NaiveDateTime;

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM[:SS]"))?;

    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| "Ambiguous or invalid local time".to_string())
}
