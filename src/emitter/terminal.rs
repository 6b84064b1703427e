//! Terminal bell emitter.
//!
//! Rings the bell `repeat_count` times on a background thread. A second
//! `play` while the first is still ringing is ignored so alarms never overlap.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{AlarmEmitter, AlarmSettings};
use crate::common::constants::{BELL_REPEAT_GAP_MS, KNOWN_SOUNDS};

type Bell = Arc<dyn Fn() -> std::io::Result<()> + Send + Sync>;

pub struct TerminalEmitter {
    bell: Bell,
    gap: Duration,
    playing: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Default for TerminalEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalEmitter {
    pub fn new() -> Self {
        Self::with_bell(
            Arc::new(|| {
                let mut stdout = std::io::stdout();
                stdout.write_all(b"\x07")?;
                stdout.flush()
            }),
            Duration::from_millis(BELL_REPEAT_GAP_MS),
        )
    }

    /// Use a custom bell action and repeat gap.
    pub fn with_bell(bell: Bell, gap: Duration) -> Self {
        Self {
            bell,
            gap,
            playing: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn join_finished(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl AlarmEmitter for TerminalEmitter {
    fn play(&mut self, settings: &AlarmSettings, label: &str) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        self.join_finished();

        log_block_start!("Medication reminder: time to take {label}");
        if !KNOWN_SOUNDS.contains(&settings.sound.as_str()) {
            log_indented!("Unknown sound '{}', using the bell", settings.sound);
        }
        if settings.vibrate {
            log_indented!("Vibrate");
        }
        if settings.volume == 0 {
            log_indented!("Sound muted (volume 0)");
            return Ok(());
        }

        // Probe once synchronously so a broken terminal surfaces as an error
        (self.bell)().context("Failed to ring the terminal bell")?;

        let remaining = settings.repeat_count.saturating_sub(1);
        if remaining == 0 {
            return Ok(());
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);

        let bell = Arc::clone(&self.bell);
        let gap = self.gap;
        let playing = Arc::clone(&self.playing);
        let stop_requested = Arc::clone(&self.stop_requested);

        self.handle = Some(thread::spawn(move || {
            'ring: for _ in 0..remaining {
                // Sleep in slices so stop() returns promptly
                let slice = Duration::from_millis(50).min(gap);
                let mut waited = Duration::ZERO;
                while waited < gap {
                    if stop_requested.load(Ordering::SeqCst) {
                        break 'ring;
                    }
                    thread::sleep(slice);
                    waited += slice;
                }
                if stop_requested.load(Ordering::SeqCst) || bell().is_err() {
                    break;
                }
            }
            playing.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.join_finished();
        self.playing.store(false, Ordering::SeqCst);
    }
}

impl Drop for TerminalEmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(gap_ms: u64) -> (TerminalEmitter, Arc<AtomicUsize>) {
        let rings = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rings);
        let emitter = TerminalEmitter::with_bell(
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            Duration::from_millis(gap_ms),
        );
        (emitter, rings)
    }

    fn settings(repeat_count: u32, volume: u32) -> AlarmSettings {
        AlarmSettings {
            repeat_count,
            volume,
            vibrate: false,
            ..AlarmSettings::default()
        }
    }

    #[test]
    fn test_rings_repeat_count_times() {
        crate::common::logger::Log::set_enabled(false);
        let (mut emitter, rings) = counting(1);
        emitter.play(&settings(3, 80), "Aspirin").unwrap();
        emitter.join_finished();
        assert_eq!(rings.load(Ordering::SeqCst), 3);
        assert!(!emitter.is_playing());
    }

    #[test]
    fn test_play_while_playing_is_ignored() {
        crate::common::logger::Log::set_enabled(false);
        let (mut emitter, rings) = counting(10_000);
        emitter.play(&settings(5, 80), "Aspirin").unwrap();
        assert!(emitter.is_playing());
        emitter.play(&settings(5, 80), "Ibuprofen").unwrap();
        emitter.stop();
        assert_eq!(rings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut emitter, _) = counting(1);
        emitter.stop();
        emitter.stop();
        assert!(!emitter.is_playing());
    }

    #[test]
    fn test_volume_zero_is_silent() {
        crate::common::logger::Log::set_enabled(false);
        let (mut emitter, rings) = counting(1);
        emitter.play(&settings(3, 0), "Aspirin").unwrap();
        assert_eq!(rings.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bell_failure_is_reported() {
        crate::common::logger::Log::set_enabled(false);
        let mut emitter = TerminalEmitter::with_bell(
            Arc::new(|| Err(std::io::Error::other("closed"))),
            Duration::from_millis(1),
        );
        assert!(emitter.play(&settings(3, 80), "Aspirin").is_err());
    }
}
