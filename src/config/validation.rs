//! Configuration validation functionality.

use anyhow::{Result, bail};

use super::Config;
use crate::common::constants::*;

/// Reject out-of-range or unknown values before they reach the engine.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(sound) = config.sound.as_deref()
        && !KNOWN_SOUNDS.contains(&sound)
    {
        bail!(
            "sound \"{}\" is not supported (expected one of: {})",
            sound,
            KNOWN_SOUNDS.join(", ")
        );
    }

    if let Some(volume) = config.volume
        && !(MINIMUM_VOLUME..=MAXIMUM_VOLUME).contains(&volume)
    {
        bail!(
            "volume ({}) must be between {} and {}",
            volume,
            MINIMUM_VOLUME,
            MAXIMUM_VOLUME
        );
    }

    if let Some(minutes) = config.snooze_duration
        && !(MINIMUM_SNOOZE_DURATION..=MAXIMUM_SNOOZE_DURATION).contains(&minutes)
    {
        bail!(
            "snooze_duration ({} minutes) must be between {} and {} minutes",
            minutes,
            MINIMUM_SNOOZE_DURATION,
            MAXIMUM_SNOOZE_DURATION
        );
    }

    if let Some(count) = config.repeat_count
        && !(MINIMUM_REPEAT_COUNT..=MAXIMUM_REPEAT_COUNT).contains(&count)
    {
        bail!(
            "repeat_count ({}) must be between {} and {}",
            count,
            MINIMUM_REPEAT_COUNT,
            MAXIMUM_REPEAT_COUNT
        );
    }

    if let Some(seconds) = config.tick_interval
        && !(MINIMUM_TICK_INTERVAL..=MAXIMUM_TICK_INTERVAL).contains(&seconds)
    {
        bail!(
            "tick_interval ({} seconds) must be between {} and {} seconds",
            seconds,
            MINIMUM_TICK_INTERVAL,
            MAXIMUM_TICK_INTERVAL
        );
    }

    if let Some(path) = config.data_file.as_deref()
        && path.trim().is_empty()
    {
        bail!("data_file must not be empty");
    }

    Ok(())
}

/// Validate a snooze duration given on the command line.
pub fn validate_snooze_minutes(minutes: u32) -> Result<()> {
    if !(MINIMUM_SNOOZE_DURATION..=MAXIMUM_SNOOZE_DURATION).contains(&minutes) {
        bail!(
            "Snooze duration must be between {} and {} minutes (got {})",
            MINIMUM_SNOOZE_DURATION,
            MAXIMUM_SNOOZE_DURATION,
            minutes
        );
    }
    Ok(())
}
