//! Auto-play: per-item countdown, volume fades and device commands.

pub mod controller;
pub mod countdown;
pub mod device;
pub mod fade;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Timing and volume settings of the auto-play controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seconds each item plays before auto-advance.
    pub interval_secs: u32,
    /// Remaining seconds at which the fade-out starts.
    pub fade_out_lead_secs: u32,
    /// Length of the fade-out ramp.
    pub fade_out_ms: u64,
    /// Volume commands issued by the fade-out ramp.
    pub fade_out_steps: u32,
    /// Length of the fade-in ramp.
    pub fade_in_ms: u64,
    /// Volume commands issued by the fade-in ramp.
    pub fade_in_steps: u32,
    /// Volume an item starts at before fading in.
    pub fade_in_start_volume: u8,
    /// Wait between a device transfer and the play command.
    pub transfer_settle_ms: u64,
    /// Wait between the play command and the fade-in.
    pub playback_settle_ms: u64,
    /// Fraction of the item duration playback starts at.
    pub start_position_fraction: f64,
    /// Volume restored when the device does not report one.
    pub default_volume: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            fade_out_lead_secs: 2,
            fade_out_ms: 1500,
            fade_out_steps: 15,
            fade_in_ms: 2000,
            fade_in_steps: 20,
            fade_in_start_volume: 5,
            transfer_settle_ms: 500,
            playback_settle_ms: 300,
            start_position_fraction: 0.3,
            default_volume: 50,
        }
    }
}

impl PlaybackConfig {
    pub(crate) fn transfer_settle(&self) -> Duration {
        Duration::from_millis(self.transfer_settle_ms)
    }

    pub(crate) fn playback_settle(&self) -> Duration {
        Duration::from_millis(self.playback_settle_ms)
    }

    /// Offset playback starts at for an item of `duration_ms`.
    pub fn start_position_ms(&self, duration_ms: u64) -> u64 {
        let fraction = self.start_position_fraction.clamp(0.0, 1.0);
        (duration_ms as f64 * fraction).floor() as u64
    }
}

/// One item of the auto-play queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackItem {
    /// Provider item identifier.
    pub id: String,
    /// Item duration in milliseconds.
    pub duration_ms: u64,
}

/// Device the controller drives and the volume to restore on stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTarget {
    /// Provider device identifier.
    pub device_id: String,
    /// Volume observed before auto-play started.
    pub original_volume: u8,
}

/// Snapshot of the auto-play countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlaybackStatus {
    /// Whether the countdown is consuming time.
    pub running: bool,
    /// Seconds left on the current item.
    pub remaining_secs: u32,
    /// Current item index.
    pub index: usize,
}

impl PlaybackStatus {
    /// Status reported when no controller exists.
    pub fn stopped(index: usize) -> Self {
        Self {
            running: false,
            remaining_secs: 0,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_is_floored_fraction() {
        let config = PlaybackConfig::default();
        assert_eq!(config.start_position_ms(200_001), 60_000);
        assert_eq!(config.start_position_ms(0), 0);
    }
}
