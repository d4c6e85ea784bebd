use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::playback::{PlaybackStatus, device::DeviceRef};

/// Payload of `POST /playback/start`.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartPlaybackRequest {
    /// Device to play on. Defaults to the active device, then the first one.
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub device_id: Option<String>,
}

/// A playback device as listed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceSummary {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_percent: Option<u8>,
}

impl From<DeviceRef> for DeviceSummary {
    fn from(device: DeviceRef) -> Self {
        Self {
            id: device.id,
            name: device.name,
            is_active: device.is_active,
            volume_percent: device.volume_percent,
        }
    }
}

/// Response of `POST /playback/start`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlaybackStarted {
    /// Device auto-play drives.
    pub device: DeviceSummary,
    /// Volume restored when auto-play stops.
    pub original_volume: u8,
    /// Item auto-play started from.
    pub index: usize,
}

/// Response of manual skips.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkipResponse {
    /// Item index after the skip.
    pub index: usize,
    /// Whether the cursor moved.
    pub moved: bool,
    /// Whether a running auto-play loop was told about the move.
    pub playing: bool,
}

/// Latest auto-play status pushed over SSE.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PlaybackStatusEvent(pub PlaybackStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_device_id_is_rejected() {
        let request = StartPlaybackRequest {
            device_id: Some(String::new()),
        };
        assert!(request.validate().is_err());
        assert!(StartPlaybackRequest::default().validate().is_ok());
    }
}
