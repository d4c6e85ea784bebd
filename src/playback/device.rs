use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderError;

/// A device the music provider can play on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Provider device identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the device is currently the active player.
    pub is_active: bool,
    /// Current volume in `0..=100`, when the device reports one.
    pub volume_percent: Option<u8>,
}

/// A failed command sent to the playback device.
#[derive(Debug, Error)]
#[error("playback command `{command}` failed")]
pub struct DeviceCommandError {
    /// Command name, e.g. `"transfer"` or `"set_volume"`.
    pub command: &'static str,
    /// Underlying provider failure.
    #[source]
    pub source: ProviderError,
}

impl DeviceCommandError {
    /// Wrap a provider failure for `command`.
    pub fn new(command: &'static str, source: ProviderError) -> Self {
        Self { command, source }
    }
}

/// Result of a device command.
pub type DeviceResult<T> = Result<T, DeviceCommandError>;

/// Remote control of the provider's playback devices.
///
/// Every call is independent: no atomicity is assumed across a transfer and
/// the play that follows it.
pub trait PlaybackDevice: Send + Sync {
    /// Devices available to the user.
    fn list_devices(&self) -> BoxFuture<'static, DeviceResult<Vec<DeviceRef>>>;
    /// Move playback to `device_id` without starting it.
    fn transfer(&self, device_id: &str) -> BoxFuture<'static, DeviceResult<()>>;
    /// Play `item_id` on `device_id` starting `position_ms` into the item.
    fn play_at(
        &self,
        device_id: &str,
        item_id: &str,
        position_ms: u64,
    ) -> BoxFuture<'static, DeviceResult<()>>;
    /// Pause playback on `device_id`.
    fn pause(&self, device_id: &str) -> BoxFuture<'static, DeviceResult<()>>;
    /// Set the volume of `device_id` to `percent`.
    fn set_volume(&self, device_id: &str, percent: u8) -> BoxFuture<'static, DeviceResult<()>>;
}

/// Choose the requested device, else the active one, else the first listed.
pub fn pick_device<'a>(devices: &'a [DeviceRef], requested: Option<&str>) -> Option<&'a DeviceRef> {
    if let Some(requested) = requested {
        return devices.iter().find(|device| device.id == requested);
    }
    devices
        .iter()
        .find(|device| device.is_active)
        .or_else(|| devices.first())
}
