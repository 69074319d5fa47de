// ── Accessory layer seam ──
//
// Outbound notifications from the monitor. Every call happens on the
// monitor's control path after the registry has been updated, so an
// implementation reading the registry sees the state being reported.

use crate::escape::EscapeStatus;
use crate::model::{DeviceId, DeviceSnapshot};

/// Receiver of device state changes (the accessory layer).
///
/// Implementations must not block; they run inline with polling.
pub trait AccessorySink: Send + Sync + 'static {
    /// A device appeared in the remote list for the first time.
    fn device_added(&self, _device: &DeviceSnapshot) {}

    /// A device disappeared from the remote list.
    fn device_removed(&self, _id: &DeviceId) {}

    /// A poll or write completed for this device.
    fn snapshot_updated(&self, device: &DeviceSnapshot, escape: EscapeStatus);

    /// The escape alarm was raised. Fires once per escape episode.
    fn escape_confirmed(&self, id: &DeviceId);

    /// A raised escape alarm was withdrawn.
    fn escape_cleared(&self, id: &DeviceId);
}

/// Sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AccessorySink for NullSink {
    fn snapshot_updated(&self, _device: &DeviceSnapshot, _escape: EscapeStatus) {}
    fn escape_confirmed(&self, _id: &DeviceId) {}
    fn escape_cleared(&self, _id: &DeviceId) {}
}
