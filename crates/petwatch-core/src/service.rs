// ── Remote service seam ──
//
// The monitor talks to the collar service only through this trait, so
// the scheduler can be driven by a scripted fake in tests.

use async_trait::async_trait;
use tracing::debug;

use petwatch_api::PetClient;

use crate::error::CoreError;
use crate::model::{DeviceId, DeviceSnapshot};

/// Operations the monitor needs from the remote service.
#[async_trait]
pub trait PetService: Send + Sync + 'static {
    /// Exchange credentials for a fresh session. Last successful call wins.
    async fn login(&self) -> Result<(), CoreError>;

    /// Fetch the full current device list. Never partially applied:
    /// either every device is returned or an error is raised.
    async fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, CoreError>;

    /// Turn the collar light on or off.
    async fn set_light(&self, module_id: &str, on: bool) -> Result<(), CoreError>;

    /// Switch lost-dog mode on or off.
    async fn set_lost_mode(&self, module_id: &str, lost: bool) -> Result<(), CoreError>;

    /// Drop any per-device state held by the service (e.g. cached
    /// locations) for a device that disappeared.
    fn forget(&self, _id: &DeviceId) {}
}

#[async_trait]
impl PetService for PetClient {
    async fn login(&self) -> Result<(), CoreError> {
        PetClient::login(self).await?;
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceSnapshot>, CoreError> {
        let pets = self.list_pets().await?;
        Ok(pets.into_iter().map(DeviceSnapshot::from).collect())
    }

    async fn set_light(&self, module_id: &str, on: bool) -> Result<(), CoreError> {
        Ok(self.set_led(module_id, on).await?)
    }

    async fn set_lost_mode(&self, module_id: &str, lost: bool) -> Result<(), CoreError> {
        Ok(PetClient::set_lost_mode(self, module_id, lost).await?)
    }

    fn forget(&self, id: &DeviceId) {
        if self.location_cache().remove(id.as_str()).is_some() {
            debug!(device = %id, "dropped cached location");
        }
    }
}
