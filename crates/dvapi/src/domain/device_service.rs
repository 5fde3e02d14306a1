use common::domain::{
    CreateDeviceRepoInput, Device, DeviceRepository, DeviceState, DomainError, DomainResult,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Identity of a device that is expected to exist in the store
#[derive(Debug, Clone, Copy, Validate)]
struct DeviceIdentity {
    #[garde(range(min = 1))]
    id: i64,
}

fn validate_identity(id: i64) -> DomainResult<()> {
    common::garde::validate(&DeviceIdentity { id })
}

/// Domain service for the device registry.
///
/// Built once at startup and shared (behind an `Arc`) by every caller.
/// The in-use guard itself runs inside the repository so that it is
/// atomic with the write it protects.
pub struct DeviceService {
    device_repository: Arc<dyn DeviceRepository>,
}

impl DeviceService {
    pub fn new(device_repository: Arc<dyn DeviceRepository>) -> Self {
        Self { device_repository }
    }

    /// Persist a new device.
    ///
    /// On success the caller's `id`, `state` and `created_on` are replaced by
    /// the stored values. A missing state is stored as `available`. Name
    /// constraints are enforced by the store.
    #[instrument(skip(self, device), fields(device_name = %device.name))]
    pub async fn create_device(&self, device: &mut Device) -> DomainResult<()> {
        let repo_input = CreateDeviceRepoInput {
            name: device.name.clone(),
            brand: device.brand.clone(),
            state: device.state.unwrap_or_default(),
        };

        let created = self.device_repository.create_device(repo_input).await?;

        device.id = created.id;
        device.state = created.state;
        device.created_on = created.created_on;

        info!(device_id = device.id, "device created");
        Ok(())
    }

    /// Get a device by ID
    #[instrument(skip(self))]
    pub async fn get_device(&self, id: i64) -> DomainResult<Device> {
        validate_identity(id)?;

        debug!(device_id = id, "getting device");

        self.device_repository
            .get_device(id)
            .await?
            .ok_or(DomainError::DeviceNotFound(id))
    }

    /// List every device, oldest first
    #[instrument(skip(self))]
    pub async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let devices = self.device_repository.list_devices().await?;

        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    /// Partially update a device.
    ///
    /// Empty fields of `device` keep their stored values. Rejected with
    /// `DeviceConflict` while the stored device is in-use, whatever state the
    /// payload carries.
    #[instrument(skip(self, device), fields(device_id = device.id))]
    pub async fn update_device(&self, device: Device) -> DomainResult<Device> {
        validate_identity(device.id)?;

        let updated = self.device_repository.update_device(device).await?;

        info!(device_id = updated.id, "device updated");
        Ok(updated)
    }

    /// Delete a device. Rejected with `DeviceConflict` while it is in-use.
    #[instrument(skip(self, device), fields(device_id = device.id))]
    pub async fn delete_device(&self, device: &Device) -> DomainResult<()> {
        validate_identity(device.id)?;

        self.device_repository.delete_device(device.id).await?;

        info!(device_id = device.id, "device deleted");
        Ok(())
    }

    /// Devices whose brand is any of `brands`, in store order
    #[instrument(skip(self, brands), fields(brand_count = brands.len()))]
    pub async fn find_devices_by_brand(&self, brands: Vec<String>) -> DomainResult<Vec<Device>> {
        if brands.is_empty() {
            return Err(DomainError::ValidationError("no brand defined".to_string()));
        }

        let devices = self.device_repository.list_devices_by_brand(brands).await?;

        debug!(count = devices.len(), "found devices by brand");
        Ok(devices)
    }

    /// Devices whose state is any of `states`, in store order
    #[instrument(skip(self, states), fields(state_count = states.len()))]
    pub async fn find_devices_by_state(
        &self,
        states: Vec<DeviceState>,
    ) -> DomainResult<Vec<Device>> {
        if states.is_empty() {
            return Err(DomainError::ValidationError("no state defined".to_string()));
        }

        let devices = self.device_repository.list_devices_by_state(states).await?;

        debug!(count = devices.len(), "found devices by state");
        Ok(devices)
    }

    /// Release the store handle. Call once, during shutdown.
    pub fn close(&self) {
        self.device_repository.close();
        info!("device registry closed");
    }
}
