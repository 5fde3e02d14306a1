use crate::domain::device::{Device, DeviceState};
use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Repository input for creating a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRepoInput {
    pub name: String,
    pub brand: String,
    pub state: DeviceState,
}

/// Repository trait for device storage operations.
///
/// `update_device` and `delete_device` load the stored record, apply the
/// in-use guard and write in one atomic unit: a device cannot become
/// in-use between the check and the write.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a device; the store assigns `id` and `created_on`
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device>;

    /// Get a device by ID
    async fn get_device(&self, id: i64) -> DomainResult<Option<Device>>;

    /// List all devices ordered by creation time, oldest first
    async fn list_devices(&self) -> DomainResult<Vec<Device>>;

    /// Merge the payload over the stored record and write it, unless the
    /// stored record is in-use. Returns the record as written.
    async fn update_device(&self, device: Device) -> DomainResult<Device>;

    /// Remove the stored record, unless it is in-use
    async fn delete_device(&self, id: i64) -> DomainResult<()>;

    /// List devices whose brand is one of `brands`
    async fn list_devices_by_brand(&self, brands: Vec<String>) -> DomainResult<Vec<Device>>;

    /// List devices whose state is one of `states`
    async fn list_devices_by_state(&self, states: Vec<DeviceState>) -> DomainResult<Vec<Device>>;

    /// Release the store handle
    fn close(&self);
}
