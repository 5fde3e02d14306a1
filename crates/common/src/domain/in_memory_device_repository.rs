use crate::domain::device::{Device, DeviceMutation, DeviceState};
use crate::domain::device_repository::{CreateDeviceRepoInput, DeviceRepository};
use crate::domain::result::{DomainError, DomainResult};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct DeviceTable {
    rows: BTreeMap<i64, Device>,
    last_id: i64,
}

/// In-memory implementation of DeviceRepository.
///
/// Guarded mutations hold the table write lock across load, check and
/// write. Constraints match the PostgreSQL schema: ids are assigned
/// monotonically and an empty name is rejected as a store error.
#[derive(Clone, Default)]
pub struct InMemoryDeviceRepository {
    table: Arc<RwLock<DeviceTable>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, operation: &'static str) -> DomainResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("store is closed").context(operation).into());
        }
        Ok(())
    }

    async fn filter<F>(&self, operation: &'static str, predicate: F) -> DomainResult<Vec<Device>>
    where
        F: Fn(&Device) -> bool,
    {
        self.ensure_open(operation)?;
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|d| predicate(*d)).cloned().collect())
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        self.ensure_open("create device")?;

        if input.name.is_empty() {
            return Err(anyhow!("name violates not-empty constraint")
                .context("create device")
                .into());
        }

        let mut table = self.table.write().await;
        table.last_id += 1;

        let device = Device {
            id: table.last_id,
            name: input.name,
            brand: input.brand,
            state: Some(input.state),
            created_on: Some(Utc::now()),
        };
        table.rows.insert(device.id, device.clone());

        debug!(device_id = device.id, "stored device in memory");
        Ok(device)
    }

    async fn get_device(&self, id: i64) -> DomainResult<Option<Device>> {
        self.ensure_open("get device")?;
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        self.ensure_open("list devices")?;
        let table = self.table.read().await;

        let mut devices: Vec<Device> = table.rows.values().cloned().collect();
        devices.sort_by_key(|d| d.created_on);
        Ok(devices)
    }

    async fn update_device(&self, mut device: Device) -> DomainResult<Device> {
        self.ensure_open("update device")?;
        let mut table = self.table.write().await;

        let current = table
            .rows
            .get(&device.id)
            .ok_or(DomainError::DeviceNotFound(device.id))?;
        current.ensure_mutable(DeviceMutation::Update)?;

        device.merge_missing_from(current);
        table.rows.insert(device.id, device.clone());

        Ok(device)
    }

    async fn delete_device(&self, id: i64) -> DomainResult<()> {
        self.ensure_open("delete device")?;
        let mut table = self.table.write().await;

        table
            .rows
            .get(&id)
            .ok_or(DomainError::DeviceNotFound(id))?
            .ensure_mutable(DeviceMutation::Delete)?;

        table.rows.remove(&id);
        Ok(())
    }

    async fn list_devices_by_brand(&self, brands: Vec<String>) -> DomainResult<Vec<Device>> {
        self.filter("list devices by brand", |d| brands.contains(&d.brand))
            .await
    }

    async fn list_devices_by_state(&self, states: Vec<DeviceState>) -> DomainResult<Vec<Device>> {
        self.filter("list devices by state", |d| {
            d.state.is_some_and(|state| states.contains(&state))
        })
        .await
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
