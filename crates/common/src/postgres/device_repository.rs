use crate::domain::{
    CreateDeviceRepoInput, Device, DeviceMutation, DeviceRepository, DeviceState, DomainError,
    DomainResult,
};
use crate::postgres::{DeviceColumn, InPredicate, PostgresClient};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use tracing::{debug, info, instrument};

const DEVICE_COLUMNS: &str = "id, name, brand, state, created_on";

/// Device row for PostgreSQL storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRow {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub state: String,
    pub created_on: DateTime<Utc>,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            id: row.get(0),
            name: row.get(1),
            brand: row.get(2),
            state: row.get(3),
            created_on: row.get(4),
        }
    }
}

/// Convert database DeviceRow to domain Device
impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let state: DeviceState = row.state.parse().map_err(|_| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "device {} has unknown state '{}'",
                row.id,
                row.state
            ))
        })?;

        Ok(Device {
            id: row.id,
            name: row.name,
            brand: row.brand.unwrap_or_default(),
            state: Some(state),
            created_on: Some(row.created_on),
        })
    }
}

fn rows_to_devices(rows: &[Row]) -> DomainResult<Vec<Device>> {
    rows.iter()
        .map(|row| Device::try_from(DeviceRow::from(row)))
        .collect()
}

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn list_where(
        &self,
        predicate: InPredicate,
        operation: &'static str,
    ) -> DomainResult<Vec<Device>> {
        let conn = self.client.get_connection().await.context(operation)?;

        let query = format!(
            "SELECT {} FROM devices WHERE {} ORDER BY created_on ASC, id ASC",
            DEVICE_COLUMNS,
            predicate.sql()
        );
        let rows = conn
            .query(&query, &predicate.params())
            .await
            .context(operation)?;

        debug!(count = rows.len(), predicate = %predicate.sql(), "filtered devices");
        rows_to_devices(&rows)
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, input), fields(device_name = %input.name, state = %input.state))]
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .context("create device")?;

        // created_on comes from the database clock
        let row = conn
            .query_one(
                "INSERT INTO devices (name, brand, state, created_on)
                 VALUES ($1, $2, $3, NOW())
                 RETURNING id, created_on",
                &[&input.name, &input.brand, &input.state.as_str()],
            )
            .await
            .context("create device")?;

        let device = Device {
            id: row.get(0),
            name: input.name,
            brand: input.brand,
            state: Some(input.state),
            created_on: Some(row.get(1)),
        };

        debug!(device_id = device.id, "registered device");
        Ok(device)
    }

    #[instrument(skip(self))]
    async fn get_device(&self, id: i64) -> DomainResult<Option<Device>> {
        let conn = self.client.get_connection().await.context("get device")?;

        let row = conn
            .query_opt(
                &format!("SELECT {} FROM devices WHERE id = $1", DEVICE_COLUMNS),
                &[&id],
            )
            .await
            .context("get device")?;

        row.map(|row| Device::try_from(DeviceRow::from(&row)))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let conn = self.client.get_connection().await.context("list devices")?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices ORDER BY created_on ASC, id ASC",
                    DEVICE_COLUMNS
                ),
                &[],
            )
            .await
            .context("list devices")?;

        debug!("found {} devices", rows.len());
        rows_to_devices(&rows)
    }

    #[instrument(skip(self, device), fields(device_id = device.id))]
    async fn update_device(&self, mut device: Device) -> DomainResult<Device> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .context("update device")?;

        // Load, guard and write under one row lock. Returning early drops the
        // transaction, which rolls it back.
        let transaction = conn.transaction().await.context("update device")?;

        let row = transaction
            .query_opt(
                &format!(
                    "SELECT {} FROM devices WHERE id = $1 FOR UPDATE",
                    DEVICE_COLUMNS
                ),
                &[&device.id],
            )
            .await
            .context("update device")?
            .ok_or(DomainError::DeviceNotFound(device.id))?;

        let current = Device::try_from(DeviceRow::from(&row))?;
        current.ensure_mutable(DeviceMutation::Update)?;

        device.merge_missing_from(&current);
        let state = device.state.unwrap_or_default();

        transaction
            .execute(
                "UPDATE devices SET name = $2, brand = $3, state = $4 WHERE id = $1",
                &[&device.id, &device.name, &device.brand, &state.as_str()],
            )
            .await
            .context("update device")?;

        transaction.commit().await.context("update device")?;

        info!(device_id = device.id, state = %state, "device updated");
        Ok(device)
    }

    #[instrument(skip(self))]
    async fn delete_device(&self, id: i64) -> DomainResult<()> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .context("delete device")?;

        let transaction = conn.transaction().await.context("delete device")?;

        let row = transaction
            .query_opt(
                &format!(
                    "SELECT {} FROM devices WHERE id = $1 FOR UPDATE",
                    DEVICE_COLUMNS
                ),
                &[&id],
            )
            .await
            .context("delete device")?
            .ok_or(DomainError::DeviceNotFound(id))?;

        Device::try_from(DeviceRow::from(&row))?.ensure_mutable(DeviceMutation::Delete)?;

        transaction
            .execute("DELETE FROM devices WHERE id = $1", &[&id])
            .await
            .context("delete device")?;

        transaction.commit().await.context("delete device")?;

        info!(device_id = id, "device deleted");
        Ok(())
    }

    #[instrument(skip(self, brands), fields(brand_count = brands.len()))]
    async fn list_devices_by_brand(&self, brands: Vec<String>) -> DomainResult<Vec<Device>> {
        let predicate = InPredicate::new(DeviceColumn::Brand, &brands)?;
        self.list_where(predicate, "list devices by brand").await
    }

    #[instrument(skip(self, states), fields(state_count = states.len()))]
    async fn list_devices_by_state(&self, states: Vec<DeviceState>) -> DomainResult<Vec<Device>> {
        let states: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
        let predicate = InPredicate::new(DeviceColumn::State, &states)?;
        self.list_where(predicate, "list devices by state").await
    }

    fn close(&self) {
        self.client.close();
    }
}
