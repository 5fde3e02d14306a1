use crate::domain::result::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational state of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceState {
    #[default]
    Available,
    InUse,
    Inactive,
}

impl DeviceState {
    pub const ALL: [DeviceState; 3] = [
        DeviceState::Available,
        DeviceState::InUse,
        DeviceState::Inactive,
    ];

    /// Wire and storage spelling of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Available => "available",
            DeviceState::InUse => "in-use",
            DeviceState::Inactive => "inactive",
        }
    }

    /// Whether a device currently in this state accepts updates and deletes.
    ///
    /// This is the only mutability rule. Transitions between states are not
    /// restricted: any state is a legal write target while the stored state
    /// is mutable.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, DeviceState::InUse)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::ValidationError(format!("unknown device state: '{}'", s)))
    }
}

/// Mutations gated by the in-use guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMutation {
    Update,
    Delete,
}

impl fmt::Display for DeviceMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMutation::Update => f.write_str("update"),
            DeviceMutation::Delete => f.write_str("delete"),
        }
    }
}

/// A physical device tracked by the registry.
///
/// `id == 0` marks a value that has not been persisted yet. Empty `name`,
/// empty `brand` and a `None` state mean "unset" in an update payload.
/// Records loaded from the store always carry a state and a creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, skip_serializing_if = "is_unpersisted")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brand: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<DeviceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
}

fn is_unpersisted(id: &i64) -> bool {
    *id == 0
}

/// Treats a missing, null or empty `state` as unset
fn deserialize_optional_state<'de, D>(deserializer: D) -> Result<Option<DeviceState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Device {
    /// Decodes a device from its JSON wire form
    pub fn from_json_bytes(bytes: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DomainError::ValidationError(format!("invalid device payload: {}", e)))
    }

    /// Encodes the device into its JSON wire form
    pub fn to_json_bytes(&self) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DomainError::EncodingError(e.to_string()))
    }

    /// Applies the in-use guard to this (currently stored) record.
    /// A record without a state has never been marked in-use.
    pub fn ensure_mutable(&self, mutation: DeviceMutation) -> DomainResult<()> {
        match self.state {
            Some(state) if !state.is_mutable() => Err(DomainError::DeviceConflict(format!(
                "cannot {} a device in '{}' state",
                mutation, state
            ))),
            _ => Ok(()),
        }
    }

    /// Field-level merge for partial updates.
    ///
    /// Unset fields are taken from `current`. Identity and creation time
    /// always come from `current` and are never rewritten by a payload.
    pub fn merge_missing_from(&mut self, current: &Device) {
        self.id = current.id;
        self.created_on = current.created_on;

        if self.name.is_empty() {
            self.name = current.name.clone();
        }
        if self.brand.is_empty() {
            self.brand = current.brand.clone();
        }
        if self.state.is_none() {
            self.state = current.state;
        }
    }
}

/// Decodes a JSON array of devices
pub fn decode_devices(bytes: &[u8]) -> DomainResult<Vec<Device>> {
    serde_json::from_slice(bytes)
        .map_err(|e| DomainError::ValidationError(format!("invalid devices payload: {}", e)))
}

/// Encodes devices as a JSON array
pub fn encode_devices(devices: &[Device]) -> DomainResult<Vec<u8>> {
    serde_json::to_vec(devices).map_err(|e| DomainError::EncodingError(e.to_string()))
}
