//! Delivery record types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinates;
use crate::error::RouteError;

/// Opaque, generator-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Delivery status of a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Delivered and Failed are terminal
    pub const fn is_terminal(self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

/// Grouping key shared by all records delivered at one physical stop.
///
/// Records without a usable stop name get a key derived from their own id,
/// so they always form a singleton group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StopKey {
    Named(String),
    Record(RecordId),
}

impl StopKey {
    /// Normalized named key (trimmed, lowercased). `None` for blank names.
    pub fn named(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(StopKey::Named(trimmed.to_lowercase()))
        }
    }
}

impl fmt::Display for StopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopKey::Named(name) => f.write_str(name),
            StopKey::Record(id) => write!(f, "#{}", id),
        }
    }
}

impl FromStr for StopKey {
    type Err = RouteError;

    /// Parses the `Display` form back: `#<uuid>` is a record key, anything else a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix('#') {
            let id = id
                .parse::<RecordId>()
                .map_err(|e| RouteError::InvalidInput(format!("bad record key '{}': {}", s, e)))?;
            return Ok(StopKey::Record(id));
        }
        StopKey::named(s).ok_or_else(|| RouteError::InvalidInput("empty stop key".to_string()))
    }
}

/// One parcel on the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: RecordId,
    /// Stop name used for grouping, as it came from the manifest
    pub stop_name: Option<String>,
    pub address: String,
    pub recipient: Option<String>,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl DeliveryRecord {
    /// Create a pending record with a fresh id. Coordinates are validated.
    pub fn new(
        stop_name: Option<String>,
        address: impl Into<String>,
        coordinates: Coordinates,
    ) -> Result<Self, RouteError> {
        coordinates.validate()?;
        Ok(Self {
            id: RecordId::new(),
            stop_name,
            address: address.into(),
            recipient: None,
            coordinates,
            status: DeliveryStatus::Pending,
        })
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn stop_key(&self) -> StopKey {
        self.stop_name
            .as_deref()
            .and_then(StopKey::named)
            .unwrap_or(StopKey::Record(self.id))
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeliveryStatus::Pending
    }
}

/// Untrusted record input (one manifest row) before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl TryFrom<RecordDraft> for DeliveryRecord {
    type Error = RouteError;

    fn try_from(draft: RecordDraft) -> Result<Self, Self::Error> {
        let coordinates = Coordinates::new(draft.lat, draft.lng)?;
        let address = draft
            .address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "---".to_string());
        let mut record = DeliveryRecord::new(draft.stop, address, coordinates)?;
        record.recipient = draft.recipient;
        Ok(record)
    }
}
