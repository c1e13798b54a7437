use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{OrderId, Result};

/// Unique identifier for a checkpoint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version number of a saga's checkpoint sequence.
///
/// Versions start at 1 for the first record and increment by 1 for each
/// subsequent record, giving optimistic concurrency control over appends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a saga with no records.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// One checkpointed orchestration decision.
///
/// The payload is opaque JSON; the saga crate owns its shape. The log only
/// cares about the saga ID and the version for ordering and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Unique identifier for this record.
    pub record_id: RecordId,

    /// The type of the record (e.g., "StepCompleted").
    pub record_type: String,

    /// The saga this record belongs to.
    pub saga_id: OrderId,

    /// The version of the saga's sequence after this record.
    pub version: Version,

    /// When the record was created.
    pub timestamp: DateTime<Utc>,

    /// The record payload as JSON.
    pub payload: serde_json::Value,
}

impl CheckpointRecord {
    /// Creates a new record from a serializable payload.
    pub fn new<T: Serialize>(
        saga_id: OrderId,
        version: Version,
        record_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            record_id: RecordId::new(),
            record_type: record_type.into(),
            saga_id,
            version,
            timestamp: Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decodes the payload back into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        step: String,
        attempt: u32,
    }

    #[test]
    fn record_id_new_creates_unique_ids() {
        let id1 = RecordId::new();
        let id2 = RecordId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
    }

    #[test]
    fn version_initial_and_first() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn record_encode_decode_roundtrip() {
        let payload = TestPayload {
            step: "PAYMENT".to_string(),
            attempt: 2,
        };
        let saga_id = OrderId::new();
        let record =
            CheckpointRecord::new(saga_id, Version::first(), "StepStarted", &payload).unwrap();

        assert_eq!(record.saga_id, saga_id);
        assert_eq!(record.record_type, "StepStarted");
        assert_eq!(record.version, Version::first());
        assert_eq!(record.decode::<TestPayload>().unwrap(), payload);
    }
}
