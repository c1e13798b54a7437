use async_trait::async_trait;

use crate::{CheckpointRecord, JournalError, OrderId, Result, Version};

/// Options for appending records to the log.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the saga's sequence for optimistic concurrency
    /// control. If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the saga to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the saga to have no records yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Validates a batch of records before appending.
///
/// All records must belong to the same saga and carry sequential versions.
pub fn validate_batch(records: &[CheckpointRecord]) -> Result<()> {
    let first = records
        .first()
        .ok_or_else(|| JournalError::InvalidBatch("cannot append empty record batch".into()))?;

    let mut expected_version = first.version;
    for record in records.iter().skip(1) {
        if record.saga_id != first.saga_id {
            return Err(JournalError::InvalidBatch(
                "all records in a batch must belong to the same saga".into(),
            ));
        }
        expected_version = expected_version.next();
        if record.version != expected_version {
            return Err(JournalError::InvalidBatch(format!(
                "record versions must be sequential: expected {}, got {}",
                expected_version, record.version
            )));
        }
    }

    Ok(())
}

/// Core trait for checkpoint log implementations.
///
/// The log is the only durability seam the orchestrator knows about: a
/// decision that was appended here is considered committed, and a saga can
/// always be re-derived by replaying its records in version order.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CheckpointLog: Send + Sync {
    /// Appends records to the log.
    ///
    /// Records are appended atomically. If `options.expected_version` is
    /// set, the operation fails with `ConcurrencyConflict` when the current
    /// version doesn't match.
    ///
    /// Returns the new version of the saga's sequence after appending.
    async fn append(&self, records: Vec<CheckpointRecord>, options: AppendOptions)
    -> Result<Version>;

    /// Retrieves all records for a saga in version order (oldest first).
    async fn records_for_saga(&self, saga_id: OrderId) -> Result<Vec<CheckpointRecord>>;

    /// Gets the current version of a saga's sequence.
    ///
    /// Returns None if the saga has no records.
    async fn saga_version(&self, saga_id: OrderId) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for checkpoint logs.
#[async_trait]
pub trait CheckpointLogExt: CheckpointLog {
    /// Appends a single record to the log.
    async fn append_record(
        &self,
        record: CheckpointRecord,
        options: AppendOptions,
    ) -> Result<Version> {
        self.append(vec![record], options).await
    }

    /// Checks if a saga has any records.
    async fn saga_exists(&self, saga_id: OrderId) -> Result<bool> {
        Ok(self.saga_version(saga_id).await?.is_some())
    }
}

// Blanket implementation for all CheckpointLog implementations
impl<T: CheckpointLog + ?Sized> CheckpointLogExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(saga_id: OrderId, version: i64) -> CheckpointRecord {
        CheckpointRecord::new(
            saga_id,
            Version::new(version),
            "TestRecord",
            &serde_json::json!({"n": version}),
        )
        .unwrap()
    }

    #[test]
    fn empty_batch_is_rejected() {
        let result = validate_batch(&[]);
        assert!(matches!(result, Err(JournalError::InvalidBatch(_))));
    }

    #[test]
    fn mixed_saga_batch_is_rejected() {
        let records = vec![record(OrderId::new(), 1), record(OrderId::new(), 2)];
        assert!(matches!(
            validate_batch(&records),
            Err(JournalError::InvalidBatch(_))
        ));
    }

    #[test]
    fn non_sequential_batch_is_rejected() {
        let saga_id = OrderId::new();
        let records = vec![record(saga_id, 1), record(saga_id, 3)];
        assert!(matches!(
            validate_batch(&records),
            Err(JournalError::InvalidBatch(_))
        ));
    }

    #[test]
    fn sequential_batch_passes() {
        let saga_id = OrderId::new();
        let records = vec![record(saga_id, 1), record(saga_id, 2), record(saga_id, 3)];
        assert!(validate_batch(&records).is_ok());
    }
}
