use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CheckpointRecord, JournalError, OrderId, Result, Version,
    log::{AppendOptions, CheckpointLog, validate_batch},
};

/// In-memory checkpoint log.
///
/// Backs tests and the demo API server. Provides the same optimistic
/// concurrency semantics a durable implementation would.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointLog {
    records: Arc<RwLock<Vec<CheckpointRecord>>>,
}

impl InMemoryCheckpointLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl CheckpointLog for InMemoryCheckpointLog {
    async fn append(
        &self,
        records: Vec<CheckpointRecord>,
        options: AppendOptions,
    ) -> Result<Version> {
        validate_batch(&records)?;

        let saga_id = records[0].saga_id;
        let mut log = self.records.write().await;

        let current_version = log
            .iter()
            .filter(|r| r.saga_id == saga_id)
            .map(|r| r.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(JournalError::ConcurrencyConflict {
                saga_id,
                expected,
                actual: current_version,
            });
        }

        // Unique version constraint simulation
        let first_new_version = records[0].version;
        if first_new_version <= current_version && current_version != Version::initial() {
            return Err(JournalError::ConcurrencyConflict {
                saga_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = records
            .last()
            .map(|r| r.version)
            .unwrap_or(Version::initial());
        log.extend(records);

        Ok(last_version)
    }

    async fn records_for_saga(&self, saga_id: OrderId) -> Result<Vec<CheckpointRecord>> {
        let log = self.records.read().await;
        let mut records: Vec<_> = log
            .iter()
            .filter(|r| r.saga_id == saga_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn saga_version(&self, saga_id: OrderId) -> Result<Option<Version>> {
        let log = self.records.read().await;
        Ok(log
            .iter()
            .filter(|r| r.saga_id == saga_id)
            .map(|r| r.version)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::CheckpointLogExt;

    fn record(saga_id: OrderId, version: i64) -> CheckpointRecord {
        CheckpointRecord::new(
            saga_id,
            Version::new(version),
            "TestRecord",
            &serde_json::json!({"n": version}),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_replay() {
        let log = InMemoryCheckpointLog::new();
        let saga_id = OrderId::new();

        let v = log
            .append(
                vec![record(saga_id, 1), record(saga_id, 2)],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
        assert_eq!(v, Version::new(2));

        let records = log.records_for_saga(saga_id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].version, Version::first());
        assert_eq!(records[1].version, Version::new(2));
    }

    #[tokio::test]
    async fn concurrency_conflict_on_stale_version() {
        let log = InMemoryCheckpointLog::new();
        let saga_id = OrderId::new();

        log.append_record(record(saga_id, 1), AppendOptions::expect_new())
            .await
            .unwrap();

        // Second writer also expects a fresh saga
        let result = log
            .append_record(record(saga_id, 1), AppendOptions::expect_new())
            .await;
        assert!(matches!(
            result,
            Err(JournalError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn version_tracking_per_saga() {
        let log = InMemoryCheckpointLog::new();
        let saga_a = OrderId::new();
        let saga_b = OrderId::new();

        log.append_record(record(saga_a, 1), AppendOptions::expect_new())
            .await
            .unwrap();
        log.append_record(record(saga_a, 2), AppendOptions::expect_version(Version::first()))
            .await
            .unwrap();

        assert_eq!(
            log.saga_version(saga_a).await.unwrap(),
            Some(Version::new(2))
        );
        assert_eq!(log.saga_version(saga_b).await.unwrap(), None);
        assert!(!log.saga_exists(saga_b).await.unwrap());
    }

    #[tokio::test]
    async fn records_for_unknown_saga_is_empty() {
        let log = InMemoryCheckpointLog::new();
        let records = log.records_for_saga(OrderId::new()).await.unwrap();
        assert!(records.is_empty());
    }
}
