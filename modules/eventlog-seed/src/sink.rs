use async_trait::async_trait;
use eventlog_store::{EventStore, NewEventRecord, StoreError};

/// Destination for generated batches.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Write one batch atomically. Returns the number of rows written.
    async fn insert_batch(&self, records: &[NewEventRecord]) -> Result<u64, StoreError>;

    /// Release whatever the sink holds (connections, pools). Called exactly
    /// once at the end of every run.
    async fn release(&self) {}
}

#[async_trait]
impl BatchSink for EventStore {
    async fn insert_batch(&self, records: &[NewEventRecord]) -> Result<u64, StoreError> {
        self.insert_many(records).await
    }

    async fn release(&self) {
        self.pool().close().await;
    }
}
