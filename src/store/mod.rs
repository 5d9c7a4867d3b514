//! Durable append-only record of observed quotes.

use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::core::{Deadline, Quote};
use crate::error::StoreError;

const PARTITION: &str = "quotes";

/// One persisted observation. Records are only ever appended; the identity
/// is assigned by the store and is independent of the wire payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: u64,
    pub value: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Append-only quote store backed by a fjall keyspace.
///
/// The keyspace is opened once at construction. A store whose keyspace could
/// not be opened stays usable and reports `StoreError::Unavailable` on every
/// append, so a broken storage path never takes the surrounding service down.
pub struct QuoteStore {
    keyspace: Option<Arc<Keyspace>>,
    next_id: AtomicU64,
}

impl QuoteStore {
    pub fn open(path: &Path) -> Self {
        let keyspace = fjall::Config::new(path).open().ok().map(Arc::new);

        let next_id = keyspace
            .as_ref()
            .and_then(|ks| {
                ks.open_partition(PARTITION, PartitionCreateOptions::default())
                    .ok()
            })
            .and_then(|partition| partition.last_key_value().ok().flatten())
            .map(|(key, _)| decode_id(&key) + 1)
            .unwrap_or(1);

        Self {
            keyspace,
            next_id: AtomicU64::new(next_id),
        }
    }

    /// Appends exactly one record under `deadline`.
    ///
    /// The partition open/create (the existence-check) and the insert both
    /// count against the deadline. A write that outlives the deadline keeps
    /// running on the blocking pool; its outcome is discarded and the call
    /// reports `Timeout`.
    pub async fn append(&self, quote: Quote, deadline: Deadline) -> Result<u64, StoreError> {
        let keyspace = self
            .keyspace
            .clone()
            .ok_or_else(|| StoreError::Unavailable("keyspace is not open".to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = QuoteRecord {
            id,
            value: quote.value,
            observed_at: Utc::now(),
        };

        let write = tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let partition = keyspace
                .open_partition(PARTITION, PartitionCreateOptions::default())
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let bytes = serde_json::to_vec(&record)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            partition
                .insert(record.id.to_be_bytes(), bytes)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

            // An acknowledged append must survive restart.
            keyspace
                .persist(PersistMode::SyncAll)
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            Ok(())
        });

        match tokio::time::timeout_at(deadline.instant(), write).await {
            Ok(Ok(result)) => {
                result?;
                debug!(id, "quote appended");
                Ok(id)
            }
            Ok(Err(join_err)) => Err(StoreError::WriteFailed(join_err.to_string())),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    /// All records in id order.
    pub fn records(&self) -> Result<Vec<QuoteRecord>, StoreError> {
        let keyspace = self
            .keyspace
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("keyspace is not open".to_string()))?;

        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        partition
            .iter()
            .map(|entry| {
                let (_, value) = entry.map_err(|e| StoreError::WriteFailed(e.to_string()))?;
                serde_json::from_slice(&value).map_err(|e| StoreError::WriteFailed(e.to_string()))
            })
            .collect()
    }
}

fn decode_id(key: &[u8]) -> u64 {
    match key.try_into() {
        Ok(bytes) => u64::from_be_bytes(bytes),
        Err(_) => 0,
    }
}
