//! Chunked record store
//!
//! A record is one logical JSON document. Small records are stored directly
//! under their name; records larger than the chunk threshold are split into
//! `<record>_chunk_<i>` keys described by `<record>_metadata`. Exactly one of
//! the two forms is authoritative at a time.
//!
//! There are no cross-key transactions. Every save writes its new keys in a
//! single batched `set()`, which is as close to atomic as the host allows;
//! two contexts saving the same record concurrently race and the last batch
//! wins at the key level.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::backend::{Keys, StorageBackend};
use super::codec;
use super::error::{approx_kb, BackendError, StoreError, StoreResult};
use super::keys;
use crate::config::StoreConfig;

/// Per-record metadata stored at `<record>_metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Whether the record is stored as chunks
    pub chunked: bool,
    /// Number of chunks (chunked records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// Serialized size in bytes. Advisory only.
    #[serde(default)]
    pub byte_size: usize,
    /// Epoch milliseconds of the save
    #[serde(default)]
    pub saved_at: i64,
}

impl RecordMetadata {
    fn direct(byte_size: usize) -> Self {
        Self {
            chunked: false,
            chunk_count: None,
            byte_size,
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    fn chunked(chunk_count: usize, byte_size: usize) -> Self {
        Self {
            chunked: true,
            chunk_count: Some(chunk_count),
            byte_size,
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    /// Save time, if the timestamp is representable
    #[must_use]
    pub fn saved_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.saved_at).single()
    }
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Whether the record was written as chunks
    pub chunked: bool,
    /// Number of stored values holding the record (1 for a direct write)
    pub chunk_count: usize,
    /// Serialized size in bytes
    pub byte_size: usize,
}

/// Diagnostic view of a stored record
#[derive(Debug)]
pub enum RecordStatus {
    /// Nothing stored under this name
    Absent,
    /// Stored as a single value
    Direct { byte_size: usize },
    /// Stored as a complete, parseable chunk set
    Chunked {
        chunk_count: usize,
        byte_size: usize,
        saved_at: Option<DateTime<Utc>>,
    },
    /// Metadata promises data that cannot be read back
    Corrupt(StoreError),
}

impl RecordStatus {
    /// Whether `load()` would return a value
    #[must_use]
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Direct { .. } | Self::Chunked { .. })
    }
}

/// Saves, loads, and clears named records on any storage area
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    config: StoreConfig,
}

impl RecordStore {
    /// Create a store with the given limits
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Limits in effect
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Save `data` under `record`, replacing any previous form
    ///
    /// # Errors
    /// - `ChunkLimitExceeded` if the record needs more chunks than allowed
    ///   (checked before anything is removed)
    /// - `QuotaExceeded` if the backend rejects the write
    /// - `Serialize` if `data` cannot be serialized
    pub async fn save<T>(
        &self,
        record: &str,
        data: &T,
        backend: &dyn StorageBackend,
    ) -> StoreResult<SaveOutcome>
    where
        T: Serialize + ?Sized,
    {
        let threshold = self.config.chunk_size_threshold;
        if threshold == 0 {
            return Err(StoreError::InvalidConfig(
                "chunk_size_threshold must be greater than 0".to_string(),
            ));
        }

        let value = serde_json::to_value(data).map_err(|e| StoreError::Serialize {
            record: record.to_string(),
            message: e.to_string(),
        })?;
        let serialized = value.to_string();
        let byte_size = serialized.len();

        let chunks = if byte_size > threshold {
            let chunks = codec::encode(&serialized, threshold);
            if chunks.len() > self.config.max_chunk_count {
                return Err(StoreError::ChunkLimitExceeded {
                    record: record.to_string(),
                    chunk_count: chunks.len(),
                    limit: self.config.max_chunk_count,
                    approx_kb: approx_kb(byte_size),
                });
            }
            Some(chunks)
        } else {
            None
        };

        let previous = self.read_metadata(record, backend).await?;
        let stale = self.stale_keys(record, previous.as_ref());
        backend.remove(&stale).await?;

        let mut batch = Map::new();
        let outcome = match chunks {
            None => {
                batch.insert(record.to_string(), value);
                batch.insert(
                    keys::metadata_key(record),
                    metadata_value(&RecordMetadata::direct(byte_size)),
                );
                SaveOutcome {
                    chunked: false,
                    chunk_count: 1,
                    byte_size,
                }
            }
            Some(chunks) => {
                let chunk_count = chunks.len();
                for (index, chunk) in chunks.into_iter().enumerate() {
                    batch.insert(keys::chunk_key(record, index), Value::String(chunk));
                }
                batch.insert(
                    keys::metadata_key(record),
                    metadata_value(&RecordMetadata::chunked(chunk_count, byte_size)),
                );
                SaveOutcome {
                    chunked: true,
                    chunk_count,
                    byte_size,
                }
            }
        };

        backend.set(batch).await.map_err(|e| match e {
            BackendError::QuotaExceeded { message, .. } => StoreError::QuotaExceeded {
                record: record.to_string(),
                approx_kb: approx_kb(byte_size),
                message,
            },
            other => StoreError::Backend(other),
        })?;

        tracing::debug!(
            record,
            area = %backend.area(),
            byte_size,
            chunked = outcome.chunked,
            chunk_count = outcome.chunk_count,
            "saved record"
        );
        Ok(outcome)
    }

    /// Load a record
    ///
    /// Returns `None` when the record is absent **or** when a chunked record
    /// is missing any of its chunks; the two cases are not distinguished here
    /// (use [`RecordStore::inspect`] for that).
    ///
    /// # Errors
    /// - `Parse` if a complete chunk set does not decode to valid JSON
    /// - `Backend` if the storage area fails
    pub async fn load(
        &self,
        record: &str,
        backend: &dyn StorageBackend,
    ) -> StoreResult<Option<Value>> {
        let metadata = self.read_metadata(record, backend).await?;

        let Some(metadata) = metadata.filter(|m| m.chunked) else {
            let value = backend.get_one(record).await?;
            tracing::debug!(record, area = %backend.area(), found = value.is_some(), "loaded record");
            return Ok(value);
        };

        match self.read_chunks(record, &metadata, backend).await {
            Ok(joined) => {
                let value = parse_record(record, &joined)?;
                tracing::debug!(
                    record,
                    area = %backend.area(),
                    chunk_count = metadata.chunk_count.unwrap_or_default(),
                    "loaded chunked record"
                );
                Ok(Some(value))
            }
            Err(StoreError::MissingChunk { index, .. }) => {
                tracing::warn!(
                    record,
                    area = %backend.area(),
                    index,
                    "chunked record is incomplete, treating as absent"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Load a record and deserialize it
    ///
    /// # Errors
    /// Same as [`RecordStore::load`], plus `Parse` if the stored value does
    /// not have the expected shape
    pub async fn load_as<T: DeserializeOwned>(
        &self,
        record: &str,
        backend: &dyn StorageBackend,
    ) -> StoreResult<Option<T>> {
        let Some(value) = self.load(record, backend).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Parse {
                record: record.to_string(),
                message: e.to_string(),
            })
    }

    /// Remove every key belonging to a record
    ///
    /// # Errors
    /// Returns an error if the storage area fails
    pub async fn clear(&self, record: &str, backend: &dyn StorageBackend) -> StoreResult<()> {
        let metadata = self.read_metadata(record, backend).await?;
        let stale = self.stale_keys(record, metadata.as_ref());
        backend.remove(&stale).await?;
        tracing::debug!(record, area = %backend.area(), "cleared record");
        Ok(())
    }

    /// Describe how a record is stored, telling corruption apart from absence
    ///
    /// # Errors
    /// Returns an error if the storage area fails
    pub async fn inspect(
        &self,
        record: &str,
        backend: &dyn StorageBackend,
    ) -> StoreResult<RecordStatus> {
        let metadata = self.read_metadata(record, backend).await?;

        let Some(metadata) = metadata.filter(|m| m.chunked) else {
            return Ok(match backend.get_one(record).await? {
                Some(value) => RecordStatus::Direct {
                    byte_size: value.to_string().len(),
                },
                None => RecordStatus::Absent,
            });
        };

        match self.read_chunks(record, &metadata, backend).await {
            Ok(joined) => match parse_record(record, &joined) {
                Ok(_) => Ok(RecordStatus::Chunked {
                    chunk_count: metadata.chunk_count.unwrap_or_default(),
                    byte_size: joined.len(),
                    saved_at: metadata.saved_at_utc(),
                }),
                Err(e) => Ok(RecordStatus::Corrupt(e)),
            },
            Err(e @ StoreError::MissingChunk { .. }) => Ok(RecordStatus::Corrupt(e)),
            Err(e) => Err(e),
        }
    }

    /// Move a record between areas
    ///
    /// The source is cleared only after the destination save succeeded.
    /// Returns `None` if there was nothing to move.
    ///
    /// # Errors
    /// Returns an error if the load, save, or clear fails
    pub async fn transfer(
        &self,
        record: &str,
        from: &dyn StorageBackend,
        to: &dyn StorageBackend,
    ) -> StoreResult<Option<SaveOutcome>> {
        if from.area() == to.area() {
            return Ok(None);
        }
        let Some(value) = self.load(record, from).await? else {
            return Ok(None);
        };
        let outcome = self.save(record, &value, to).await?;
        self.clear(record, from).await?;
        tracing::info!(record, from = %from.area(), to = %to.area(), "moved record");
        Ok(Some(outcome))
    }

    /// Read and decode metadata; unreadable metadata counts as absent
    async fn read_metadata(
        &self,
        record: &str,
        backend: &dyn StorageBackend,
    ) -> StoreResult<Option<RecordMetadata>> {
        let Some(raw) = backend.get_one(&keys::metadata_key(record)).await? else {
            return Ok(None);
        };
        match serde_json::from_value(raw) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => {
                tracing::warn!(record, area = %backend.area(), error = %e, "ignoring unreadable record metadata");
                Ok(None)
            }
        }
    }

    /// Fetch every chunk named by `metadata` and join them
    async fn read_chunks(
        &self,
        record: &str,
        metadata: &RecordMetadata,
        backend: &dyn StorageBackend,
    ) -> StoreResult<String> {
        let count = metadata.chunk_count.unwrap_or_default();
        if count == 0 {
            return Err(StoreError::MissingChunk {
                record: record.to_string(),
                index: 0,
            });
        }

        let chunk_keys = keys::chunk_keys(record, count);
        let mut items = backend.get(Keys::Many(&chunk_keys)).await?;

        let mut chunks = Vec::with_capacity(count);
        for (index, key) in chunk_keys.iter().enumerate() {
            match items.remove(key) {
                Some(Value::String(chunk)) => chunks.push(chunk),
                _ => {
                    return Err(StoreError::MissingChunk {
                        record: record.to_string(),
                        index,
                    })
                }
            }
        }

        Ok(codec::decode(&chunks))
    }

    /// Every key a previous version of the record may have left behind
    fn stale_keys(&self, record: &str, previous: Option<&RecordMetadata>) -> Vec<String> {
        let mut stale = BTreeSet::new();
        stale.insert(record.to_string());
        stale.insert(keys::metadata_key(record));

        if let Some(count) = previous.filter(|m| m.chunked).and_then(|m| m.chunk_count) {
            stale.extend(keys::chunk_keys(record, count));
        }
        stale.extend(keys::chunk_keys(record, self.config.orphan_sweep_limit));

        stale.into_iter().collect()
    }
}

fn metadata_value(metadata: &RecordMetadata) -> Value {
    // a struct of plain scalars always serializes
    serde_json::to_value(metadata).unwrap_or(Value::Null)
}

fn parse_record(record: &str, joined: &str) -> StoreResult<Value> {
    serde_json::from_str(joined).map_err(|e| StoreError::Parse {
        record: record.to_string(),
        message: e.to_string(),
    })
}
