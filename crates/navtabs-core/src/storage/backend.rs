//! Backend adapter
//!
//! Uniform async get/set/remove/clear over the two host storage areas.
//! Every call is one batch; the host serializes batches but gives no
//! ordering between calls issued by different contexts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::error::{BackendError, BackendResult};
use super::memory::MemoryBackend;

/// Capacity of each backend's change channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Storage area identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Small quota, replicated across the user's devices
    Synced,
    /// Larger quota, device-only
    Local,
}

impl StorageArea {
    /// The other area
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Synced => Self::Local,
            Self::Local => Self::Synced,
        }
    }

    /// Area holding user data for the given preference
    #[must_use]
    pub fn for_sync_preference(use_sync_storage: bool) -> Self {
        if use_sync_storage {
            Self::Synced
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageArea::Synced => write!(f, "synced"),
            StorageArea::Local => write!(f, "local"),
        }
    }
}

impl FromStr for StorageArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synced" | "sync" => Ok(Self::Synced),
            "local" => Ok(Self::Local),
            other => Err(format!("Unknown storage area: {other}")),
        }
    }
}

/// Key selection for `get` and `bytes_in_use`
#[derive(Debug, Clone, Copy)]
pub enum Keys<'a> {
    /// A single key
    One(&'a str),
    /// A batch of keys
    Many(&'a [String]),
    /// Every key in the area
    All,
}

impl Keys<'_> {
    /// Copy the selected entries out of `items`; absent keys are skipped
    #[must_use]
    pub fn select(&self, items: &Map<String, Value>) -> Map<String, Value> {
        match self {
            Keys::One(key) => items
                .get(*key)
                .map(|v| ((*key).to_string(), v.clone()))
                .into_iter()
                .collect(),
            Keys::Many(keys) => keys
                .iter()
                .filter_map(|k| items.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
            Keys::All => items.clone(),
        }
    }
}

/// Notification emitted after a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Area that changed
    pub area: StorageArea,
    /// Keys written or removed by the batch
    pub changed_keys: Vec<String>,
}

/// Host quota ceilings for one area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Max bytes of a single item (key + JSON value)
    pub bytes_per_item: Option<usize>,
    /// Max bytes of the whole area
    pub total_bytes: Option<usize>,
    /// Max number of items
    pub max_items: Option<usize>,
}

impl QuotaLimits {
    /// Limits of the synced area
    #[must_use]
    pub fn synced() -> Self {
        Self {
            bytes_per_item: Some(8_192),
            total_bytes: Some(102_400),
            max_items: Some(512),
        }
    }

    /// Limits of the local area
    #[must_use]
    pub fn local() -> Self {
        Self {
            bytes_per_item: None,
            total_bytes: Some(10_485_760),
            max_items: None,
        }
    }

    /// No limits at all
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Preset for an area
    #[must_use]
    pub fn for_area(area: StorageArea) -> Self {
        match area {
            StorageArea::Synced => Self::synced(),
            StorageArea::Local => Self::local(),
        }
    }

    /// Check that applying `incoming` on top of `current` stays within limits
    ///
    /// # Errors
    /// Returns `QuotaExceeded` describing the first limit that would be broken
    pub fn check(
        &self,
        area: StorageArea,
        current: &Map<String, Value>,
        incoming: &Map<String, Value>,
    ) -> BackendResult<()> {
        if let Some(limit) = self.bytes_per_item {
            for (key, value) in incoming {
                let size = item_size(key, value);
                if size > limit {
                    return Err(BackendError::QuotaExceeded {
                        area,
                        message: format!(
                            "item '{key}' is {size} bytes, per-item limit is {limit} bytes"
                        ),
                    });
                }
            }
        }

        if let Some(limit) = self.max_items {
            let added = incoming.keys().filter(|k| !current.contains_key(*k)).count();
            let count = current.len() + added;
            if count > limit {
                return Err(BackendError::QuotaExceeded {
                    area,
                    message: format!("{count} items exceeds the limit of {limit} items"),
                });
            }
        }

        if let Some(limit) = self.total_bytes {
            let kept: usize = current
                .iter()
                .filter(|(k, _)| !incoming.contains_key(*k))
                .map(|(k, v)| item_size(k, v))
                .sum();
            let written: usize = incoming.iter().map(|(k, v)| item_size(k, v)).sum();
            let total = kept + written;
            if total > limit {
                return Err(BackendError::QuotaExceeded {
                    area,
                    message: format!("{total} bytes exceeds the total limit of {limit} bytes"),
                });
            }
        }

        Ok(())
    }
}

/// Size the host charges for one item: key bytes plus JSON value bytes
#[must_use]
pub fn item_size(key: &str, value: &Value) -> usize {
    key.len() + serde_json::to_vec(value).map_or(0, |v| v.len())
}

/// Broadcasts `StorageChange` events for one area
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    area: StorageArea,
    tx: broadcast::Sender<StorageChange>,
}

impl ChangeNotifier {
    /// Create a notifier for `area`
    #[must_use]
    pub fn new(area: StorageArea) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { area, tx }
    }

    /// New receiver for subsequent changes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }

    /// Emit a change; a no-op when nothing changed or nobody listens
    pub fn notify(&self, changed_keys: Vec<String>) {
        if changed_keys.is_empty() {
            return;
        }
        // send only fails when there are no receivers
        let _ = self.tx.send(StorageChange {
            area: self.area,
            changed_keys,
        });
    }
}

/// One host storage area
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which area this backend is
    fn area(&self) -> StorageArea;

    /// Read the selected keys; absent keys are missing from the result
    async fn get(&self, keys: Keys<'_>) -> BackendResult<Map<String, Value>>;

    /// Write a batch of items in one call
    async fn set(&self, items: Map<String, Value>) -> BackendResult<()>;

    /// Remove keys; absent keys are ignored
    async fn remove(&self, keys: &[String]) -> BackendResult<()>;

    /// Remove everything in the area
    async fn clear(&self) -> BackendResult<()>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;

    /// Read a single key
    async fn get_one(&self, key: &str) -> BackendResult<Option<Value>> {
        let mut items = self.get(Keys::One(key)).await?;
        Ok(items.remove(key))
    }

    /// Advisory byte usage of the selected keys
    async fn bytes_in_use(&self, keys: Keys<'_>) -> BackendResult<usize> {
        let items = self.get(keys).await?;
        Ok(items.iter().map(|(k, v)| item_size(k, v)).sum())
    }
}

/// Both storage areas, as seen by one execution context
#[derive(Clone)]
pub struct Storage {
    synced: Arc<dyn StorageBackend>,
    local: Arc<dyn StorageBackend>,
}

impl Storage {
    /// Bundle two backends
    #[must_use]
    pub fn new(synced: Arc<dyn StorageBackend>, local: Arc<dyn StorageBackend>) -> Self {
        Self { synced, local }
    }

    /// In-memory areas with the host's quota presets
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBackend::new(StorageArea::Synced)),
            Arc::new(MemoryBackend::new(StorageArea::Local)),
        )
    }

    /// Backend for an area
    #[must_use]
    pub fn area(&self, area: StorageArea) -> &dyn StorageBackend {
        match area {
            StorageArea::Synced => self.synced.as_ref(),
            StorageArea::Local => self.local.as_ref(),
        }
    }

    /// The synced area
    #[must_use]
    pub fn synced(&self) -> &dyn StorageBackend {
        self.synced.as_ref()
    }

    /// The local area
    #[must_use]
    pub fn local(&self) -> &dyn StorageBackend {
        self.local.as_ref()
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("synced", &self.synced.area())
            .field("local", &self.local.area())
            .finish()
    }
}
