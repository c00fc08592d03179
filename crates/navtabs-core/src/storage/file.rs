//! Storage area persisted as a JSON file
//!
//! Each area is one file (`synced.json`, `local.json`) under a data
//! directory. Writes go to a temp file in the same directory and are
//! renamed into place, so readers never see a partial file.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::backend::{
    ChangeNotifier, Keys, QuotaLimits, Storage, StorageArea, StorageBackend, StorageChange,
};
use super::error::{BackendError, BackendResult};

/// Storage area backed by a JSON file
pub struct FileBackend {
    area: StorageArea,
    path: PathBuf,
    limits: QuotaLimits,
    // serializes read-modify-write cycles within this process
    guard: Mutex<()>,
    notifier: ChangeNotifier,
}

impl FileBackend {
    /// Area file `<dir>/<area>.json` with the host quota preset
    #[must_use]
    pub fn new(dir: &Path, area: StorageArea) -> Self {
        Self::with_limits(dir, area, QuotaLimits::for_area(area))
    }

    /// Area file with explicit limits
    #[must_use]
    pub fn with_limits(dir: &Path, area: StorageArea, limits: QuotaLimits) -> Self {
        Self {
            area,
            path: dir.join(format!("{area}.json")),
            limits,
            guard: Mutex::new(()),
            notifier: ChangeNotifier::new(area),
        }
    }

    /// Both areas under one directory
    #[must_use]
    pub fn storage(dir: &Path) -> Storage {
        Storage::new(
            Arc::new(Self::new(dir, StorageArea::Synced)),
            Arc::new(Self::new(dir, StorageArea::Local)),
        )
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, message: impl std::fmt::Display) -> BackendError {
        BackendError::Io {
            area: self.area,
            message: format!("{}: {message}", self.path.display()),
        }
    }

    async fn read_all(&self) -> BackendResult<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if bytes.is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Serialization {
            area: self.area,
            message: format!("{}: {e}", self.path.display()),
        })
    }

    async fn write_all(&self, items: &Map<String, Value>) -> BackendResult<()> {
        let data = serde_json::to_vec_pretty(items).map_err(|e| BackendError::Serialization {
            area: self.area,
            message: e.to_string(),
        })?;
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| self.io_error(e))?;

        result.map_err(|e| self.io_error(e))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn area(&self) -> StorageArea {
        self.area
    }

    async fn get(&self, keys: Keys<'_>) -> BackendResult<Map<String, Value>> {
        let _guard = self.guard.lock().await;
        let items = self.read_all().await?;
        Ok(keys.select(&items))
    }

    async fn set(&self, items: Map<String, Value>) -> BackendResult<()> {
        let changed: Vec<String> = items.keys().cloned().collect();
        {
            let _guard = self.guard.lock().await;
            let mut current = self.read_all().await?;
            self.limits.check(self.area, &current, &items)?;
            current.extend(items);
            self.write_all(&current).await?;
        }
        self.notifier.notify(changed);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> BackendResult<()> {
        let removed: Vec<String> = {
            let _guard = self.guard.lock().await;
            let mut current = self.read_all().await?;
            let removed: Vec<String> = keys
                .iter()
                .filter(|k| current.remove(k.as_str()).is_some())
                .cloned()
                .collect();
            if !removed.is_empty() {
                self.write_all(&current).await?;
            }
            removed
        };
        self.notifier.notify(removed);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let removed: Vec<String> = {
            let _guard = self.guard.lock().await;
            let current = self.read_all().await?;
            let keys: Vec<String> = current.keys().cloned().collect();
            if !keys.is_empty() {
                self.write_all(&Map::new()).await?;
            }
            keys
        };
        self.notifier.notify(removed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.notifier.subscribe()
    }
}
