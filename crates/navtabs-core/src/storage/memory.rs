//! In-process storage area

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use super::backend::{ChangeNotifier, Keys, QuotaLimits, StorageArea, StorageBackend, StorageChange};
use super::error::BackendResult;

/// Storage area held in memory, enforcing the same quotas as the host
pub struct MemoryBackend {
    area: StorageArea,
    limits: QuotaLimits,
    items: Mutex<Map<String, Value>>,
    notifier: ChangeNotifier,
}

impl MemoryBackend {
    /// Empty area with the host quota preset for `area`
    #[must_use]
    pub fn new(area: StorageArea) -> Self {
        Self::with_limits(area, QuotaLimits::for_area(area))
    }

    /// Empty area with explicit limits
    #[must_use]
    pub fn with_limits(area: StorageArea, limits: QuotaLimits) -> Self {
        Self {
            area,
            limits,
            items: Mutex::new(Map::new()),
            notifier: ChangeNotifier::new(area),
        }
    }

    /// Quota limits in effect
    #[must_use]
    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Number of stored items
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the area is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // never held across an await
    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn area(&self) -> StorageArea {
        self.area
    }

    async fn get(&self, keys: Keys<'_>) -> BackendResult<Map<String, Value>> {
        Ok(keys.select(&self.lock()))
    }

    async fn set(&self, items: Map<String, Value>) -> BackendResult<()> {
        let changed: Vec<String> = items.keys().cloned().collect();
        {
            let mut current = self.lock();
            self.limits.check(self.area, &current, &items)?;
            current.extend(items);
        }
        self.notifier.notify(changed);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> BackendResult<()> {
        let removed: Vec<String> = {
            let mut current = self.lock();
            keys.iter()
                .filter(|k| current.remove(k.as_str()).is_some())
                .cloned()
                .collect()
        };
        self.notifier.notify(removed);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        let removed: Vec<String> = {
            let mut current = self.lock();
            let keys = current.keys().cloned().collect();
            current.clear();
            keys
        };
        self.notifier.notify(removed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_get_set_remove() {
        let backend = MemoryBackend::new(StorageArea::Local);
        backend
            .set(batch(&[("a", json!(1)), ("b", json!({"x": true}))]))
            .await
            .unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let got = backend.get(Keys::Many(&keys)).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got["b"], json!({"x": true}));

        backend.remove(&["a".to_string()]).await.unwrap();
        assert_eq!(backend.get_one("a").await.unwrap(), None);
        assert_eq!(backend.len(), 1);

        backend.clear().await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_batch_is_not_applied() {
        let backend = MemoryBackend::new(StorageArea::Synced);
        let big = "x".repeat(9_000);
        let err = backend
            .set(batch(&[("small", json!(1)), ("big", json!(big))]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_change_notifications() {
        let backend = MemoryBackend::new(StorageArea::Synced);
        let mut rx = backend.subscribe();

        backend.set(batch(&[("a", json!(1))])).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.area, StorageArea::Synced);
        assert_eq!(change.changed_keys, vec!["a".to_string()]);

        // removing an absent key changes nothing and emits nothing
        backend.remove(&["missing".to_string()]).await.unwrap();
        backend.remove(&["a".to_string()]).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.changed_keys, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_bytes_in_use() {
        let backend = MemoryBackend::new(StorageArea::Local);
        backend.set(batch(&[("k", json!("ab"))])).await.unwrap();
        assert_eq!(backend.bytes_in_use(Keys::All).await.unwrap(), 5);
        assert_eq!(backend.bytes_in_use(Keys::One("none")).await.unwrap(), 0);
    }
}
