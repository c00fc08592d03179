//! Profile, tab, and settings types
//!
//! Field names follow the persisted camelCase layout. Unknown fields on tabs
//! and settings are kept so that data written by other surfaces survives a
//! round trip through this crate.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::storage::backend::{StorageArea, StorageBackend};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::keys;

/// A named, user-scoped set of tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique identifier (UUID v4 string)
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether this is the fallback profile
    #[serde(default)]
    pub is_default: bool,
    /// URL globs that select this profile automatically
    #[serde(default)]
    pub url_patterns: Vec<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub created_at: i64,
    /// Epoch milliseconds of the last switch to this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<i64>,
}

impl Profile {
    /// Create a new profile with the given name
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            is_default: false,
            url_patterns: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
            last_active: None,
        }
    }

    /// Create the fallback profile
    #[must_use]
    pub fn new_default(name: String) -> Self {
        let mut profile = Self::new(name);
        profile.is_default = true;
        profile.last_active = Some(profile.created_at);
        profile
    }

    /// Record that the profile was just activated
    pub fn touch(&mut self) {
        self.last_active = Some(Utc::now().timestamp_millis());
    }

    /// Record name of this profile's tab list
    #[must_use]
    pub fn tabs_key(&self) -> String {
        keys::profile_tabs_key(&self.id)
    }
}

/// A navigation tab, possibly with a dropdown of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tab>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tab {
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
            url: url.into(),
            children: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Settings object stored directly under `userSettings`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Profile whose tabs are shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<String>,
    /// Profile created by migration or marked default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile_id: Option<String>,
    /// Whether user data lives in the synced area; `None` means never chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sync_storage: Option<bool>,
    /// Whether the profile switcher is shown
    #[serde(default)]
    pub profiles_enabled: bool,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSettings {
    /// Area settings are kept in
    pub const AREA: StorageArea = StorageArea::Synced;

    /// Active profile id, treating an empty string as unset
    #[must_use]
    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Effective sync preference
    #[must_use]
    pub fn uses_sync_storage(&self, config: &StoreConfig) -> bool {
        self.use_sync_storage
            .unwrap_or(config.default_use_sync_storage)
    }

    /// Read settings; `None` if none were saved
    ///
    /// # Errors
    /// Returns `Parse` if the stored object has the wrong shape
    pub async fn load(backend: &dyn StorageBackend) -> StoreResult<Option<Self>> {
        let Some(value) = backend.get_one(keys::USER_SETTINGS).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Parse {
                record: keys::USER_SETTINGS.to_string(),
                message: e.to_string(),
            })
    }

    /// Write settings directly (never chunked)
    ///
    /// # Errors
    /// Returns an error if the backend rejects the write
    pub async fn save(&self, backend: &dyn StorageBackend) -> StoreResult<()> {
        let value = serde_json::to_value(self).map_err(|e| StoreError::Serialize {
            record: keys::USER_SETTINGS.to_string(),
            message: e.to_string(),
        })?;
        let mut batch = Map::new();
        batch.insert(keys::USER_SETTINGS.to_string(), value);
        backend.set(batch).await?;
        Ok(())
    }
}
