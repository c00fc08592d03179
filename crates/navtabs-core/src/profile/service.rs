//! Profile and tab operations shared by every execution context
//!
//! All reads and writes of tab lists resolve the record name through
//! [`resolve_tabs_key`] first, so the background process, content scripts,
//! popup, and options page always touch the same record.
//!
//! Each operation is a read-modify-write of whole records. Two contexts
//! editing profiles at the same time can lose one of the edits; the storage
//! host offers no way to prevent that.

use thiserror::Error;

use super::patterns;
use super::resolver::{data_area, resolve_tabs_key};
use super::types::{Profile, Tab, UserSettings};
use crate::config::StoreConfig;
use crate::storage::backend::{Storage, StorageArea, StorageBackend};
use crate::storage::error::StoreError;
use crate::storage::keys;
use crate::storage::record::{RecordStore, SaveOutcome};

/// Result type for profile operations
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors from profile operations
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile with this id
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// The default profile cannot be deleted
    #[error("Profile '{0}' is the default profile and cannot be deleted")]
    DefaultProfile(String),

    /// Name is empty
    #[error("Invalid profile name: {0:?}")]
    InvalidName(String),

    /// Another profile already has this name
    #[error("A profile named '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProfileError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "PROFILE_NOT_FOUND",
            Self::DefaultProfile(_) => "PERMISSION_DENIED",
            Self::InvalidName(_) => "VALIDATION_ERROR",
            Self::DuplicateName(_) => "CONFLICT",
            Self::Store(e) => e.code(),
        }
    }
}

/// Profile-aware access to tabs, profiles, and settings
#[derive(Debug, Clone)]
pub struct ProfileService {
    storage: Storage,
    store: RecordStore,
}

impl ProfileService {
    /// Create a service over both storage areas
    #[must_use]
    pub fn new(storage: Storage, config: StoreConfig) -> Self {
        Self {
            storage,
            store: RecordStore::new(config),
        }
    }

    /// Record store used for all records
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn config(&self) -> &StoreConfig {
        self.store.config()
    }

    fn settings_backend(&self) -> &dyn StorageBackend {
        self.storage.area(UserSettings::AREA)
    }

    /// Current settings, or defaults if none were saved
    ///
    /// # Errors
    /// Returns an error if the stored settings cannot be read
    pub async fn settings(&self) -> ProfileResult<UserSettings> {
        Ok(UserSettings::load(self.settings_backend())
            .await?
            .unwrap_or_default())
    }

    /// Persist settings
    ///
    /// # Errors
    /// Returns an error if the write is rejected
    pub async fn save_settings(&self, settings: &UserSettings) -> ProfileResult<()> {
        settings.save(self.settings_backend()).await?;
        Ok(())
    }

    /// Area holding profiles and tabs under the current settings
    ///
    /// # Errors
    /// Returns an error if settings cannot be read
    pub async fn data_area(&self) -> ProfileResult<StorageArea> {
        let settings = self.settings().await?;
        Ok(data_area(&settings, self.config()))
    }

    /// Tabs of the active profile (or the legacy list when profiles are off)
    ///
    /// # Errors
    /// Returns an error if settings or the tab record cannot be read
    pub async fn load_tabs(&self) -> ProfileResult<Vec<Tab>> {
        let settings = self.settings().await?;
        let key = resolve_tabs_key(&settings);
        let backend = self.storage.area(data_area(&settings, self.config()));
        Ok(self
            .store
            .load_as::<Vec<Tab>>(&key, backend)
            .await?
            .unwrap_or_default())
    }

    /// Replace the active tab list
    ///
    /// # Errors
    /// Returns an error if the write is rejected (e.g. quota exceeded)
    pub async fn save_tabs(&self, tabs: &[Tab]) -> ProfileResult<SaveOutcome> {
        let settings = self.settings().await?;
        let key = resolve_tabs_key(&settings);
        let backend = self.storage.area(data_area(&settings, self.config()));
        Ok(self.store.save(&key, tabs, backend).await?)
    }

    /// All profiles
    ///
    /// # Errors
    /// Returns an error if the profile record cannot be read
    pub async fn list_profiles(&self) -> ProfileResult<Vec<Profile>> {
        let area = self.data_area().await?;
        self.read_profiles(self.storage.area(area)).await
    }

    /// Profile by id
    ///
    /// # Errors
    /// Returns `NotFound` if no profile has this id
    pub async fn get_profile(&self, id: &str) -> ProfileResult<Profile> {
        self.list_profiles()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    /// Create a profile with an empty tab list
    ///
    /// # Errors
    /// Returns an error if the name is empty or taken, or a write fails
    pub async fn create_profile(
        &self,
        name: &str,
        url_patterns: Vec<String>,
    ) -> ProfileResult<Profile> {
        let name = validate_name(name)?;
        let backend = self.storage.area(self.data_area().await?);
        let mut profiles = self.read_profiles(backend).await?;
        ensure_unique(&profiles, &name, None)?;

        let mut profile = Profile::new(name);
        profile.url_patterns = url_patterns;
        if profiles.is_empty() {
            profile.is_default = true;
        }

        self.store
            .save(&profile.tabs_key(), &Vec::<Tab>::new(), backend)
            .await?;
        profiles.push(profile.clone());
        self.store.save(keys::PROFILES, &profiles, backend).await?;

        tracing::info!(profile_id = %profile.id, name = %profile.name, "created profile");
        Ok(profile)
    }

    /// Rename a profile
    ///
    /// # Errors
    /// Returns an error if the profile is missing, the name is invalid or
    /// taken, or the write fails
    pub async fn rename_profile(&self, id: &str, name: &str) -> ProfileResult<Profile> {
        let name = validate_name(name)?;
        let backend = self.storage.area(self.data_area().await?);
        let mut profiles = self.read_profiles(backend).await?;
        ensure_unique(&profiles, &name, Some(id))?;

        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.name = name;
        let renamed = profile.clone();

        self.store.save(keys::PROFILES, &profiles, backend).await?;
        Ok(renamed)
    }

    /// Delete a profile and its tab record
    ///
    /// If the deleted profile was active, the default profile becomes active.
    ///
    /// # Errors
    /// Returns `DefaultProfile` for the default profile, `NotFound` for an
    /// unknown id, or a storage error
    pub async fn delete_profile(&self, id: &str) -> ProfileResult<()> {
        let mut settings = self.settings().await?;
        let backend = self.storage.area(data_area(&settings, self.config()));
        let mut profiles = self.read_profiles(backend).await?;

        let index = profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        if profiles[index].is_default {
            return Err(ProfileError::DefaultProfile(profiles[index].name.clone()));
        }

        let removed = profiles.remove(index);
        self.store.save(keys::PROFILES, &profiles, backend).await?;
        self.store.clear(&removed.tabs_key(), backend).await?;

        if settings.active_profile() == Some(id) {
            settings.active_profile_id = profiles
                .iter()
                .find(|p| p.is_default)
                .or_else(|| profiles.first())
                .map(|p| p.id.clone());
            self.save_settings(&settings).await?;
        }

        tracing::info!(profile_id = %id, "deleted profile");
        Ok(())
    }

    /// Make a profile active
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, or a storage error
    pub async fn switch_profile(&self, id: &str) -> ProfileResult<Profile> {
        let mut settings = self.settings().await?;
        let backend = self.storage.area(data_area(&settings, self.config()));
        let mut profiles = self.read_profiles(backend).await?;

        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.touch();
        let active = profile.clone();

        self.store.save(keys::PROFILES, &profiles, backend).await?;
        settings.active_profile_id = Some(active.id.clone());
        self.save_settings(&settings).await?;
        Ok(active)
    }

    /// Profile whose URL patterns match `url`, else the default profile
    ///
    /// # Errors
    /// Returns an error if the profile record cannot be read
    pub async fn profile_for_url(&self, url: &str) -> ProfileResult<Option<Profile>> {
        let profiles = self.list_profiles().await?;
        let matched = profiles
            .iter()
            .find(|p| patterns::any_matches(&p.url_patterns, url))
            .or_else(|| profiles.iter().find(|p| p.is_default));
        Ok(matched.cloned())
    }

    /// Switch between the synced and local areas, moving all user data
    ///
    /// Records are moved one at a time; each source record is cleared only
    /// after its copy was written. The flag is saved last.
    ///
    /// # Errors
    /// Returns an error if any record cannot be moved (e.g. the target quota
    /// is too small); records already moved stay in the target area
    pub async fn set_use_sync_storage(&self, use_sync_storage: bool) -> ProfileResult<()> {
        let mut settings = self.settings().await?;
        let from = data_area(&settings, self.config());
        let to = StorageArea::for_sync_preference(use_sync_storage);

        if from != to {
            let source = self.storage.area(from);
            let target = self.storage.area(to);

            let mut records = vec![keys::LEGACY_TABS.to_string()];
            for profile in self.read_profiles(source).await? {
                records.push(profile.tabs_key());
            }
            // profiles last, so an interrupted move can be resumed from the source
            records.push(keys::PROFILES.to_string());

            for record in &records {
                self.store.transfer(record, source, target).await?;
            }
        }

        settings.use_sync_storage = Some(use_sync_storage);
        self.save_settings(&settings).await?;
        tracing::info!(%from, %to, "changed storage area");
        Ok(())
    }

    async fn read_profiles(&self, backend: &dyn StorageBackend) -> ProfileResult<Vec<Profile>> {
        Ok(self
            .store
            .load_as::<Vec<Profile>>(keys::PROFILES, backend)
            .await?
            .unwrap_or_default())
    }
}

fn validate_name(name: &str) -> ProfileResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn ensure_unique(profiles: &[Profile], name: &str, except_id: Option<&str>) -> ProfileResult<()> {
    let taken = profiles
        .iter()
        .filter(|p| Some(p.id.as_str()) != except_id)
        .any(|p| p.name.eq_ignore_ascii_case(name));
    if taken {
        return Err(ProfileError::DuplicateName(name.to_string()));
    }
    Ok(())
}
