//! Legacy-to-profile migration engine
//!
//! Moves the flat `customTabs` list into a `Default` profile exactly once per
//! extension version. Steps 1-5 of [`MigrationEngine::perform`] are full
//! overwrites, so repeating them is harmless; the completion marker is
//! written only after all of them succeeded.
//!
//! `profiles` ends up in exactly one area: a retry into the other area
//! removes what a failed attempt left behind.
//!
//! Each transition reads the persisted scalars and then writes them. The
//! storage host has no compare-and-set, so two contexts may both detect
//! `Needed` and both migrate. The second run overwrites the first, leaving a
//! single `Default` profile.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::state::{state_keys, CompletionMarker, MigrationPhase, PersistedState};
use crate::config::StoreConfig;
use crate::profile::{Profile, UserSettings};
use crate::storage::backend::{Storage, StorageArea};
use crate::storage::error::StoreError;
use crate::storage::keys;
use crate::storage::record::RecordStore;

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Step of `perform` that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    ReadLegacyTabs,
    SaveProfiles,
    SaveProfileTabs,
    RemoveStaleProfiles,
    UpdateSettings,
    Commit,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStep::ReadLegacyTabs => "reading legacy tabs",
            MigrationStep::SaveProfiles => "saving profiles",
            MigrationStep::SaveProfileTabs => "saving profile tabs",
            MigrationStep::RemoveStaleProfiles => "removing stale profiles",
            MigrationStep::UpdateSettings => "updating settings",
            MigrationStep::Commit => "recording completion",
        };
        write!(f, "{name}")
    }
}

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A step of `perform` failed; nothing was marked complete
    #[error("Migration failed while {step}: {source}. Retry or skip the migration")]
    Failed {
        step: MigrationStep,
        #[source]
        source: StoreError,
    },

    /// `perform` found no legacy tabs in either area
    #[error("No legacy tabs found to migrate")]
    NothingToMigrate,

    /// Operation not allowed in the current phase
    #[error("Cannot {action} migration while it is {from}")]
    InvalidTransition {
        from: MigrationPhase,
        action: &'static str,
    },

    /// Storage failure outside `perform`
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MigrationError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } | Self::NothingToMigrate => "MIGRATION_FAILED",
            Self::InvalidTransition { .. } => "INVALID_STATE",
            Self::Store(e) => e.code(),
        }
    }
}

/// Arguments of `perform`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationOptions {
    /// Turn on the profile switcher
    pub enable_profiles: bool,
    /// Keep user data in the synced area
    pub use_sync_storage: bool,
}

/// What a successful `perform` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub version: String,
    pub profile_id: String,
    pub tab_count: usize,
    pub source_area: StorageArea,
    pub target_area: StorageArea,
    pub tabs_chunked: bool,
}

/// Detects and performs the legacy schema migration
#[derive(Debug)]
pub struct MigrationEngine {
    storage: Storage,
    store: RecordStore,
    phase: MigrationPhase,
    version: Option<String>,
}

impl MigrationEngine {
    /// Create an engine in the `Unknown` phase
    #[must_use]
    pub fn new(storage: Storage, config: StoreConfig) -> Self {
        Self {
            storage,
            store: RecordStore::new(config),
            phase: MigrationPhase::Unknown,
            version: None,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    /// Version passed to the last `detect`
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Persisted scalars as currently stored
    ///
    /// # Errors
    /// Returns an error if the local area cannot be read
    pub async fn persisted_state(&self) -> MigrationResult<PersistedState> {
        Ok(PersistedState::read(self.storage.local()).await?)
    }

    /// Decide whether migration is needed for `current_version`
    ///
    /// `Needed` when legacy tabs exist and either no profiles exist or a
    /// previous attempt is still pending. Sets `migrationPending` when
    /// needed, otherwise records `extensionVersion`.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or written
    pub async fn detect(&mut self, current_version: &str) -> MigrationResult<MigrationPhase> {
        if self.phase == MigrationPhase::InProgress {
            return Err(MigrationError::InvalidTransition {
                from: self.phase,
                action: "detect",
            });
        }
        self.version = Some(current_version.to_string());

        let state = self.persisted_state().await?;
        if state.is_completed_for(current_version) {
            return Ok(self.transition(MigrationPhase::NotNeeded));
        }
        if state.is_opted_out_for(current_version) {
            tracing::info!(version = current_version, "migration was skipped for this version");
            return Ok(self.transition(MigrationPhase::NotNeeded));
        }

        let legacy = self.find_legacy_tabs(StorageArea::Synced).await?;
        let has_profiles = self.has_profiles().await?;

        let mut batch = Map::new();
        let phase = if legacy.is_some() && (!has_profiles || state.pending) {
            batch.insert(keys::MIGRATION_PENDING.to_string(), Value::Bool(true));
            MigrationPhase::Needed
        } else {
            batch.insert(
                keys::EXTENSION_VERSION.to_string(),
                Value::String(current_version.to_string()),
            );
            MigrationPhase::NotNeeded
        };
        self.storage
            .local()
            .set(batch)
            .await
            .map_err(StoreError::from)?;

        Ok(self.transition(phase))
    }

    /// Move legacy tabs into a new `Default` profile
    ///
    /// Valid after `detect` returned `Needed`, or after a failed attempt.
    ///
    /// # Errors
    /// - `InvalidTransition` in any other phase
    /// - `Failed` / `NothingToMigrate` if a step fails; `migrationPending`
    ///   stays set so the next `detect` yields `Needed` again
    pub async fn perform(&mut self, options: MigrationOptions) -> MigrationResult<MigrationReport> {
        let version = match (self.phase, &self.version) {
            (MigrationPhase::Needed | MigrationPhase::Failed, Some(version)) => version.clone(),
            _ => {
                return Err(MigrationError::InvalidTransition {
                    from: self.phase,
                    action: "perform",
                })
            }
        };

        self.transition(MigrationPhase::InProgress);
        let result = match self.run_steps(&version, options).await {
            Ok(report) => self.commit(&version).await.map(|()| report),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                self.transition(MigrationPhase::Completed);
                tracing::info!(
                    version = %report.version,
                    profile_id = %report.profile_id,
                    tab_count = report.tab_count,
                    target = %report.target_area,
                    "migration completed"
                );
                Ok(report)
            }
            Err(e) => {
                self.transition(MigrationPhase::Failed);
                tracing::warn!(error = %e, "migration failed");
                Err(e)
            }
        }
    }

    /// Permanently opt out of migration for the detected version
    ///
    /// A completion marker from an earlier version is kept; the opt-out is
    /// then recorded in `migrationSkippedVersion` instead.
    ///
    /// # Errors
    /// `InvalidTransition` unless the phase is `Needed` or `Failed`
    pub async fn skip(&mut self) -> MigrationResult<()> {
        let version = match (self.phase, &self.version) {
            (MigrationPhase::Needed | MigrationPhase::Failed, Some(version)) => version.clone(),
            _ => {
                return Err(MigrationError::InvalidTransition {
                    from: self.phase,
                    action: "skip",
                })
            }
        };

        let state = self.persisted_state().await?;
        let mut batch = Map::new();
        match state.completed {
            // an earlier version's marker stays until reset
            CompletionMarker::Version(_) => {
                batch.insert(
                    keys::MIGRATION_SKIPPED.to_string(),
                    Value::String(version.clone()),
                );
            }
            CompletionMarker::Never | CompletionMarker::OptedOut => {
                if let Some(marker) = CompletionMarker::OptedOut.to_value() {
                    batch.insert(keys::MIGRATION_COMPLETED.to_string(), marker);
                }
            }
        }
        batch.insert(keys::MIGRATION_PENDING.to_string(), Value::Bool(false));
        batch.insert(keys::EXTENSION_VERSION.to_string(), Value::String(version));
        self.storage
            .local()
            .set(batch)
            .await
            .map_err(StoreError::from)?;

        self.transition(MigrationPhase::Skipped);
        Ok(())
    }

    /// Full reset: forget all migration state
    ///
    /// # Errors
    /// Returns an error if the local area cannot be written
    pub async fn reset(&mut self) -> MigrationResult<()> {
        self.storage
            .local()
            .remove(&state_keys())
            .await
            .map_err(StoreError::from)?;
        self.version = None;
        self.transition(MigrationPhase::Unknown);
        Ok(())
    }

    async fn run_steps(
        &self,
        version: &str,
        options: MigrationOptions,
    ) -> MigrationResult<MigrationReport> {
        let preferred = StorageArea::for_sync_preference(options.use_sync_storage);
        let (source_area, legacy) = self
            .find_legacy_tabs(preferred)
            .await
            .map_err(|source| MigrationError::Failed {
                step: MigrationStep::ReadLegacyTabs,
                source,
            })?
            .ok_or(MigrationError::NothingToMigrate)?;

        let profile = Profile::new_default(self.store.config().default_profile_name.clone());
        let target = self.storage.area(preferred);

        self.store
            .save(keys::PROFILES, &[&profile], target)
            .await
            .map_err(|source| MigrationError::Failed {
                step: MigrationStep::SaveProfiles,
                source,
            })?;

        let outcome = self
            .store
            .save(&profile.tabs_key(), &legacy, target)
            .await
            .map_err(|source| MigrationError::Failed {
                step: MigrationStep::SaveProfileTabs,
                source,
            })?;

        self.remove_stale_profiles(preferred.other())
            .await
            .map_err(|source| MigrationError::Failed {
                step: MigrationStep::RemoveStaleProfiles,
                source,
            })?;

        self.update_settings(&profile.id, options)
            .await
            .map_err(|source| MigrationError::Failed {
                step: MigrationStep::UpdateSettings,
                source,
            })?;

        Ok(MigrationReport {
            version: version.to_string(),
            profile_id: profile.id,
            tab_count: legacy.as_array().map_or(0, Vec::len),
            source_area,
            target_area: preferred,
            tabs_chunked: outcome.chunked,
        })
    }

    /// Drop profiles an earlier failed attempt left in `area`, with their tabs
    async fn remove_stale_profiles(&self, area: StorageArea) -> Result<(), StoreError> {
        let backend = self.storage.area(area);
        let stale = match self.store.load_as::<Vec<Profile>>(keys::PROFILES, backend).await {
            Ok(profiles) => profiles.unwrap_or_default(),
            Err(StoreError::Parse { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        for profile in &stale {
            self.store.clear(&profile.tabs_key(), backend).await?;
        }
        self.store.clear(keys::PROFILES, backend).await?;
        if !stale.is_empty() {
            tracing::info!(area = %area, count = stale.len(), "removed stale profiles");
        }
        Ok(())
    }

    async fn update_settings(
        &self,
        profile_id: &str,
        options: MigrationOptions,
    ) -> Result<(), StoreError> {
        let backend = self.storage.area(UserSettings::AREA);
        let mut settings = UserSettings::load(backend).await?.unwrap_or_default();
        settings.active_profile_id = Some(profile_id.to_string());
        settings.default_profile_id = Some(profile_id.to_string());
        settings.use_sync_storage = Some(options.use_sync_storage);
        if options.enable_profiles {
            settings.profiles_enabled = true;
        }
        settings.save(backend).await
    }

    async fn commit(&self, version: &str) -> MigrationResult<()> {
        let mut batch = Map::new();
        batch.insert(
            keys::MIGRATION_COMPLETED.to_string(),
            Value::String(version.to_string()),
        );
        batch.insert(keys::MIGRATION_PENDING.to_string(), Value::Bool(false));
        batch.insert(
            keys::EXTENSION_VERSION.to_string(),
            Value::String(version.to_string()),
        );
        self.storage
            .local()
            .set(batch)
            .await
            .map_err(|e| MigrationError::Failed {
                step: MigrationStep::Commit,
                source: e.into(),
            })
    }

    /// Legacy tabs from `preferred`, else the other area; empty lists count as absent
    async fn find_legacy_tabs(
        &self,
        preferred: StorageArea,
    ) -> Result<Option<(StorageArea, Value)>, StoreError> {
        for area in [preferred, preferred.other()] {
            let tabs = self
                .store
                .load(keys::LEGACY_TABS, self.storage.area(area))
                .await?;
            if let Some(tabs) = tabs.filter(has_content) {
                return Ok(Some((area, tabs)));
            }
        }
        Ok(None)
    }

    async fn has_profiles(&self) -> Result<bool, StoreError> {
        for area in [StorageArea::Synced, StorageArea::Local] {
            let profiles = self
                .store
                .load(keys::PROFILES, self.storage.area(area))
                .await?;
            if profiles.as_ref().is_some_and(has_content) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn transition(&mut self, next: MigrationPhase) -> MigrationPhase {
        if self.phase != next {
            tracing::info!(from = %self.phase, to = %next, "migration phase changed");
        }
        self.phase = next;
        next
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}
