//! Migration state
//!
//! The persisted form is a few scalars in the local area. In memory the
//! engine tracks an explicit [`MigrationPhase`]; the scalars are only the
//! durable part of it.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::storage::backend::{Keys, StorageBackend};
use crate::storage::error::StoreResult;
use crate::storage::keys;

/// Phase of the migration state machine
///
/// ```text
/// Unknown --detect--> NotNeeded | Needed
/// Needed  --perform-> InProgress --> Completed | Failed
/// Failed  --perform-> InProgress (retry)
/// Needed | Failed --skip--> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Unknown,
    NotNeeded,
    Needed,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationPhase::Unknown => "unknown",
            MigrationPhase::NotNeeded => "not needed",
            MigrationPhase::Needed => "needed",
            MigrationPhase::InProgress => "in progress",
            MigrationPhase::Completed => "completed",
            MigrationPhase::Failed => "failed",
            MigrationPhase::Skipped => "skipped",
        };
        write!(f, "{name}")
    }
}

/// Value of `migrationCompleted`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompletionMarker {
    /// Never migrated
    #[default]
    Never,
    /// Migrated for this extension version
    Version(String),
    /// User skipped migration (`false`)
    OptedOut,
}

impl CompletionMarker {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(version)) if !version.is_empty() => Self::Version(version.clone()),
            Some(Value::Bool(false)) => Self::OptedOut,
            _ => Self::Never,
        }
    }

    /// Persisted JSON form; `None` means the key is absent
    #[must_use]
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Never => None,
            Self::Version(version) => Some(Value::String(version.clone())),
            Self::OptedOut => Some(Value::Bool(false)),
        }
    }
}

/// The migration scalars held in the local area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// `extensionVersion`
    pub extension_version: Option<String>,
    /// `migrationCompleted`
    pub completed: CompletionMarker,
    /// `migrationPending`
    pub pending: bool,
    /// `migrationSkippedVersion`, set by `skip` next to an earlier completion marker
    pub skipped_version: Option<String>,
}

impl PersistedState {
    /// Read the scalars in one batch
    ///
    /// # Errors
    /// Returns an error if the local area cannot be read
    pub async fn read(local: &dyn StorageBackend) -> StoreResult<Self> {
        let wanted = state_keys();
        let items = local.get(Keys::Many(&wanted)).await?;
        Ok(Self::from_items(&items))
    }

    fn from_items(items: &Map<String, Value>) -> Self {
        Self {
            extension_version: items
                .get(keys::EXTENSION_VERSION)
                .and_then(Value::as_str)
                .map(str::to_string),
            completed: CompletionMarker::from_value(items.get(keys::MIGRATION_COMPLETED)),
            pending: items
                .get(keys::MIGRATION_PENDING)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            skipped_version: items
                .get(keys::MIGRATION_SKIPPED)
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Whether migration already completed for `version`
    #[must_use]
    pub fn is_completed_for(&self, version: &str) -> bool {
        matches!(&self.completed, CompletionMarker::Version(v) if v == version)
    }

    /// Whether the user skipped migration while running `version`
    #[must_use]
    pub fn is_opted_out_for(&self, version: &str) -> bool {
        if self.skipped_version.as_deref() == Some(version) {
            return true;
        }
        self.completed == CompletionMarker::OptedOut
            && self.extension_version.as_deref() == Some(version)
    }
}

/// Keys of the persisted scalars
#[must_use]
pub fn state_keys() -> Vec<String> {
    vec![
        keys::EXTENSION_VERSION.to_string(),
        keys::MIGRATION_COMPLETED.to_string(),
        keys::MIGRATION_PENDING.to_string(),
        keys::MIGRATION_SKIPPED.to_string(),
    ]
}
