//! Profile-aware record resolution
//!
//! Every surface that reads or writes tabs goes through these functions, so
//! all execution contexts agree on which record is the active tab list.

use super::types::UserSettings;
use crate::config::StoreConfig;
use crate::storage::backend::StorageArea;
use crate::storage::keys;

/// Record name of the active tab list
///
/// `profile_<activeProfileId>_tabs` when a profile is active, otherwise the
/// legacy `customTabs` record.
#[must_use]
pub fn resolve_tabs_key(settings: &UserSettings) -> String {
    match settings.active_profile() {
        Some(id) => keys::profile_tabs_key(id),
        None => keys::LEGACY_TABS.to_string(),
    }
}

/// Area holding profiles and tab lists
#[must_use]
pub fn data_area(settings: &UserSettings, config: &StoreConfig) -> StorageArea {
    StorageArea::for_sync_preference(settings.uses_sync_storage(config))
}
