//! Persisted key naming
//!
//! ```text
//! <record>                     direct value (non-chunked form)
//! <record>_metadata            {chunked, chunkCount?, byteSize, savedAt}
//! <record>_chunk_<i>           i in [0, chunkCount)
//! ```

/// Legacy flat tab list, written by releases that predate profiles
pub const LEGACY_TABS: &str = "customTabs";

/// Profile list record
pub const PROFILES: &str = "profiles";

/// Settings object, always stored directly
pub const USER_SETTINGS: &str = "userSettings";

/// Migration scalars (local area only)
pub const EXTENSION_VERSION: &str = "extensionVersion";
pub const MIGRATION_COMPLETED: &str = "migrationCompleted";
pub const MIGRATION_PENDING: &str = "migrationPending";
pub const MIGRATION_SKIPPED: &str = "migrationSkippedVersion";

const METADATA_SUFFIX: &str = "_metadata";
const CHUNK_INFIX: &str = "_chunk_";

/// Key holding a record's metadata
#[must_use]
pub fn metadata_key(record: &str) -> String {
    format!("{record}{METADATA_SUFFIX}")
}

/// Key holding chunk `index` of a record
#[must_use]
pub fn chunk_key(record: &str, index: usize) -> String {
    format!("{record}{CHUNK_INFIX}{index}")
}

/// Keys of chunks `0..count`
#[must_use]
pub fn chunk_keys(record: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| chunk_key(record, i)).collect()
}

/// Tab record owned by a profile
#[must_use]
pub fn profile_tabs_key(profile_id: &str) -> String {
    format!("profile_{profile_id}_tabs")
}
