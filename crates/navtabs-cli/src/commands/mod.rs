//! CLI command handlers
//!
//! Each top-level subcommand has its own module. All of them work on the
//! same [`Context`], built once from `--data-dir` and `--config`.

pub mod migrate;
pub mod profile;
pub mod record;
pub mod tabs;

use navtabs_core::config::StoreConfig;
use navtabs_core::storage::Storage;

/// Storage areas and limits shared by every command
pub struct Context {
    pub storage: Storage,
    pub config: StoreConfig,
}
