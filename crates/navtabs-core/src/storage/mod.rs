//! Storage layer (backend areas + chunked records)

pub mod backend;
pub mod codec;
pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod record;

pub use backend::{Keys, QuotaLimits, Storage, StorageArea, StorageBackend, StorageChange};
pub use error::{BackendError, BackendResult, StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use record::{RecordMetadata, RecordStatus, RecordStore, SaveOutcome};
