//! Profile types and operations

pub mod patterns;
pub mod resolver;
pub mod service;
mod types;

pub use resolver::{data_area, resolve_tabs_key};
pub use service::{ProfileError, ProfileResult, ProfileService};
pub use types::*;
