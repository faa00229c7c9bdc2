//! SQLite persistence, configuration and JSON import/export for `roll-core`.
//!
//! [`Store`] is the storage collaborator: it loads full [`roll_core::Snapshot`]s
//! and implements the core's write-side traits.

pub mod config;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;

pub use config::{Config, DATA_DIR_ENV, DB_FILE, ReportConfig, StoreConfig, resolve_data_dir};
pub use error::{Result, StoreError};
pub use store::Store;
