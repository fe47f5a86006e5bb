//! OneDrive external storage adapter
//!
//! Exposes a OneDrive account as a hierarchical, path-addressed filesystem.
//! Paths are translated into remote item ids through an instance-local
//! resolution cache, and writes are staged in local temporary files that are
//! uploaded when the handle is closed.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod log_appender;
pub mod onedrive_service;
pub mod storage;

pub use backend::OneDriveBackend;
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use storage::{FileStat, FileType, OneDriveStorage, OpenFile};
