//! Backend descriptor the host uses to register and instantiate the adapter

use crate::config::REQUIRED_PARAMS;
use crate::error::StorageResult;
use crate::storage::OneDriveStorage;
use log::info;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct OneDriveBackend;

impl OneDriveBackend {
    pub const IDENTIFIER: &'static str = "files_external_onedrive";
    /// Identifier older host configurations still refer to
    pub const LEGACY_ALIAS: &'static str = "\\OC\\Files\\External_Storage\\OneDrive";
    pub const TEXT: &'static str = "OneDrive";
    pub const AUTH_SCHEME: &'static str = "oauth2";

    pub fn new() -> Self {
        Self
    }

    pub fn required_parameters(&self) -> &'static [&'static str] {
        &REQUIRED_PARAMS
    }

    pub fn matches(&self, identifier: &str) -> bool {
        identifier == Self::IDENTIFIER || identifier == Self::LEGACY_ALIAS
    }

    /// Validate `params` and connect a storage instance
    pub async fn create_storage(
        &self,
        params: &HashMap<String, String>,
    ) -> StorageResult<OneDriveStorage> {
        let storage = OneDriveStorage::from_params(params).await?;
        info!("✅ Mounted {} storage {}", Self::TEXT, storage.storage_id());
        Ok(storage)
    }
}
