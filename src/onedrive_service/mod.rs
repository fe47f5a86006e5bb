//! Remote Object Client for the OneDrive (Microsoft Graph) API

pub mod http_client;
pub mod onedrive_client;
pub mod onedrive_models;

pub use onedrive_client::{OneDriveClient, OneDriveClientTrait};
pub use onedrive_models::DriveItem;
