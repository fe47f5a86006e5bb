//! Error type returned by the storage facade.

use thiserror::Error;

/// Failures surfaced by [`crate::storage::OneDriveStorage`].
///
/// Expected conditions (missing paths, occupied names) get their own
/// variants so callers can branch on them; faults coming from the remote
/// API are carried unchanged in [`StorageError::Remote`].
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Invalid path for this operation: {0}")]
    InvalidPath(String),

    #[error("Unsupported open mode: {0}")]
    InvalidMode(String),

    /// The handle passed to `close` was opened by another storage instance.
    /// It is discarded without uploading anything.
    #[error("Handle {handle_id} for {path} was not opened by this storage")]
    ForeignHandle { handle_id: u64, path: String },

    /// The staged content could not be uploaded because the parent folder
    /// no longer resolves. The local copy has already been deleted.
    #[error("Upload of {path} discarded: parent folder could not be resolved")]
    UploadDiscarded { path: String },

    /// The rename half of a cross-directory rename succeeded but the move
    /// did not. The remote object keeps its new name in the old folder.
    #[error("{from} was renamed but not moved to {to}: {source}")]
    PartialRename {
        from: String,
        to: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Remote(#[from] anyhow::Error),

    #[error("Local staging error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// True for the two conditions where buffered or structural changes were
    /// only partially applied remotely.
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            StorageError::UploadDiscarded { .. } | StorageError::PartialRename { .. }
        )
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
