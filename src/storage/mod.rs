//! POSIX-like view of a OneDrive drive
//!
//! Every operation goes through the path cache to find the remote item,
//! calls the remote client, and updates the cache with the outcome. File
//! contents never stay local longer than one open/close cycle.

pub mod content_type;
pub mod open_mode;
pub mod path_cache;
pub mod path_utils;
pub mod staging;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::onedrive_service::http_client::HttpClient;
use crate::onedrive_service::onedrive_client::{OneDriveClient, OneDriveClientTrait};
use crate::onedrive_service::onedrive_models::{DriveItem, ItemUpdate, UploadOptions};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::{Builder, NamedTempFile};

use content_type::detect_content_type;
use open_mode::OpenMode;
use path_cache::PathCache;
use path_utils::{base_name, extension, is_same_or_descendant, join_path, normalize_path, parent_path};
use staging::{ReadHandle, StagedFile, StagingBuffer};

const TEMP_FILE_PREFIX: &str = "onedrive-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Dir,
    File,
}

/// Result of [`OneDriveStorage::stat`]
#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    pub file_type: FileType,
    /// Always 0 for folders
    pub size: u64,
    /// The remote side only tracks one modification time, reported here
    /// as both access and modify time.
    pub atime: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
    pub ctime: Option<DateTime<Utc>>,
}

/// A handle returned by [`OneDriveStorage::open`]
pub enum OpenFile {
    Read(ReadHandle),
    Write(StagedFile),
}

/// OneDrive storage adapter.
///
/// One instance serves one mounted connection. Operations take `&mut self`
/// and run their remote calls one after another; there is no locking or
/// cache coherence across instances. Concurrent writers of the same path
/// each get their own staged copy and the last `close` wins remotely.
pub struct OneDriveStorage {
    config: StorageConfig,
    client: Arc<dyn OneDriveClientTrait>,
    cache: PathCache,
    staging: StagingBuffer,
}

impl OneDriveStorage {
    /// Connect using the Graph client built from `config`
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let token_state = config.token_state()?;
        let client = OneDriveClient::with_endpoints(
            &config.client_id,
            token_state,
            HttpClient::with_base(&config.api_base),
            &config.token_url,
        );
        Self::with_client(config, Arc::new(client)).await
    }

    /// Connect from the host's parameter map
    pub async fn from_params(params: &HashMap<String, String>) -> StorageResult<Self> {
        Self::new(StorageConfig::from_params(params)?).await
    }

    /// Connect over an existing client. The token is renewed right away
    /// when it has no lifetime left; it is not checked again afterwards.
    pub async fn with_client(
        config: StorageConfig,
        client: Arc<dyn OneDriveClientTrait>,
    ) -> StorageResult<Self> {
        config.validate()?;

        if client.token_expire() <= 1 {
            info!("🔄 Access token for {} expired, renewing", config.client_id);
            client.renew_access_token(&config.client_secret).await?;
        }

        Ok(Self {
            config,
            client,
            cache: PathCache::new(),
            staging: StagingBuffer::new(),
        })
    }

    pub fn storage_id(&self) -> String {
        format!("onedrive::{}", self.config.client_id)
    }

    /// Current token state as a blob, so the host can persist a token
    /// renewed during construction
    pub fn serialized_token(&self) -> StorageResult<String> {
        Ok(self.client.serialized_token()?)
    }

    pub fn client(&self) -> &Arc<dyn OneDriveClientTrait> {
        &self.client
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn staging(&self) -> &StagingBuffer {
        &self.staging
    }

    /// Remote item at `path`, or `None` when it does not exist
    pub async fn resolve(&mut self, path: &str) -> Option<DriveItem> {
        self.cache.resolve(self.client.as_ref(), path).await
    }

    async fn resolve_folder(&mut self, path: &str) -> StorageResult<DriveItem> {
        let folder = self
            .resolve(path)
            .await
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        if !folder.is_folder() {
            return Err(StorageError::NotADirectory(path.to_string()));
        }
        Ok(folder)
    }

    /// Names in a folder, in remote listing order
    pub async fn list(&mut self, path: &str) -> StorageResult<Vec<String>> {
        let path = normalize_path(path);
        let folder = self.resolve_folder(&path).await?;

        let children = self
            .cache
            .list_folder(self.client.as_ref(), &path, folder.id())
            .await?;

        debug!("📂 Listed {} entries in '{}'", children.len(), path);
        Ok(children
            .iter()
            .map(|child| child.name().to_string())
            .collect())
    }

    pub async fn stat(&mut self, path: &str) -> StorageResult<FileStat> {
        let item = self
            .resolve(path)
            .await
            .ok_or_else(|| StorageError::NotFound(normalize_path(path)))?;

        let (file_type, size) = if item.is_folder() {
            (FileType::Dir, 0)
        } else {
            (FileType::File, item.size())
        };
        Ok(FileStat {
            file_type,
            size,
            atime: item.updated_time(),
            mtime: item.updated_time(),
            ctime: item.created_time(),
        })
    }

    pub async fn file_type(&mut self, path: &str) -> StorageResult<FileType> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Ok(FileType::Dir);
        }

        match self.resolve(&path).await {
            Some(item) if item.is_folder() => Ok(FileType::Dir),
            Some(_) => Ok(FileType::File),
            None => Err(StorageError::NotFound(path)),
        }
    }

    pub async fn exists(&mut self, path: &str) -> bool {
        self.resolve(path).await.is_some()
    }

    pub async fn is_dir(&mut self, path: &str) -> bool {
        matches!(self.file_type(path).await, Ok(FileType::Dir))
    }

    pub async fn is_file(&mut self, path: &str) -> bool {
        matches!(self.file_type(path).await, Ok(FileType::File))
    }

    pub async fn is_updatable(&mut self, path: &str) -> bool {
        self.exists(path).await
    }

    pub async fn is_deletable(&mut self, path: &str) -> bool {
        self.exists(path).await
    }

    /// Create a folder; its parent must exist and the name must be free
    pub async fn mkdir(&mut self, path: &str) -> StorageResult<()> {
        let path = normalize_path(path);
        if path.is_empty() || self.exists(&path).await {
            return Err(StorageError::AlreadyExists(path));
        }

        let parent_dir = parent_path(&path);
        let parent = self.resolve_folder(&parent_dir).await?;
        let folder = self
            .client
            .create_folder(&base_name(&path), parent.id())
            .await?;

        self.cache.set(&path, folder);
        // A new folder is empty, no need to list it
        self.cache.store_listing(&path, &[]);
        info!("✅ Created folder {}", path);
        Ok(())
    }

    /// Delete a file or folder. Removing the root deletes every child of
    /// the drive and stops at the first failure.
    pub async fn remove(&mut self, path: &str) -> StorageResult<()> {
        let path = normalize_path(path);
        if !self.is_deletable(&path).await {
            return Err(StorageError::NotFound(path));
        }

        if path.is_empty() {
            for name in self.list("").await? {
                self.remove_item(&name).await?;
            }
            self.cache.clear();
            info!("🗑️ Emptied drive root");
            return Ok(());
        }

        self.remove_item(&path).await
    }

    async fn remove_item(&mut self, path: &str) -> StorageResult<()> {
        let item = self
            .resolve(path)
            .await
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        self.client.delete_object(item.id()).await?;
        self.cache.tombstone(path);
        info!("🗑️ Removed {}", path);
        Ok(())
    }

    /// Rename or move `from` to `to`, replacing whatever occupies `to`.
    ///
    /// Across folders this takes a rename and a move call. If the move
    /// fails the item stays renamed in its old folder and
    /// [`StorageError::PartialRename`] is returned.
    pub async fn rename(&mut self, from: &str, to: &str) -> StorageResult<()> {
        let from = normalize_path(from);
        let to = normalize_path(to);

        let item = self
            .resolve(&from)
            .await
            .ok_or_else(|| StorageError::NotFound(from.clone()))?;
        if from == to {
            return Ok(());
        }
        if from.is_empty() || to.is_empty() {
            return Err(StorageError::InvalidPath(from));
        }
        if is_same_or_descendant(&to, &from) || is_same_or_descendant(&from, &to) {
            return Err(StorageError::InvalidPath(format!("{} -> {}", from, to)));
        }

        let from_parent = parent_path(&from);
        let to_parent = parent_path(&to);
        let new_name = base_name(&to);

        let target_parent = if from_parent == to_parent {
            None
        } else {
            Some(self.resolve_folder(&to_parent).await?)
        };

        if self.exists(&to).await {
            debug!("Destination {} is occupied, removing it first", to);
            self.remove(&to).await?;
        }

        let renamed = self
            .client
            .update_object(item.id(), &ItemUpdate::rename(&new_name))
            .await?;

        let updated = match target_parent {
            None => renamed,
            Some(parent) => match self.client.move_object(item.id(), parent.id()).await {
                Ok(moved) => moved,
                Err(e) => {
                    let renamed_path = join_path(&from_parent, &new_name);
                    warn!(
                        "⚠️ {} was renamed to {} but could not be moved to {}: {:#}",
                        from, renamed_path, to, e
                    );
                    self.cache.tombstone(&from);
                    self.cache.set(&renamed_path, renamed);
                    return Err(StorageError::PartialRename {
                        from,
                        to,
                        source: e,
                    });
                }
            },
        };

        self.cache.tombstone(&from);
        self.cache.set(&to, updated);
        info!("✅ Renamed {} to {}", from, to);
        Ok(())
    }

    /// Open `path` with an fopen-style mode string
    pub async fn open(&mut self, path: &str, mode: &str) -> StorageResult<OpenFile> {
        let mode: OpenMode = mode.parse()?;
        if mode.is_read_only() {
            Ok(OpenFile::Read(self.open_read(path).await?))
        } else {
            Ok(OpenFile::Write(self.open_write(path, mode).await?))
        }
    }

    /// Download the file into a local copy and open it for reading
    pub async fn open_read(&mut self, path: &str) -> StorageResult<ReadHandle> {
        let path = normalize_path(path);
        let item = self
            .resolve(&path)
            .await
            .ok_or_else(|| StorageError::NotFound(path.clone()))?;
        if item.is_folder() {
            return Err(StorageError::IsADirectory(path));
        }

        let content = self.client.fetch_content(item.id()).await?;
        let mut temp = self.create_temp_file(&path)?;
        temp.write_all(&content)?;
        debug!("📥 Fetched {} ({} bytes) for reading", path, content.len());
        Ok(ReadHandle::new(path, temp)?)
    }

    /// Stage a local copy of `path` for writing. Existing content is copied
    /// in first; a missing path starts empty. Nothing is uploaded until the
    /// handle is passed to [`OneDriveStorage::close`].
    pub async fn open_write(&mut self, path: &str, mode: OpenMode) -> StorageResult<StagedFile> {
        let path = normalize_path(path);
        if mode.is_read_only() {
            return Err(StorageError::InvalidMode(format!("{:?}", mode)));
        }
        if path.is_empty() {
            return Err(StorageError::IsADirectory(path));
        }

        let mut temp = self.create_temp_file(&path)?;
        if let Some(existing) = self.resolve(&path).await {
            if existing.is_folder() {
                return Err(StorageError::IsADirectory(path));
            }
            let content = self.client.fetch_content(existing.id()).await?;
            temp.write_all(&content)?;
            temp.flush()?;
        }

        let (_, temp_path) = temp.into_parts();
        let file = mode.open_options().open(&temp_path)?;
        let handle_id = self.staging.register(&path, &temp_path);

        Ok(StagedFile::new(
            handle_id,
            path,
            file,
            temp_path,
            self.staging.clone(),
        ))
    }

    /// Close a staged handle and upload its content (write-back).
    ///
    /// The local copy is deleted whatever the outcome. When the parent
    /// folder no longer resolves the content is dropped and
    /// [`StorageError::UploadDiscarded`] is returned. A handle opened by
    /// another instance is dropped unflushed with
    /// [`StorageError::ForeignHandle`].
    pub async fn close(&mut self, staged: StagedFile) -> StorageResult<()> {
        if !staged.belongs_to(&self.staging) {
            warn!(
                "⚠️ Handle {} for {} closed on {}, which did not open it",
                staged.handle_id(),
                staged.remote_path(),
                self.storage_id()
            );
            return Err(StorageError::ForeignHandle {
                handle_id: staged.handle_id(),
                path: staged.remote_path().to_string(),
            });
        }

        let (handle_id, temp_path) = staged.finish()?;

        let result = match self.staging.take(handle_id) {
            Some(entry) => self.write_back(&entry.remote_path, &temp_path).await,
            None => {
                debug!("Handle {} has no staging entry, nothing to upload", handle_id);
                Ok(())
            }
        };

        if let Err(e) = temp_path.close() {
            warn!("⚠️ Failed to delete staged copy for handle {}: {}", handle_id, e);
        }
        result
    }

    async fn write_back(&mut self, remote_path: &str, local_path: &Path) -> StorageResult<()> {
        let parent_dir = parent_path(remote_path);
        let parent = match self.resolve(&parent_dir).await {
            Some(parent) if parent.is_folder() => parent,
            _ => {
                warn!(
                    "⚠️ Parent folder '{}' of {} is gone, discarding buffered upload",
                    parent_dir, remote_path
                );
                return Err(StorageError::UploadDiscarded {
                    path: remote_path.to_string(),
                });
            }
        };

        let content = tokio::fs::read(local_path).await?;
        let size = content.len();
        let options = UploadOptions {
            content_type: Some(detect_content_type(local_path)),
        };
        let item = self
            .client
            .create_file(&base_name(remote_path), content, parent.id(), options)
            .await?;

        self.cache.set(remote_path, item);
        info!("✅ Wrote back {} ({} bytes)", remote_path, size);
        Ok(())
    }

    /// Remaining quota of the account; `path` is not consulted
    pub async fn free_space(&mut self, _path: &str) -> StorageResult<u64> {
        let quota = self.client.fetch_quota().await?;
        Ok(quota.available())
    }

    /// Refresh an existing item with a same-name update, or create an empty
    /// file. The remote side cannot set timestamps, so `mtime` is ignored.
    pub async fn touch(&mut self, path: &str, mtime: Option<DateTime<Utc>>) -> StorageResult<()> {
        let path = normalize_path(path);
        if let Some(mtime) = mtime {
            debug!("Ignoring requested mtime {} for {}", mtime, path);
        }
        if path.is_empty() {
            return Ok(());
        }

        let name = base_name(&path);
        let item = match self.resolve(&path).await {
            Some(existing) => {
                self.client
                    .update_object(existing.id(), &ItemUpdate::rename(&name))
                    .await?
            }
            None => {
                let parent = self.resolve_folder(&parent_path(&path)).await?;
                let options = UploadOptions {
                    content_type: Some(detect_content_type(Path::new(&name))),
                };
                self.client
                    .create_file(&name, Vec::new(), parent.id(), options)
                    .await?
            }
        };

        self.cache.set(&path, item);
        Ok(())
    }

    /// True when the quota can be fetched, i.e. the connection and
    /// credentials work
    pub async fn health_check(&mut self) -> bool {
        match self.client.fetch_quota().await {
            Ok(_) => true,
            Err(e) => {
                warn!("⚠️ Health check for {} failed: {:#}", self.storage_id(), e);
                false
            }
        }
    }

    fn create_temp_file(&self, path: &str) -> io::Result<NamedTempFile> {
        let dir = self.config.temp_dir();
        std::fs::create_dir_all(&dir)?;
        let suffix = extension(path);
        let file = Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&dir)?;
        Ok(file)
    }
}
