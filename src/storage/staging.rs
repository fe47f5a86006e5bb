//! Write-back staging of locally buffered files
//!
//! Opening a path for writing stages a local temporary copy and registers
//! it here under a handle id. Closing the handle through the storage facade
//! takes the entry out again (exactly once) and uploads the content.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::{NamedTempFile, TempPath};

/// Remote destination of a staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingEntry {
    pub remote_path: String,
    pub local_path: PathBuf,
}

/// Single-use map from open staged handles to their remote path
#[derive(Clone, Default)]
pub struct StagingBuffer {
    open_handles: Arc<Mutex<HashMap<u64, StagingEntry>>>,
    next_handle_id: Arc<Mutex<u64>>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<u64, StagingEntry>> {
        self.open_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a staged copy and return its handle id
    pub fn register(&self, remote_path: &str, local_path: &Path) -> u64 {
        let handle_id = {
            let mut next_id = self
                .next_handle_id
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *next_id += 1;
            *next_id
        };

        self.handles().insert(
            handle_id,
            StagingEntry {
                remote_path: remote_path.to_string(),
                local_path: local_path.to_path_buf(),
            },
        );
        debug!(
            "📂 Staged handle {} for {} at {}",
            handle_id,
            remote_path,
            local_path.display()
        );
        handle_id
    }

    /// Remove and return the entry of `handle_id`
    pub fn take(&self, handle_id: u64) -> Option<StagingEntry> {
        self.handles().remove(&handle_id)
    }

    pub fn contains(&self, handle_id: u64) -> bool {
        self.handles().contains_key(&handle_id)
    }

    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }

    /// True when both values share one handle table
    pub fn same_buffer(&self, other: &StagingBuffer) -> bool {
        Arc::ptr_eq(&self.open_handles, &other.open_handles)
    }
}

/// Writable local copy of a remote file.
///
/// Pass it to [`crate::storage::OneDriveStorage::close`] to upload the
/// content. Dropping it instead discards the pending upload and deletes the
/// local copy.
pub struct StagedFile {
    handle_id: u64,
    remote_path: String,
    file: File,
    temp_path: Option<TempPath>,
    staging: StagingBuffer,
}

impl StagedFile {
    pub(crate) fn new(
        handle_id: u64,
        remote_path: String,
        file: File,
        temp_path: TempPath,
        staging: StagingBuffer,
    ) -> Self {
        Self {
            handle_id,
            remote_path,
            file,
            temp_path: Some(temp_path),
            staging,
        }
    }

    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    /// True when this handle was registered in `staging`
    pub fn belongs_to(&self, staging: &StagingBuffer) -> bool {
        self.staging.same_buffer(staging)
    }

    /// Sync the local copy and hand over ownership of its path. The handle
    /// itself is closed; the staging entry stays for the caller to take.
    pub(crate) fn finish(mut self) -> io::Result<(u64, TempPath)> {
        self.file.flush()?;
        self.file.sync_data()?;
        let temp_path = self
            .temp_path
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staged file already finished"))?;
        Ok((self.handle_id, temp_path))
    }
}

impl Read for StagedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for StagedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Still holding the path means close() never ran
        if let Some(temp_path) = self.temp_path.take() {
            if self.staging.take(self.handle_id).is_some() {
                warn!(
                    "⚠️ Handle {} for {} dropped without close, pending upload discarded",
                    self.handle_id, self.remote_path
                );
            }
            if let Err(e) = temp_path.close() {
                warn!("⚠️ Failed to delete staged copy of {}: {}", self.remote_path, e);
            }
        }
    }
}

/// Read-only local copy of a remote file, deleted when dropped
pub struct ReadHandle {
    remote_path: String,
    file: NamedTempFile,
}

impl ReadHandle {
    pub(crate) fn new(remote_path: String, mut file: NamedTempFile) -> io::Result<Self> {
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(Self { remote_path, file })
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn local_path(&self) -> &Path {
        self.file.path()
    }
}

impl Read for ReadHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for ReadHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
