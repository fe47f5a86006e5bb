//! Path resolution cache
//!
//! Maps normalized relative paths to the drive items they name. Item ids
//! cannot be derived from a path, so entries are discovered by listing the
//! parent folder; a listing caches every child, not only the one looked up.
//! Mutations update the cache directly: deletions leave a tombstone and purge
//! everything underneath, creations and renames set the new path.

use crate::onedrive_service::onedrive_client::OneDriveClientTrait;
use crate::onedrive_service::onedrive_models::DriveItem;
use crate::storage::path_utils::{is_same_or_descendant, join_path, normalize_path, parent_path};
use anyhow::Result;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Resolved(DriveItem),
    /// Confirmed absent
    Tombstone,
}

/// Instance-local, unbounded cache of resolved paths
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<String, CacheEntry>,
    /// Folders whose complete child listing is in `entries`
    listed: HashSet<String>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(&normalize_path(path))
    }

    /// Cached item for `path`, without touching the remote side
    pub fn lookup(&self, path: &str) -> Option<&DriveItem> {
        match self.get(path) {
            Some(CacheEntry::Resolved(item)) => Some(item),
            _ => None,
        }
    }

    pub fn is_listed(&self, dir: &str) -> bool {
        self.listed.contains(&normalize_path(dir))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.listed.clear();
    }

    /// Record `item` at `path`. When a different object previously lived
    /// there, whatever was cached below it is dropped.
    pub fn set(&mut self, path: &str, item: DriveItem) {
        let path = normalize_path(path);
        let replaced = match self.entries.get(&path) {
            Some(CacheEntry::Resolved(old)) => old.id != item.id,
            _ => false,
        };
        if replaced {
            self.purge_below(&path);
            self.listed.remove(&path);
        }
        self.entries.insert(path, CacheEntry::Resolved(item));
    }

    /// Mark `path` as absent and drop every entry at or below it.
    /// Tombstoning the root empties the whole cache.
    pub fn tombstone(&mut self, path: &str) {
        let path = normalize_path(path);
        if path.is_empty() {
            self.clear();
            return;
        }

        self.purge_below(&path);
        self.listed.retain(|dir| !is_same_or_descendant(dir, &path));
        self.entries.insert(path, CacheEntry::Tombstone);
    }

    /// Replace the cached children of `dir` with a fresh listing. Children
    /// missing from the listing are dropped together with their subtrees.
    pub fn store_listing(&mut self, dir: &str, children: &[DriveItem]) {
        let dir = normalize_path(dir);
        let fresh: HashSet<String> = children
            .iter()
            .map(|child| join_path(&dir, child.name()))
            .collect();

        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|key| !key.is_empty() && parent_path(key) == dir && !fresh.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            self.purge_below(&key);
            self.listed.retain(|listed| !is_same_or_descendant(listed, &key));
            self.entries.remove(&key);
        }

        for child in children {
            self.set(&join_path(&dir, child.name()), child.clone());
        }
        self.listed.insert(dir);
    }

    /// Resolve `path` to a drive item, listing parent folders as needed.
    ///
    /// Returns `None` when any segment is missing, when an intermediate
    /// segment is not a folder, or when a listing fails.
    pub async fn resolve(
        &mut self,
        client: &dyn OneDriveClientTrait,
        path: &str,
    ) -> Option<DriveItem> {
        let path = normalize_path(path);
        match self.entries.get(&path) {
            Some(CacheEntry::Resolved(item)) => return Some(item.clone()),
            Some(CacheEntry::Tombstone) => return None,
            None => {}
        }

        let mut current = self.resolve_root(client).await?;
        if path.is_empty() {
            return Some(current);
        }
        let mut current_path = String::new();

        for segment in path.split('/') {
            let child_path = join_path(&current_path, segment);

            if !self.entries.contains_key(&child_path) && !self.listed.contains(&current_path) {
                if !current.is_folder() {
                    return None;
                }
                if let Err(e) = self.list_folder(client, &current_path, current.id()).await {
                    warn!("⚠️ Failed to list '{}' while resolving '{}': {:#}", current_path, path, e);
                    return None;
                }
            }

            match self.entries.get(&child_path) {
                Some(CacheEntry::Resolved(item)) => current = item.clone(),
                _ => {
                    debug!("'{}' not found while resolving '{}'", child_path, path);
                    return None;
                }
            }
            current_path = child_path;
        }

        Some(current)
    }

    /// Fetch the children of `dir` and cache them
    pub async fn list_folder(
        &mut self,
        client: &dyn OneDriveClientTrait,
        dir: &str,
        folder_id: &str,
    ) -> Result<Vec<DriveItem>> {
        let children = client.fetch_objects(folder_id).await?;
        self.store_listing(dir, &children);
        Ok(children)
    }

    async fn resolve_root(&mut self, client: &dyn OneDriveClientTrait) -> Option<DriveItem> {
        if let Some(CacheEntry::Resolved(root)) = self.entries.get("") {
            return Some(root.clone());
        }

        match client.fetch_root().await {
            Ok(root) => {
                self.entries
                    .insert(String::new(), CacheEntry::Resolved(root.clone()));
                Some(root)
            }
            Err(e) => {
                warn!("⚠️ Failed to fetch drive root: {:#}", e);
                None
            }
        }
    }

    fn purge_below(&mut self, path: &str) {
        let prefix = format!("{}/", path);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }
}
