use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use onedrive_storage::auth::token_state::{unix_now, TokenResponse, TokenState};
use onedrive_storage::onedrive_service::onedrive_client::OneDriveClientTrait;
use onedrive_storage::onedrive_service::onedrive_models::{
    DriveItem, FileFacet, FolderFacet, ItemUpdate, ParentReference, Quota, UploadOptions,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ROOT_ID: &str = "root";

/// In-memory drive the mock serves
#[derive(Debug, Clone)]
pub struct MockDrive {
    pub items: HashMap<String, DriveItem>,
    pub contents: HashMap<String, Vec<u8>>,
    /// Creation order, listings follow it
    pub order: Vec<String>,
    pub quota: Quota,
    pub token_expire: i64,
    pub token_state: TokenState,
    pub last_content_type: Option<String>,
    pub should_fail_operations: Vec<String>, // List of operation names that should fail
    next_id: u64,
}

impl Default for MockDrive {
    fn default() -> Self {
        let root = DriveItem {
            id: ROOT_ID.to_string(),
            name: Some("root".to_string()),
            last_modified: Some("2024-01-01T00:00:00Z".to_string()),
            created_date: Some("2024-01-01T00:00:00Z".to_string()),
            folder: Some(FolderFacet { child_count: 0 }),
            ..Default::default()
        };
        let mut items = HashMap::new();
        items.insert(ROOT_ID.to_string(), root);

        Self {
            items,
            contents: HashMap::new(),
            order: vec![ROOT_ID.to_string()],
            quota: Quota {
                total: Some(5_000_000),
                used: Some(1_000_000),
                remaining: Some(4_000_000),
                deleted: Some(0),
                state: Some("normal".to_string()),
            },
            token_expire: 3600,
            token_state: TokenState::default(),
            last_content_type: None,
            should_fail_operations: vec![],
            next_id: 0,
        }
    }
}

impl MockDrive {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("item_{}", self.next_id)
    }

    fn child_named(&self, parent_id: &str, name: &str) -> Option<DriveItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .find(|item| item.parent_id() == Some(parent_id) && item.name() == name)
            .cloned()
    }

    fn insert(&mut self, item: DriveItem, content: Option<Vec<u8>>) -> DriveItem {
        let id = item.id.clone();
        if let Some(content) = content {
            self.contents.insert(id.clone(), content);
        }
        if !self.order.contains(&id) {
            self.order.push(id.clone());
        }
        self.items.insert(id, item.clone());
        item
    }

    fn new_item(&mut self, name: &str, parent_id: &str, is_folder: bool, size: u64) -> DriveItem {
        let now = Utc::now().to_rfc3339();
        DriveItem {
            id: self.allocate_id(),
            name: Some(name.to_string()),
            last_modified: Some(now.clone()),
            created_date: Some(now),
            size: Some(size),
            folder: is_folder.then(|| FolderFacet { child_count: 0 }),
            file: (!is_folder).then(|| FileFacet {
                mime_type: Some("application/octet-stream".to_string()),
            }),
            parent_reference: Some(ParentReference {
                id: parent_id.to_string(),
                path: None,
            }),
        }
    }

    fn remove_subtree(&mut self, item_id: &str) {
        let children: Vec<String> = self
            .items
            .values()
            .filter(|item| item.parent_id() == Some(item_id))
            .map(|item| item.id.clone())
            .collect();
        for child in children {
            self.remove_subtree(&child);
        }
        self.items.remove(item_id);
        self.contents.remove(item_id);
        self.order.retain(|id| id != item_id);
    }
}

/// Mock implementation of OneDriveClientTrait for testing
#[derive(Clone)]
pub struct MockOneDriveClient {
    drive: Arc<Mutex<MockDrive>>,
    call_counter: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockOneDriveClient {
    pub fn new() -> Self {
        Self {
            drive: Arc::new(Mutex::new(MockDrive::default())),
            call_counter: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a folder below `parent_id` and return its id
    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        let mut drive = self.drive.lock().unwrap();
        let item = drive.new_item(name, parent_id, true, 0);
        drive.insert(item, None).id
    }

    /// Add a file below `parent_id` and return its id
    pub fn add_file(&self, parent_id: &str, name: &str, content: &[u8]) -> String {
        let mut drive = self.drive.lock().unwrap();
        let item = drive.new_item(name, parent_id, false, content.len() as u64);
        drive.insert(item, Some(content.to_vec())).id
    }

    /// Remove an item behind the adapter's back
    pub fn remove_remote(&self, item_id: &str) {
        self.drive.lock().unwrap().remove_subtree(item_id);
    }

    pub fn item(&self, item_id: &str) -> Option<DriveItem> {
        self.drive.lock().unwrap().items.get(item_id).cloned()
    }

    pub fn content(&self, item_id: &str) -> Option<Vec<u8>> {
        self.drive.lock().unwrap().contents.get(item_id).cloned()
    }

    /// Walk `path` by name from the root
    pub fn find_by_path(&self, path: &str) -> Option<DriveItem> {
        let drive = self.drive.lock().unwrap();
        let mut current = drive.items.get(ROOT_ID).cloned()?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = drive.child_named(&current.id, segment)?;
        }
        Some(current)
    }

    pub fn children_names(&self, parent_id: &str) -> Vec<String> {
        let drive = self.drive.lock().unwrap();
        drive
            .order
            .iter()
            .filter_map(|id| drive.items.get(id))
            .filter(|item| item.parent_id() == Some(parent_id))
            .map(|item| item.name().to_string())
            .collect()
    }

    pub fn set_quota(&self, quota: Quota) {
        self.drive.lock().unwrap().quota = quota;
    }

    pub fn set_token_expire(&self, seconds: i64) {
        self.drive.lock().unwrap().token_expire = seconds;
    }

    pub fn set_token_state(&self, state: TokenState) {
        self.drive.lock().unwrap().token_state = state;
    }

    pub fn last_content_type(&self) -> Option<String> {
        self.drive.lock().unwrap().last_content_type.clone()
    }

    /// Make specific operations fail
    pub fn make_operation_fail(&self, operation: &str) {
        let mut drive = self.drive.lock().unwrap();
        if !drive.should_fail_operations.contains(&operation.to_string()) {
            drive.should_fail_operations.push(operation.to_string());
        }
    }

    /// Make all operations succeed (clear failure list)
    pub fn clear_operation_failures(&self) {
        self.drive.lock().unwrap().should_fail_operations.clear();
    }

    /// Get call count for a specific operation
    pub fn get_call_count(&self, operation: &str) -> usize {
        let counter = self.call_counter.lock().unwrap();
        counter.get(operation).copied().unwrap_or(0)
    }

    /// Reset call counters
    pub fn reset_call_counters(&self) {
        self.call_counter.lock().unwrap().clear();
    }

    /// Internal helper to increment call counter and check if operation should fail
    fn should_fail_operation(&self, operation: &str) -> bool {
        {
            let mut counter = self.call_counter.lock().unwrap();
            *counter.entry(operation.to_string()).or_insert(0) += 1;
        }

        let drive = self.drive.lock().unwrap();
        drive.should_fail_operations.contains(&operation.to_string())
    }
}

#[async_trait]
impl OneDriveClientTrait for MockOneDriveClient {
    async fn fetch_root(&self) -> Result<DriveItem> {
        if self.should_fail_operation("fetch_root") {
            return Err(anyhow!("Mock fetch root failure"));
        }
        let drive = self.drive.lock().unwrap();
        drive
            .items
            .get(ROOT_ID)
            .cloned()
            .ok_or_else(|| anyhow!("Mock drive has no root"))
    }

    async fn fetch_objects(&self, folder_id: &str) -> Result<Vec<DriveItem>> {
        if self.should_fail_operation("fetch_objects") {
            return Err(anyhow!("Mock listing failure"));
        }
        let drive = self.drive.lock().unwrap();
        match drive.items.get(folder_id) {
            Some(folder) if folder.is_folder() => {}
            _ => return Err(anyhow!("itemNotFound: {}", folder_id)),
        }
        Ok(drive
            .order
            .iter()
            .filter_map(|id| drive.items.get(id))
            .filter(|item| item.parent_id() == Some(folder_id))
            .cloned()
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveItem> {
        if self.should_fail_operation("create_folder") {
            return Err(anyhow!("Mock create folder failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        if drive.child_named(parent_id, name).is_some() {
            return Err(anyhow!("nameAlreadyExists: {}", name));
        }
        let item = drive.new_item(name, parent_id, true, 0);
        Ok(drive.insert(item, None))
    }

    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<DriveItem> {
        if self.should_fail_operation("create_file") {
            return Err(anyhow!("Mock upload failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        if !drive.items.contains_key(parent_id) {
            return Err(anyhow!("itemNotFound: {}", parent_id));
        }
        drive.last_content_type = options.content_type;

        let item = match drive.child_named(parent_id, name) {
            Some(mut existing) => {
                existing.size = Some(content.len() as u64);
                existing.last_modified = Some(Utc::now().to_rfc3339());
                existing
            }
            None => drive.new_item(name, parent_id, false, content.len() as u64),
        };
        Ok(drive.insert(item, Some(content)))
    }

    async fn update_object(&self, item_id: &str, update: &ItemUpdate) -> Result<DriveItem> {
        if self.should_fail_operation("update_object") {
            return Err(anyhow!("Mock update failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        let item = drive
            .items
            .get_mut(item_id)
            .ok_or_else(|| anyhow!("itemNotFound: {}", item_id))?;
        if let Some(name) = &update.name {
            item.name = Some(name.clone());
        }
        item.last_modified = Some(Utc::now().to_rfc3339());
        Ok(item.clone())
    }

    async fn delete_object(&self, item_id: &str) -> Result<()> {
        if self.should_fail_operation("delete_object") {
            return Err(anyhow!("Mock delete failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        if !drive.items.contains_key(item_id) {
            return Err(anyhow!("itemNotFound: {}", item_id));
        }
        drive.remove_subtree(item_id);
        Ok(())
    }

    async fn move_object(&self, item_id: &str, new_parent_id: &str) -> Result<DriveItem> {
        if self.should_fail_operation("move_object") {
            return Err(anyhow!("Mock move failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        if !drive.items.contains_key(new_parent_id) {
            return Err(anyhow!("itemNotFound: {}", new_parent_id));
        }
        let item = drive
            .items
            .get_mut(item_id)
            .ok_or_else(|| anyhow!("itemNotFound: {}", item_id))?;
        item.parent_reference = Some(ParentReference {
            id: new_parent_id.to_string(),
            path: None,
        });
        Ok(item.clone())
    }

    async fn fetch_content(&self, item_id: &str) -> Result<Vec<u8>> {
        if self.should_fail_operation("fetch_content") {
            return Err(anyhow!("Mock download failure"));
        }
        let drive = self.drive.lock().unwrap();
        drive
            .contents
            .get(item_id)
            .cloned()
            .ok_or_else(|| anyhow!("itemNotFound: {}", item_id))
    }

    async fn fetch_quota(&self) -> Result<Quota> {
        if self.should_fail_operation("fetch_quota") {
            return Err(anyhow!("Mock quota failure"));
        }
        Ok(self.drive.lock().unwrap().quota.clone())
    }

    fn token_expire(&self) -> i64 {
        self.drive.lock().unwrap().token_expire
    }

    async fn renew_access_token(&self, _client_secret: &str) -> Result<()> {
        if self.should_fail_operation("renew_access_token") {
            return Err(anyhow!("Mock token refresh failure"));
        }
        let mut drive = self.drive.lock().unwrap();
        drive.token_state.apply_refresh(
            TokenResponse {
                token_type: "Bearer".to_string(),
                access_token: "renewed".to_string(),
                refresh_token: Some("rotated".to_string()),
                expires_in: 3600,
                scope: None,
            },
            unix_now(),
        );
        drive.token_expire = 3600;
        Ok(())
    }

    fn serialized_token(&self) -> Result<String> {
        self.drive.lock().unwrap().token_state.to_blob()
    }
}
