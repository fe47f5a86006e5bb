use crate::auth::token_state::{unix_now, TokenResponse, TokenState, TOKEN_URL};
use crate::onedrive_service::http_client::HttpClient;
use crate::onedrive_service::onedrive_models::{
    Drive, DriveItem, DriveItemCollection, ItemUpdate, Quota, UploadOptions,
};
use crate::storage::content_type::DEFAULT_CONTENT_TYPE;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::{Arc, RwLock};

/// Trait defining the remote calls the storage adapter depends on
#[async_trait]
pub trait OneDriveClientTrait: Send + Sync {
    async fn fetch_root(&self) -> Result<DriveItem>;

    /// Children of a folder, in the order the API returns them
    async fn fetch_objects(&self, folder_id: &str) -> Result<Vec<DriveItem>>;

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveItem>;

    /// Create or replace a file named `name` inside `parent_id`
    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<DriveItem>;

    async fn update_object(&self, item_id: &str, update: &ItemUpdate) -> Result<DriveItem>;

    async fn delete_object(&self, item_id: &str) -> Result<()>;

    async fn move_object(&self, item_id: &str, new_parent_id: &str) -> Result<DriveItem>;

    async fn fetch_content(&self, item_id: &str) -> Result<Vec<u8>>;

    async fn fetch_quota(&self) -> Result<Quota>;

    /// Remaining access token lifetime in seconds
    fn token_expire(&self) -> i64;

    async fn renew_access_token(&self, client_secret: &str) -> Result<()>;

    /// Current token state in its serialized form, for the host to persist
    fn serialized_token(&self) -> Result<String>;
}

/// OneDrive API client backed by Microsoft Graph
#[derive(Clone)]
pub struct OneDriveClient {
    http_client: HttpClient,
    client_id: String,
    token_url: String,
    token_state: Arc<RwLock<TokenState>>,
}

impl OneDriveClient {
    pub fn new(client_id: &str, token_state: TokenState) -> Self {
        Self::with_endpoints(client_id, token_state, HttpClient::new(), TOKEN_URL)
    }

    pub fn with_endpoints(
        client_id: &str,
        token_state: TokenState,
        http_client: HttpClient,
        token_url: &str,
    ) -> Self {
        Self {
            http_client,
            client_id: client_id.to_string(),
            token_url: token_url.to_string(),
            token_state: Arc::new(RwLock::new(token_state)),
        }
    }

    fn read_state(&self) -> Result<TokenState> {
        self.token_state
            .read()
            .map(|state| state.clone())
            .map_err(|_| anyhow!("Token state lock poisoned"))
    }

    /// Get authorization header with the current token
    fn auth_header(&self) -> Result<String> {
        let state = self.read_state()?;
        let token = state
            .access_token()
            .ok_or_else(|| anyhow!("No access token available"))?;
        Ok(format!("Bearer {}", token))
    }

    fn build_children_url(folder_id: &str) -> String {
        format!("/me/drive/items/{}/children", urlencoding::encode(folder_id))
    }

    fn build_upload_url(parent_id: &str, file_name: &str) -> String {
        format!(
            "/me/drive/items/{}:/{}:/content?@microsoft.graph.conflictBehavior=replace",
            urlencoding::encode(parent_id),
            urlencoding::encode(file_name)
        )
    }

    fn upload_content_type(options: UploadOptions) -> String {
        options
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }

    fn build_item_url(item_id: &str) -> String {
        format!("/me/drive/items/{}", urlencoding::encode(item_id))
    }

    /// Build create folder request body
    fn build_create_folder_body(folder_name: &str) -> serde_json::Value {
        serde_json::json!({
            "name": folder_name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail"
        })
    }

    /// Build move item request body
    fn build_move_item_body(new_parent_id: &str) -> serde_json::Value {
        serde_json::json!({
            "parentReference": {
                "id": new_parent_id
            }
        })
    }
}

#[async_trait]
impl OneDriveClientTrait for OneDriveClient {
    async fn fetch_root(&self) -> Result<DriveItem> {
        let auth_header = self.auth_header()?;
        self.http_client
            .get("/me/drive/root", &auth_header)
            .await
            .context("Failed to fetch drive root")
    }

    async fn fetch_objects(&self, folder_id: &str) -> Result<Vec<DriveItem>> {
        let auth_header = self.auth_header()?;
        let mut items = Vec::new();
        let mut next = Some(Self::build_children_url(folder_id));

        while let Some(url) = next {
            let page: DriveItemCollection = self
                .http_client
                .get(&url, &auth_header)
                .await
                .with_context(|| format!("Failed to list children of {}", folder_id))?;
            items.extend(page.value);
            next = page.next_link;
        }

        debug!("📂 Listed {} children of {}", items.len(), folder_id);
        Ok(items)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveItem> {
        let auth_header = self.auth_header()?;
        let body = Self::build_create_folder_body(name);
        let item: DriveItem = self
            .http_client
            .post(&Self::build_children_url(parent_id), &body, &auth_header)
            .await
            .context("Failed to create folder")?;

        info!("Created folder: {} in {} -> {}", name, parent_id, item.id);
        Ok(item)
    }

    async fn create_file(
        &self,
        name: &str,
        content: Vec<u8>,
        parent_id: &str,
        options: UploadOptions,
    ) -> Result<DriveItem> {
        let auth_header = self.auth_header()?;
        let content_type = Self::upload_content_type(options);
        let size = content.len();

        let item: DriveItem = self
            .http_client
            .upload_file(
                &Self::build_upload_url(parent_id, name),
                content,
                &content_type,
                &auth_header,
            )
            .await
            .context("Failed to upload file")?;

        info!(
            "Uploaded file: {} ({} bytes, {}) to parent {} -> {}",
            name, size, content_type, parent_id, item.id
        );
        Ok(item)
    }

    async fn update_object(&self, item_id: &str, update: &ItemUpdate) -> Result<DriveItem> {
        let auth_header = self.auth_header()?;
        let item: DriveItem = self
            .http_client
            .patch(&Self::build_item_url(item_id), update, &auth_header)
            .await
            .context("Failed to update item")?;

        debug!("Updated item: {} -> {:?}", item_id, update);
        Ok(item)
    }

    async fn delete_object(&self, item_id: &str) -> Result<()> {
        let auth_header = self.auth_header()?;
        self.http_client
            .delete(&Self::build_item_url(item_id), &auth_header)
            .await
            .context("Failed to delete item")?;

        info!("Deleted item: {}", item_id);
        Ok(())
    }

    async fn move_object(&self, item_id: &str, new_parent_id: &str) -> Result<DriveItem> {
        let auth_header = self.auth_header()?;
        let body = Self::build_move_item_body(new_parent_id);
        let item: DriveItem = self
            .http_client
            .patch(&Self::build_item_url(item_id), &body, &auth_header)
            .await
            .context("Failed to move item")?;

        info!("Moved item: {} to parent: {}", item_id, new_parent_id);
        Ok(item)
    }

    async fn fetch_content(&self, item_id: &str) -> Result<Vec<u8>> {
        let auth_header = self.auth_header()?;
        let url = format!("{}/content", Self::build_item_url(item_id));
        self.http_client
            .get_bytes(&url, &auth_header)
            .await
            .context("Failed to download item content")
    }

    async fn fetch_quota(&self) -> Result<Quota> {
        let auth_header = self.auth_header()?;
        let drive: Drive = self
            .http_client
            .get("/me/drive", &auth_header)
            .await
            .context("Failed to fetch drive quota")?;

        drive
            .quota
            .ok_or_else(|| anyhow!("Drive response carries no quota"))
    }

    fn serialized_token(&self) -> Result<String> {
        self.read_state()?.to_blob()
    }

    fn token_expire(&self) -> i64 {
        match self.token_state.read() {
            Ok(state) => state.token_expire(),
            Err(_) => 0,
        }
    }

    async fn renew_access_token(&self, client_secret: &str) -> Result<()> {
        let params = self
            .read_state()?
            .build_refresh_token_params(&self.client_id, client_secret)?;
        let form: Vec<(&str, String)> = params.into_iter().collect();

        warn!("🔄 Token expired, refreshing...");
        let response: TokenResponse = self
            .http_client
            .post_form(&self.token_url, &form)
            .await
            .context("Token refresh failed")?;

        let mut state = self
            .token_state
            .write()
            .map_err(|_| anyhow!("Token state lock poisoned"))?;
        state.apply_refresh(response, unix_now());
        info!("✅ Access token renewed");
        Ok(())
    }
}
