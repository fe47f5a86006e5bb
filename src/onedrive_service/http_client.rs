use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// HTTP client for Microsoft Graph API operations
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    api_base: String,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_base(GRAPH_API_BASE)
    }

    /// Client talking to a different Graph-compatible endpoint
    pub fn with_base(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Get full URL by prepending the API base if needed
    pub fn get_full_url(&self, url: &str) -> Result<String> {
        if url.starts_with("http") {
            Ok(url.to_string())
        } else {
            Ok(format!("{}{}", self.api_base, url))
        }
    }

    /// Make a GET request with authorization header
    pub async fn get<T>(&self, url: &str, auth_header: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url)?;
        debug!("Getting url: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response")?
            .error_for_status()
            .context("Not a success status")?;

        let response_json = response
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(response_json)
    }

    /// Make a GET request and return the raw body
    pub async fn get_bytes(&self, url: &str, auth_header: &str) -> Result<Vec<u8>> {
        let url = self.get_full_url(url)?;
        debug!("Downloading url: {}", url);

        let bytes = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response for download")?
            .error_for_status()
            .context("Not a success status")?
            .bytes()
            .await
            .context("Failed to read response bytes")?;
        Ok(bytes.to_vec())
    }

    /// Make a POST request with authorization header
    pub async fn post<T, B>(&self, url: &str, body: &B, auth_header: &str) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.get_full_url(url)?;
        let response = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to get response for post")?
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(response)
    }

    /// Make a PATCH request with authorization header
    pub async fn patch<T, B>(&self, url: &str, body: &B, auth_header: &str) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.get_full_url(url)?;
        let response = self
            .client
            .patch(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to get response for patch")?
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(response)
    }

    /// Make a DELETE request with authorization header
    pub async fn delete(&self, url: &str, auth_header: &str) -> Result<()> {
        let url = self.get_full_url(url)?;
        self.client
            .delete(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response for delete")?
            .error_for_status()
            .context("Not a success status")?;
        Ok(())
    }

    /// Upload file content with authorization header
    pub async fn upload_file<T>(
        &self,
        url: &str,
        file_data: Vec<u8>,
        content_type: &str,
        auth_header: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url)?;
        let response = self
            .client
            .put(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", content_type)
            .body(file_data)
            .send()
            .await
            .context("Failed to get response for upload")?
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize upload response")?;
        Ok(response)
    }

    /// POST a form to an absolute URL, no authorization header
    pub async fn post_form<T>(&self, url: &str, form: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .context("Failed to send form request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Form request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json::<T>()
            .await
            .context("Failed to deserialize form response")
    }
}
