use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Microsoft OAuth token URL
pub const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// Token response from Microsoft OAuth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A token together with the moment it was obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObtainedToken {
    /// Unix timestamp (seconds) of the token exchange
    pub obtained: i64,
    pub data: TokenResponse,
}

/// Serialized client state stored by the host alongside the mount.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<ObtainedToken>,
}

impl TokenState {
    /// Decode the opaque token blob
    pub fn from_blob(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).context("Failed to parse token state")
    }

    /// Encode back into the blob format
    pub fn to_blob(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize token state")
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.data.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .and_then(|t| t.data.refresh_token.as_deref())
    }

    /// Seconds of access token lifetime left at `now`. Zero without a token.
    pub fn expires_in_at(&self, now: i64) -> i64 {
        match &self.token {
            Some(token) => token.obtained + token.data.expires_in - now,
            None => 0,
        }
    }

    /// Seconds of access token lifetime left
    pub fn token_expire(&self) -> i64 {
        self.expires_in_at(unix_now())
    }

    /// Replace the token with a freshly exchanged one. A response without a
    /// refresh token keeps the previous refresh token.
    pub fn apply_refresh(&mut self, mut response: TokenResponse, obtained: i64) {
        if response.refresh_token.is_none() {
            response.refresh_token = self.refresh_token().map(str::to_string);
        }
        self.token = Some(ObtainedToken {
            obtained,
            data: response,
        });
    }

    /// Build parameters for token refresh
    pub fn build_refresh_token_params(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<HashMap<&'static str, String>> {
        let refresh_token = self
            .refresh_token()
            .ok_or_else(|| anyhow!("No refresh token available"))?;

        let mut params = HashMap::new();
        params.insert("client_id", client_id.to_string());
        params.insert("client_secret", client_secret.to_string());
        params.insert("refresh_token", refresh_token.to_string());
        params.insert("grant_type", "refresh_token".to_string());
        if let Some(redirect_uri) = &self.redirect_uri {
            params.insert("redirect_uri", redirect_uri.clone());
        }
        Ok(params)
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
