//! Chrome Web Store API client.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use tracing::debug;

use super::credentials::Secret;
use crate::error::{ReleaseError, Result};

const TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";
const API_BASE: &str = "https://www.googleapis.com";
const API_VERSION_HEADER: &str = "x-goog-api-version";

/// Remote store operations a publish needs
pub trait StoreApi {
    /// Trade a long-lived refresh token for a short-lived access token
    fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &Secret,
        refresh_token: &Secret,
    ) -> Result<Secret>;

    /// Upload a new package for an existing item
    fn upload(&self, access_token: &Secret, zip_path: &Path, extension_id: &str) -> Result<()>;

    /// Publish the most recently uploaded package
    fn publish(&self, access_token: &Secret, extension_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    upload_state: Option<String>,
    #[serde(default)]
    item_error: Vec<ItemError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemError {
    error_code: Option<String>,
    error_detail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    status: Vec<String>,
    #[serde(default)]
    status_detail: Vec<String>,
}

/// Blocking HTTP client for the Chrome Web Store v1.1 API
#[derive(Debug, Clone)]
pub struct ChromeWebStore {
    client: Client,
    token_url: String,
    api_base: String,
}

impl ChromeWebStore {
    /// Creates a client against the public Google endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(TOKEN_URL, API_BASE)
    }

    /// Creates a client against custom endpoints (e.g., a local stub server)
    pub fn with_endpoints(token_url: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ReleaseError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(ChromeWebStore {
            client,
            token_url: token_url.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self, extension_id: &str) -> String {
        format!(
            "{}/upload/chromewebstore/v1.1/items/{}",
            self.api_base, extension_id
        )
    }

    fn publish_url(&self, extension_id: &str) -> String {
        format!(
            "{}/chromewebstore/v1.1/items/{}/publish",
            self.api_base, extension_id
        )
    }
}

fn status_code(response: &Response) -> i32 {
    i32::from(response.status().as_u16())
}

impl StoreApi for ChromeWebStore {
    fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &Secret,
        refresh_token: &Secret,
    ) -> Result<Secret> {
        let command = format!("POST {}", self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret.expose()),
                ("refresh_token", refresh_token.expose()),
                ("grant_type", "refresh_token"),
                ("redirect_uri", "urn:ietf:wg:oauth:2.0:oob"),
            ])
            .send()
            .map_err(|e| ReleaseError::command(&command, 1, e.to_string()))?;

        let code = status_code(&response);
        let body: TokenResponse = response
            .json()
            .map_err(|e| ReleaseError::command(&command, code, e.to_string()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(Secret::new(token)),
            _ => Err(ReleaseError::command(
                &command,
                code,
                format!(
                    "no access token returned: {} {}",
                    body.error.unwrap_or_default(),
                    body.error_description.unwrap_or_default()
                )
                .trim()
                .to_string(),
            )),
        }
    }

    fn upload(&self, access_token: &Secret, zip_path: &Path, extension_id: &str) -> Result<()> {
        let file = File::open(zip_path).map_err(|e| {
            ReleaseError::UploadFailed(format!("cannot open {}: {}", zip_path.display(), e))
        })?;

        let response = self
            .client
            .put(self.upload_url(extension_id))
            .bearer_auth(access_token.expose())
            .header(API_VERSION_HEADER, "2")
            .body(file)
            .send()
            .map_err(|e| ReleaseError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ReleaseError::UploadFailed(format!("{}: {}", status, text)));
        }

        let body: UploadResponse = response
            .json()
            .map_err(|e| ReleaseError::UploadFailed(format!("unreadable response: {}", e)))?;
        debug!(state = ?body.upload_state, "upload response");

        if body.upload_state.as_deref() == Some("FAILURE") {
            let details: Vec<String> = body
                .item_error
                .iter()
                .map(|err| {
                    format!(
                        "{}: {}",
                        err.error_code.as_deref().unwrap_or("UNKNOWN"),
                        err.error_detail.as_deref().unwrap_or("")
                    )
                })
                .collect();
            return Err(ReleaseError::UploadFailed(details.join("; ")));
        }
        Ok(())
    }

    fn publish(&self, access_token: &Secret, extension_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.publish_url(extension_id))
            .bearer_auth(access_token.expose())
            .header(API_VERSION_HEADER, "2")
            .header(CONTENT_LENGTH, "0")
            .send()
            .map_err(|e| ReleaseError::PublishFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(ReleaseError::PublishFailed(format!("{}: {}", status, text)));
        }

        let body: PublishResponse = response
            .json()
            .map_err(|e| ReleaseError::PublishFailed(format!("unreadable response: {}", e)))?;

        let accepted = body.status.is_empty()
            || body
                .status
                .iter()
                .any(|s| s == "OK" || s == "ITEM_PENDING_REVIEW");
        if !accepted {
            return Err(ReleaseError::PublishFailed(format!(
                "{} {}",
                body.status.join(","),
                body.status_detail.join("; ")
            )));
        }
        Ok(())
    }
}
