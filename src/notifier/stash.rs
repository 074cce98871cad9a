//! Stash GraphQL client that triggers a `metadataScan`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

use super::{Notifier, NotifyError};
use crate::config::{ApiConfig, ScanOptions};

/// Header Stash reads API keys from.
const API_KEY_HEADER: &str = "ApiKey";

/// Build the JSON body of the scan mutation.
pub fn scan_request_body(scan: &ScanOptions) -> String {
    let mutation = format!(
        "mutation {{ metadataScan (input: {{ \
         rescan: {}, \
         scanGenerateClipPreviews: {}, \
         scanGenerateCovers: {}, \
         scanGenerateImagePreviews: {}, \
         scanGeneratePhashes: {}, \
         scanGeneratePreviews: {}, \
         scanGenerateSprites: {}, \
         scanGenerateThumbnails: {} \
         }})}}",
        scan.rescan,
        scan.generate_clip_previews,
        scan.generate_covers,
        scan.generate_image_previews,
        scan.generate_phashes,
        scan.generate_previews,
        scan.generate_sprites,
        scan.generate_thumbnails,
    );

    serde_json::json!({ "query": mutation }).to_string()
}

/// [`Notifier`] that POSTs the scan mutation to a Stash endpoint.
pub struct StashClient {
    client: reqwest::Client,
    endpoint: String,
    /// Sent only when authentication is enabled.
    api_key: Option<String>,
    /// Pre-rendered request body; the scan options never change at runtime.
    body: String,
}

impl StashClient {
    /// Create a client for `endpoint`.
    ///
    /// `api.api_key` is attached only when `api.use_auth` is set.
    pub fn new(
        endpoint: impl Into<String>,
        api: &ApiConfig,
        scan: &ScanOptions,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .pool_max_idle_per_host(api.max_idle_connections)
            .build()
            .map_err(NotifyError::ClientBuild)?;

        let body = scan_request_body(scan);
        crate::debug_event!("notifier", "scan request body", "{body}");

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api.use_auth.then(|| api.api_key.clone()).flatten(),
            body,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for StashClient {
    async fn trigger_scan(&self) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(self.body.clone());

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        // Drain the body so the connection can go back to the pool
        let _ = response.bytes().await;

        if !status.is_success() {
            return Err(NotifyError::Status { status });
        }

        crate::debug_event!("notifier", "scan requested", "{status}");
        Ok(())
    }
}

impl std::fmt::Debug for StashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashClient")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}
