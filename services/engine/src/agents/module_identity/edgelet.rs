//! Edge Security Daemon Identity Client
//!
//! Talks to the identity endpoints of the daemon's management API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::store::IdentityStore;
use super::types::Identity;

pub const DEFAULT_API_VERSION: &str = "2018-06-28";

#[derive(Debug, Deserialize)]
struct IdentityList {
    #[serde(default)]
    identities: Vec<Identity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentitySpec<'a> {
    module_id: &'a str,
    managed_by: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// HTTP identity store backed by the edge security daemon
pub struct EdgeletIdentityClient {
    http_client: Client,
    base_url: String,
    api_version: String,
}

impl EdgeletIdentityClient {
    /// Create a client for the management API at `base_url`
    pub fn new(base_url: &str, api_version: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    fn identities_url(&self) -> String {
        format!("{}/identities/?api-version={}", self.base_url, self.api_version)
    }

    fn identity_url(&self, module_id: &str) -> String {
        format!(
            "{}/identities/{}?api-version={}",
            self.base_url,
            urlencoding::encode(module_id),
            self.api_version
        )
    }
}

/// Turn a non-success response into an error carrying the daemon's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    anyhow::bail!("Management API error {}: {}", status, message)
}

#[async_trait]
impl IdentityStore for EdgeletIdentityClient {
    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let response = self
            .http_client
            .get(self.identities_url())
            .send()
            .await
            .context("Failed to call management API")?;

        let list: IdentityList = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse identity list")?;

        debug!(count = list.identities.len(), "Listed identities");
        Ok(list.identities)
    }

    async fn create_identity(&self, module_id: &str, managed_by: &str) -> Result<Identity> {
        let spec = IdentitySpec { module_id, managed_by };

        let response = self
            .http_client
            .post(self.identities_url())
            .json(&spec)
            .send()
            .await
            .with_context(|| format!("Failed to create identity {}", module_id))?;

        let identity: Identity = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse created identity")?;

        debug!(module_id = %identity.module_id, "Created identity");
        Ok(identity)
    }

    async fn remove_identity(&self, module_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.identity_url(module_id))
            .send()
            .await
            .with_context(|| format!("Failed to remove identity {}", module_id))?;

        check_status(response).await?;

        debug!(module_id = %module_id, "Removed identity");
        Ok(())
    }
}
