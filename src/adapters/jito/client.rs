//! Jito Bundle Client
//!
//! HTTP client for the Jito Block Engine JSON-RPC API: bundle submission
//! and status lookups.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::config::JitoConfig;
use super::error::JitoError;
use super::types::{BundleRequest, BundleStatusEntry, GetBundleStatusesResponse, JsonRpcResponse};

/// Maximum transactions the block engine accepts in one bundle
pub const MAX_BUNDLE_SIZE: usize = 5;

/// Relay operations the bundle submitter depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Submit encoded transactions, returning the bundle id
    async fn send_bundle(&self, transactions: Vec<String>) -> Result<String, JitoError>;

    async fn get_bundle_statuses(
        &self,
        bundle_ids: Vec<String>,
    ) -> Result<Vec<Option<BundleStatusEntry>>, JitoError>;
}

/// Jito Block Engine client for bundle submission
#[derive(Debug, Clone)]
pub struct JitoBundleClient {
    /// Client configuration
    config: JitoConfig,
    /// HTTP client
    http: Client,
}

impl JitoBundleClient {
    /// Create a new Jito client with default configuration
    pub fn new() -> Result<Self, JitoError> {
        Self::with_config(JitoConfig::default())
    }

    /// Create a new Jito client with custom configuration
    pub fn with_config(config: JitoConfig) -> Result<Self, JitoError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JitoError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &JitoConfig {
        &self.config
    }

    /// Get the configured block engine URL
    pub fn block_engine_url(&self) -> &str {
        &self.config.block_engine_url
    }

    async fn call<T: DeserializeOwned>(&self, request: &BundleRequest) -> Result<T, JitoError> {
        let mut req_builder = self
            .http
            .post(self.config.bundles_url())
            .header("Content-Type", "application/json")
            .json(request);

        // Add API token if configured
        if let Some(ref token) = self.config.api_token {
            req_builder = req_builder.header("x-jito-auth", token);
        }

        let response = req_builder.send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(JitoError::RateLimited);
        }

        let response_text = response.text().await?;

        let rpc_response: JsonRpcResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            JitoError::SerializationError(format!(
                "HTTP {} with unparseable body ({}): {}",
                status, e, response_text
            ))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(JitoError::ApiError {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or_else(|| JitoError::ApiError {
            code: -1,
            message: format!("No result in {} response", request.method),
        })
    }
}

#[async_trait]
impl BundleRelay for JitoBundleClient {
    async fn send_bundle(&self, transactions: Vec<String>) -> Result<String, JitoError> {
        if transactions.is_empty() {
            return Err(JitoError::InvalidBundle("Bundle cannot be empty".into()));
        }

        if transactions.len() > MAX_BUNDLE_SIZE {
            return Err(JitoError::InvalidBundle(format!(
                "Bundle cannot contain more than {} transactions",
                MAX_BUNDLE_SIZE
            )));
        }

        self.call(&BundleRequest::send_bundle(transactions)).await
    }

    async fn get_bundle_statuses(
        &self,
        bundle_ids: Vec<String>,
    ) -> Result<Vec<Option<BundleStatusEntry>>, JitoError> {
        let response: GetBundleStatusesResponse = self
            .call(&BundleRequest::get_bundle_statuses(bundle_ids))
            .await
            .map_err(|e| match e {
                JitoError::ApiError { message, .. } => JitoError::StatusCheckFailed(message),
                other => other,
            })?;

        Ok(response.value)
    }
}
