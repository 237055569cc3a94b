//! Jupiter API Client
//!
//! HTTP client for the Jupiter DEX aggregator swap API.
//! Handles quote fetching and swap transaction building.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};

use super::quote::{QuoteRequest, QuoteResponse};
use super::swap::{SwapRequest, SwapResponse};
use crate::ports::execution::{ExecutionError, SwapPort, SwapQuote, SwapQuoteRequest};

/// Jupiter API client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    /// Base URL for Jupiter API
    pub api_base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Number of retry attempts
    pub max_retries: u32,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Jupiter DEX aggregator client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

impl JupiterClient {
    /// Create a new Jupiter client with default configuration
    pub fn new() -> Result<Self, ExecutionError> {
        Self::with_config(JupiterConfig::default())
    }

    /// Create a new Jupiter client with custom configuration
    pub fn with_config(config: JupiterConfig) -> Result<Self, ExecutionError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExecutionError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Get a quote, returned typed and as the raw JSON `/swap` expects
    pub async fn get_quote(
        &self,
        request: &QuoteRequest,
    ) -> Result<(QuoteResponse, serde_json::Value), ExecutionError> {
        let url = format!("{}/quote", self.config.api_base_url);

        let mut req = self.http.get(&url).query(&request.query_params());
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self.execute_with_retry(|| async {
            req.try_clone()
                .ok_or_else(|| ExecutionError::ApiError("Failed to clone request".into()))?
                .send()
                .await
                .map_err(|e| ExecutionError::ApiError(e.to_string()))
        }).await?;

        let raw: serde_json::Value = self.handle_response(response).await?;
        let quote: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ExecutionError::ApiError(format!("Failed to parse quote: {}", e)))?;
        Ok((quote, raw))
    }

    /// Build and get swap transaction
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, ExecutionError> {
        let url = format!("{}/swap", self.config.api_base_url);

        let mut req = self.http.post(&url).json(request);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self.execute_with_retry(|| async {
            req.try_clone()
                .ok_or_else(|| ExecutionError::ApiError("Failed to clone request".into()))?
                .send()
                .await
                .map_err(|e| ExecutionError::ApiError(e.to_string()))
        }).await?;

        self.handle_response(response).await
    }

    /// Execute request with retry logic and rate limit handling
    async fn execute_with_retry<F, Fut>(&self, request_fn: F) -> Result<reqwest::Response, ExecutionError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ExecutionError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match request_fn().await {
                Ok(response) => {
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1)); // 2s, 4s, 8s
                        tracing::warn!(
                            "Rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff, attempt + 1, self.config.max_retries
                        );
                        last_error = Some(ExecutionError::ApiError("Rate limit exceeded".into()));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if response.status().is_server_error() {
                        last_error = Some(ExecutionError::ApiError(
                            format!("Server error: {}", response.status())
                        ));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExecutionError::ApiError("Max retries exceeded".into())))
    }

    /// Handle API response and deserialize
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ExecutionError> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if error_text.contains("SlippageToleranceExceeded") || error_text.contains("6001") {
                return Err(ExecutionError::SlippageExceeded);
            }

            return Err(ExecutionError::ApiError(format!(
                "API error {}: {}",
                status,
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExecutionError::ApiError(format!("Failed to parse response: {}", e)))
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }
}

#[async_trait]
impl SwapPort for JupiterClient {
    async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, ExecutionError> {
        let quote_request = QuoteRequest::new(
            request.input_mint.clone(),
            request.output_mint.clone(),
            request.amount,
            request.slippage_bps,
        );

        let (quote, raw) = self.get_quote(&quote_request).await?;
        to_swap_quote(quote, raw)
    }

    async fn build_swap_transaction(
        &self,
        quote: &SwapQuote,
        user_public_key: &Pubkey,
    ) -> Result<VersionedTransaction, ExecutionError> {
        let swap_request = SwapRequest::new(user_public_key.to_string(), quote.raw.clone());
        let swap = self.get_swap_transaction(&swap_request).await?;

        tracing::debug!(
            last_valid_block_height = swap.last_valid_block_height,
            prioritization_fee_lamports = swap.prioritization_fee_lamports,
            "Swap transaction built"
        );

        swap.transaction().map_err(ExecutionError::InvalidTransaction)
    }
}

fn to_swap_quote(quote: QuoteResponse, raw: serde_json::Value) -> Result<SwapQuote, ExecutionError> {
    let in_amount = quote
        .input_amount()
        .ok_or_else(|| ExecutionError::ApiError(format!("Invalid inAmount: {}", quote.in_amount)))?;
    let out_amount = quote
        .output_amount()
        .ok_or_else(|| ExecutionError::ApiError(format!("Invalid outAmount: {}", quote.out_amount)))?;

    tracing::debug!(
        input_mint = %quote.input_mint,
        output_mint = %quote.output_mint,
        in_amount,
        out_amount,
        route = ?quote.route_labels(),
        "Quote received"
    );

    Ok(SwapQuote {
        input_mint: quote.input_mint,
        output_mint: quote.output_mint,
        in_amount,
        out_amount,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jupiter_config_default() {
        let config = JupiterConfig::default();
        assert_eq!(config.api_base_url, "https://api.jup.ag/swap/v1");
        assert!(config.api_key.is_none());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_jupiter_client_creation() {
        let config = JupiterConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let client = JupiterClient::with_config(config).unwrap();
        assert_eq!(client.api_base_url(), "https://api.jup.ag/swap/v1");
    }

    #[test]
    fn test_to_swap_quote_keeps_raw_payload() {
        let raw = serde_json::json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "MintA",
            "inAmount": "1000000000",
            "outAmount": "5000000",
            "contextSlot": 7
        });
        let quote: QuoteResponse = serde_json::from_value(raw.clone()).unwrap();

        let swap_quote = to_swap_quote(quote, raw.clone()).unwrap();
        assert_eq!(swap_quote.in_amount, 1_000_000_000);
        assert_eq!(swap_quote.out_amount, 5_000_000);
        assert_eq!(swap_quote.raw, raw);
    }

    #[test]
    fn test_to_swap_quote_rejects_bad_amount() {
        let raw = serde_json::json!({
            "inputMint": "a",
            "outputMint": "b",
            "inAmount": "1",
            "outAmount": ""
        });
        let quote: QuoteResponse = serde_json::from_value(raw.clone()).unwrap();

        assert!(matches!(to_swap_quote(quote, raw), Err(ExecutionError::ApiError(_))));
    }
}
