use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("Transaction signing failed: {0}")]
    SigningError(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Slippage tolerance exceeded")]
    SlippageExceeded,
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Balance query failed: {0}")]
    BalanceError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16, // basis points (1 = 0.01%)
}

impl SwapQuoteRequest {
    pub fn new(
        input_mint: impl Into<String>,
        output_mint: impl Into<String>,
        amount: u64,
        slippage_bps: u16,
    ) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            slippage_bps,
        }
    }
}

/// A priced route, kept verbatim so it can be handed back for building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    /// Full quote payload as returned by the aggregator
    pub raw: serde_json::Value,
}

/// Swap quote/build service.
///
/// `build_swap_transaction` returns an unsigned transaction; callers sign
/// it with their own wallet before submission.
#[async_trait]
pub trait SwapPort: Send + Sync {
    async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, ExecutionError>;

    async fn build_swap_transaction(
        &self,
        quote: &SwapQuote,
        user_public_key: &Pubkey,
    ) -> Result<VersionedTransaction, ExecutionError>;
}

/// Token balance lookups against the chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalancePort: Send + Sync {
    /// Balance of `mint` held by `owner`, in raw units
    async fn token_balance(&self, owner: &Pubkey, mint: &str) -> Result<u64, ExecutionError>;
}
