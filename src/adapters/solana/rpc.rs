use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_client::{rpc_client::RpcClient, rpc_request::TokenAccountsFilter};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::ports::execution::{BalancePort, ExecutionError};

#[derive(Debug, Error)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Unexpected account data: {0}")]
    AccountDataError(String),
}

impl From<SolanaClientError> for ExecutionError {
    fn from(err: SolanaClientError) -> Self {
        ExecutionError::BalanceError(err.to_string())
    }
}

/// Total holding of one mint across all of an owner's token accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenHolding {
    /// Raw units
    pub amount: u64,
    pub decimals: u8,
}

impl TokenHolding {
    /// Decimal-adjusted amount
    pub fn ui_amount(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.amount as i128, self.decimals as u32)
    }
}

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
}

impl SolanaClient {
    /// Create a new Solana RPC client
    pub fn new(rpc_url: String) -> Self {
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()));
        Self { client }
    }

    /// Get SOL balance in lamports
    pub async fn get_balance(&self, owner: &Pubkey) -> Result<u64, SolanaClientError> {
        let owner = *owner;

        // Spawn blocking to make sync RPC call async-compatible
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_balance(&owner)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Sum of `mint` held by `owner` across every token account.
    ///
    /// An owner with no account for the mint holds zero.
    pub async fn token_holding(&self, owner: &Pubkey, mint: &str) -> Result<TokenHolding, SolanaClientError> {
        let mint_key = Pubkey::from_str(mint)
            .map_err(|e| SolanaClientError::InvalidPublicKey(format!("{}: {}", mint, e)))?;
        let owner = *owner;
        let mint = mint.to_string();

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let accounts = client
                .get_token_accounts_by_owner(&owner, TokenAccountsFilter::Mint(mint_key))
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?;

            let parsed = accounts
                .iter()
                .map(|acc| {
                    serde_json::to_value(&acc.account.data)
                        .map_err(|e| SolanaClientError::AccountDataError(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            sum_parsed_token_accounts(&parsed, &mint)
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Raw-unit balance of `mint`
    pub async fn token_balance(&self, owner: &Pubkey, mint: &str) -> Result<u64, SolanaClientError> {
        Ok(self.token_holding(owner, mint).await?.amount)
    }

    /// Decimal-adjusted balance of `mint`
    pub async fn token_balance_ui(&self, owner: &Pubkey, mint: &str) -> Result<Decimal, SolanaClientError> {
        Ok(self.token_holding(owner, mint).await?.ui_amount())
    }
}

#[async_trait]
impl BalancePort for SolanaClient {
    async fn token_balance(&self, owner: &Pubkey, mint: &str) -> Result<u64, ExecutionError> {
        Ok(SolanaClient::token_balance(self, owner, mint).await?)
    }
}

/// Sum `jsonParsed` token account payloads for `mint`
fn sum_parsed_token_accounts(
    accounts: &[serde_json::Value],
    mint: &str,
) -> Result<TokenHolding, SolanaClientError> {
    let mut holding = TokenHolding::default();

    for data in accounts {
        let info = data
            .get("parsed")
            .and_then(|p| p.get("info"))
            .ok_or_else(|| SolanaClientError::AccountDataError("token account missing parsed info".into()))?;

        if info.get("mint").and_then(|v| v.as_str()) != Some(mint) {
            continue;
        }

        let token_amount = info
            .get("tokenAmount")
            .ok_or_else(|| SolanaClientError::AccountDataError("token account missing tokenAmount".into()))?;

        let amount: u64 = token_amount
            .get("amount")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SolanaClientError::AccountDataError("tokenAmount missing amount".into()))?
            .parse()
            .map_err(|e| SolanaClientError::AccountDataError(format!("amount: {}", e)))?;

        if let Some(decimals) = token_amount.get("decimals").and_then(|v| v.as_u64()) {
            holding.decimals = decimals as u8;
        }

        holding.amount = holding
            .amount
            .checked_add(amount)
            .ok_or_else(|| SolanaClientError::AccountDataError("token balance overflow".into()))?;
    }

    Ok(holding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const MINT: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    fn account(mint: &str, amount: &str, decimals: u8) -> serde_json::Value {
        json!({
            "program": "spl-token",
            "parsed": {
                "type": "account",
                "info": {
                    "mint": mint,
                    "owner": "Owner1111111111111111111111111111111111111",
                    "tokenAmount": {
                        "amount": amount,
                        "decimals": decimals,
                        "uiAmountString": "0"
                    }
                }
            },
            "space": 165
        })
    }

    #[test]
    fn test_sum_across_accounts() {
        let accounts = vec![account(MINT, "1500000", 6), account(MINT, "500000", 6)];
        let holding = sum_parsed_token_accounts(&accounts, MINT).unwrap();

        assert_eq!(holding.amount, 2_000_000);
        assert_eq!(holding.decimals, 6);
        assert_eq!(holding.ui_amount(), dec!(2.000000));
    }

    #[test]
    fn test_other_mints_ignored() {
        let accounts = vec![account("OtherMint", "999", 9), account(MINT, "42", 0)];
        let holding = sum_parsed_token_accounts(&accounts, MINT).unwrap();
        assert_eq!(holding.amount, 42);
    }

    #[test]
    fn test_no_accounts_is_zero() {
        let holding = sum_parsed_token_accounts(&[], MINT).unwrap();
        assert_eq!(holding.amount, 0);
        assert_eq!(holding.ui_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_binary_payload_rejected() {
        let accounts = vec![json!(["AAAA", "base64"])];
        assert!(matches!(
            sum_parsed_token_accounts(&accounts, MINT),
            Err(SolanaClientError::AccountDataError(_))
        ));
    }

    #[test]
    fn test_invalid_mint_rejected_before_rpc() {
        let client = SolanaClient::new("http://127.0.0.1:1".to_string());
        let result = tokio_test::block_on(client.token_holding(&Pubkey::new_unique(), "not-a-mint"));
        assert!(matches!(result, Err(SolanaClientError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_error_conversion() {
        let err: ExecutionError = SolanaClientError::RpcError("timeout".to_string()).into();
        assert!(matches!(err, ExecutionError::BalanceError(_)));
    }
}
