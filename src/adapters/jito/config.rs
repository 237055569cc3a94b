//! Jito Configuration
//!
//! Block Engine endpoint, tip accounts and confirmation polling settings.

use std::time::Duration;

/// Jito Block Engine endpoints
pub mod endpoints {
    /// Mainnet block engine (Amsterdam)
    pub const MAINNET_AMSTERDAM: &str = "https://amsterdam.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (Frankfurt)
    pub const MAINNET_FRANKFURT: &str = "https://frankfurt.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (New York)
    pub const MAINNET_NY: &str = "https://ny.mainnet.block-engine.jito.wtf";
    /// Mainnet block engine (Tokyo)
    pub const MAINNET_TOKYO: &str = "https://tokyo.mainnet.block-engine.jito.wtf";
    /// Default mainnet endpoint
    pub const MAINNET_DEFAULT: &str = MAINNET_AMSTERDAM;

    /// Bundle JSON-RPC path, shared by `sendBundle` and `getBundleStatuses`
    pub const BUNDLES_PATH: &str = "/api/v1/bundles";
}

/// Jito tip accounts for validator tips
pub mod tip_accounts {
    use rand::Rng;
    use solana_sdk::pubkey::Pubkey;

    /// Official Jito tip accounts (validators rotate through these)
    pub const TIP_ACCOUNTS: &[&str] = &[
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
        "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
    ];

    pub fn defaults() -> Vec<String> {
        TIP_ACCOUNTS.iter().map(|s| s.to_string()).collect()
    }

    /// Uniformly random pick, `None` for an empty set
    pub fn random_tip_account(accounts: &[Pubkey]) -> Option<Pubkey> {
        if accounts.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..accounts.len());
        Some(accounts[idx])
    }
}

/// Jito Block Engine configuration
#[derive(Debug, Clone)]
pub struct JitoConfig {
    /// Block Engine endpoint URL
    pub block_engine_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// How long to poll for confirmation before giving up
    pub confirm_timeout: Duration,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Tip recipients, base58
    pub tip_accounts: Vec<String>,
    /// Optional API token for authenticated requests
    pub api_token: Option<String>,
}

impl Default for JitoConfig {
    fn default() -> Self {
        Self {
            block_engine_url: endpoints::MAINNET_DEFAULT.to_string(),
            timeout: Duration::from_secs(10),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            tip_accounts: tip_accounts::defaults(),
            api_token: None,
        }
    }
}

impl JitoConfig {
    /// Create config for mainnet with specific region
    pub fn mainnet(region: &str) -> Self {
        let url = match region.to_lowercase().as_str() {
            "frankfurt" | "fra" => endpoints::MAINNET_FRANKFURT,
            "newyork" | "ny" => endpoints::MAINNET_NY,
            "tokyo" | "tyo" => endpoints::MAINNET_TOKYO,
            _ => endpoints::MAINNET_AMSTERDAM,
        };

        Self {
            block_engine_url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn bundles_url(&self) -> String {
        format!(
            "{}{}",
            self.block_engine_url.trim_end_matches('/'),
            endpoints::BUNDLES_PATH
        )
    }

    /// Set API token
    pub fn with_api_token(mut self, token: String) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Set confirmation window and poll interval
    pub fn with_polling(mut self, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_tip_accounts(mut self, accounts: Vec<String>) -> Self {
        self.tip_accounts = accounts;
        self
    }
}
