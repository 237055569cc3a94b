//! Configuration Loader
//!
//! Loads and validates the bot configuration from a TOML file. Secrets and
//! endpoints can be overridden from the environment (`.env` is loaded by
//! the binary before any getter runs).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::jito::{tip_accounts, JitoConfig};
use crate::adapters::jupiter::JupiterConfig;
use crate::domain::{SignalMarkers, StopLossPolicy, TakeProfitLadder};
use crate::ports::source::ChannelAllowList;

const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trading: TradingSection,
    #[serde(default)]
    pub signals: SignalMarkers,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub jupiter: JupiterSection,
    #[serde(default)]
    pub jito: JitoSection,
    pub solana: SolanaSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Trade sizing, ladder and stop-loss
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSection {
    /// SOL spent per buy
    pub buy_amount_sol: Decimal,
    /// SOL tipped to the relay with every bundle
    pub priority_fee_sol: Decimal,
    /// Slippage tolerance in basis points (5000 = 50%)
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    /// Floor before the first take-profit, as a fraction of the entry
    pub stop_loss_multiplier: Decimal,
    /// Percent of the held balance sold at each take-profit, in order
    #[serde(default = "default_take_profit_percentages")]
    pub take_profit_percentages: Vec<u8>,
    /// Pause between positions in a stop-loss scan
    #[serde(default = "default_monitor_pacing_ms")]
    pub monitor_pacing_ms: u64,
}

fn default_slippage_bps() -> u16 {
    5000
}

fn default_take_profit_percentages() -> Vec<u8> {
    vec![25, 33, 50, 100]
}

fn default_monitor_pacing_ms() -> u64 {
    1000
}

impl TradingSection {
    pub fn buy_lamports(&self) -> Result<u64, ConfigError> {
        sol_to_lamports(self.buy_amount_sol, "buy_amount_sol")
    }

    pub fn priority_fee_lamports(&self) -> Result<u64, ConfigError> {
        sol_to_lamports(self.priority_fee_sol, "priority_fee_sol")
    }

    pub fn ladder(&self) -> Result<TakeProfitLadder, ConfigError> {
        TakeProfitLadder::new(self.take_profit_percentages.clone())
            .map_err(|e| ConfigError::ValidationError(format!("take_profit_percentages: {}", e)))
    }

    pub fn stop_loss_policy(&self) -> StopLossPolicy {
        StopLossPolicy::new(self.stop_loss_multiplier)
    }

    pub fn monitor_pacing(&self) -> Duration {
        Duration::from_millis(self.monitor_pacing_ms)
    }
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    #[serde(default)]
    pub bot_token: String,
    /// Channels whose posts are traded on
    #[serde(default)]
    pub channels: Vec<i64>,
    /// Long-poll timeout for getUpdates
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
}

fn default_poll_timeout_secs() -> u32 {
    30
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channels: Vec::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl TelegramSection {
    /// Checks TELEGRAM_BOT_TOKEN env var first, falls back to config value
    pub fn get_bot_token(&self) -> Option<String> {
        env_or("TELEGRAM_BOT_TOKEN", &self.bot_token)
    }

    pub fn allow_list(&self) -> ChannelAllowList {
        ChannelAllowList::new(self.channels.iter().copied())
    }
}

/// Jupiter API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct JupiterSection {
    #[serde(default = "default_jupiter_url")]
    pub api_url: String,
    /// Optional API key for higher rate limits
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_jupiter_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_jupiter_retries")]
    pub max_retries: u32,
}

fn default_jupiter_url() -> String {
    JupiterConfig::default().api_base_url
}

fn default_jupiter_timeout_secs() -> u64 {
    30
}

fn default_jupiter_retries() -> u32 {
    3
}

impl Default for JupiterSection {
    fn default() -> Self {
        Self {
            api_url: default_jupiter_url(),
            api_key: None,
            timeout_secs: default_jupiter_timeout_secs(),
            max_retries: default_jupiter_retries(),
        }
    }
}

impl JupiterSection {
    /// Checks JUPITER_API_KEY env var first, falls back to config value
    pub fn get_api_key(&self) -> Option<String> {
        env_or("JUPITER_API_KEY", self.api_key.as_deref().unwrap_or_default())
    }

    pub fn client_config(&self) -> JupiterConfig {
        JupiterConfig {
            api_base_url: self.api_url.clone(),
            api_key: self.get_api_key(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

/// Jito block engine configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct JitoSection {
    #[serde(default = "default_block_engine_url")]
    pub block_engine_url: String,
    /// Tip recipients, one is picked at random per bundle
    #[serde(default = "tip_accounts::defaults")]
    pub tip_accounts: Vec<String>,
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_block_engine_url() -> String {
    JitoConfig::default().block_engine_url
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for JitoSection {
    fn default() -> Self {
        Self {
            block_engine_url: default_block_engine_url(),
            tip_accounts: tip_accounts::defaults(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            api_token: None,
        }
    }
}

impl JitoSection {
    /// Checks JITO_API_TOKEN env var first, falls back to config value
    pub fn get_api_token(&self) -> Option<String> {
        env_or("JITO_API_TOKEN", self.api_token.as_deref().unwrap_or_default())
    }

    pub fn client_config(&self) -> JitoConfig {
        let config = JitoConfig {
            block_engine_url: self.block_engine_url.clone(),
            ..JitoConfig::default()
        }
        .with_tip_accounts(self.tip_accounts.clone())
        .with_polling(
            Duration::from_secs(self.confirm_timeout_secs),
            Duration::from_millis(self.poll_interval_ms),
        );

        match self.get_api_token() {
            Some(token) => config.with_api_token(token),
            None => config,
        }
    }
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    pub rpc_url: String,
    /// Wallet keypair path (JSON byte array). NEVER commit this file!
    #[serde(default)]
    pub keypair_path: String,
}

impl SolanaSection {
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }

    /// Checks SOLANA_KEYPAIR_PATH env var first, then the config value, `~` expanded
    pub fn get_keypair_path(&self) -> Option<PathBuf> {
        env_or("SOLANA_KEYPAIR_PATH", &self.keypair_path).map(|p| expand_path(&p))
    }

    /// Base58 secret key from SOLANA_PRIVATE_KEY, preferred over the keypair file
    pub fn get_private_key(&self) -> Option<String> {
        env_or("SOLANA_PRIVATE_KEY", "")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Directory holding positions.json
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageSection {
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Log level from a config file, read before full loading so that
/// loading itself is logged at the right level
pub fn peek_log_level<P: AsRef<Path>>(path: P) -> Option<String> {
    #[derive(Deserialize)]
    struct LoggingOnly {
        #[serde(default)]
        logging: LoggingSection,
    }

    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str::<LoggingOnly>(&content)
        .ok()
        .map(|c| c.logging.level)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Trading
        if self.trading.buy_lamports()? == 0 {
            return Err(ConfigError::ValidationError(
                "buy_amount_sol must be > 0".to_string(),
            ));
        }
        self.trading.priority_fee_lamports()?;

        if self.trading.slippage_bps == 0 || self.trading.slippage_bps > 10_000 {
            return Err(ConfigError::ValidationError(format!(
                "slippage_bps must be 1-10000, got {}",
                self.trading.slippage_bps
            )));
        }

        let multiplier = self.trading.stop_loss_multiplier;
        if multiplier <= Decimal::ZERO || multiplier > Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "stop_loss_multiplier must be in (0, 1], got {}",
                multiplier
            )));
        }

        self.trading.ladder()?;

        if self.trading.monitor_pacing_ms == 0 {
            return Err(ConfigError::ValidationError(
                "monitor_pacing_ms must be > 0".to_string(),
            ));
        }

        // Signals
        if self.signals.buy_start.is_empty() || self.signals.buy_end.is_empty() {
            return Err(ConfigError::ValidationError(
                "buy markers cannot be empty".to_string(),
            ));
        }
        if self.signals.link_separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "link_separator cannot be empty".to_string(),
            ));
        }

        // Jupiter
        if self.jupiter.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "jupiter api_url cannot be empty".to_string(),
            ));
        }

        // Jito
        if self.jito.tip_accounts.is_empty() {
            return Err(ConfigError::ValidationError(
                "jito tip_accounts cannot be empty".to_string(),
            ));
        }
        for account in &self.jito.tip_accounts {
            if Pubkey::from_str(account).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "invalid jito tip account: {}",
                    account
                )));
            }
        }
        if self.jito.poll_interval_ms == 0 || self.jito.confirm_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "jito polling window and interval must be > 0".to_string(),
            ));
        }

        // Solana
        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Exact SOL to lamports conversion; sub-lamport amounts are rejected
pub fn sol_to_lamports(sol: Decimal, field: &str) -> Result<u64, ConfigError> {
    let lamports = sol.checked_mul(Decimal::from(LAMPORTS_PER_SOL)).ok_or_else(|| {
        ConfigError::ValidationError(format!("{} is too large: {} SOL", field, sol))
    })?;
    if lamports.is_sign_negative() || !lamports.fract().is_zero() {
        return Err(ConfigError::ValidationError(format!(
            "{} must be a non-negative whole number of lamports, got {} SOL",
            field, sol
        )));
    }
    lamports.to_u64().ok_or_else(|| {
        ConfigError::ValidationError(format!("{} is too large: {} SOL", field, sol))
    })
}

fn env_or(var: &str, fallback: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| Some(fallback.to_string()).filter(|v| !v.trim().is_empty()))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[trading]
buy_amount_sol = 0.1
priority_fee_sol = 0.001
stop_loss_multiplier = 0.5

[telegram]
channels = [-1001234567890]

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
keypair_path = "~/.config/solana/id.json"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.trading.buy_amount_sol, dec!(0.1));
        assert_eq!(config.trading.buy_lamports().unwrap(), 100_000_000);
        assert_eq!(config.trading.priority_fee_lamports().unwrap(), 1_000_000);
        assert_eq!(config.trading.slippage_bps, 5000);
        assert_eq!(config.trading.ladder().unwrap().max_level(), 4);
        assert_eq!(config.trading.monitor_pacing(), Duration::from_secs(1));
        assert!(config.telegram.allow_list().contains(1234567890));
        assert_eq!(config.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.signals.buy_start, "CA: ");
        assert_eq!(config.signals.sell_marker, "🔥🔥🔥");
        assert_eq!(config.jito.tip_accounts.len(), 8);
        assert_eq!(config.jito.confirm_timeout_secs, 60);
        assert_eq!(config.jupiter.max_retries, 3);
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.logging.level, "info");

        let jito = config.jito.client_config();
        assert_eq!(jito.poll_interval, Duration::from_secs(1));
        assert!(jito.bundles_url().ends_with("/api/v1/bundles"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_signal_markers_override() {
        let content = format!(
            "{}\n[signals]\nbuy_start = \"Mint: \"\nsell_marker = \"EXIT\"\n",
            create_valid_config()
        );
        let file = write_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.signals.buy_start, "Mint: ");
        assert_eq!(config.signals.sell_marker, "EXIT");
        assert_eq!(config.signals.buy_end, "\n🤴 Price");
    }

    #[test]
    fn test_invalid_ladder_rejected() {
        let content = create_valid_config().replace(
            "stop_loss_multiplier = 0.5",
            "stop_loss_multiplier = 0.5\ntake_profit_percentages = [25, 50]",
        );
        let file = write_config(&content);

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("take_profit")));
    }

    #[test]
    fn test_invalid_stop_loss_multiplier() {
        let content = create_valid_config().replace("stop_loss_multiplier = 0.5", "stop_loss_multiplier = 1.5");
        let file = write_config(&content);

        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_tip_account() {
        let content = format!("{}\n[jito]\ntip_accounts = [\"not-a-key\"]\n", create_valid_config());
        let file = write_config(&content);

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("not-a-key")));
    }

    #[test]
    fn test_sol_to_lamports() {
        assert_eq!(sol_to_lamports(dec!(1), "x").unwrap(), 1_000_000_000);
        assert_eq!(sol_to_lamports(dec!(0.000000001), "x").unwrap(), 1);
        assert_eq!(sol_to_lamports(dec!(0), "x").unwrap(), 0);
        assert!(sol_to_lamports(dec!(0.0000000001), "x").is_err());
        assert!(sol_to_lamports(dec!(-0.1), "x").is_err());
    }

    #[test]
    fn test_peek_log_level() {
        let content = format!("{}\n[logging]\nlevel = \"debug\"\n", create_valid_config());
        let file = write_config(&content);

        assert_eq!(peek_log_level(file.path()).as_deref(), Some("debug"));
        assert_eq!(peek_log_level("/nonexistent/config.toml"), None);
    }

    #[test]
    fn test_zero_buy_amount_rejected() {
        let content = create_valid_config().replace("buy_amount_sol = 0.1", "buy_amount_sol = 0");
        let file = write_config(&content);

        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_oversized_amount_rejected() {
        assert!(matches!(
            sol_to_lamports(Decimal::MAX, "buy_amount_sol"),
            Err(ConfigError::ValidationError(_))
        ));

        let content = create_valid_config().replace("buy_amount_sol = 0.1", "buy_amount_sol = 1e20");
        let file = write_config(&content);
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }
}
