//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, peek_log_level, sol_to_lamports, Config, ConfigError, JitoSection, JupiterSection, LoggingSection,
    SolanaSection, StorageSection, TelegramSection, TradingSection,
};
