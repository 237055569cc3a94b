//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Jupiter: DEX aggregator quote and swap building
//! - Jito: bundle submission with confirmation polling
//! - Solana: RPC balances and wallet management
//! - Storage: JSON-file position store
//! - Telegram: channel post long-polling
//! - CLI: command-line definitions

pub mod cli;
pub mod jito;
pub mod jupiter;
pub mod solana;
pub mod storage;
pub mod telegram;

pub use cli::CliApp;
pub use jito::{JitoBundleClient, JitoBundleSubmitter};
pub use jupiter::JupiterClient;
pub use solana::{SolanaClient, WalletManager};
pub use storage::JsonPositionStore;
pub use telegram::TelegramSource;
