//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - Swap quoting/building and token balances (Jupiter, Solana RPC)
//! - Fee-paying bundle submission (Jito)
//! - Position persistence
//! - The channel message feed

pub mod bundle;
pub mod execution;
pub mod mocks;
pub mod source;
pub mod store;

// Re-export main traits and types
pub use bundle::{BundleSubmitter, SubmissionOutcome};
pub use execution::{BalancePort, ExecutionError, SwapPort, SwapQuote, SwapQuoteRequest};
pub use source::{ChannelAllowList, ChannelMessage, SignalSource, SignalSourceError};
pub use store::{PositionStore, StoreError};
