//! Signal Ladder - channel-signal trading bot library
//!
//! Buys tokens announced in Telegram signal channels through Jupiter,
//! sells them down a take-profit ladder on sell alerts and protects every
//! open position with a stop-loss. Every swap lands as a Jito bundle.
//!
//! # Modules
//!
//! - `domain`: Signal parsing, positions, take-profit ladder, stop-loss floor
//! - `ports`: Trait abstractions (SwapPort, BalancePort, BundleSubmitter, PositionStore, SignalSource)
//! - `adapters`: External implementations (Jupiter, Jito, Solana, JSON store, Telegram, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Execution engine, stop-loss monitor and the bot loop

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
