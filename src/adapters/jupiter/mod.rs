//! Jupiter Adapter
//!
//! Implementation of the SwapPort for the Jupiter DEX aggregator.
//! Handles quote fetching and swap transaction building.

mod client;
mod quote;
mod swap;

pub use client::{JupiterClient, JupiterConfig};
pub use quote::{QuoteRequest, QuoteResponse};
pub use swap::{SwapRequest, SwapResponse};
