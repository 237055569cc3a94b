//! Jito Bundle Adapter
//!
//! Priority-fee bundles via the Jito Block Engine: a tip transfer plus the
//! signed swap, submitted together and polled for confirmation.

mod client;
mod config;
mod error;
mod submitter;
mod types;

pub use client::{BundleRelay, JitoBundleClient, MAX_BUNDLE_SIZE};
pub use config::{endpoints, tip_accounts, JitoConfig};
pub use error::JitoError;
pub use submitter::JitoBundleSubmitter;
pub use types::{BundleStatusEntry, GetBundleStatusesResponse};
