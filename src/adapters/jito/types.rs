//! Jito Bundle Types
//!
//! Request and response types for Jito Block Engine API.

use serde::{Deserialize, Serialize};

/// JSON-RPC request with a single array parameter, used by both
/// `sendBundle` (encoded transactions) and `getBundleStatuses` (bundle ids)
#[derive(Debug, Clone, Serialize)]
pub struct BundleRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID
    pub id: u64,
    /// Method name
    pub method: String,
    pub params: Vec<Vec<String>>,
}

impl BundleRequest {
    fn rpc(method: &str, values: Vec<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: method.to_string(),
            params: vec![values],
        }
    }

    /// `sendBundle` with base58 encoded transactions, tip first
    pub fn send_bundle(transactions: Vec<String>) -> Self {
        Self::rpc("sendBundle", transactions)
    }

    pub fn get_bundle_statuses(bundle_ids: Vec<String>) -> Self {
        Self::rpc("getBundleStatuses", bundle_ids)
    }
}

/// JSON-RPC response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<u64>,
    /// Result (if success)
    pub result: Option<T>,
    /// Error (if failure)
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    pub data: Option<serde_json::Value>,
}

/// Result of `getBundleStatuses`
#[derive(Debug, Clone, Deserialize)]
pub struct GetBundleStatusesResponse {
    /// One slot per queried id; unknown bundles come back as `null`
    #[serde(default)]
    pub value: Vec<Option<BundleStatusEntry>>,
}

/// Single bundle status entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BundleStatusEntry {
    pub bundle_id: String,
    /// `processed`, `confirmed` or `finalized`
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub transactions: Vec<String>,
}

impl BundleStatusEntry {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_status.as_deref() == Some("confirmed")
    }
}

/// True only if every id has a matching entry reporting `confirmed`
pub fn all_confirmed(bundle_ids: &[String], statuses: &[Option<BundleStatusEntry>]) -> bool {
    !bundle_ids.is_empty()
        && bundle_ids.iter().all(|id| {
            statuses
                .iter()
                .flatten()
                .any(|entry| &entry.bundle_id == id && entry.is_confirmed())
        })
}
