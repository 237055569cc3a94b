//! Jupiter Quote Types
//!
//! Request and response structures for the Jupiter quote API.

use serde::{Deserialize, Serialize};

/// Request parameters for getting a swap quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Input token mint address
    pub input_mint: String,
    /// Output token mint address
    pub output_mint: String,
    /// Amount in base units (lamports for SOL)
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
}

impl QuoteRequest {
    pub fn new(input_mint: String, output_mint: String, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
        }
    }

    pub fn query_params(&self) -> [(&'static str, String); 4] {
        [
            ("inputMint", self.input_mint.clone()),
            ("outputMint", self.output_mint.clone()),
            ("amount", self.amount.to_string()),
            ("slippageBps", self.slippage_bps.to_string()),
        ]
    }
}

/// Response from Jupiter quote API
///
/// Only the fields the bot reads are typed; the whole payload is kept as
/// JSON and echoed back to `/swap` unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// Input token mint address
    pub input_mint: String,
    /// Output token mint address
    pub output_mint: String,
    /// Input amount in base units
    pub in_amount: String,
    /// Output amount in base units
    pub out_amount: String,
    /// Minimum output amount after slippage (otherAmountThreshold)
    #[serde(default)]
    pub other_amount_threshold: String,
    /// Price impact percentage (as string)
    #[serde(default)]
    pub price_impact_pct: String,
    #[serde(default)]
    pub route_plan: Vec<RoutePlanStep>,
}

impl QuoteResponse {
    pub fn input_amount(&self) -> Option<u64> {
        self.in_amount.parse().ok()
    }

    pub fn output_amount(&self) -> Option<u64> {
        self.out_amount.parse().ok()
    }

    /// DEX labels along the route, for logging
    pub fn route_labels(&self) -> Vec<&str> {
        self.route_plan
            .iter()
            .map(|step| step.swap_info.label.as_str())
            .collect()
    }
}

/// A step in the route plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub swap_info: SwapInfo,
    /// Percentage of the trade going through this route
    pub percent: u8,
}

/// Information about a single swap in the route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    /// AMM key (pool identifier)
    pub amm_key: String,
    /// Label for the DEX (e.g., "Raydium", "Orca")
    #[serde(default)]
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let req = QuoteRequest::new(
            "So11111111111111111111111111111111111111112".to_string(),
            "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr".to_string(),
            1_000_000_000,
            5000,
        );

        let params = req.query_params();
        assert_eq!(params[0], ("inputMint", "So11111111111111111111111111111111111111112".to_string()));
        assert_eq!(params[2], ("amount", "1000000000".to_string()));
        assert_eq!(params[3], ("slippageBps", "5000".to_string()));
    }

    #[test]
    fn test_quote_response_parsing() {
        let json = r#"{
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr",
            "inAmount": "1000000000",
            "outAmount": "35210000000",
            "otherAmountThreshold": "17605000000",
            "swapMode": "ExactIn",
            "slippageBps": 5000,
            "priceImpactPct": "0.02",
            "routePlan": [{
                "swapInfo": {
                    "ammKey": "pool123",
                    "label": "Raydium",
                    "inputMint": "So11111111111111111111111111111111111111112",
                    "outputMint": "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr",
                    "inAmount": "1000000000",
                    "outAmount": "35210000000"
                },
                "percent": 100
            }],
            "contextSlot": 299283763
        }"#;

        let quote: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(quote.input_amount(), Some(1_000_000_000));
        assert_eq!(quote.output_amount(), Some(35_210_000_000));
        assert_eq!(quote.route_labels(), vec!["Raydium"]);
    }

    #[test]
    fn test_unparseable_amount() {
        let json = r#"{
            "inputMint": "a",
            "outputMint": "b",
            "inAmount": "1",
            "outAmount": "not-a-number"
        }"#;

        let quote: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(quote.output_amount(), None);
        assert!(quote.route_labels().is_empty());
    }
}
