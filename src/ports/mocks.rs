//! In-memory port implementations for tests.
//!
//! Every mock records its calls and lets the test steer responses at any
//! point, including while the system under test is running.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::VersionedTransaction,
};

use super::bundle::{BundleSubmitter, SubmissionOutcome};
use super::execution::{BalancePort, ExecutionError, SwapPort, SwapQuote, SwapQuoteRequest};
use super::source::{ChannelMessage, SignalSource, SignalSourceError};
use super::store::{PositionStore, StoreError};
use crate::domain::Position;

/// Swap service with a fixed output amount per (input, output) pair
#[derive(Debug, Clone, Default)]
pub struct MockSwap {
    quotes: Arc<Mutex<HashMap<(String, String), u64>>>,
    failing: Arc<Mutex<bool>>,
    quote_calls: Arc<Mutex<Vec<SwapQuoteRequest>>>,
    build_calls: Arc<AtomicUsize>,
}

impl MockSwap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the output amount for a pair
    pub fn with_quote(self, input_mint: &str, output_mint: &str, out_amount: u64) -> Self {
        self.set_quote(input_mint, output_mint, out_amount);
        self
    }

    pub fn set_quote(&self, input_mint: &str, output_mint: &str, out_amount: u64) {
        self.quotes
            .lock()
            .unwrap()
            .insert((input_mint.to_string(), output_mint.to_string()), out_amount);
    }

    /// Make every quote and build fail until reset
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Get all recorded quote requests
    pub fn get_quote_calls(&self) -> Vec<SwapQuoteRequest> {
        self.quote_calls.lock().unwrap().clone()
    }

    pub fn build_count(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapPort for MockSwap {
    async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuote, ExecutionError> {
        self.quote_calls.lock().unwrap().push(request.clone());
        if *self.failing.lock().unwrap() {
            return Err(ExecutionError::ApiError("quote service unavailable".to_string()));
        }

        let key = (request.input_mint.clone(), request.output_mint.clone());
        let out_amount = self
            .quotes
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .ok_or_else(|| ExecutionError::ApiError("No route found".to_string()))?;

        Ok(SwapQuote {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount: request.amount,
            out_amount,
            raw: serde_json::json!({
                "inputMint": request.input_mint,
                "outputMint": request.output_mint,
                "inAmount": request.amount.to_string(),
                "outAmount": out_amount.to_string(),
            }),
        })
    }

    async fn build_swap_transaction(
        &self,
        _quote: &SwapQuote,
        user_public_key: &Pubkey,
    ) -> Result<VersionedTransaction, ExecutionError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().unwrap() {
            return Err(ExecutionError::ApiError("swap service unavailable".to_string()));
        }

        let instruction = system_instruction::transfer(user_public_key, &Pubkey::new_unique(), 1);
        let message = Message::new(&[instruction], Some(user_public_key));
        let signatures = vec![Signature::default(); message.header.num_required_signatures as usize];

        Ok(VersionedTransaction {
            signatures,
            message: VersionedMessage::Legacy(message),
        })
    }
}

/// Token balances keyed by mint
#[derive(Debug, Clone, Default)]
pub struct MockBalance {
    balances: Arc<Mutex<HashMap<String, u64>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, mint: &str, amount: u64) -> Self {
        self.set_balance(mint, amount);
        self
    }

    pub fn set_balance(&self, mint: &str, amount: u64) {
        self.balances.lock().unwrap().insert(mint.to_string(), amount);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl BalancePort for MockBalance {
    async fn token_balance(&self, _owner: &Pubkey, mint: &str) -> Result<u64, ExecutionError> {
        if *self.failing.lock().unwrap() {
            return Err(ExecutionError::BalanceError("rpc unavailable".to_string()));
        }
        Ok(self.balances.lock().unwrap().get(mint).copied().unwrap_or(0))
    }
}

/// Bundle submitter that replays queued outcomes, then confirms
#[derive(Debug, Clone, Default)]
pub struct MockBundleSubmitter {
    outcomes: Arc<Mutex<VecDeque<SubmissionOutcome>>>,
    calls: Arc<Mutex<Vec<u64>>>,
    delay: Option<Duration>,
}

impl MockBundleSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every submission for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_outcome(&self, outcome: SubmissionOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Tip amounts of all submissions so far
    pub fn get_calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BundleSubmitter for MockBundleSubmitter {
    async fn submit(&self, _transaction: VersionedTransaction, tip_lamports: u64) -> SubmissionOutcome {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(tip_lamports);
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SubmissionOutcome::Confirmed {
                bundle_id: format!("mock-bundle-{}", call),
            })
    }
}

/// Position store backed by a map, with injectable write failures
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    positions: Arc<Mutex<HashMap<String, Position>>>,
    failing_writes: Arc<AtomicUsize>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(self, position: Position) -> Self {
        self.positions
            .lock()
            .unwrap()
            .insert(position.token_address.clone(), position);
        self
    }

    /// Fail the next `count` writes with a write error
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> HashMap<String, Position> {
        self.positions.lock().unwrap().clone()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let remaining = self.failing_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::WriteError("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn create(&self, position: Position) -> Result<(), StoreError> {
        self.check_write()?;
        let mut positions = self.positions.lock().unwrap();
        if positions.contains_key(&position.token_address) {
            return Err(StoreError::AlreadyExists(position.token_address));
        }
        positions.insert(position.token_address.clone(), position);
        Ok(())
    }

    async fn get(&self, token_address: &str) -> Result<Option<Position>, StoreError> {
        Ok(self.positions.lock().unwrap().get(token_address).cloned())
    }

    async fn all(&self) -> Result<Vec<Position>, StoreError> {
        Ok(self.positions.lock().unwrap().values().cloned().collect())
    }

    async fn decrement_level(
        &self,
        token_address: &str,
        expected_level: u8,
    ) -> Result<Option<Position>, StoreError> {
        self.check_write()?;
        let mut positions = self.positions.lock().unwrap();
        match positions.get_mut(token_address) {
            Some(position) if position.current_tp_level == expected_level && expected_level > 1 => {
                position.current_tp_level -= 1;
                Ok(Some(position.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, token_address: &str) -> Result<bool, StoreError> {
        self.check_write()?;
        Ok(self.positions.lock().unwrap().remove(token_address).is_some())
    }
}

/// Signal feed that hands out queued batches
#[derive(Debug, Clone, Default)]
pub struct MockSignalSource {
    batches: Arc<Mutex<VecDeque<Result<Vec<ChannelMessage>, String>>>>,
}

impl MockSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: Vec<ChannelMessage>) {
        self.batches.lock().unwrap().push_back(Ok(batch));
    }

    pub fn push_error(&self, error: &str) {
        self.batches.lock().unwrap().push_back(Err(error.to_string()));
    }
}

#[async_trait]
impl SignalSource for MockSignalSource {
    async fn next_batch(&mut self) -> Result<Vec<ChannelMessage>, SignalSourceError> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(e)) => Err(SignalSourceError::Network(e)),
            None => {
                // idle long-poll
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }
}
