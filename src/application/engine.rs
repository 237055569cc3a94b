//! Execution Engine
//!
//! Turns buy/sell/stop-loss decisions into confirmed swaps and keeps the
//! position store in step with what actually landed on chain.
//!
//! Every operation on a token runs under that token's lock, and the store
//! is only touched after the bundle is confirmed.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use super::locks::TokenLocks;
use crate::adapters::solana::{WalletError, WalletManager};
use crate::domain::{LevelTransition, Position, PositionError, StopLossPolicy, TakeProfitLadder};
use crate::ports::bundle::{BundleSubmitter, SubmissionOutcome};
use crate::ports::execution::{BalancePort, ExecutionError, SwapPort, SwapQuote, SwapQuoteRequest};
use crate::ports::store::{PositionStore, StoreError};

const EXPLORER_TX_URL: &str = "https://solscan.io/tx/";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid token address: {0}")]
    InvalidToken(String),
    #[error("Position already open for {0}")]
    PositionExists(String),
    #[error("No open position for {0}")]
    NoPosition(String),
    #[error("Position for {token} is at level {found}, expected {expected}")]
    StaleLevel { token: String, expected: u8, found: u8 },
    #[error("Nothing to sell for {0}: balance is zero")]
    ZeroBalance(String),
    #[error("Balance query failed: {0}")]
    Balance(ExecutionError),
    #[error("Quote failed: {0}")]
    Quote(ExecutionError),
    #[error("Swap build failed: {0}")]
    Build(ExecutionError),
    #[error("Signing failed: {0}")]
    Signing(#[from] WalletError),
    #[error("Bundle not confirmed: {0}")]
    Submission(SubmissionOutcome),
    #[error("Position store error: {0}")]
    Store(#[from] StoreError),
    #[error("Take-profit ladder error: {0}")]
    Ladder(#[from] PositionError),
}

impl EngineError {
    /// Nothing was attempted on chain because there was nothing to do
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            EngineError::PositionExists(_)
                | EngineError::NoPosition(_)
                | EngineError::StaleLevel { .. }
                | EngineError::ZeroBalance(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Buy,
    Sell,
    StopLoss,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
            TradeKind::StopLoss => write!(f, "stop-loss"),
        }
    }
}

/// Result of one confirmed trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReport {
    pub kind: TradeKind,
    pub token_address: String,
    pub signature: String,
    pub bundle_id: Option<String>,
    /// Amount sent into the swap (lamports for buys, raw token units for exits)
    pub in_amount: u64,
    /// Quoted output amount
    pub out_amount: u64,
    /// Level after the trade, `None` once the position is closed
    pub level_after: Option<u8>,
    /// False if the store could not be updated after confirmation
    pub persisted: bool,
}

impl TradeReport {
    pub fn explorer_url(&self) -> String {
        explorer_url(&self.signature)
    }
}

pub fn explorer_url(signature: &str) -> String {
    format!("{}{}", EXPLORER_TX_URL, signature)
}

/// Outcome of evaluating one position against its stop-loss floor
#[derive(Debug, Clone, PartialEq)]
pub enum StopLossCheck {
    /// Nothing held, nothing to protect
    EmptyBalance,
    Safe { value: u64, floor: Decimal },
    Breached { value: u64, floor: Decimal },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Native amount spent per buy
    pub buy_lamports: u64,
    /// Priority fee attached to every bundle
    pub tip_lamports: u64,
    pub slippage_bps: u16,
    /// Store writes after a confirmed trade
    pub persist_attempts: u32,
    /// Delay before the first store retry, doubled after each failure
    pub persist_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            buy_lamports: 100_000_000,
            tip_lamports: 1_000_000,
            slippage_bps: 5000,
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(250),
        }
    }
}

struct Executed {
    quote: SwapQuote,
    signature: String,
    bundle_id: Option<String>,
}

pub struct ExecutionEngine {
    swap: Arc<dyn SwapPort>,
    balances: Arc<dyn BalancePort>,
    bundles: Arc<dyn BundleSubmitter>,
    store: Arc<dyn PositionStore>,
    wallet: WalletManager,
    ladder: TakeProfitLadder,
    stop_loss: StopLossPolicy,
    settings: EngineSettings,
    native_mint: String,
    locks: TokenLocks,
}

impl ExecutionEngine {
    pub fn new(
        swap: Arc<dyn SwapPort>,
        balances: Arc<dyn BalancePort>,
        bundles: Arc<dyn BundleSubmitter>,
        store: Arc<dyn PositionStore>,
        wallet: WalletManager,
        ladder: TakeProfitLadder,
        stop_loss: StopLossPolicy,
        settings: EngineSettings,
    ) -> Self {
        Self {
            swap,
            balances,
            bundles,
            store,
            wallet,
            ladder,
            stop_loss,
            settings,
            native_mint: spl_token::native_mint::ID.to_string(),
            locks: TokenLocks::new(),
        }
    }

    pub fn ladder(&self) -> &TakeProfitLadder {
        &self.ladder
    }

    pub fn stop_loss(&self) -> &StopLossPolicy {
        &self.stop_loss
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn PositionStore> {
        Arc::clone(&self.store)
    }

    pub fn wallet_pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// Enter a new position with the configured native amount.
    ///
    /// A token that already has an open position is rejected.
    pub async fn execute_buy(&self, token_address: &str) -> Result<TradeReport, EngineError> {
        validate_token(token_address)?;
        let _guard = self.locks.lock(token_address).await;

        if self.store.get(token_address).await?.is_some() {
            return Err(EngineError::PositionExists(token_address.to_string()));
        }

        let native_mint = self.native_mint.clone();
        let executed = self
            .swap_and_submit(&native_mint, token_address, self.settings.buy_lamports)
            .await?;

        let position = Position::open(
            token_address,
            self.ladder.max_level(),
            executed.quote.out_amount,
            self.settings.buy_lamports,
        )
        .with_signature(executed.signature.clone());

        let store = &self.store;
        let record = position.clone();
        let persisted = self
            .persist(token_address, "create", &position, move || store.create(record.clone()))
            .await
            .is_some();

        tracing::info!(
            token = %token_address,
            lamports = self.settings.buy_lamports,
            tokens = executed.quote.out_amount,
            level = position.current_tp_level,
            "Buy confirmed: {}",
            explorer_url(&executed.signature)
        );

        Ok(TradeReport {
            kind: TradeKind::Buy,
            token_address: token_address.to_string(),
            signature: executed.signature,
            bundle_id: executed.bundle_id,
            in_amount: executed.quote.in_amount,
            out_amount: executed.quote.out_amount,
            level_after: Some(position.current_tp_level),
            persisted,
        })
    }

    /// Sell the current take-profit slice of an open position
    pub async fn execute_sell(&self, token_address: &str) -> Result<TradeReport, EngineError> {
        validate_token(token_address)?;
        let _guard = self.locks.lock(token_address).await;

        let position = self
            .store
            .get(token_address)
            .await?
            .ok_or_else(|| EngineError::NoPosition(token_address.to_string()))?;
        let level = position.current_tp_level;

        let balance = self.balance_of(token_address).await?;
        let amount = self.ladder.sell_amount(balance, level)?;
        if amount == 0 {
            return Err(EngineError::ZeroBalance(token_address.to_string()));
        }
        let step = self.ladder.step(level)?;
        let transition = self.ladder.transition(level)?;

        let native_mint = self.native_mint.clone();
        let executed = self.swap_and_submit(token_address, &native_mint, amount).await?;

        let store = &self.store;
        let (level_after, persisted) = match transition {
            LevelTransition::Decrement(next) => {
                let mut expected = position.clone();
                expected.current_tp_level = next;
                let updated = self
                    .persist(token_address, "decrement", &expected, move || {
                        store.decrement_level(token_address, level)
                    })
                    .await;
                match updated {
                    Some(Some(_)) => (Some(next), true),
                    Some(None) => {
                        tracing::warn!(
                            token = %token_address,
                            level,
                            "Position changed underneath a confirmed sell, level not updated"
                        );
                        (Some(level), false)
                    }
                    None => (Some(level), false),
                }
            }
            LevelTransition::Close => {
                let persisted = self.close(token_address, &position).await;
                (None, persisted)
            }
        };

        tracing::info!(
            token = %token_address,
            step,
            sold = amount,
            lamports = executed.quote.out_amount,
            level = ?level_after,
            "Take-profit {} confirmed: {}",
            step,
            explorer_url(&executed.signature)
        );

        Ok(TradeReport {
            kind: TradeKind::Sell,
            token_address: token_address.to_string(),
            signature: executed.signature,
            bundle_id: executed.bundle_id,
            in_amount: amount,
            out_amount: executed.quote.out_amount,
            level_after,
            persisted,
        })
    }

    /// Value the recorded entry amount and compare it to the floor
    pub async fn check_stop_loss(&self, position: &Position) -> Result<StopLossCheck, EngineError> {
        let token_address = &position.token_address;
        if self.balance_of(token_address).await? == 0 {
            return Ok(StopLossCheck::EmptyBalance);
        }

        let request = SwapQuoteRequest::new(
            token_address.as_str(),
            self.native_mint.as_str(),
            position.initial_token_amount,
            self.settings.slippage_bps,
        );
        let quote = self
            .swap
            .get_swap_quote(&request)
            .await
            .map_err(EngineError::Quote)?;

        let max_level = self.ladder.max_level();
        let floor = self.stop_loss.floor(position, max_level);
        let value = quote.out_amount;

        if self.stop_loss.is_breached(position, value, max_level) {
            Ok(StopLossCheck::Breached { value, floor })
        } else {
            Ok(StopLossCheck::Safe { value, floor })
        }
    }

    /// Sell the whole balance and close the position.
    ///
    /// Aborts without trading if the record is gone or no longer at
    /// `expected_level`, which means another exit got there first.
    pub async fn stop_loss_exit(
        &self,
        token_address: &str,
        expected_level: u8,
    ) -> Result<TradeReport, EngineError> {
        let _guard = self.locks.lock(token_address).await;

        let position = self
            .store
            .get(token_address)
            .await?
            .ok_or_else(|| EngineError::NoPosition(token_address.to_string()))?;
        if position.current_tp_level != expected_level {
            return Err(EngineError::StaleLevel {
                token: token_address.to_string(),
                expected: expected_level,
                found: position.current_tp_level,
            });
        }

        let balance = self.balance_of(token_address).await?;
        if balance == 0 {
            return Err(EngineError::ZeroBalance(token_address.to_string()));
        }

        let native_mint = self.native_mint.clone();
        let executed = self.swap_and_submit(token_address, &native_mint, balance).await?;
        let persisted = self.close(token_address, &position).await;

        tracing::info!(
            token = %token_address,
            sold = balance,
            lamports = executed.quote.out_amount,
            "Stop-loss exit confirmed: {}",
            explorer_url(&executed.signature)
        );

        Ok(TradeReport {
            kind: TradeKind::StopLoss,
            token_address: token_address.to_string(),
            signature: executed.signature,
            bundle_id: executed.bundle_id,
            in_amount: balance,
            out_amount: executed.quote.out_amount,
            level_after: None,
            persisted,
        })
    }

    async fn balance_of(&self, token_address: &str) -> Result<u64, EngineError> {
        self.balances
            .token_balance(&self.wallet.pubkey(), token_address)
            .await
            .map_err(EngineError::Balance)
    }

    /// Quote, build, sign and submit one swap; `Err` unless confirmed
    async fn swap_and_submit(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Result<Executed, EngineError> {
        let request = SwapQuoteRequest::new(input_mint, output_mint, amount, self.settings.slippage_bps);
        let quote = self
            .swap
            .get_swap_quote(&request)
            .await
            .map_err(EngineError::Quote)?;

        let transaction = self
            .swap
            .build_swap_transaction(&quote, &self.wallet.pubkey())
            .await
            .map_err(EngineError::Build)?;
        let signed = self.wallet.sign_transaction(transaction)?;
        let signature = signed
            .signatures
            .first()
            .copied()
            .unwrap_or_default()
            .to_string();

        let outcome = self.bundles.submit(signed, self.settings.tip_lamports).await;
        if !outcome.is_confirmed() {
            return Err(EngineError::Submission(outcome));
        }

        Ok(Executed {
            quote,
            signature,
            bundle_id: outcome.bundle_id().map(str::to_string),
        })
    }

    async fn close(&self, token_address: &str, position: &Position) -> bool {
        let store = &self.store;
        match self
            .persist(token_address, "delete", position, move || store.delete(token_address))
            .await
        {
            Some(true) => true,
            Some(false) => {
                tracing::warn!(token = %token_address, "Position was already removed");
                true
            }
            None => false,
        }
    }

    /// Run a store write after a confirmed trade, retrying with backoff.
    ///
    /// Returns `None` once every attempt failed; the intended record is
    /// logged so it can be reconciled by hand.
    async fn persist<T, F, Fut>(
        &self,
        token_address: &str,
        action: &str,
        record: &Position,
        mut op: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.settings.persist_attempts.max(1);
        let mut backoff = self.settings.persist_backoff;

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::error!(
                        token = %token_address,
                        action,
                        record = ?record,
                        "Position record already exists, confirmed trade not recorded"
                    );
                    return None;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        token = %token_address,
                        action,
                        attempt,
                        error = %e,
                        "Position store write failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    tracing::error!(
                        token = %token_address,
                        action,
                        record = ?record,
                        error = %e,
                        "Position store write failed after confirmed trade, reconcile manually"
                    );
                }
            }
        }
        None
    }
}

/// Log a failed engine operation at a level matching its class
pub fn report_failure(kind: TradeKind, token_address: &str, error: &EngineError) {
    match error {
        e if e.is_skip() => {
            tracing::info!(token = %token_address, action = %kind, "Skipped: {}", e);
        }
        EngineError::Balance(e) | EngineError::Quote(e) | EngineError::Build(e) => {
            tracing::warn!(token = %token_address, action = %kind, error = %e, "Swap preparation failed");
        }
        EngineError::Submission(outcome) => {
            tracing::warn!(
                token = %token_address,
                action = %kind,
                outcome = outcome.kind(),
                bundle_id = outcome.bundle_id().unwrap_or("-"),
                "Trade not confirmed: {}",
                outcome
            );
        }
        e => {
            tracing::error!(token = %token_address, action = %kind, error = %e, "Trade failed");
        }
    }
}

fn validate_token(token_address: &str) -> Result<(), EngineError> {
    Pubkey::from_str(token_address)
        .map(|_| ())
        .map_err(|_| EngineError::InvalidToken(token_address.to_string()))
}
