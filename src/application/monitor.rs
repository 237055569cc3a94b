//! Stop-Loss Monitor
//!
//! Scans every open position in a loop, one at a time with a fixed pause
//! between positions. A breach spawns the exit in the background so the
//! scan keeps going; a token whose exit is still running is not evaluated
//! again until that exit resolves.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use super::engine::{report_failure, ExecutionEngine, StopLossCheck, TradeKind};
use super::locks::InFlightSet;
use crate::ports::store::PositionStore;

/// Counters for one pass over the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub scanned: usize,
    pub empty: usize,
    pub breached: usize,
    pub exits_spawned: usize,
    pub in_flight_skipped: usize,
    pub errors: usize,
}

pub struct StopLossMonitor {
    engine: Arc<ExecutionEngine>,
    store: Arc<dyn PositionStore>,
    pacing: Duration,
    in_flight: InFlightSet,
}

impl StopLossMonitor {
    pub fn new(engine: Arc<ExecutionEngine>, pacing: Duration) -> Self {
        let store = engine.store();
        Self {
            engine,
            store,
            pacing,
            in_flight: InFlightSet::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    /// Scan until `shutdown` flips to true.
    ///
    /// Shutdown is only observed between cycles. Exits still running when
    /// the loop ends are awaited before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(pacing_ms = self.pacing.as_millis() as u64, "Stop-loss monitor started");
        let mut exits = JoinSet::new();

        while !*shutdown.borrow() {
            let summary = self.run_cycle(&mut exits).await;
            reap(&mut exits);

            if summary.scanned == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.pacing) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        if !exits.is_empty() {
            tracing::info!(pending = exits.len(), "Waiting for stop-loss exits to finish");
        }
        while let Some(result) = exits.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Stop-loss exit task panicked");
            }
        }
        tracing::info!("Stop-loss monitor stopped");
    }

    /// One sequential pass over a snapshot of the store
    pub async fn run_cycle(&self, exits: &mut JoinSet<()>) -> CycleSummary {
        let mut summary = CycleSummary::default();

        let positions = match self.store.all().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read open positions");
                summary.errors += 1;
                return summary;
            }
        };

        for position in positions {
            let token = position.token_address.clone();

            if self.in_flight.contains(&token) {
                summary.in_flight_skipped += 1;
                continue;
            }
            summary.scanned += 1;

            match self.engine.check_stop_loss(&position).await {
                Ok(StopLossCheck::EmptyBalance) => {
                    summary.empty += 1;
                    tracing::info!(token = %token, "Balance is zero, nothing to protect");
                }
                Ok(StopLossCheck::Safe { value, floor }) => {
                    tracing::debug!(
                        token = %token,
                        level = position.current_tp_level,
                        value,
                        floor = %floor,
                        "Position above stop-loss floor"
                    );
                }
                Ok(StopLossCheck::Breached { value, floor }) => {
                    summary.breached += 1;
                    tracing::warn!(
                        token = %token,
                        level = position.current_tp_level,
                        value,
                        floor = %floor,
                        "Stop-loss triggered"
                    );
                    if self.spawn_exit(exits, &token, position.current_tp_level) {
                        summary.exits_spawned += 1;
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(token = %token, error = %e, "Stop-loss check failed");
                }
            }

            tokio::time::sleep(self.pacing).await;
        }

        summary
    }

    fn spawn_exit(&self, exits: &mut JoinSet<()>, token: &str, level: u8) -> bool {
        let Some(guard) = self.in_flight.try_claim(token) else {
            return false;
        };
        let engine = Arc::clone(&self.engine);
        let token = token.to_string();

        exits.spawn(async move {
            let _guard = guard;
            if let Err(e) = engine.stop_loss_exit(&token, level).await {
                report_failure(TradeKind::StopLoss, &token, &e);
            }
        });
        true
    }
}

fn reap(exits: &mut JoinSet<()>) {
    while let Some(result) = exits.try_join_next() {
        if let Err(e) = result {
            tracing::error!(error = %e, "Stop-loss exit task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::solana::WalletManager;
    use crate::application::engine::EngineSettings;
    use crate::domain::{Position, StopLossPolicy, TakeProfitLadder};
    use crate::ports::mocks::{MemoryPositionStore, MockBalance, MockBundleSubmitter, MockSwap};
    use rust_decimal_macros::dec;
    use solana_sdk::pubkey::Pubkey;

    const SOL: u64 = 1_000_000_000;

    struct Harness {
        swap: MockSwap,
        balances: MockBalance,
        bundles: MockBundleSubmitter,
        store: MemoryPositionStore,
        monitor: StopLossMonitor,
    }

    fn native() -> String {
        spl_token::native_mint::ID.to_string()
    }

    fn harness(store: MemoryPositionStore, bundles: MockBundleSubmitter) -> Harness {
        paced_harness(store, bundles, Duration::from_millis(1))
    }

    fn paced_harness(store: MemoryPositionStore, bundles: MockBundleSubmitter, pacing: Duration) -> Harness {
        let swap = MockSwap::new();
        let balances = MockBalance::new();
        let engine = ExecutionEngine::new(
            Arc::new(swap.clone()),
            Arc::new(balances.clone()),
            Arc::new(bundles.clone()),
            Arc::new(store.clone()),
            WalletManager::new_random(),
            TakeProfitLadder::default(),
            StopLossPolicy::new(dec!(0.5)),
            EngineSettings {
                buy_lamports: SOL,
                persist_backoff: Duration::from_millis(1),
                ..EngineSettings::default()
            },
        );
        let monitor = StopLossMonitor::new(Arc::new(engine), pacing);
        Harness { swap, balances, bundles, store, monitor }
    }

    #[tokio::test]
    async fn test_cycle_skips_zero_balance() {
        let token = Pubkey::new_unique().to_string();
        let h = harness(
            MemoryPositionStore::new().with_position(Position::open(&token, 4, 1_000, SOL)),
            MockBundleSubmitter::new(),
        );
        let mut exits = JoinSet::new();

        let summary = h.monitor.run_cycle(&mut exits).await;

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.empty, 1);
        assert!(exits.is_empty());
        assert_eq!(h.store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_breach_spawns_exit_and_closes_position() {
        let token = Pubkey::new_unique().to_string();
        let h = harness(
            MemoryPositionStore::new().with_position(Position::open(&token, 4, 1_000, SOL)),
            MockBundleSubmitter::new(),
        );
        h.balances.set_balance(&token, 1_000);
        h.swap.set_quote(&token, &native(), SOL / 10);
        let mut exits = JoinSet::new();

        let summary = h.monitor.run_cycle(&mut exits).await;
        assert_eq!(summary.breached, 1);
        assert_eq!(summary.exits_spawned, 1);

        while exits.join_next().await.is_some() {}
        assert!(h.store.snapshot().is_empty());
        assert!(h.monitor.in_flight().is_empty());
        assert_eq!(h.bundles.call_count(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_exit_suppresses_duplicate() {
        let token = Pubkey::new_unique().to_string();
        let h = harness(
            MemoryPositionStore::new().with_position(Position::open(&token, 4, 1_000, SOL)),
            MockBundleSubmitter::new().with_delay(Duration::from_millis(100)),
        );
        h.balances.set_balance(&token, 1_000);
        h.swap.set_quote(&token, &native(), SOL / 10);
        let mut exits = JoinSet::new();

        let first = h.monitor.run_cycle(&mut exits).await;
        let second = h.monitor.run_cycle(&mut exits).await;

        assert_eq!(first.exits_spawned, 1);
        assert_eq!(second.in_flight_skipped, 1);
        assert_eq!(second.exits_spawned, 0);

        while exits.join_next().await.is_some() {}
        assert_eq!(h.bundles.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = harness(MemoryPositionStore::new(), MockBundleSubmitter::new());
        let (tx, rx) = watch::channel(false);

        let monitor = h.monitor;
        let handle = tokio::spawn(async move { monitor.run(rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cycle_pauses_after_each_position() {
        let pacing = Duration::from_millis(30);
        let breached = Pubkey::new_unique().to_string();
        let safe_a = Pubkey::new_unique().to_string();
        let safe_b = Pubkey::new_unique().to_string();
        let h = paced_harness(
            MemoryPositionStore::new()
                .with_position(Position::open(&breached, 4, 1_000, SOL))
                .with_position(Position::open(&safe_a, 4, 1_000, SOL))
                .with_position(Position::open(&safe_b, 4, 1_000, SOL)),
            MockBundleSubmitter::new(),
            pacing,
        );
        for token in [&breached, &safe_a, &safe_b] {
            h.balances.set_balance(token, 1_000);
        }
        h.swap.set_quote(&breached, &native(), SOL / 10);
        h.swap.set_quote(&safe_a, &native(), SOL);
        h.swap.set_quote(&safe_b, &native(), SOL);
        let mut exits = JoinSet::new();

        let started = tokio::time::Instant::now();
        let summary = h.monitor.run_cycle(&mut exits).await;
        let elapsed = started.elapsed();

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.breached, 1);
        assert_eq!(summary.exits_spawned, 1);
        assert!(elapsed >= pacing * 3, "cycle took {:?}", elapsed);

        while exits.join_next().await.is_some() {}
        assert_eq!(h.store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_mid_scan_finishes_cycle_and_exits() {
        let breached = Pubkey::new_unique().to_string();
        let safe = Pubkey::new_unique().to_string();
        let h = paced_harness(
            MemoryPositionStore::new()
                .with_position(Position::open(&breached, 4, 1_000, SOL))
                .with_position(Position::open(&safe, 4, 1_000, SOL)),
            MockBundleSubmitter::new().with_delay(Duration::from_millis(300)),
            Duration::from_millis(100),
        );
        h.balances.set_balance(&breached, 1_000);
        h.balances.set_balance(&safe, 1_000);
        h.swap.set_quote(&breached, &native(), SOL / 10);
        h.swap.set_quote(&safe, &native(), SOL);

        let (tx, rx) = watch::channel(false);
        let monitor = h.monitor;
        let handle = tokio::spawn(async move { monitor.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        // the delayed exit landed before run returned
        assert_eq!(h.bundles.call_count(), 1);
        assert!(!h.store.snapshot().contains_key(&breached));
        assert!(h.store.snapshot().contains_key(&safe));

        // the rest of the snapshot was still valued after the flag flipped
        let quoted: Vec<String> = h
            .swap
            .get_quote_calls()
            .into_iter()
            .map(|call| call.input_mint)
            .collect();
        assert!(quoted.contains(&safe));
        assert!(quoted.contains(&breached));
    }
}
