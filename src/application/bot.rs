//! Signal bot
//!
//! Wires the channel listener and the stop-loss monitor together. Both run
//! until the shutdown watch flips; each signal is handled on its own task so
//! a slow trade never holds up the feed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use super::engine::{report_failure, ExecutionEngine, TradeKind};
use super::monitor::StopLossMonitor;
use crate::domain::{Signal, SignalKind, SignalParser};
use crate::ports::source::{ChannelAllowList, ChannelMessage, SignalSource, SignalSourceError};

const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Pulls channel posts, filters them and dispatches parsed signals
pub struct SignalListener<S: SignalSource> {
    source: S,
    parser: SignalParser,
    allow_list: ChannelAllowList,
    engine: Arc<ExecutionEngine>,
    error_backoff: Duration,
}

impl<S: SignalSource> SignalListener<S> {
    pub fn new(
        source: S,
        parser: SignalParser,
        allow_list: ChannelAllowList,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self {
            source,
            parser,
            allow_list,
            engine,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Delay before polling again after a feed error
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Signal carried by `message`, if it comes from an allowed channel
    pub fn accept(&self, message: &ChannelMessage) -> Option<Signal> {
        if !self.allow_list.contains(message.channel_id) {
            tracing::trace!(channel = message.channel_id, "Ignoring post from unlisted channel");
            return None;
        }
        self.parser.parse(&message.text, message.link.as_deref())
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(channels = self.allow_list.len(), "Signal listener started");
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            let batch = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                batch = self.source.next_batch() => batch,
            };

            match batch {
                Ok(messages) => {
                    for message in messages {
                        if let Some(signal) = self.accept(&message) {
                            self.dispatch(&mut tasks, signal);
                        }
                    }
                }
                Err(SignalSourceError::Auth(e)) => {
                    tracing::error!(error = %e, "Signal source rejected credentials, listener stopping");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Signal source poll failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.error_backoff) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }

            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Signal task panicked");
                }
            }
        }

        if !tasks.is_empty() {
            tracing::info!(pending = tasks.len(), "Waiting for signal tasks to finish");
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Signal task panicked");
            }
        }
        tracing::info!("Signal listener stopped");
    }

    fn dispatch(&self, tasks: &mut JoinSet<()>, signal: Signal) {
        tracing::info!(
            kind = %signal.kind,
            token = %signal.token_address,
            label = signal.label.as_deref().unwrap_or("-"),
            "Signal received"
        );

        let engine = Arc::clone(&self.engine);
        tasks.spawn(async move {
            let token = signal.token_address;
            let (kind, result) = match signal.kind {
                SignalKind::Buy => (TradeKind::Buy, engine.execute_buy(&token).await),
                SignalKind::Sell => (TradeKind::Sell, engine.execute_sell(&token).await),
            };
            if let Err(e) = result {
                report_failure(kind, &token, &e);
            }
        });
    }
}

/// Listener and monitor sharing one engine
pub struct SignalBot<S: SignalSource> {
    listener: SignalListener<S>,
    monitor: StopLossMonitor,
}

impl<S: SignalSource> SignalBot<S> {
    pub fn new(listener: SignalListener<S>, monitor: StopLossMonitor) -> Self {
        Self { listener, monitor }
    }

    /// Run both loops until shutdown, then wait for their in-flight work
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let listener_shutdown = shutdown.clone();
        tokio::join!(self.listener.run(listener_shutdown), self.monitor.run(shutdown));
        tracing::info!("Bot stopped");
    }
}
