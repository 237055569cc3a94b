//! Per-token exclusion.
//!
//! `TokenLocks` serializes every read-quote-submit-mutate sequence on one
//! token address while letting different tokens proceed concurrently.
//! `InFlightSet` marks tokens with a stop-loss exit already running so the
//! monitor does not spawn a second one.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct TokenLocks {
    locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TokenLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `token`
    pub async fn lock(&self, token: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // drop entries nobody holds or waits on
            locks.retain(|key, lock| key == token || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(token.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of tracked tokens
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    tokens: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `token`; `None` if it is already in flight
    pub fn try_claim(&self, token: &str) -> Option<InFlightGuard> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if !tokens.insert(token.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            token: token.to_string(),
            tokens: Arc::clone(&self.tokens),
        })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the claim on drop
#[derive(Debug)]
pub struct InFlightGuard {
    token: String,
    tokens: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.token);
    }
}
