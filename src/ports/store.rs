use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Position;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Position already exists for {0}")]
    AlreadyExists(String),

    #[error("Failed to serialize positions: {0}")]
    SerializationError(String),

    #[error("Failed to write positions file: {0}")]
    WriteError(String),

    #[error("Failed to read positions file: {0}")]
    ReadError(String),

    #[error("Positions file is corrupted: {0}")]
    CorruptedFile(String),
}

/// Durable mapping from token address to its open position.
///
/// Implementations serialize their own writes; `decrement_level` is a
/// compare-and-set so a stale reader can never double-decrement.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Insert a new record, failing with `AlreadyExists` if one is present
    async fn create(&self, position: Position) -> Result<(), StoreError>;

    async fn get(&self, token_address: &str) -> Result<Option<Position>, StoreError>;

    async fn all(&self) -> Result<Vec<Position>, StoreError>;

    /// Decrement the level by one if it still equals `expected_level`.
    ///
    /// Returns the updated record, or `None` when the record is missing or
    /// its level has moved on.
    async fn decrement_level(
        &self,
        token_address: &str,
        expected_level: u8,
    ) -> Result<Option<Position>, StoreError>;

    /// Remove a record; `false` if nothing was there
    async fn delete(&self, token_address: &str) -> Result<bool, StoreError>;
}
