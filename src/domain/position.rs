use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One open position per held token.
///
/// Field names on disk follow the record format the bot has always
/// written (`address`, `current_tp_level`, `initialTokenBalance`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "address")]
    pub token_address: String,
    /// Remaining take-profit levels, counts down from the ladder size to 1
    pub current_tp_level: u8,
    /// Token amount (raw units) received by the entry swap
    #[serde(rename = "initialTokenBalance")]
    pub initial_token_amount: u64,
    /// Native amount spent on entry, in lamports
    pub entry_lamports: u64,
    #[serde(default)]
    pub entry_signature: Option<String>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("Take-profit ladder cannot be empty")]
    EmptyLadder,
    #[error("Take-profit ladder supports at most {max} levels, got {got}")]
    TooManyLevels { max: usize, got: usize },
    #[error("Invalid take-profit percentage at level {level}: {pct} (must be 1-100)")]
    InvalidPercentage { level: usize, pct: u8 },
    #[error("Final take-profit level must sell 100%, got {0}%")]
    FinalLevelNotFull(u8),
    #[error("Level {level} is outside the ladder (1..={max})")]
    LevelOutOfRange { level: u8, max: u8 },
}

impl Position {
    /// A fresh position starts at the top of the ladder
    pub fn open(
        token_address: impl Into<String>,
        max_level: u8,
        initial_token_amount: u64,
        entry_lamports: u64,
    ) -> Self {
        Self {
            token_address: token_address.into(),
            current_tp_level: max_level,
            initial_token_amount,
            entry_lamports,
            entry_signature: None,
            opened_at: Utc::now(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.entry_signature = Some(signature.into());
        self
    }

    /// True once at least one take-profit level has been sold
    pub fn take_profit_hit(&self, max_level: u8) -> bool {
        self.current_tp_level < max_level
    }

    pub fn is_final_level(&self) -> bool {
        self.current_tp_level == 1
    }
}

/// What happens to a position after a confirmed partial exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTransition {
    /// Move down to the given level
    Decrement(u8),
    /// Final level sold, remove the record
    Close,
}

/// Partial-exit percentages, first entry sold at the first take-profit.
///
/// Percentages apply to the balance held at the time of each exit, so
/// `[25, 33, 50, 100]` sells roughly a quarter of the original bag at
/// every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeProfitLadder {
    percentages: Vec<u8>,
}

impl TakeProfitLadder {
    pub fn new(percentages: Vec<u8>) -> Result<Self, PositionError> {
        if percentages.is_empty() {
            return Err(PositionError::EmptyLadder);
        }
        if percentages.len() > u8::MAX as usize {
            return Err(PositionError::TooManyLevels {
                max: u8::MAX as usize,
                got: percentages.len(),
            });
        }
        for (i, pct) in percentages.iter().enumerate() {
            if *pct == 0 || *pct > 100 {
                return Err(PositionError::InvalidPercentage { level: i + 1, pct: *pct });
            }
        }
        let last = percentages[percentages.len() - 1];
        if last != 100 {
            return Err(PositionError::FinalLevelNotFull(last));
        }
        Ok(Self { percentages })
    }

    pub fn max_level(&self) -> u8 {
        self.percentages.len() as u8
    }

    pub fn percentages(&self) -> &[u8] {
        &self.percentages
    }

    /// 1-based take-profit step that a sell at `current_level` realizes
    pub fn step(&self, current_level: u8) -> Result<u8, PositionError> {
        self.check_level(current_level)?;
        Ok(self.max_level() - current_level + 1)
    }

    /// Percentage of the held balance to sell at `current_level`
    pub fn exit_percentage(&self, current_level: u8) -> Result<u8, PositionError> {
        self.check_level(current_level)?;
        Ok(self.percentages[(self.max_level() - current_level) as usize])
    }

    /// Raw token amount to sell from `balance` at `current_level`
    pub fn sell_amount(&self, balance: u64, current_level: u8) -> Result<u64, PositionError> {
        let pct = self.exit_percentage(current_level)?;
        Ok((balance as u128 * pct as u128 / 100) as u64)
    }

    pub fn transition(&self, current_level: u8) -> Result<LevelTransition, PositionError> {
        self.check_level(current_level)?;
        if current_level == 1 {
            Ok(LevelTransition::Close)
        } else {
            Ok(LevelTransition::Decrement(current_level - 1))
        }
    }

    fn check_level(&self, level: u8) -> Result<(), PositionError> {
        if level == 0 || level > self.max_level() {
            return Err(PositionError::LevelOutOfRange {
                level,
                max: self.max_level(),
            });
        }
        Ok(())
    }
}

impl Default for TakeProfitLadder {
    fn default() -> Self {
        Self {
            percentages: vec![25, 33, 50, 100],
        }
    }
}

/// Level-dependent protective floor.
///
/// Before any take-profit the floor is `entry * multiplier`; after the
/// first take-profit it rises to break-even. Only a value strictly below
/// the floor counts as a breach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLossPolicy {
    multiplier: Decimal,
}

impl StopLossPolicy {
    pub fn new(multiplier: Decimal) -> Self {
        Self { multiplier }
    }

    pub fn multiplier(&self) -> Decimal {
        self.multiplier
    }

    /// Floor in lamports for `position`
    pub fn floor(&self, position: &Position, max_level: u8) -> Decimal {
        let entry = Decimal::from(position.entry_lamports);
        if position.take_profit_hit(max_level) {
            entry
        } else {
            entry * self.multiplier
        }
    }

    pub fn is_breached(&self, position: &Position, current_value_lamports: u64, max_level: u8) -> bool {
        Decimal::from(current_value_lamports) < self.floor(position, max_level)
    }
}
