//! Domain Layer - Core business logic for the signal ladder bot
//!
//! Pure types and rules with no I/O. All external interactions happen
//! through the ports layer.
//!
//! - `signal`: channel text → buy/sell signal
//! - `position`: open position record, take-profit ladder, stop-loss floor

pub mod signal;
pub mod position;

pub use signal::{Signal, SignalKind, SignalMarkers, SignalParser};
pub use position::{LevelTransition, Position, PositionError, StopLossPolicy, TakeProfitLadder};
