//! Application Layer
//!
//! - `engine`: buy/sell/stop-loss execution against the ports
//! - `monitor`: stop-loss scanning loop
//! - `bot`: channel listener plus monitor, with shutdown
//! - `locks`: per-token exclusion and in-flight tracking

pub mod bot;
pub mod engine;
pub mod locks;
pub mod monitor;

pub use bot::{SignalBot, SignalListener};
pub use engine::{
    explorer_url, report_failure, EngineError, EngineSettings, ExecutionEngine, StopLossCheck,
    TradeKind, TradeReport,
};
pub use locks::{InFlightGuard, InFlightSet, TokenLocks};
pub use monitor::{CycleSummary, StopLossMonitor};
