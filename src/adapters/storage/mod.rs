//! Position Storage Adapter
//!
//! File-backed implementation of the PositionStore port.

mod json_store;

pub use json_store::{JsonPositionStore, POSITIONS_FILE};
