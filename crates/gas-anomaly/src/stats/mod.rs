//! Streaming statistics for keyed observations
//!
//! This module provides:
//! - Exact integer square root
//! - Fixed-point smoothing factor
//! - Per-key exponentially weighted mean/variance with distance scoring

mod alpha;
mod isqrt;
mod key;
mod store;

pub use alpha::{Alpha, ALPHA_SCALE};
pub use isqrt::isqrt;
pub use key::StatKey;
pub use store::{StatEntry, StatisticsStore, StoreConfig, WarmupGate, ZERO_VARIANCE_DISTANCE};
