//! Gas anomaly scoring engine
//!
//! This crate provides the core functionality for:
//! - Per-key exponentially weighted statistics in exact integer arithmetic
//! - Distance scoring and severity classification
//! - Quota-bounded alert emission
//! - Transaction evaluation against gas used and gas price history
//! - Metrics and structured logging

pub mod classify;
pub mod error;
pub mod finding;
pub mod handler;
pub mod models;
pub mod observability;
pub mod stats;

pub use classify::{Classifier, Quota, Severity, Thresholds};
pub use error::{EngineError, Result};
pub use finding::{Finding, FindingType, Quantity};
pub use handler::{InMemoryReceipts, ReceiptLookup, TransactionHandler};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use stats::{Alpha, StatEntry, StatKey, StatisticsStore, StoreConfig, WarmupGate};

/// Arbitrary precision integer used for all observed values and distances
pub use malachite::Integer;
