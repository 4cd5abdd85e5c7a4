//! Transaction evaluation pipeline
//!
//! For every transaction: derive the statistics key, fetch the receipt, score
//! gas used and gas price against their history, classify both distances
//! under the shared quota, then fold the new values into the history.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;
use malachite::Integer;
use tracing::debug;

use crate::classify::{Classifier, Quota};
use crate::error::{EngineError, Result};
use crate::finding::{Finding, Quantity};
use crate::models::{Receipt, TransactionEvent};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::stats::{StatKey, StatisticsStore, StoreConfig};

/// Source of transaction receipts
#[async_trait]
pub trait ReceiptLookup: Send + Sync {
    /// Fetch the receipt of the transaction with the given hash
    async fn receipt(&self, tx_hash: &str) -> anyhow::Result<Receipt>;
}

/// Receipts pushed in by the ingestion layer ahead of evaluation
///
/// Each receipt is handed out once.
#[derive(Default)]
pub struct InMemoryReceipts {
    receipts: DashMap<String, Receipt>,
}

impl InMemoryReceipts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx_hash: impl Into<String>, receipt: Receipt) {
        self.receipts.insert(tx_hash.into(), receipt);
    }

    /// Drop the receipt of `tx_hash` if it was never looked up
    pub fn remove(&self, tx_hash: &str) -> Option<Receipt> {
        self.receipts.remove(tx_hash).map(|(_, receipt)| receipt)
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

#[async_trait]
impl ReceiptLookup for InMemoryReceipts {
    async fn receipt(&self, tx_hash: &str) -> anyhow::Result<Receipt> {
        self.receipts
            .remove(tx_hash)
            .map(|(_, receipt)| receipt)
            .ok_or_else(|| anyhow!("no receipt for transaction {}", tx_hash))
    }
}

/// Evaluates transactions against gas used and gas price history
pub struct TransactionHandler {
    gas_used: StatisticsStore,
    gas_price: StatisticsStore,
    classifier: Classifier,
    quota: Arc<Quota>,
    receipts: Arc<dyn ReceiptLookup>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl TransactionHandler {
    /// Create a handler with one store per quantity, both built from `store_config`
    pub fn new(
        store_config: StoreConfig,
        classifier: Classifier,
        quota: Arc<Quota>,
        receipts: Arc<dyn ReceiptLookup>,
    ) -> Self {
        Self {
            gas_used: StatisticsStore::new(store_config.clone()),
            gas_price: StatisticsStore::new(store_config),
            classifier,
            quota,
            receipts,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("transaction-handler"),
        }
    }

    /// Set custom structured logger
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Evaluate one transaction
    ///
    /// Returns no findings once the quota is exhausted or when the transaction
    /// has no recipient. A failed receipt lookup or an unparsable quantity is
    /// returned as an error and leaves the statistics untouched.
    pub async fn handle(&self, event: &TransactionEvent) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        if self.quota.is_exhausted() {
            self.skip(&event.hash, "quota_exhausted");
            return Ok(findings);
        }

        let Some(key) = event.stat_key() else {
            self.skip(&event.hash, "no_recipient");
            return Ok(findings);
        };

        let gas_price = event.gas_price()?;
        let receipt = match self.receipts.receipt(&event.hash).await {
            Ok(receipt) => receipt,
            Err(source) => {
                self.metrics.inc_receipt_lookup_errors();
                self.logger
                    .log_lookup_failure(&event.hash, &format!("{:#}", source));
                return Err(EngineError::ReceiptLookup {
                    hash: event.hash.clone(),
                    source,
                });
            }
        };
        let gas_used = receipt.gas_used()?;

        let observations = [
            (Quantity::GasUsed, gas_used),
            (Quantity::GasPrice, gas_price),
        ];

        let mut scored = Vec::with_capacity(observations.len());
        for (quantity, value) in observations {
            let distance = self.store(quantity).observe(&key, &value)?;
            self.metrics.inc_observations(quantity);
            debug!(
                tx_hash = %event.hash,
                key = %key,
                quantity = %quantity,
                value = %value,
                distance = %distance,
                "Scored observation"
            );
            scored.push((quantity, value, distance));
        }

        for (quantity, value, distance) in scored {
            if let Some(severity) = self.classifier.classify(&distance, &self.quota) {
                let finding = Finding::new(quantity, severity, &event.hash, &value, &distance);
                self.metrics.inc_findings(quantity, severity);
                self.logger.log_finding(&event.hash, quantity, &finding);
                findings.push(finding);
            }
        }

        self.refresh_gauges();
        Ok(findings)
    }

    /// Fold history into both stores without scoring it
    pub fn seed(&self, key: &StatKey, gas_used: &Integer, gas_price: &Integer) -> Result<()> {
        self.gas_used.update(key, gas_used)?;
        self.gas_price.update(key, gas_price)?;
        Ok(())
    }

    /// Statistics of one quantity
    pub fn store(&self, quantity: Quantity) -> &StatisticsStore {
        match quantity {
            Quantity::GasUsed => &self.gas_used,
            Quantity::GasPrice => &self.gas_price,
        }
    }

    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn skip(&self, tx_hash: &str, reason: &str) {
        self.metrics.inc_skipped(reason);
        self.logger.log_skipped(tx_hash, reason);
    }

    fn refresh_gauges(&self) {
        for quantity in Quantity::ALL {
            let store = self.store(quantity);
            self.metrics.set_keys(quantity, store.len(), store.evictions());
        }
        self.metrics.set_quota_remaining(self.quota.remaining());
    }
}
