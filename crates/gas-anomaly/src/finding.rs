//! Alert records handed to the publishing layer

use std::collections::BTreeMap;

use malachite::Integer;
use serde::{Deserialize, Serialize};

use crate::classify::Severity;

/// Observed quantity of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    GasUsed,
    GasPrice,
}

impl Quantity {
    pub const ALL: [Quantity; 2] = [Quantity::GasUsed, Quantity::GasPrice];

    /// Finding name
    pub fn finding_name(&self) -> &'static str {
        match self {
            Quantity::GasUsed => "High Gas Used",
            Quantity::GasPrice => "High Gas Price",
        }
    }

    pub fn alert_id(&self) -> &'static str {
        match self {
            Quantity::GasUsed => "FORTA-1",
            Quantity::GasPrice => "FORTA-2",
        }
    }

    /// Metadata field carrying the observed value
    pub fn metadata_field(&self) -> &'static str {
        match self {
            Quantity::GasUsed => "gasUsed",
            Quantity::GasPrice => "gasPrice",
        }
    }

    fn description_label(&self) -> &'static str {
        match self {
            Quantity::GasUsed => "Gas used",
            Quantity::GasPrice => "Gas price",
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::GasUsed => "gas_used",
            Quantity::GasPrice => "gas_price",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingType {
    Suspicious,
}

/// Structured alert for one anomalous quantity of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub name: String,
    /// Human-readable message referencing the transaction hash
    pub description: String,
    pub alert_id: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    /// Decimal encoded value and distance
    pub metadata: BTreeMap<String, String>,
}

impl Finding {
    pub fn new(
        quantity: Quantity,
        severity: Severity,
        tx_hash: &str,
        value: &Integer,
        distance: &Integer,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(quantity.metadata_field().to_string(), value.to_string());
        metadata.insert("distance".to_string(), distance.to_string());

        Self {
            name: quantity.finding_name().to_string(),
            description: format!(
                "{} in transaction {} is {}",
                quantity.description_label(),
                tx_hash,
                value
            ),
            alert_id: quantity.alert_id().to_string(),
            severity,
            finding_type: FindingType::Suspicious,
            metadata,
        }
    }
}
