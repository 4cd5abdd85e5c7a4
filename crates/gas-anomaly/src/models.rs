//! Core data models for transaction evaluation

use malachite::base::num::conversion::traits::FromStringBase;
use malachite::Integer;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::stats::StatKey;

/// Transaction as delivered by the ingestion layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    /// Network (chain) identifier
    pub network: String,
    pub hash: String,
    pub from: String,
    /// Recipient, `None` for contract creation
    pub to: Option<String>,
    /// Raw call data, hex encoded
    pub data: String,
    /// Gas price as `0x` hex or decimal string
    pub gas_price: String,
}

impl TransactionEvent {
    /// Statistics key of this transaction, `None` without a recipient
    pub fn stat_key(&self) -> Option<StatKey> {
        let to = self.to.as_ref()?;
        Some(StatKey::new(
            self.network.clone(),
            to.clone(),
            function_selector(&self.data),
        ))
    }

    pub fn gas_price(&self) -> Result<Integer> {
        parse_quantity(&self.gas_price)
    }
}

/// Execution receipt of a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Gas consumed as `0x` hex or decimal string
    pub gas_used: String,
}

impl Receipt {
    pub fn gas_used(&self) -> Result<Integer> {
        parse_quantity(&self.gas_used)
    }
}

/// Function selector prefix of call data
///
/// Four bytes of hex: 10 characters with a `0x` prefix, 8 without. Shorter
/// call data is returned whole.
pub fn function_selector(data: &str) -> &str {
    let length = if data.starts_with("0x") { 10 } else { 8 };
    match data.char_indices().nth(length) {
        Some((end, _)) => &data[..end],
        None => data,
    }
}

/// Parse a non-negative quantity from `0x` hex or decimal
pub fn parse_quantity(raw: &str) -> Result<Integer> {
    let trimmed = raw.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };

    // from_string_base accepts a sign, quantities never carry one
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(EngineError::InvalidQuantity(raw.to_string()));
    }

    Integer::from_string_base(radix as u8, digits)
        .ok_or_else(|| EngineError::InvalidQuantity(raw.to_string()))
}
