//! Composite key identifying a monitored population

use serde::{Deserialize, Serialize};

/// `(network, address, signature)` triple
///
/// Components are compared as exact strings. No case or zero-padding
/// normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatKey {
    pub network: String,
    pub address: String,
    pub signature: String,
}

impl StatKey {
    pub fn new(
        network: impl Into<String>,
        address: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
            signature: signature.into(),
        }
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.network, self.address, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_compare_exactly() {
        let a = StatKey::new("1", "0xdac17f958d2ee523a2206206994597c13d831ec7", "0xa9059cbb");
        let b = StatKey::new("1", "0xDAC17F958D2EE523A2206206994597C13D831EC7", "0xa9059cbb");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.to_string(), "1/0xdac17f958d2ee523a2206206994597c13d831ec7/0xa9059cbb");
    }
}
