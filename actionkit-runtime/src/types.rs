use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Network descriptor supplied by the caller: which chain family and which
/// network within it an action targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub protocol_family: String,
    pub network_id: String,
}

impl Network {
    pub fn new(protocol_family: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            protocol_family: protocol_family.into(),
            network_id: network_id.into(),
        }
    }

    /// Shorthand for an EVM network.
    pub fn evm(network_id: impl Into<String>) -> Self {
        Self::new("evm", network_id)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.protocol_family, self.network_id)
    }
}

/// Static allow-list a provider declares for the networks it can act on.
#[derive(Debug, Clone, Copy)]
pub enum NetworkGate {
    /// Protocol family must match and the network id must be listed.
    Family {
        protocol_family: &'static str,
        network_ids: &'static [&'static str],
    },
    /// Only the network id is checked.
    NetworkIds(&'static [&'static str]),
}

impl NetworkGate {
    pub fn allows(&self, network: &Network) -> bool {
        match self {
            NetworkGate::Family {
                protocol_family,
                network_ids,
            } => {
                network.protocol_family == *protocol_family
                    && network_ids.contains(&network.network_id.as_str())
            }
            NetworkGate::NetworkIds(network_ids) => {
                network_ids.contains(&network.network_id.as_str())
            }
        }
    }
}

/// Contract call produced by a calldata builder, consumed once by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Bytes,
}

/// Identifier the wallet hands back after broadcasting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque confirmation record. Only ever serialized back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionReceipt(pub serde_json::Value);

impl std::fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A submitted and confirmed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub tx_id: TransactionId,
    pub receipt: TransactionReceipt,
}

/// Integer amount in the token's smallest unit, kept as the digit string the
/// caller supplied until calldata is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeiAmount(String);

impl WeiAmount {
    /// Parse into a `uint256`. Values that do not fit are a build error,
    /// never truncated.
    pub fn to_u256(&self) -> Result<U256, ActionError> {
        U256::from_str_radix(&self.0, 10)
            .map_err(|e| ActionError::build(format!("amount '{}' is not a uint256: {e}", self.0)))
    }
}

impl std::fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
