//! Chain and account identifiers
//!
//! Chains are addressed as `namespace:reference` (e.g. `xrpl:0`,
//! `eip155:7672`) and accounts as `namespace:reference:address`
//! (e.g. `xrpl:0:rGA3kwmB5hBnvs6VW1fnGKysJfBCUazDrD`). Both serialize as
//! their plain string form.
//!
//! ```rust
//! use ledgerlink_client_core::caip::{AccountId, ChainId};
//!
//! let chain: ChainId = "eip155:7672".parse().unwrap();
//! assert_eq!(chain.namespace(), "eip155");
//!
//! let account: AccountId = "xrpl:0:rABC".parse().unwrap();
//! assert_eq!(account.address(), "rABC");
//! assert_eq!(account.chain_id().to_string(), "xrpl:0");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ClientError;

/// Namespace of XRP-style ledgers
pub const XRPL_NAMESPACE: &str = "xrpl";

/// Namespace of EVM-compatible chains
pub const EIP155_NAMESPACE: &str = "eip155";

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// A `namespace:reference` chain identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Build a chain id from its parts
    pub fn new(
        namespace: impl Into<String>,
        reference: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let namespace = namespace.into();
        let reference = reference.into();
        if !valid_segment(&namespace) || !valid_segment(&reference) {
            return Err(ClientError::InvalidChainId {
                value: format!("{}:{}", namespace, reference),
                reason: "namespace and reference must be non-empty identifiers".to_string(),
            });
        }
        Ok(Self { namespace, reference })
    }

    /// Chain id from parts known to be well-formed
    pub(crate) fn from_static(namespace: &'static str, reference: &'static str) -> Self {
        Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    /// Ledger family, e.g. `xrpl`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Network reference within the family, e.g. `0` or `7672`
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl FromStr for ChainId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !reference.contains(':') => {
                Self::new(namespace, reference)
            }
            _ => Err(ClientError::InvalidChainId {
                value: s.to_string(),
                reason: "expected namespace:reference".to_string(),
            }),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// A `namespace:reference:address` account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    chain_id: ChainId,
    address: String,
}

impl AccountId {
    /// Build an account id on the given chain
    pub fn new(chain_id: ChainId, address: impl Into<String>) -> Result<Self, ClientError> {
        let address = address.into();
        if address.is_empty() || address.contains(':') {
            return Err(ClientError::InvalidAccountId {
                value: format!("{}:{}", chain_id, address),
                reason: "address must be non-empty and contain no ':'".to_string(),
            });
        }
        Ok(Self { chain_id, address })
    }

    /// Chain the account lives on
    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    /// Ledger family of the account
    pub fn namespace(&self) -> &str {
        self.chain_id.namespace()
    }

    /// Bare ledger address, e.g. `rABC` or `0xDEF`
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl FromStr for AccountId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(reference), Some(address)) => {
                let chain_id = ChainId::new(namespace, reference).map_err(|_| {
                    ClientError::InvalidAccountId {
                        value: s.to_string(),
                        reason: "invalid chain prefix".to_string(),
                    }
                })?;
                Self::new(chain_id, address)
            }
            _ => Err(ClientError::InvalidAccountId {
                value: s.to_string(),
                reason: "expected namespace:reference:address".to_string(),
            }),
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.address)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(ChainId);
string_serde!(AccountId);
