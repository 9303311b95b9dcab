//! Supported networks
//!
//! The coordinator proposes sessions covering a fixed set of networks: two
//! XRP ledger networks and two EVM networks of The Root Network. This module
//! holds that table and derives the default session proposal from it.
//!
//! ```rust
//! use ledgerlink_client_core::network::{Network, default_required_namespaces};
//!
//! let network = Network::from_chain_id(&"xrpl:1".parse().unwrap()).unwrap();
//! assert_eq!(network.display_name(), "XRPL Testnet");
//!
//! let required = default_required_namespaces();
//! assert_eq!(required.chains().len(), 4);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::caip::{ChainId, EIP155_NAMESPACE, XRPL_NAMESPACE};
use crate::client::types::{NamespaceRequirement, RequiredNamespaces};

/// `xrpl_signTransaction`: sign (and optionally autofill/submit) an XRPL transaction
pub const XRPL_SIGN_TRANSACTION: &str = "xrpl_signTransaction";

/// `eth_sendTransaction`: sign and broadcast an EVM transaction
pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";

/// `personal_sign`: sign an arbitrary message with an EVM account
pub const PERSONAL_SIGN: &str = "personal_sign";

/// A network the coordinator knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// `xrpl:0`
    XrplMainnet,
    /// `xrpl:1`
    XrplTestnet,
    /// `eip155:7668`
    TrnMainnet,
    /// `eip155:7672`
    TrnPorcini,
}

impl Network {
    /// Every supported network, in display order
    pub const ALL: [Network; 4] = [
        Network::XrplMainnet,
        Network::XrplTestnet,
        Network::TrnMainnet,
        Network::TrnPorcini,
    ];

    /// Namespace (ledger family) of this network
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::XrplMainnet | Self::XrplTestnet => XRPL_NAMESPACE,
            Self::TrnMainnet | Self::TrnPorcini => EIP155_NAMESPACE,
        }
    }

    /// Chain reference within the namespace
    pub fn reference(&self) -> &'static str {
        match self {
            Self::XrplMainnet => "0",
            Self::XrplTestnet => "1",
            Self::TrnMainnet => "7668",
            Self::TrnPorcini => "7672",
        }
    }

    /// Chain identifier, e.g. `eip155:7672`
    pub fn chain_id(&self) -> ChainId {
        ChainId::from_static(self.namespace(), self.reference())
    }

    /// Human-readable network name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::XrplMainnet => "XRPL Mainnet",
            Self::XrplTestnet => "XRPL Testnet",
            Self::TrnMainnet => "TRN Mainnet",
            Self::TrnPorcini => "TRN Porcini",
        }
    }

    /// Look up a network by chain id
    pub fn from_chain_id(chain_id: &ChainId) -> Option<Self> {
        Self::ALL.into_iter().find(|n| {
            n.namespace() == chain_id.namespace() && n.reference() == chain_id.reference()
        })
    }

    /// Methods the coordinator calls on this network's namespace
    pub fn methods(&self) -> &'static [&'static str] {
        match self.namespace() {
            XRPL_NAMESPACE => &[XRPL_SIGN_TRANSACTION],
            _ => &[ETH_SEND_TRANSACTION, PERSONAL_SIGN],
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The session proposal covering every [`Network`]
///
/// One entry per namespace, chains in [`Network::ALL`] order, no events.
pub fn default_required_namespaces() -> RequiredNamespaces {
    let mut required = RequiredNamespaces::default();
    for network in Network::ALL {
        let entry = required
            .0
            .entry(network.namespace().to_string())
            .or_insert_with(|| NamespaceRequirement {
                chains: Vec::new(),
                methods: network.methods().iter().map(|m| m.to_string()).collect(),
                events: Vec::new(),
            });
        entry.chains.push(network.chain_id());
    }
    required
}
