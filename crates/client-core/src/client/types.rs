//! Type definitions for the client-core library
//!
//! This module contains the data structures exchanged between the
//! [`SessionCoordinator`](super::SessionCoordinator), the external protocol
//! client and presentation layers.
//!
//! # Type Categories
//!
//! - **Protocol records** - [`Pairing`], [`Session`], [`SessionNamespace`]
//! - **Proposal types** - [`RequiredNamespaces`], [`NamespaceRequirement`], [`AppMetadata`]
//! - **Lifecycle results** - [`ConnectOutcome`], [`DisconnectOutcome`], [`CoordinatorState`]
//! - **Notifications** - [`SessionEvent`]
//!
//! # Deriving Accounts
//!
//! ```rust
//! use ledgerlink_client_core::{derive_accounts, Session, SessionNamespace};
//!
//! let mut session = Session::new("topic-1");
//! let xrpl = SessionNamespace::with_accounts(["xrpl:0:rABC"]);
//! let evm = SessionNamespace::with_accounts(["eip155:7672:0xDEF"]);
//! session.namespaces.insert("xrpl".to_string(), xrpl);
//! session.namespaces.insert("eip155".to_string(), evm);
//!
//! assert_eq!(derive_accounts(&session), vec!["xrpl:0:rABC", "eip155:7672:0xDEF"]);
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::caip::ChainId;
use crate::error::ClientError;

// ===== METADATA =====

/// Metadata describing this application to the remote wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name shown in the wallet
    pub name: String,
    /// Short description shown in the wallet
    pub description: String,
    /// Origin URL of the application
    pub url: String,
    /// Icon URLs
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "LedgerLink".to_string(),
            description: "Wallet pairing example for XRPL and EVM networks".to_string(),
            url: "http://localhost".to_string(),
            icons: Vec::new(),
        }
    }
}

/// Reason code attached to protocol-level notices such as disconnects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkReason {
    /// Numeric protocol code
    pub code: u32,
    /// Human-readable message
    pub message: String,
}

impl SdkReason {
    /// The standard "user disconnected" reason
    pub fn user_disconnected() -> Self {
        Self {
            code: 6000,
            message: "User disconnected.".to_string(),
        }
    }
}

// ===== PROTOCOL RECORDS =====

/// A transport pairing known to the protocol client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Pairing topic
    pub topic: String,
    /// Whether the pairing has completed and is usable
    pub active: bool,
    /// Unix timestamp (seconds) after which the pairing is discarded
    pub expiry: i64,
    /// Metadata of the paired peer, once known
    #[serde(default)]
    pub peer_metadata: Option<AppMetadata>,
}

/// Accounts and permissions granted for one namespace of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNamespace {
    /// Account identifiers of the form `namespace:reference:address`
    pub accounts: Vec<String>,
    /// Request methods the wallet accepts
    #[serde(default)]
    pub methods: Vec<String>,
    /// Events the wallet may emit
    #[serde(default)]
    pub events: Vec<String>,
}

impl SessionNamespace {
    /// Namespace granting only the given accounts
    pub fn with_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: accounts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// An approved connection with a remote wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session topic; every request and disconnect is scoped to it
    pub topic: String,
    /// Granted namespaces in the order the wallet listed them
    pub namespaces: IndexMap<String, SessionNamespace>,
    /// Unix timestamp (seconds) at which the session expires
    pub expiry: i64,
    /// Metadata of the wallet
    #[serde(default)]
    pub peer_metadata: Option<AppMetadata>,
}

impl Session {
    /// Empty session for the given topic, expiring in seven days
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            namespaces: IndexMap::new(),
            expiry: Utc::now().timestamp() + 7 * 24 * 60 * 60,
            peer_metadata: None,
        }
    }

    /// Whether the session expiry lies before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now.timestamp()
    }
}

/// Flatten every namespace's account list into one deduplicated list
///
/// Order is first occurrence, namespaces in session order.
pub fn derive_accounts(session: &Session) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut accounts = Vec::new();
    for namespace in session.namespaces.values() {
        for account in &namespace.accounts {
            if seen.insert(account.as_str()) {
                accounts.push(account.clone());
            }
        }
    }
    accounts
}

// ===== PROPOSAL TYPES =====

/// Capabilities requested for one namespace in a session proposal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRequirement {
    /// Chains the session must cover
    pub chains: Vec<ChainId>,
    /// Request methods the application will call
    pub methods: Vec<String>,
    /// Events the application subscribes to
    pub events: Vec<String>,
}

/// Required namespaces of a session proposal, keyed by namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredNamespaces(pub IndexMap<String, NamespaceRequirement>);

impl RequiredNamespaces {
    /// Add or replace the requirement for a namespace
    pub fn insert(&mut self, namespace: impl Into<String>, requirement: NamespaceRequirement) {
        self.0.insert(namespace.into(), requirement);
    }

    /// Requirement for a namespace
    pub fn get(&self, namespace: &str) -> Option<&NamespaceRequirement> {
        self.0.get(namespace)
    }

    /// All required chains, flattened in declaration order
    pub fn chains(&self) -> Vec<ChainId> {
        self.0.values().flat_map(|req| req.chains.iter().cloned()).collect()
    }

    /// Whether nothing is required
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that each requirement only lists chains of its own namespace
    pub fn validate(&self) -> Result<(), ClientError> {
        for (namespace, requirement) in &self.0 {
            if requirement.chains.is_empty() {
                return Err(ClientError::InvalidConfiguration {
                    field: format!("required_namespaces.{}", namespace),
                    reason: "at least one chain is required".to_string(),
                });
            }
            if let Some(chain) = requirement.chains.iter().find(|c| c.namespace() != namespace) {
                return Err(ClientError::InvalidConfiguration {
                    field: format!("required_namespaces.{}", namespace),
                    reason: format!("chain {} belongs to another namespace", chain),
                });
            }
        }
        Ok(())
    }
}

// ===== LIFECYCLE RESULTS =====

/// Result of [`SessionCoordinator::connect`](super::SessionCoordinator::connect)
///
/// Connect never returns `Err`; failures are reported here after being
/// logged, and leave coordinator state untouched.
#[must_use]
#[derive(Debug)]
pub enum ConnectOutcome {
    /// No protocol client exists yet, so no handshake was attempted
    NoClient,
    /// The wallet approved and the session was adopted
    Connected(Session),
    /// The handshake failed; no session was adopted
    Failed(ClientError),
}

impl ConnectOutcome {
    /// Whether a session was adopted
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Result of [`SessionCoordinator::disconnect`](super::SessionCoordinator::disconnect)
#[must_use]
#[derive(Debug)]
pub enum DisconnectOutcome {
    /// There was no session (or no client); nothing changed
    NoSession,
    /// The wallet was notified and local state was reset
    Disconnected { topic: String },
    /// The notice failed; local state was reset anyway
    ResetAfterError { topic: String, error: ClientError },
}

/// Coarse lifecycle state of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// No protocol client and no initialization in flight
    Uninitialized,
    /// Protocol client construction in flight
    Initializing,
    /// Client ready, no session
    Ready,
    /// Client ready with an adopted session
    Connected,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

// ===== NOTIFICATIONS =====

/// Session notifications raised by the protocol client outside of any call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session reached its expiry
    Expired { topic: String },
    /// The wallet deleted the session
    Deleted { topic: String },
    /// The wallet changed the granted namespaces
    Updated {
        topic: String,
        namespaces: IndexMap<String, SessionNamespace>,
    },
}

impl SessionEvent {
    /// Topic the event refers to
    pub fn topic(&self) -> &str {
        match self {
            Self::Expired { topic } | Self::Deleted { topic } | Self::Updated { topic, .. } => {
                topic
            }
        }
    }
}
