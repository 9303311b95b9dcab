//! Seams to the external wallet-pairing protocol client
//!
//! The coordinator never speaks the pairing wire protocol itself. Relay
//! transport, encryption and URI encoding live behind [`PairingClient`],
//! which is constructed by a [`PairingClientFactory`]. Pairing URIs are shown
//! to the user through an [`ApprovalPrompt`].
//!
//! # Implementing a client
//!
//! ```rust
//! use async_trait::async_trait;
//! use futures::FutureExt;
//! use ledgerlink_client_core::protocol::{
//!     ConnectParams, PairingClient, PendingApproval, SessionRequest,
//! };
//! use ledgerlink_client_core::{ClientError, ClientResult, Pairing, SdkReason, Session};
//!
//! struct OfflineClient;
//!
//! #[async_trait]
//! impl PairingClient for OfflineClient {
//!     async fn connect(&self, _params: ConnectParams) -> ClientResult<PendingApproval> {
//!         Ok(PendingApproval {
//!             uri: None,
//!             approval: async { Err(ClientError::handshake("offline")) }.boxed(),
//!         })
//!     }
//!
//!     async fn disconnect(&self, _topic: &str, _reason: SdkReason) -> ClientResult<()> {
//!         Ok(())
//!     }
//!
//!     async fn request(&self, request: SessionRequest) -> ClientResult<serde_json::Value> {
//!         Err(ClientError::request(request.method(), "offline"))
//!     }
//!
//!     fn active_pairings(&self) -> Vec<Pairing> {
//!         Vec::new()
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::caip::ChainId;
use crate::client::config::ClientConfig;
use crate::client::types::{Pairing, RequiredNamespaces, SdkReason, Session};
use crate::error::ClientResult;

/// Parameters of a connection handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Existing pairing to reuse instead of creating a new one
    pub pairing_topic: Option<String>,
    /// Capabilities the session must grant
    pub required_namespaces: RequiredNamespaces,
}

/// A handshake awaiting the wallet's decision
pub struct PendingApproval {
    /// URI to show the user when a new pairing was created
    pub uri: Option<String>,
    /// Resolves once the wallet approves or rejects
    pub approval: BoxFuture<'static, ClientResult<Session>>,
}

impl fmt::Debug for PendingApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingApproval")
            .field("uri", &self.uri)
            .finish_non_exhaustive()
    }
}

/// JSON-RPC style method call carried inside a session request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    /// Method name, e.g. `xrpl_signTransaction`
    pub method: String,
    /// Method parameters
    pub params: serde_json::Value,
}

/// A request scoped to a session topic and chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Session the request belongs to
    pub topic: String,
    /// Chain the request targets
    #[serde(rename = "chainId")]
    pub chain_id: ChainId,
    /// Method and parameters
    pub request: RequestArguments,
}

impl SessionRequest {
    /// Build a request for `method` on `chain_id` within `topic`
    pub fn new(
        topic: impl Into<String>,
        chain_id: ChainId,
        method: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            chain_id,
            request: RequestArguments {
                method: method.into(),
                params,
            },
        }
    }

    /// Method name of the carried call
    pub fn method(&self) -> &str {
        &self.request.method
    }
}

/// An initialized wallet-pairing protocol client
#[async_trait]
pub trait PairingClient: Send + Sync {
    /// Propose a session, optionally over an existing pairing
    async fn connect(&self, params: ConnectParams) -> ClientResult<PendingApproval>;

    /// Notify the wallet that the session identified by `topic` is over
    async fn disconnect(&self, topic: &str, reason: SdkReason) -> ClientResult<()>;

    /// Send a request and wait for the wallet's response
    async fn request(&self, request: SessionRequest) -> ClientResult<serde_json::Value>;

    /// Pairings that are currently active
    fn active_pairings(&self) -> Vec<Pairing>;
}

/// Constructs protocol clients from process configuration
#[async_trait]
pub trait PairingClientFactory: Send + Sync {
    /// Build and initialize a client
    async fn create(&self, config: &ClientConfig) -> ClientResult<Arc<dyn PairingClient>>;
}

/// Presents pairing URIs to the user for out-of-band approval
pub trait ApprovalPrompt: Send + Sync {
    /// Show the URI together with the chains being requested
    fn open(&self, uri: &str, chains: &[ChainId]);

    /// Dismiss the prompt
    fn close(&self);
}

/// Prompt that shows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrompt;

impl ApprovalPrompt for NoopPrompt {
    fn open(&self, _uri: &str, _chains: &[ChainId]) {}

    fn close(&self) {}
}

/// Prompt that writes the pairing URI to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPrompt;

impl ApprovalPrompt for LogPrompt {
    fn open(&self, uri: &str, chains: &[ChainId]) {
        let chains: Vec<String> = chains.iter().map(|c| c.to_string()).collect();
        info!(uri = %uri, chains = ?chains, "Approve the connection in your wallet");
    }

    fn close(&self) {
        info!("Connection prompt closed");
    }
}
