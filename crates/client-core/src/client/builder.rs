//! Coordinator builder
//!
//! This module provides a fluent builder for constructing a
//! [`SessionCoordinator`]. The builder collects configuration, the protocol
//! client factory and the approval prompt, validates them and hands back a
//! shareable coordinator.
//!
//! # Examples
//!
//! ## Basic Setup
//!
//! ```rust
//! use ledgerlink_client_core::CoordinatorBuilder;
//! use ledgerlink_client_core::sim::{SimulatedWallet, SimulatedWalletFactory};
//!
//! let coordinator = CoordinatorBuilder::new()
//!     .project_id("0123456789abcdef")
//!     .factory(SimulatedWalletFactory::new(SimulatedWallet::new()))
//!     .build()
//!     .expect("Failed to build coordinator");
//! assert_eq!(coordinator.config().project_id, "0123456789abcdef");
//! ```
//!
//! ## Custom Policies
//!
//! ```rust
//! use std::time::Duration;
//! use ledgerlink_client_core::CoordinatorBuilder;
//! use ledgerlink_client_core::client::recovery::RetryConfig;
//! use ledgerlink_client_core::protocol::LogPrompt;
//! use ledgerlink_client_core::sim::{SimulatedWallet, SimulatedWalletFactory};
//!
//! let coordinator = CoordinatorBuilder::new()
//!     .init_retry(RetryConfig::quick())
//!     .request_timeout(Duration::from_secs(90))
//!     .prompt(LogPrompt)
//!     .factory(SimulatedWalletFactory::new(SimulatedWallet::new()))
//!     .build()
//!     .unwrap();
//! assert_eq!(coordinator.config().request_timeout, Some(Duration::from_secs(90)));
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::config::ClientConfig;
use super::recovery::RetryConfig;
use super::types::{AppMetadata, RequiredNamespaces};
use super::SessionCoordinator;
use crate::error::{ClientError, ClientResult};
use crate::events::{EVENT_CHANNEL_CAPACITY, EventBus};
use crate::protocol::{ApprovalPrompt, NoopPrompt, PairingClientFactory};

/// Fluent builder for [`SessionCoordinator`]
///
/// A factory is mandatory; everything else has a default. The prompt
/// defaults to [`NoopPrompt`].
pub struct CoordinatorBuilder {
    config: ClientConfig,
    factory: Option<Arc<dyn PairingClientFactory>>,
    prompt: Arc<dyn ApprovalPrompt>,
    event_capacity: usize,
}

impl CoordinatorBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            factory: None,
            prompt: Arc::new(NoopPrompt),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Replace the whole configuration, e.g. one loaded with [`ClientConfig::from_env`]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the project identifier handed to the protocol client
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config.project_id = project_id.into();
        self
    }

    /// Set the relay endpoint
    pub fn relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.config.relay_url = relay_url.into();
        self
    }

    /// Set the metadata presented to wallets
    pub fn metadata(mut self, metadata: AppMetadata) -> Self {
        self.config.metadata = metadata;
        self
    }

    /// Replace the proposed namespaces
    pub fn required_namespaces(mut self, required: RequiredNamespaces) -> Self {
        self.config.required_namespaces = required;
        self
    }

    /// Bound every session request by `timeout`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for protocol client construction
    pub fn init_retry(mut self, retry: RetryConfig) -> Self {
        self.config.init_retry = retry;
        self
    }

    /// Set the protocol client factory
    pub fn factory(mut self, factory: impl PairingClientFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set a factory that is already shared elsewhere
    pub fn shared_factory(mut self, factory: Arc<dyn PairingClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set the prompt used to present pairing URIs
    pub fn prompt(mut self, prompt: impl ApprovalPrompt + 'static) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    /// Set the event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate and build the coordinator
    ///
    /// The protocol client is not constructed here; call
    /// [`SessionCoordinator::ensure_client`] for that.
    pub fn build(self) -> ClientResult<Arc<SessionCoordinator>> {
        self.config.validate()?;

        let factory = self.factory.ok_or_else(|| ClientError::InvalidConfiguration {
            field: "factory".to_string(),
            reason: "a protocol client factory is required".to_string(),
        })?;

        if self.event_capacity == 0 {
            return Err(ClientError::InvalidConfiguration {
                field: "event_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Arc::new(SessionCoordinator::new(
            self.config,
            factory,
            self.prompt,
            EventBus::new(self.event_capacity),
        )))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
