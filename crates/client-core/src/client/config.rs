//! Client configuration
//!
//! [`ClientConfig`] carries everything the coordinator hands to the protocol
//! client factory (project id, application metadata, relay URL) together with
//! the session proposal and the coordinator's own timing policies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         ClientConfig         │
//! │ ┌──────────────────────────┐ │
//! │ │ Protocol settings        │ │  • project id, relay URL
//! │ │ App metadata             │ │  • name, url, icons
//! │ │ Required namespaces      │ │  • chains, methods, events
//! │ │ Policies                 │ │  • init retry, request timeout
//! │ └──────────────────────────┘ │
//! └──────────────────────────────┘
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use ledgerlink_client_core::client::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new()
//!     .with_project_id("0123456789abcdef")
//!     .with_request_timeout(Duration::from_secs(120));
//!
//! assert_eq!(config.project_id, "0123456789abcdef");
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## From the environment
//!
//! ```rust,no_run
//! use ledgerlink_client_core::client::config::ClientConfig;
//!
//! // Reads LEDGERLINK_PROJECT_ID, LEDGERLINK_RELAY_URL and
//! // LEDGERLINK_REQUEST_TIMEOUT_SECS; a missing project id becomes "".
//! let config = ClientConfig::from_env().unwrap();
//! println!("project: {:?}", config.project_id);
//! ```

use std::time::Duration;

use tracing::warn;

use super::recovery::RetryConfig;
use super::types::{AppMetadata, RequiredNamespaces};
use crate::error::{ClientError, ClientResult};
use crate::network::default_required_namespaces;

/// Environment variable holding the protocol project identifier
pub const ENV_PROJECT_ID: &str = "LEDGERLINK_PROJECT_ID";

/// Environment variable overriding the relay URL
pub const ENV_RELAY_URL: &str = "LEDGERLINK_RELAY_URL";

/// Environment variable setting the request timeout in seconds
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LEDGERLINK_REQUEST_TIMEOUT_SECS";

/// Default relay endpoint of the pairing protocol
pub const DEFAULT_RELAY_URL: &str = "wss://relay.walletconnect.com";

/// Coordinator and protocol client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project identifier issued by the relay operator; may be empty
    pub project_id: String,
    /// Relay endpoint handed to the protocol client
    pub relay_url: String,
    /// Metadata presented to wallets
    pub metadata: AppMetadata,
    /// Capabilities proposed on every connect
    pub required_namespaces: RequiredNamespaces,
    /// Retry policy for protocol client construction
    pub init_retry: RetryConfig,
    /// Upper bound for a single session request; `None` defers to the transport
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            metadata: AppMetadata::default(),
            required_namespaces: default_required_namespaces(),
            init_retry: RetryConfig::none(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment
    ///
    /// A missing project id is not an error: it degrades to an empty string
    /// and is logged. A malformed timeout is rejected.
    pub fn from_env() -> ClientResult<Self> {
        let mut config = Self::default();

        match std::env::var(ENV_PROJECT_ID) {
            Ok(project_id) => config.project_id = project_id,
            Err(_) => warn!(
                variable = ENV_PROJECT_ID,
                "Project id not set; continuing with an empty identifier"
            ),
        }

        if let Ok(relay_url) = std::env::var(ENV_RELAY_URL) {
            config.relay_url = relay_url;
        }

        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ClientError::InvalidConfiguration {
                field: ENV_REQUEST_TIMEOUT_SECS.to_string(),
                reason: format!("'{}' is not a number of seconds", raw),
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the project identifier
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    /// Set the relay URL
    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = relay_url.into();
        self
    }

    /// Set application metadata
    pub fn with_metadata(mut self, metadata: AppMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the proposed namespaces
    pub fn with_required_namespaces(mut self, required: RequiredNamespaces) -> Self {
        self.required_namespaces = required;
        self
    }

    /// Set the initialization retry policy
    pub fn with_init_retry(mut self, retry: RetryConfig) -> Self {
        self.init_retry = retry;
        self
    }

    /// Bound every session request by `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Check the configuration for values the coordinator cannot work with
    pub fn validate(&self) -> ClientResult<()> {
        if self.relay_url.is_empty() {
            return Err(ClientError::InvalidConfiguration {
                field: "relay_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }
        if self.required_namespaces.is_empty() {
            return Err(ClientError::InvalidConfiguration {
                field: "required_namespaces".to_string(),
                reason: "at least one namespace must be proposed".to_string(),
            });
        }
        self.required_namespaces.validate()?;
        if self.init_retry.max_attempts == 0 {
            return Err(ClientError::InvalidConfiguration {
                field: "init_retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(ClientError::InvalidConfiguration {
                field: "request_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
