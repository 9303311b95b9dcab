//! Session coordinator
//!
//! The [`SessionCoordinator`] owns one wallet-pairing session at a time. It
//! lazily constructs the protocol client, runs the connection handshake,
//! keeps the derived account list in step with the session and scopes every
//! request to the session topic.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──ensure_client──► Initializing ──ok──► Ready ◄──────────┐
//!       ▲                               │                 │              │
//!       └────────────── error ──────────┘              connect       disconnect /
//!                                                         ▼          expiry / delete
//!                                                     Connected ─────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use ledgerlink_client_core::{CoordinatorBuilder, ConnectOutcome};
//! use ledgerlink_client_core::sim::{SimulatedWallet, SimulatedWalletFactory};
//!
//! # tokio_test::block_on(async {
//! let wallet = SimulatedWallet::new();
//! let coordinator = CoordinatorBuilder::new()
//!     .factory(SimulatedWalletFactory::new(wallet))
//!     .build()
//!     .unwrap();
//!
//! coordinator.ensure_client().await.unwrap();
//! let outcome = coordinator.connect(None).await;
//! assert!(outcome.is_connected());
//! assert!(!coordinator.accounts().await.is_empty());
//! # })
//! ```

pub mod builder;
pub mod config;
pub mod recovery;
pub mod requests;
pub mod session;
pub mod types;

#[cfg(all(test, feature = "sim"))]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};

use crate::error::{ClientError, ClientResult};
use crate::events::{CoordinatorEvent, EventBus, EventStream};
use crate::protocol::{ApprovalPrompt, PairingClient, PairingClientFactory};

pub use builder::CoordinatorBuilder;
pub use config::ClientConfig;
pub use requests::SignOptions;
pub use types::*;

/// Session-scoped state; `accounts` is always `derive_accounts(session)`
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) session: Option<Session>,
    pub(crate) accounts: Vec<String>,
    pub(crate) pairings: Vec<Pairing>,
}

impl SessionState {
    pub(crate) fn adopt(&mut self, session: Session) {
        self.accounts = derive_accounts(&session);
        self.session = Some(session);
    }

    pub(crate) fn reset(&mut self) {
        self.session = None;
        self.accounts.clear();
    }
}

/// Coordinates one wallet-pairing session
///
/// Construct with [`CoordinatorBuilder`] and share by `Arc`. All operations
/// take `&self`.
pub struct SessionCoordinator {
    pub(crate) config: ClientConfig,
    pub(crate) factory: Arc<dyn PairingClientFactory>,
    pub(crate) prompt: Arc<dyn ApprovalPrompt>,
    pub(crate) client: OnceCell<Arc<dyn PairingClient>>,
    pub(crate) initializing: AtomicBool,
    pub(crate) state: RwLock<SessionState>,
    pub(crate) events: EventBus,
}

/// Clears the initializing flag when construction ends, including on cancellation
struct InitializingFlag<'a>(&'a AtomicBool);

impl<'a> InitializingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InitializingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionCoordinator {
    pub(crate) fn new(
        config: ClientConfig,
        factory: Arc<dyn PairingClientFactory>,
        prompt: Arc<dyn ApprovalPrompt>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            factory,
            prompt,
            client: OnceCell::new(),
            initializing: AtomicBool::new(false),
            state: RwLock::new(SessionState::default()),
            events,
        }
    }

    /// Construct the protocol client if it does not exist yet
    ///
    /// Concurrent callers share one in-flight construction. On failure the
    /// handle stays unset and the next call tries again.
    pub async fn ensure_client(&self) -> ClientResult<Arc<dyn PairingClient>> {
        let client = self.client.get_or_try_init(|| self.create_client()).await?;
        Ok(Arc::clone(client))
    }

    async fn create_client(&self) -> ClientResult<Arc<dyn PairingClient>> {
        let _flag = InitializingFlag::raise(&self.initializing);
        self.events.emit(CoordinatorEvent::Initializing);
        info!(
            project_id_set = !self.config.project_id.is_empty(),
            relay_url = %self.config.relay_url,
            app = %self.config.metadata.name,
            "Initializing pairing client"
        );

        let retry = self.config.init_retry.clone();
        let result = recovery::retry_with_backoff("client_init", retry, || {
            self.factory.create(&self.config)
        })
        .await;

        match result {
            Ok(client) => {
                info!("Pairing client ready");
                self.events.emit(CoordinatorEvent::Initialized);
                Ok(client)
            }
            Err(e) => {
                error!(error = %e, category = e.category(), "Pairing client initialization failed");
                let error = match e {
                    ClientError::InitializationFailed { .. } => e,
                    other => ClientError::InitializationFailed {
                        reason: other.to_string(),
                    },
                };
                self.events.emit(CoordinatorEvent::InitializationFailed {
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// The protocol client, if initialized
    pub fn client(&self) -> Option<Arc<dyn PairingClient>> {
        self.client.get().cloned()
    }

    /// Whether a client construction is in flight
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    /// Current lifecycle state
    pub async fn state(&self) -> CoordinatorState {
        if self.client.initialized() {
            if self.state.read().await.session.is_some() {
                CoordinatorState::Connected
            } else {
                CoordinatorState::Ready
            }
        } else if self.is_initializing() {
            CoordinatorState::Initializing
        } else {
            CoordinatorState::Uninitialized
        }
    }

    /// The adopted session, if any
    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    /// Account identifiers of the adopted session, deduplicated
    pub async fn accounts(&self) -> Vec<String> {
        self.state.read().await.accounts.clone()
    }

    /// Active pairings as of the last successful connect
    pub async fn pairings(&self) -> Vec<Pairing> {
        self.state.read().await.pairings.clone()
    }

    /// Configuration this coordinator was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> EventStream {
        self.events.stream()
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("client_initialized", &self.client.initialized())
            .field("initializing", &self.is_initializing())
            .finish_non_exhaustive()
    }
}
