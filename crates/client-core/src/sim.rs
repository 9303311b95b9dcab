//! In-process simulated wallet
//!
//! [`SimulatedWallet`] implements [`PairingClient`] without any relay. It
//! answers session proposals according to an [`ApprovalMode`], signs every
//! request with random bytes and records what it was asked to do. The demo
//! CLI and the test suites drive the coordinator against it.
//!
//! Clones share state, so a test can keep one handle for inspection while
//! the coordinator owns another through [`SimulatedWalletFactory`].
//!
//! ```rust
//! use ledgerlink_client_core::sim::{ApprovalMode, SimulatedWallet, SimulatedWalletFactory};
//! use ledgerlink_client_core::CoordinatorBuilder;
//!
//! # tokio_test::block_on(async {
//! let wallet = SimulatedWallet::new().with_mode(ApprovalMode::Reject);
//! let coordinator = CoordinatorBuilder::new()
//!     .factory(SimulatedWalletFactory::new(wallet.clone()))
//!     .build()
//!     .unwrap();
//!
//! coordinator.ensure_client().await.unwrap();
//! assert!(!coordinator.connect(None).await.is_connected());
//! assert_eq!(wallet.proposals(), 1);
//! # })
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::caip::{EIP155_NAMESPACE, XRPL_NAMESPACE};
use crate::client::config::ClientConfig;
use crate::client::types::{
    AppMetadata, Pairing, RequiredNamespaces, SdkReason, Session, SessionNamespace,
};
use crate::error::{ClientError, ClientResult};
use crate::network::{ETH_SEND_TRANSACTION, PERSONAL_SIGN, XRPL_SIGN_TRANSACTION};
use crate::protocol::{
    ConnectParams, PairingClient, PairingClientFactory, PendingApproval, SessionRequest,
};

/// Default XRPL address of the simulated wallet
pub const SIM_XRPL_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

/// Default EVM address of the simulated wallet
pub const SIM_EVM_ADDRESS: &str = "0x5aB1F4d3e5A6f9C2b7E8D0c1A2b3C4d5E6f7A8b9";

const PAIRING_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// How the simulated wallet answers session proposals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Approve immediately
    #[default]
    Approve,
    /// Reject immediately
    Reject,
    /// Wait for [`SimulatedWallet::approve_pending`] or [`SimulatedWallet::reject_pending`]
    Manual,
}

struct PendingProposal {
    pairing_topic: String,
    required: RequiredNamespaces,
    responder: oneshot::Sender<ClientResult<Session>>,
}

#[derive(Default)]
struct WalletState {
    mode: ApprovalMode,
    addresses: IndexMap<String, String>,
    namespaces_override: Option<IndexMap<String, SessionNamespace>>,
    pending: Option<PendingProposal>,
    pairings: Vec<Pairing>,
    sessions: HashSet<String>,
    requests: Vec<SessionRequest>,
    disconnects: Vec<(String, SdkReason)>,
    proposals: usize,
    reject_requests: bool,
    fail_disconnect: bool,
    request_delay: Option<Duration>,
}

/// A wallet living in the same process
#[derive(Clone)]
pub struct SimulatedWallet {
    state: Arc<Mutex<WalletState>>,
}

impl SimulatedWallet {
    /// Wallet that approves everything with its default addresses
    pub fn new() -> Self {
        let mut addresses = IndexMap::new();
        addresses.insert(XRPL_NAMESPACE.to_string(), SIM_XRPL_ADDRESS.to_string());
        addresses.insert(EIP155_NAMESPACE.to_string(), SIM_EVM_ADDRESS.to_string());
        Self {
            state: Arc::new(Mutex::new(WalletState {
                addresses,
                ..Default::default()
            })),
        }
    }

    /// Set how proposals are answered
    pub fn with_mode(self, mode: ApprovalMode) -> Self {
        self.set_mode(mode);
        self
    }

    /// Use `address` for every chain of `namespace`
    pub fn with_address(self, namespace: impl Into<String>, address: impl Into<String>) -> Self {
        self.state.lock().addresses.insert(namespace.into(), address.into());
        self
    }

    /// Grant exactly these namespaces instead of deriving them from the proposal
    pub fn with_session_namespaces(self, namespaces: IndexMap<String, SessionNamespace>) -> Self {
        self.state.lock().namespaces_override = Some(namespaces);
        self
    }

    /// Delay every request response
    pub fn with_request_delay(self, delay: Duration) -> Self {
        self.state.lock().request_delay = Some(delay);
        self
    }

    pub fn set_mode(&self, mode: ApprovalMode) {
        self.state.lock().mode = mode;
    }

    /// Make the wallet user decline every request
    pub fn set_reject_requests(&self, reject: bool) {
        self.state.lock().reject_requests = reject;
    }

    /// Make disconnect notices fail
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.state.lock().fail_disconnect = fail;
    }

    /// Whether a proposal is waiting in [`ApprovalMode::Manual`]
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Approve the waiting proposal; returns false if there was none
    pub fn approve_pending(&self) -> bool {
        let mut state = self.state.lock();
        let Some(proposal) = state.pending.take() else {
            return false;
        };
        let session = approve(&mut state, &proposal.pairing_topic, &proposal.required);
        proposal.responder.send(Ok(session)).is_ok()
    }

    /// Reject the waiting proposal; returns false if there was none
    pub fn reject_pending(&self) -> bool {
        let Some(proposal) = self.state.lock().pending.take() else {
            return false;
        };
        proposal.responder.send(Err(user_rejected())).is_ok()
    }

    /// Number of session proposals received
    pub fn proposals(&self) -> usize {
        self.state.lock().proposals
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.state.lock().requests.clone()
    }

    /// Disconnect notices received so far, in order
    pub fn disconnects(&self) -> Vec<(String, SdkReason)> {
        self.state.lock().disconnects.clone()
    }

    /// Whether the wallet considers `topic` a live session
    pub fn has_session(&self, topic: &str) -> bool {
        self.state.lock().sessions.contains(topic)
    }
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedWallet")
            .field("mode", &state.mode)
            .field("sessions", &state.sessions.len())
            .field("requests", &state.requests.len())
            .finish_non_exhaustive()
    }
}

fn random_hex(len: usize) -> String {
    let bytes: Vec<u8> = (0..len).map(|_| rand::random::<u8>()).collect();
    hex::encode(bytes)
}

fn user_rejected() -> ClientError {
    ClientError::ApprovalRejected {
        reason: "User rejected.".to_string(),
    }
}

fn wallet_metadata() -> AppMetadata {
    AppMetadata {
        name: "Simulated Wallet".to_string(),
        description: "In-process wallet for demos and tests".to_string(),
        url: "https://localhost".to_string(),
        icons: Vec::new(),
    }
}

/// Build the approved session and mark the pairing active
fn approve(state: &mut WalletState, pairing_topic: &str, required: &RequiredNamespaces) -> Session {
    let mut session = Session::new(Uuid::new_v4().simple().to_string());
    session.peer_metadata = Some(wallet_metadata());
    session.namespaces = match &state.namespaces_override {
        Some(namespaces) => namespaces.clone(),
        None => required
            .0
            .iter()
            .map(|(namespace, requirement)| {
                let accounts = match state.addresses.get(namespace) {
                    Some(address) => requirement
                        .chains
                        .iter()
                        .map(|chain| format!("{}:{}", chain, address))
                        .collect(),
                    None => Vec::new(),
                };
                let granted = SessionNamespace {
                    accounts,
                    methods: requirement.methods.clone(),
                    events: requirement.events.clone(),
                };
                (namespace.clone(), granted)
            })
            .collect(),
    };

    if let Some(pairing) = state.pairings.iter_mut().find(|p| p.topic == pairing_topic) {
        pairing.active = true;
        pairing.peer_metadata = Some(wallet_metadata());
    }
    state.sessions.insert(session.topic.clone());
    info!(
        topic = %session.topic,
        pairing_topic = %pairing_topic,
        "Simulated wallet approved session"
    );
    session
}

fn respond(request: &SessionRequest) -> ClientResult<Value> {
    match request.method() {
        XRPL_SIGN_TRANSACTION => {
            let mut tx_json = request
                .request
                .params
                .get("tx_json")
                .cloned()
                .ok_or_else(|| ClientError::request(XRPL_SIGN_TRANSACTION, "missing tx_json"))?;
            if let Value::Object(tx) = &mut tx_json {
                tx.insert("SigningPubKey".to_string(), json!(random_hex(33).to_uppercase()));
                tx.insert("TxnSignature".to_string(), json!(random_hex(70).to_uppercase()));
            }
            Ok(json!({
                "tx_json": tx_json,
                "hash": random_hex(32).to_uppercase(),
            }))
        }
        ETH_SEND_TRANSACTION => Ok(json!(format!("0x{}", random_hex(32)))),
        PERSONAL_SIGN => Ok(json!(format!("0x{}", random_hex(65)))),
        other => Err(ClientError::request(other, "method not supported by wallet")),
    }
}

#[async_trait]
impl PairingClient for SimulatedWallet {
    async fn connect(&self, params: ConnectParams) -> ClientResult<PendingApproval> {
        let mut state = self.state.lock();
        state.proposals += 1;

        let (pairing_topic, uri) = match params.pairing_topic {
            Some(topic) => {
                if !state.pairings.iter().any(|p| p.topic == topic) {
                    return Err(ClientError::handshake(format!("unknown pairing {}", topic)));
                }
                (topic, None)
            }
            None => {
                let topic = random_hex(32);
                let uri = format!("wc:{}@2?relay-protocol=irn&symKey={}", topic, random_hex(32));
                state.pairings.push(Pairing {
                    topic: topic.clone(),
                    active: false,
                    expiry: Utc::now().timestamp() + PAIRING_TTL_SECS,
                    peer_metadata: None,
                });
                (topic, Some(uri))
            }
        };
        debug!(
            pairing_topic = %pairing_topic,
            mode = ?state.mode,
            "Simulated wallet received proposal"
        );

        let approval: BoxFuture<'static, ClientResult<Session>> = match state.mode {
            ApprovalMode::Approve => {
                let session = approve(&mut state, &pairing_topic, &params.required_namespaces);
                async move { Ok(session) }.boxed()
            }
            ApprovalMode::Reject => async { Err(user_rejected()) }.boxed(),
            ApprovalMode::Manual => {
                let (responder, receiver) = oneshot::channel();
                // A newer proposal supersedes the one still waiting
                state.pending = Some(PendingProposal {
                    pairing_topic,
                    required: params.required_namespaces,
                    responder,
                });
                async move {
                    receiver
                        .await
                        .unwrap_or_else(|_| Err(ClientError::handshake("proposal expired")))
                }
                .boxed()
            }
        };

        Ok(PendingApproval { uri, approval })
    }

    async fn disconnect(&self, topic: &str, reason: SdkReason) -> ClientResult<()> {
        let mut state = self.state.lock();
        state.disconnects.push((topic.to_string(), reason));
        if state.fail_disconnect {
            return Err(ClientError::DisconnectFailed {
                topic: topic.to_string(),
                reason: "relay unavailable".to_string(),
            });
        }
        state.sessions.remove(topic);
        Ok(())
    }

    async fn request(&self, request: SessionRequest) -> ClientResult<Value> {
        let delay = {
            let mut state = self.state.lock();
            state.requests.push(request.clone());
            if !state.sessions.contains(&request.topic) {
                return Err(ClientError::request(request.method(), "unknown session topic"));
            }
            if state.reject_requests {
                return Err(ClientError::RequestRejected {
                    reason: "User rejected the request.".to_string(),
                });
            }
            state.request_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        respond(&request)
    }

    fn active_pairings(&self) -> Vec<Pairing> {
        self.state.lock().pairings.iter().filter(|p| p.active).cloned().collect()
    }
}

/// Factory handing out a shared [`SimulatedWallet`]
///
/// Counts constructions and can be told to fail the first few.
#[derive(Clone)]
pub struct SimulatedWalletFactory {
    wallet: SimulatedWallet,
    constructions: Arc<AtomicUsize>,
    failures_remaining: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl SimulatedWalletFactory {
    pub fn new(wallet: SimulatedWallet) -> Self {
        Self {
            wallet,
            constructions: Arc::new(AtomicUsize::new(0)),
            failures_remaining: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Fail the next `count` constructions
    pub fn with_failures(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Take `delay` for every construction
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of construction attempts so far
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn wallet(&self) -> &SimulatedWallet {
        &self.wallet
    }
}

#[async_trait]
impl PairingClientFactory for SimulatedWalletFactory {
    async fn create(&self, config: &ClientConfig) -> ClientResult<Arc<dyn PairingClient>> {
        let attempt = self.constructions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(attempt, relay_url = %config.relay_url, "Constructing simulated wallet client");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ClientError::InitializationFailed {
                reason: "relay unreachable".to_string(),
            });
        }

        Ok(Arc::new(self.wallet.clone()))
    }
}
