//! Coordinator behavior against the simulated wallet

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_stream::StreamExt;
use tracing_test::traced_test;

use super::recovery::RetryConfig;
use super::*;
use crate::caip::ChainId;
use crate::error::{ClientError, ClientResult};
use crate::events::CoordinatorEvent;
use crate::protocol::{
    ApprovalPrompt, ConnectParams, PairingClient, PairingClientFactory, PendingApproval,
    SessionRequest,
};
use crate::sim::{ApprovalMode, SimulatedWallet, SimulatedWalletFactory};
use crate::xrpl::XrplPayment;

// ===== HELPERS =====

#[derive(Clone, Default)]
struct CountingPrompt {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl CountingPrompt {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ApprovalPrompt for CountingPrompt {
    fn open(&self, uri: &str, chains: &[ChainId]) {
        assert!(uri.starts_with("wc:"));
        assert_eq!(chains.len(), 4);
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Client that approves instantly with numbered topics and holds disconnects
/// until released
#[derive(Default)]
struct ScriptedClient {
    sessions: AtomicUsize,
    fail_connect: bool,
    disconnect_entered: AtomicBool,
    release_disconnect: Notify,
}

#[async_trait]
impl PairingClient for ScriptedClient {
    async fn connect(&self, _params: ConnectParams) -> ClientResult<PendingApproval> {
        if self.fail_connect {
            return Err(ClientError::internal("relay socket closed"));
        }
        let n = self.sessions.fetch_add(1, Ordering::SeqCst);
        let mut session = Session::new(format!("topic-{}", n));
        session.namespaces.insert(
            "xrpl".to_string(),
            SessionNamespace::with_accounts([format!("xrpl:0:r{}", n)]),
        );
        Ok(PendingApproval {
            uri: None,
            approval: async move { Ok(session) }.boxed(),
        })
    }

    async fn disconnect(&self, _topic: &str, _reason: SdkReason) -> ClientResult<()> {
        self.disconnect_entered.store(true, Ordering::SeqCst);
        self.release_disconnect.notified().await;
        Ok(())
    }

    async fn request(&self, request: SessionRequest) -> ClientResult<Value> {
        Err(ClientError::request(request.method(), "not scripted"))
    }

    fn active_pairings(&self) -> Vec<Pairing> {
        Vec::new()
    }
}

struct ScriptedFactory(Arc<ScriptedClient>);

#[async_trait]
impl PairingClientFactory for ScriptedFactory {
    async fn create(&self, _config: &ClientConfig) -> ClientResult<Arc<dyn PairingClient>> {
        let client: Arc<dyn PairingClient> = self.0.clone();
        Ok(client)
    }
}

async fn scripted_coordinator(client: Arc<ScriptedClient>) -> Arc<SessionCoordinator> {
    let coordinator = CoordinatorBuilder::new()
        .factory(ScriptedFactory(client))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();
    coordinator
}

fn coordinator_for(factory: SimulatedWalletFactory) -> Arc<SessionCoordinator> {
    CoordinatorBuilder::new().factory(factory).build().unwrap()
}

async fn ready_coordinator(wallet: SimulatedWallet) -> Arc<SessionCoordinator> {
    let coordinator = coordinator_for(SimulatedWalletFactory::new(wallet));
    coordinator.ensure_client().await.unwrap();
    coordinator
}

async fn connected_coordinator(wallet: SimulatedWallet) -> Arc<SessionCoordinator> {
    let coordinator = ready_coordinator(wallet).await;
    assert!(coordinator.connect(None).await.is_connected());
    coordinator
}

fn namespaces(entries: &[(&str, &[&str])]) -> IndexMap<String, SessionNamespace> {
    entries
        .iter()
        .map(|(ns, accounts)| {
            let namespace = SessionNamespace::with_accounts(accounts.iter().copied());
            (ns.to_string(), namespace)
        })
        .collect()
}

fn xrpl_testnet() -> ChainId {
    "xrpl:1".parse().unwrap()
}

// ===== INITIALIZATION =====

#[tokio::test]
async fn test_concurrent_initialization_constructs_once() {
    let factory = SimulatedWalletFactory::new(SimulatedWallet::new())
        .with_delay(Duration::from_millis(50));
    let coordinator = coordinator_for(factory.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.ensure_client().await.map(|_| ()) })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(factory.constructions(), 1);
    assert!(!coordinator.is_initializing());
    assert_eq!(coordinator.state().await, CoordinatorState::Ready);
}

#[tokio::test]
async fn test_initialization_failure_leaves_client_unset_and_retries_later() {
    let factory = SimulatedWalletFactory::new(SimulatedWallet::new()).with_failures(1);
    let coordinator = coordinator_for(factory.clone());

    let first = coordinator.ensure_client().await;
    assert!(matches!(first, Err(ClientError::InitializationFailed { .. })));
    assert!(coordinator.client().is_none());
    assert_eq!(coordinator.state().await, CoordinatorState::Uninitialized);

    coordinator.ensure_client().await.unwrap();
    assert_eq!(factory.constructions(), 2);

    // Already initialized: no further construction
    coordinator.ensure_client().await.unwrap();
    assert_eq!(factory.constructions(), 2);
}

#[tokio::test]
async fn test_init_retry_policy_retries_within_one_call() {
    let factory = SimulatedWalletFactory::new(SimulatedWallet::new()).with_failures(2);
    let coordinator = CoordinatorBuilder::new()
        .init_retry(RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            use_jitter: false,
        })
        .factory(factory.clone())
        .build()
        .unwrap();

    coordinator.ensure_client().await.unwrap();
    assert_eq!(factory.constructions(), 3);
}

#[test]
fn test_build_requires_factory() {
    let result = CoordinatorBuilder::new().build();
    assert!(matches!(
        result,
        Err(ClientError::InvalidConfiguration { ref field, .. }) if field == "factory"
    ));
}

// ===== CONNECT =====

#[tokio::test]
async fn test_connect_without_client_starts_no_handshake() {
    let wallet = SimulatedWallet::new();
    let coordinator = coordinator_for(SimulatedWalletFactory::new(wallet.clone()));

    let outcome = coordinator.connect(None).await;

    assert!(matches!(outcome, ConnectOutcome::NoClient));
    assert_eq!(wallet.proposals(), 0);
    assert!(coordinator.session().await.is_none());
    assert_eq!(coordinator.state().await, CoordinatorState::Uninitialized);
}

#[tokio::test]
async fn test_connect_derives_accounts_in_namespace_order() {
    let wallet = SimulatedWallet::new().with_session_namespaces(namespaces(&[
        ("xrpl", &["xrpl:0:rABC"]),
        ("eip155", &["eip155:7672:0xDEF"]),
    ]));
    let coordinator = connected_coordinator(wallet).await;

    assert_eq!(coordinator.accounts().await, vec!["xrpl:0:rABC", "eip155:7672:0xDEF"]);
    assert_eq!(coordinator.state().await, CoordinatorState::Connected);
}

#[tokio::test]
async fn test_connect_deduplicates_accounts() {
    let wallet = SimulatedWallet::new().with_session_namespaces(namespaces(&[
        ("xrpl", &["xrpl:0:rABC", "xrpl:0:rABC", "xrpl:1:rABC"]),
        ("eip155", &["eip155:7668:0xDEF", "eip155:7668:0xDEF"]),
    ]));
    let coordinator = connected_coordinator(wallet).await;

    assert_eq!(
        coordinator.accounts().await,
        vec!["xrpl:0:rABC", "xrpl:1:rABC", "eip155:7668:0xDEF"]
    );
}

#[tokio::test]
async fn test_connect_caches_active_pairings() {
    let coordinator = connected_coordinator(SimulatedWallet::new()).await;
    let pairings = coordinator.pairings().await;
    assert_eq!(pairings.len(), 1);
    assert!(pairings[0].active);
}

#[tokio::test]
async fn test_rejected_connect_adopts_nothing() {
    let wallet = SimulatedWallet::new().with_mode(ApprovalMode::Reject);
    let coordinator = ready_coordinator(wallet).await;

    let outcome = coordinator.connect(None).await;

    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(ClientError::ApprovalRejected { .. })
    ));
    assert!(coordinator.session().await.is_none());
    assert!(coordinator.accounts().await.is_empty());
}

#[tokio::test]
async fn test_failed_reconnect_keeps_existing_session() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let before = coordinator.session().await.unwrap();
    let accounts_before = coordinator.accounts().await;

    wallet.set_mode(ApprovalMode::Reject);
    let outcome = coordinator.connect(None).await;

    assert!(!outcome.is_connected());
    assert_eq!(coordinator.session().await.unwrap().topic, before.topic);
    assert_eq!(coordinator.accounts().await, accounts_before);
}

#[tokio::test]
async fn test_connect_reuses_existing_pairing() {
    let wallet = SimulatedWallet::new();
    let prompt = CountingPrompt::default();
    let coordinator = CoordinatorBuilder::new()
        .prompt(prompt.clone())
        .factory(SimulatedWalletFactory::new(wallet.clone()))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();
    assert!(coordinator.connect(None).await.is_connected());
    let pairing = coordinator.pairings().await.remove(0);

    let outcome = coordinator.connect(Some(&pairing)).await;

    assert!(outcome.is_connected());
    assert_eq!(wallet.proposals(), 2);
    // Resumed pairings produce no URI, so the prompt was only opened the first time
    assert_eq!(prompt.opens(), 1);
    assert_eq!(prompt.closes(), 1);
}

#[tokio::test]
async fn test_unknown_pairing_fails_without_prompt() {
    let wallet = SimulatedWallet::new();
    let prompt = CountingPrompt::default();
    let coordinator = CoordinatorBuilder::new()
        .prompt(prompt.clone())
        .factory(SimulatedWalletFactory::new(wallet.clone()))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();
    let unknown = Pairing {
        topic: "feedface".to_string(),
        active: true,
        expiry: 0,
        peer_metadata: None,
    };

    let outcome = coordinator.connect(Some(&unknown)).await;

    assert!(matches!(
        outcome,
        ConnectOutcome::Failed(ClientError::HandshakeFailed { .. })
    ));
    assert_eq!((prompt.opens(), prompt.closes()), (0, 0));
    assert!(coordinator.session().await.is_none());
    assert!(coordinator.accounts().await.is_empty());
}

#[tokio::test]
async fn test_connect_initiation_error_reported_as_handshake_failure() {
    let client = Arc::new(ScriptedClient {
        fail_connect: true,
        ..Default::default()
    });
    let coordinator = scripted_coordinator(client).await;

    let outcome = coordinator.connect(None).await;

    match outcome {
        ConnectOutcome::Failed(ClientError::HandshakeFailed { reason }) => {
            assert!(reason.contains("relay socket closed"));
        }
        other => panic!("expected a handshake failure, got {:?}", other),
    }
    assert!(coordinator.session().await.is_none());
}

// ===== APPROVAL PROMPT =====

#[tokio::test]
async fn test_prompt_closed_once_on_success_and_failure() {
    let wallet = SimulatedWallet::new();
    let prompt = CountingPrompt::default();
    let coordinator = CoordinatorBuilder::new()
        .prompt(prompt.clone())
        .factory(SimulatedWalletFactory::new(wallet.clone()))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();

    assert!(coordinator.connect(None).await.is_connected());
    assert_eq!((prompt.opens(), prompt.closes()), (1, 1));

    wallet.set_mode(ApprovalMode::Reject);
    assert!(!coordinator.connect(None).await.is_connected());
    assert_eq!((prompt.opens(), prompt.closes()), (2, 2));
}

#[tokio::test]
async fn test_prompt_closed_when_connect_is_abandoned() {
    let wallet = SimulatedWallet::new().with_mode(ApprovalMode::Manual);
    let prompt = CountingPrompt::default();
    let coordinator = CoordinatorBuilder::new()
        .prompt(prompt.clone())
        .factory(SimulatedWalletFactory::new(wallet.clone()))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), coordinator.connect(None)).await;

    assert!(abandoned.is_err());
    assert!(wallet.has_pending());
    assert_eq!((prompt.opens(), prompt.closes()), (1, 1));
    assert!(coordinator.session().await.is_none());
}

#[tokio::test]
async fn test_manual_approval_completes_connect() {
    let wallet = SimulatedWallet::new().with_mode(ApprovalMode::Manual);
    let coordinator = ready_coordinator(wallet.clone()).await;

    let connecting = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.connect(None).await })
    };
    while !wallet.has_pending() {
        tokio::task::yield_now().await;
    }
    assert!(wallet.approve_pending());

    let outcome = connecting.await.unwrap();
    assert!(outcome.is_connected());
    assert_eq!(coordinator.accounts().await.len(), 4);
}

// ===== DISCONNECT =====

#[tokio::test]
async fn test_disconnect_without_session_is_noop() {
    let wallet = SimulatedWallet::new();
    let coordinator = ready_coordinator(wallet.clone()).await;

    assert!(matches!(coordinator.disconnect().await, DisconnectOutcome::NoSession));
    assert!(wallet.disconnects().is_empty());
}

#[tokio::test]
async fn test_disconnect_notifies_wallet_and_resets() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let topic = coordinator.session().await.unwrap().topic;

    let outcome = coordinator.disconnect().await;

    assert!(matches!(outcome, DisconnectOutcome::Disconnected { topic: ref t } if *t == topic));
    assert_eq!(wallet.disconnects(), vec![(topic.clone(), SdkReason::user_disconnected())]);
    assert!(!wallet.has_session(&topic));
    assert!(coordinator.session().await.is_none());
    assert!(coordinator.accounts().await.is_empty());
    assert_eq!(coordinator.state().await, CoordinatorState::Ready);
}

#[tokio::test]
async fn test_disconnect_failure_still_resets_state() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    wallet.set_fail_disconnect(true);

    let outcome = coordinator.disconnect().await;

    assert!(matches!(
        outcome,
        DisconnectOutcome::ResetAfterError {
            error: ClientError::DisconnectFailed { .. },
            ..
        }
    ));
    assert!(coordinator.session().await.is_none());
    assert!(coordinator.accounts().await.is_empty());
}

#[tokio::test]
async fn test_disconnect_keeps_session_adopted_while_notice_in_flight() {
    let client = Arc::new(ScriptedClient::default());
    let coordinator = scripted_coordinator(Arc::clone(&client)).await;
    assert!(coordinator.connect(None).await.is_connected());

    let disconnecting = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.disconnect().await })
    };
    while !client.disconnect_entered.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    assert!(coordinator.connect(None).await.is_connected());
    client.release_disconnect.notify_one();

    let outcome = disconnecting.await.unwrap();
    assert!(matches!(outcome, DisconnectOutcome::Disconnected { ref topic } if topic == "topic-0"));
    assert_eq!(coordinator.session().await.unwrap().topic, "topic-1");
    assert_eq!(coordinator.accounts().await, vec!["xrpl:0:r1"]);
}

// ===== REQUESTS =====

#[tokio::test]
async fn test_sign_without_session_sends_nothing() {
    let wallet = SimulatedWallet::new();
    let coordinator = ready_coordinator(wallet.clone()).await;
    let payment = XrplPayment::new("rA", "rB", "100000");

    let result = coordinator
        .sign_transaction(&xrpl_testnet(), payment.to_tx_json(), None)
        .await;

    assert!(matches!(result, Err(ClientError::PreconditionFailed { .. })));
    assert!(wallet.requests().is_empty());
}

#[tokio::test]
async fn test_sign_without_client_fails_precondition() {
    let coordinator = coordinator_for(SimulatedWalletFactory::new(SimulatedWallet::new()));
    let result = coordinator
        .sign_transaction(&xrpl_testnet(), serde_json::Map::new(), None)
        .await;
    assert!(matches!(result, Err(ClientError::PreconditionFailed { .. })));
}

#[tokio::test]
async fn test_sign_xrpl_is_scoped_to_session_topic() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let topic = coordinator.session().await.unwrap().topic;
    let payment = XrplPayment::new("rA", "rB", "100000").with_destination_tag(12);

    let response = coordinator
        .sign_transaction(
            &xrpl_testnet(),
            payment.to_tx_json(),
            Some(SignOptions::autofill_and_submit()),
        )
        .await
        .unwrap();
    assert!(response["tx_json"]["TxnSignature"].is_string());

    let requests = wallet.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].topic, topic);
    assert_eq!(requests[0].chain_id, xrpl_testnet());
    assert_eq!(requests[0].method(), "xrpl_signTransaction");
    assert_eq!(requests[0].request.params["tx_json"]["DestinationTag"], json!(12));
    assert_eq!(requests[0].request.params["submit"], json!(true));
}

#[tokio::test]
async fn test_sign_eip155_sends_transaction_array() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let chain: ChainId = "eip155:7672".parse().unwrap();
    let Value::Object(tx) = json!({"from": "0xabc", "to": "0xdef", "value": "0x1"}) else {
        unreachable!()
    };

    let response = coordinator.sign_transaction(&chain, tx, None).await.unwrap();

    assert!(response.as_str().unwrap().starts_with("0x"));
    let requests = wallet.requests();
    assert_eq!(requests[0].method(), "eth_sendTransaction");
    assert!(requests[0].request.params.is_array());
}

#[tokio::test]
async fn test_sign_unsupported_namespace_sends_nothing() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let chain: ChainId = "solana:mainnet".parse().unwrap();

    let result = coordinator.sign_transaction(&chain, serde_json::Map::new(), None).await;

    assert!(matches!(result, Err(ClientError::UnsupportedNamespace { .. })));
    assert!(wallet.requests().is_empty());
}

#[tokio::test]
async fn test_personal_sign_params() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    let chain: ChainId = "eip155:7668".parse().unwrap();

    let signature = coordinator.personal_sign(&chain, "Hello World", "0xDEF").await.unwrap();

    assert!(signature.as_str().unwrap().starts_with("0x"));
    assert_eq!(wallet.requests()[0].request.params, json!(["Hello World", "0xDEF"]));
}

#[tokio::test]
async fn test_rejected_request_propagates() {
    let wallet = SimulatedWallet::new();
    let coordinator = connected_coordinator(wallet.clone()).await;
    wallet.set_reject_requests(true);

    let result = coordinator
        .sign_transaction(&xrpl_testnet(), XrplPayment::new("rA", "rB", "1").to_tx_json(), None)
        .await;

    assert!(matches!(result, Err(ClientError::RequestRejected { .. })));
    // The session survives a rejected request
    assert!(coordinator.session().await.is_some());
}

#[tokio::test]
async fn test_request_timeout() {
    let wallet = SimulatedWallet::new().with_request_delay(Duration::from_millis(500));
    let coordinator = CoordinatorBuilder::new()
        .request_timeout(Duration::from_millis(20))
        .factory(SimulatedWalletFactory::new(wallet))
        .build()
        .unwrap();
    coordinator.ensure_client().await.unwrap();
    assert!(coordinator.connect(None).await.is_connected());

    let result = coordinator
        .request(&xrpl_testnet(), "xrpl_signTransaction", json!({"tx_json": {}}))
        .await;

    assert!(matches!(result, Err(ClientError::OperationTimeout { duration_ms: 20 })));
}

// ===== SESSION EVENTS =====

#[tokio::test]
async fn test_expiry_event_resets_state() {
    let coordinator = connected_coordinator(SimulatedWallet::new()).await;
    let topic = coordinator.session().await.unwrap().topic;

    let unrelated = SessionEvent::Expired {
        topic: "other".into(),
    };
    assert!(!coordinator.handle_session_event(unrelated).await);
    assert!(coordinator.session().await.is_some());

    assert!(coordinator.handle_session_event(SessionEvent::Expired { topic }).await);
    assert!(coordinator.session().await.is_none());
    assert!(coordinator.accounts().await.is_empty());
}

#[tokio::test]
async fn test_update_event_rederives_accounts() {
    let coordinator = connected_coordinator(SimulatedWallet::new()).await;
    let topic = coordinator.session().await.unwrap().topic;

    let changed = coordinator
        .handle_session_event(SessionEvent::Updated {
            topic,
            namespaces: namespaces(&[("xrpl", &["xrpl:1:rNEW"])]),
        })
        .await;

    assert!(changed);
    assert_eq!(coordinator.accounts().await, vec!["xrpl:1:rNEW"]);
}

#[tokio::test]
async fn test_prune_expired_session() {
    let coordinator = connected_coordinator(SimulatedWallet::new()).await;
    assert!(!coordinator.prune_expired().await);

    coordinator.state.write().await.session.as_mut().unwrap().expiry = 0;
    assert!(coordinator.prune_expired().await);
    assert!(coordinator.session().await.is_none());
}

// ===== EVENTS & LOGGING =====

#[tokio::test]
async fn test_event_stream_reports_connect() {
    let coordinator = ready_coordinator(SimulatedWallet::new()).await;
    let mut events = coordinator.subscribe();

    assert!(coordinator.connect(None).await.is_connected());

    let proposed = events.next().await.unwrap().unwrap();
    assert!(matches!(proposed, CoordinatorEvent::PairingProposed { .. }));
    let connected = events.next().await.unwrap().unwrap();
    assert!(matches!(
        connected,
        CoordinatorEvent::SessionConnected { ref accounts, .. } if accounts.len() == 4
    ));
}

#[tokio::test]
#[traced_test]
async fn test_failed_connect_is_logged() {
    let wallet = SimulatedWallet::new().with_mode(ApprovalMode::Reject);
    let coordinator = ready_coordinator(wallet).await;

    let _ = coordinator.connect(None).await;

    assert!(logs_contain("Connection handshake failed"));
}
