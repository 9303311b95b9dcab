//! Connection lifecycle: connect, disconnect and wallet-side session events
//!
//! Lifecycle operations never return `Err`. Failures are logged and
//! reported through [`ConnectOutcome`] / [`DisconnectOutcome`], and the
//! coordinator's state is always left consistent: a session is either fully
//! adopted (with its derived accounts) or not at all.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::types::{
    ConnectOutcome, DisconnectOutcome, Pairing, SdkReason, Session, SessionEvent, derive_accounts,
};
use super::SessionCoordinator;
use crate::caip::ChainId;
use crate::error::{ClientError, ClientResult};
use crate::events::CoordinatorEvent;
use crate::protocol::{ApprovalPrompt, ConnectParams, PairingClient, PendingApproval};

/// Closes the approval prompt exactly once if it was opened
///
/// Closing also happens on drop so that an abandoned `connect` future does not
/// leave the prompt on screen.
struct PromptGuard<'a> {
    prompt: &'a dyn ApprovalPrompt,
    open: bool,
}

impl<'a> PromptGuard<'a> {
    fn new(prompt: &'a dyn ApprovalPrompt) -> Self {
        Self { prompt, open: false }
    }

    fn open(&mut self, uri: &str, chains: &[ChainId]) {
        self.prompt.open(uri, chains);
        self.open = true;
    }

    fn dismiss(&mut self) {
        if std::mem::take(&mut self.open) {
            self.prompt.close();
        }
    }
}

impl Drop for PromptGuard<'_> {
    fn drop(&mut self) {
        self.dismiss();
    }
}

fn into_handshake_error(e: ClientError) -> ClientError {
    match e {
        ClientError::HandshakeFailed { .. } | ClientError::ApprovalRejected { .. } => e,
        other => ClientError::handshake(other.to_string()),
    }
}

impl SessionCoordinator {
    /// Propose a session to a wallet and adopt it once approved
    ///
    /// Without an initialized client this returns [`ConnectOutcome::NoClient`]
    /// and starts no handshake. When `pairing` is given, its topic is reused
    /// instead of creating a new pairing. The approval wait is unbounded here;
    /// only the protocol client's own expiry applies.
    pub async fn connect(&self, pairing: Option<&Pairing>) -> ConnectOutcome {
        let Some(client) = self.client() else {
            debug!("Connect requested before the pairing client exists; ignoring");
            return ConnectOutcome::NoClient;
        };

        let mut prompt = PromptGuard::new(self.prompt.as_ref());
        let outcome = match self.handshake(client.as_ref(), pairing, &mut prompt).await {
            Ok(session) => {
                self.adopt_session(client.as_ref(), session.clone()).await;
                ConnectOutcome::Connected(session)
            }
            Err(e) => {
                error!(error = %e, category = e.category(), "Connection handshake failed");
                self.events.emit(CoordinatorEvent::ConnectFailed {
                    reason: e.to_string(),
                });
                ConnectOutcome::Failed(e)
            }
        };
        prompt.dismiss();
        outcome
    }

    async fn handshake(
        &self,
        client: &dyn PairingClient,
        pairing: Option<&Pairing>,
        prompt: &mut PromptGuard<'_>,
    ) -> ClientResult<Session> {
        let required_namespaces = self.config.required_namespaces.clone();
        let chains = required_namespaces.chains();
        let params = ConnectParams {
            pairing_topic: pairing.map(|p| p.topic.clone()),
            required_namespaces,
        };

        info!(
            pairing_topic = ?params.pairing_topic,
            chains = chains.len(),
            "Proposing session"
        );

        let PendingApproval { uri, approval } =
            client.connect(params).await.map_err(into_handshake_error)?;

        if let Some(uri) = uri {
            prompt.open(&uri, &chains);
            self.events.emit(CoordinatorEvent::PairingProposed { uri, chains });
        }

        approval.await.map_err(into_handshake_error)
    }

    async fn adopt_session(&self, client: &dyn PairingClient, session: Session) {
        let pairings: Vec<Pairing> = client
            .active_pairings()
            .into_iter()
            .filter(|p| p.active)
            .collect();
        let topic = session.topic.clone();

        let accounts = {
            let mut state = self.state.write().await;
            if let Some(previous) = &state.session {
                warn!(previous = %previous.topic, topic = %topic, "Replacing existing session");
            }
            state.adopt(session);
            state.pairings = pairings;
            state.accounts.clone()
        };

        info!(topic = %topic, accounts = accounts.len(), "Session connected");
        self.events.emit(CoordinatorEvent::SessionConnected { topic, accounts });
    }

    /// End the current session
    ///
    /// Sends a "user disconnected" notice for the session topic. Local state
    /// is reset whether or not the notice reaches the wallet, unless another
    /// session was adopted in the meantime.
    pub async fn disconnect(&self) -> DisconnectOutcome {
        let Some(client) = self.client() else {
            return DisconnectOutcome::NoSession;
        };
        let topic = match &self.state.read().await.session {
            Some(session) => session.topic.clone(),
            None => return DisconnectOutcome::NoSession,
        };

        info!(topic = %topic, "Disconnecting session");
        let result = client.disconnect(&topic, SdkReason::user_disconnected()).await;

        {
            let mut state = self.state.write().await;
            // A connect may have adopted a newer session while the notice was in flight
            if state.session.as_ref().is_some_and(|s| s.topic == topic) {
                state.reset();
            } else {
                debug!(
                    topic = %topic,
                    "Session replaced during disconnect; keeping the newer one"
                );
            }
        }

        match result {
            Ok(()) => {
                info!(topic = %topic, "Session disconnected");
                self.events.emit(CoordinatorEvent::SessionDisconnected {
                    topic: topic.clone(),
                    notified: true,
                });
                DisconnectOutcome::Disconnected { topic }
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Disconnect notice failed; state reset anyway");
                self.events.emit(CoordinatorEvent::SessionDisconnected {
                    topic: topic.clone(),
                    notified: false,
                });
                let error = ClientError::DisconnectFailed {
                    topic: topic.clone(),
                    reason: e.to_string(),
                };
                DisconnectOutcome::ResetAfterError { topic, error }
            }
        }
    }

    /// Apply a wallet-side session notification
    ///
    /// Events for topics other than the current session's are ignored.
    /// Returns whether the event changed state.
    pub async fn handle_session_event(&self, event: SessionEvent) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let is_current = state
            .session
            .as_ref()
            .is_some_and(|s| s.topic == event.topic());
        if !is_current {
            debug!(topic = %event.topic(), "Ignoring event for unknown session");
            return false;
        }

        let emitted = match event {
            SessionEvent::Expired { topic } => {
                state.reset();
                info!(topic = %topic, "Session expired");
                CoordinatorEvent::SessionExpired { topic }
            }
            SessionEvent::Deleted { topic } => {
                state.reset();
                info!(topic = %topic, "Session deleted by wallet");
                CoordinatorEvent::SessionDisconnected {
                    topic,
                    notified: false,
                }
            }
            SessionEvent::Updated { topic, namespaces } => {
                let Some(session) = state.session.as_mut() else {
                    return false;
                };
                session.namespaces = namespaces;
                state.accounts = derive_accounts(session);
                info!(
                    topic = %topic,
                    accounts = state.accounts.len(),
                    "Session namespaces updated"
                );
                CoordinatorEvent::SessionUpdated {
                    topic,
                    accounts: state.accounts.clone(),
                }
            }
        };
        drop(guard);

        self.events.emit(emitted);
        true
    }

    /// Drop the session if its expiry has passed
    ///
    /// Returns whether a session was removed.
    pub async fn prune_expired(&self) -> bool {
        let expired_topic = match &self.state.read().await.session {
            Some(session) if session.is_expired_at(Utc::now()) => session.topic.clone(),
            _ => return false,
        };
        self.handle_session_event(SessionEvent::Expired {
            topic: expired_topic,
        })
        .await
    }
}
