//! Session-scoped requests
//!
//! Every request is bound to the current session topic and a target chain.
//! The method is picked from the chain's namespace:
//!
//! | namespace | method                 | params                              |
//! |-----------|------------------------|-------------------------------------|
//! | `xrpl`    | `xrpl_signTransaction` | `{ tx_json, autofill?, submit? }`   |
//! | `eip155`  | `eth_sendTransaction`  | `[payload]`                         |
//!
//! Preconditions (client and session present, namespace supported) are
//! checked before anything is sent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, info};

use super::SessionCoordinator;
use super::recovery::with_timeout;
use crate::caip::{ChainId, EIP155_NAMESPACE, XRPL_NAMESPACE};
use crate::error::{ClientError, ClientResult};
use crate::network::{ETH_SEND_TRANSACTION, PERSONAL_SIGN, XRPL_SIGN_TRANSACTION};
use crate::protocol::{PairingClient, SessionRequest};

/// Wallet-side options for `xrpl_signTransaction`
///
/// Absent options are omitted from the request so that the wallet applies its
/// own defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOptions {
    /// Let the wallet fill in fee, sequence and last ledger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autofill: Option<bool>,
    /// Let the wallet submit the signed transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<bool>,
}

impl SignOptions {
    /// Autofill and submit, as a wallet-driven payment flow does
    pub fn autofill_and_submit() -> Self {
        Self {
            autofill: Some(true),
            submit: Some(true),
        }
    }
}

/// Build the method name and params for signing `payload` on `chain_id`
pub(crate) fn sign_request_params(
    chain_id: &ChainId,
    payload: Map<String, Value>,
    options: Option<SignOptions>,
) -> ClientResult<(&'static str, Value)> {
    match chain_id.namespace() {
        XRPL_NAMESPACE => {
            let mut params = Map::new();
            params.insert("tx_json".to_string(), Value::Object(payload));
            if let Some(options) = options {
                if let Some(autofill) = options.autofill {
                    params.insert("autofill".to_string(), Value::Bool(autofill));
                }
                if let Some(submit) = options.submit {
                    params.insert("submit".to_string(), Value::Bool(submit));
                }
            }
            Ok((XRPL_SIGN_TRANSACTION, Value::Object(params)))
        }
        EIP155_NAMESPACE => Ok((ETH_SEND_TRANSACTION, json!([Value::Object(payload)]))),
        other => Err(ClientError::UnsupportedNamespace {
            namespace: other.to_string(),
        }),
    }
}

impl SessionCoordinator {
    /// Ask the wallet to sign (and possibly submit) a transaction
    ///
    /// `payload` is the ledger-specific transaction body: an XRPL `tx_json`
    /// or an EVM transaction object. Returns the wallet's raw response.
    ///
    /// # Errors
    ///
    /// - [`ClientError::PreconditionFailed`] without a client or session
    /// - [`ClientError::UnsupportedNamespace`] for chains outside `xrpl`/`eip155`
    /// - transport and wallet errors from the protocol client
    pub async fn sign_transaction(
        &self,
        chain_id: &ChainId,
        payload: Map<String, Value>,
        options: Option<SignOptions>,
    ) -> ClientResult<Value> {
        let (client, topic) = self.request_context("sign_transaction").await?;
        let (method, params) = sign_request_params(chain_id, payload, options)?;
        let request = SessionRequest::new(topic, chain_id.clone(), method, params);
        self.dispatch(client.as_ref(), request).await
    }

    /// Send `message` for signing with `personal_sign`
    pub async fn personal_sign(
        &self,
        chain_id: &ChainId,
        message: &str,
        address: &str,
    ) -> ClientResult<Value> {
        let (client, topic) = self.request_context(PERSONAL_SIGN).await?;
        if chain_id.namespace() != EIP155_NAMESPACE {
            return Err(ClientError::UnsupportedNamespace {
                namespace: chain_id.namespace().to_string(),
            });
        }
        let params = json!([message, address]);
        let request = SessionRequest::new(topic, chain_id.clone(), PERSONAL_SIGN, params);
        self.dispatch(client.as_ref(), request).await
    }

    /// Send an arbitrary method within the current session
    pub async fn request(
        &self,
        chain_id: &ChainId,
        method: &str,
        params: Value,
    ) -> ClientResult<Value> {
        let (client, topic) = self.request_context(method).await?;
        let request = SessionRequest::new(topic, chain_id.clone(), method, params);
        self.dispatch(client.as_ref(), request).await
    }

    async fn request_context(
        &self,
        operation: &str,
    ) -> ClientResult<(Arc<dyn PairingClient>, String)> {
        let client = self.client().ok_or_else(|| {
            ClientError::precondition(operation, "pairing client is not initialized")
        })?;
        let topic = self
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.topic.clone())
            .ok_or_else(|| ClientError::precondition(operation, "no active session"))?;
        Ok((client, topic))
    }

    async fn dispatch(
        &self,
        client: &dyn PairingClient,
        request: SessionRequest,
    ) -> ClientResult<Value> {
        let method = request.method().to_string();
        let topic = request.topic.clone();
        info!(
            topic = %topic,
            chain_id = %request.chain_id,
            method = %method,
            "Sending session request"
        );
        debug!(params = %request.request.params, "Request params");

        let result = match self.config.request_timeout {
            Some(timeout) => with_timeout(&method, timeout, client.request(request)).await,
            None => client.request(request).await,
        };

        match &result {
            Ok(_) => info!(topic = %topic, method = %method, "Session request completed"),
            Err(e) => error!(
                topic = %topic,
                method = %method,
                error = %e,
                category = e.category(),
                "Session request failed"
            ),
        }
        result
    }
}
