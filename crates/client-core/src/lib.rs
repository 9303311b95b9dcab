//! # LedgerLink Client Core
//!
//! Session coordination for wallet-pairing protocols across XRP Ledger
//! (`xrpl`) and EVM (`eip155`) networks.
//!
//! This crate sits between a presentation layer and an external
//! wallet-pairing protocol client. It lazily constructs that client, runs the
//! connection handshake, keeps a derived account list in step with the live
//! session and dispatches signing requests scoped to it. Relay transport,
//! encryption and URI encoding stay behind the [`protocol::PairingClient`]
//! trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Presentation Layer               │
//! │   (CLI, desktop UI, web front end)      │
//! └──────────────────┬──────────────────────┘
//!                    │ connect / sign / disconnect
//! ┌──────────────────┴──────────────────────┐
//! │      ledgerlink-client-core             │
//! │ ┌─────────────┐ ┌─────────────────────┐ │
//! │ │ Session     │ │ Events / Accounts   │ │
//! │ │ Coordinator │ │ (broadcast stream)  │ │
//! │ └─────────────┘ └─────────────────────┘ │
//! └──────────────────┬──────────────────────┘
//!                    │ PairingClient trait
//! ┌──────────────────┴──────────────────────┐
//! │   Wallet-pairing protocol client        │
//! │   (relay, crypto, URI encoding)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use ledgerlink_client_core::{CoordinatorBuilder, SignOptions};
//! use ledgerlink_client_core::sim::{SimulatedWallet, SimulatedWalletFactory};
//! use ledgerlink_client_core::xrpl::XrplPayment;
//!
//! # tokio_test::block_on(async {
//! let coordinator = CoordinatorBuilder::new()
//!     .factory(SimulatedWalletFactory::new(SimulatedWallet::new()))
//!     .build()?;
//!
//! coordinator.ensure_client().await?;
//! let _ = coordinator.connect(None).await;
//!
//! let account: ledgerlink_client_core::caip::AccountId = coordinator.accounts().await[0].parse()?;
//! let destination = "rGA3kwmB5hBnvs6VW1fnGKysJfBCUazDrD";
//! let payment = XrplPayment::new(account.address(), destination, "100000");
//! let options = Some(SignOptions::autofill_and_submit());
//! let response = coordinator
//!     .sign_transaction(account.chain_id(), payment.to_tx_json(), options)
//!     .await?;
//! assert!(response.get("hash").is_some());
//!
//! let _ = coordinator.disconnect().await;
//! # Ok::<(), ledgerlink_client_core::ClientError>(())
//! # }).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! Lifecycle operations (`connect`, `disconnect`) report through outcome
//! values and always leave state consistent. Requests return
//! [`ClientResult`]; see [`ClientError`] for the categories.

pub mod caip;
pub mod client;
pub mod error;
pub mod events;
pub mod network;
pub mod protocol;
pub mod xrpl;

#[cfg(feature = "sim")]
pub mod sim;

pub use client::{
    AppMetadata, ClientConfig, ConnectOutcome, CoordinatorBuilder, CoordinatorState,
    DisconnectOutcome, NamespaceRequirement, Pairing, RequiredNamespaces, SdkReason, Session,
    SessionCoordinator, SessionEvent, SessionNamespace, SignOptions, derive_accounts,
};
pub use error::{ClientError, ClientResult};
pub use events::{CoordinatorEvent, EventStream};
pub use network::Network;

/// Crate version, for user-agent style reporting
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
