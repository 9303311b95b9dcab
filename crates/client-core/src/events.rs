//! Event system for the session coordinator
//!
//! Presentation layers observe the coordinator either by polling its
//! accessors or by subscribing to a broadcast stream of [`CoordinatorEvent`]s.
//! Events are emitted after the corresponding state change has been applied,
//! so a subscriber that reads `accounts()` on `SessionConnected` sees the new
//! accounts.
//!
//! ```rust,no_run
//! # use ledgerlink_client_core::{SessionCoordinator, CoordinatorEvent};
//! # use tokio_stream::StreamExt;
//! # async fn example(coordinator: std::sync::Arc<SessionCoordinator>) {
//! let mut events = coordinator.subscribe();
//! while let Some(Ok(event)) = events.next().await {
//!     if let CoordinatorEvent::SessionConnected { accounts, .. } = event {
//!         println!("connected: {}", accounts.join(","));
//!     }
//! }
//! # }
//! ```

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use crate::caip::ChainId;

/// Capacity of the event channel; slow subscribers observe `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the session coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// Protocol client construction started
    Initializing,

    /// Protocol client is ready
    Initialized,

    /// Protocol client construction failed
    InitializationFailed {
        /// Error description
        reason: String,
    },

    /// A pairing URI is waiting for approval in the wallet
    PairingProposed {
        /// URI to present to the user
        uri: String,
        /// Chains being requested
        chains: Vec<ChainId>,
    },

    /// A session was adopted
    SessionConnected {
        /// Session topic
        topic: String,
        /// Derived account identifiers
        accounts: Vec<String>,
    },

    /// The wallet changed the namespaces of the current session
    SessionUpdated {
        /// Session topic
        topic: String,
        /// Re-derived account identifiers
        accounts: Vec<String>,
    },

    /// A connection attempt failed; state is unchanged
    ConnectFailed {
        /// Error description
        reason: String,
    },

    /// The session was torn down locally or by the wallet
    SessionDisconnected {
        /// Topic of the removed session
        topic: String,
        /// Whether the wallet was successfully notified (always false for remote deletes)
        notified: bool,
    },

    /// The session reached its expiry
    SessionExpired {
        /// Topic of the removed session
        topic: String,
    },
}

/// Stream of coordinator events
pub type EventStream = BroadcastStream<CoordinatorEvent>;

/// Broadcast fan-out for coordinator events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoordinatorEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event; dropped silently when nobody is subscribed
    pub fn emit(&self, event: CoordinatorEvent) {
        trace!(?event, subscribers = self.sender.receiver_count(), "Emitting coordinator event");
        let _ = self.sender.send(event);
    }

    /// Subscribe as a raw receiver
    pub fn receiver(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream
    pub fn stream(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
