use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::trace;

use crate::wallet::ChainId;

/// Kinds of events published on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Wallet events
    WalletChange,
    WalletChangeAddress,
    WalletChangeChain,
    WalletDisconnect,
    WalletAutoConnected,

    // Diagnostics
    ErrorInvalidWalletConnector,
    ErrorWrongNetwork,
    ErrorAutoConnectExpired,
    ErrorUnlockRequired,
    ErrorNoMatchingConnector,
}

impl EventType {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            EventType::ErrorInvalidWalletConnector
                | EventType::ErrorWrongNetwork
                | EventType::ErrorAutoConnectExpired
                | EventType::ErrorUnlockRequired
                | EventType::ErrorNoMatchingConnector
        )
    }
}

/// Event payloads. Events without data carry only their type.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    AddressChanged { address: String },
    ChainChanged { chain_id: ChainId },
    Signal(EventType),
}

impl WalletEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            WalletEvent::AddressChanged { .. } => EventType::WalletChangeAddress,
            WalletEvent::ChainChanged { .. } => EventType::WalletChangeChain,
            WalletEvent::Signal(event_type) => *event_type,
        }
    }
}

impl From<EventType> for WalletEvent {
    fn from(event_type: EventType) -> Self {
        WalletEvent::Signal(event_type)
    }
}

pub type EventCallback = Arc<dyn Fn(EventType, &WalletEvent) + Send + Sync>;

/// Fan-out of lifecycle and diagnostic events to keyed listeners.
///
/// Listeners are held in an unordered map, so delivery order between
/// listeners is unspecified. Registering an existing id replaces its callback.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, EventCallback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus
    pub fn global() -> Arc<EventBus> {
        static GLOBAL: OnceLock<Arc<EventBus>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(EventBus::new())).clone()
    }

    pub fn add_listener<F>(&self, listener_id: impl Into<String>, callback: F)
    where
        F: Fn(EventType, &WalletEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .insert(listener_id.into(), Arc::new(callback));
    }

    /// Register a listener that only sees events whose type is in `event_types`
    pub fn add_listener_for<F>(
        &self,
        listener_id: impl Into<String>,
        event_types: HashSet<EventType>,
        callback: F,
    ) where
        F: Fn(EventType, &WalletEvent) + Send + Sync + 'static,
    {
        self.add_listener(listener_id, move |event_type, event| {
            if event_types.contains(&event_type) {
                callback(event_type, event);
            }
        });
    }

    pub fn remove_listener(&self, listener_id: &str) -> bool {
        self.listeners.write().remove(listener_id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `event` to every listener registered at the time of the call.
    /// Listeners may register or remove listeners while being called.
    pub fn dispatch(&self, event: impl Into<WalletEvent>) {
        let event = event.into();
        let event_type = event.event_type();
        let snapshot: Vec<EventCallback> = self.listeners.read().values().cloned().collect();
        trace!(?event_type, listeners = snapshot.len(), "dispatching event");

        for callback in snapshot {
            callback(event_type, &event);
        }
    }
}
