use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::events::{EventBus, EventType, WalletEvent};
use super::state::WalletState;
use crate::config::ManagerOptions;
use crate::connector::{AddressCallback, ChainCallback, WalletConnector, WalletRegistry};
use crate::error::{ConnectorError, Result};
use crate::wallet::{ChainId, ChainType, SessionLookup, SessionStore, WalletType};

pub type WalletCallback = Arc<dyn Fn(Option<WalletType>) + Send + Sync>;

static INSTANCE: Mutex<Option<WalletManager>> = parking_lot::const_mutex(None);

struct ManagerInner {
    options: ManagerOptions,
    registry: WalletRegistry,
    sessions: SessionStore,
    events: Arc<EventBus>,
    connector: RwLock<Option<Arc<dyn WalletConnector>>>,
    /// Bumped by every adopt; hooks of replaced connectors compare against it
    generation: AtomicU64,
    state: Mutex<WalletState>,
    address_observers: RwLock<HashMap<String, AddressCallback>>,
    chain_observers: RwLock<HashMap<String, ChainCallback>>,
    wallet_observers: RwLock<HashMap<String, WalletCallback>>,
}

/// Owns the active wallet connector and the session derived from it.
///
/// Cloning is cheap and every clone drives the same manager. Connectors
/// report address and chain changes back through hooks set in
/// [`WalletManager::adopt`], which hold only a weak reference.
#[derive(Clone)]
pub struct WalletManager {
    inner: Arc<ManagerInner>,
}

impl WalletManager {
    pub fn new(
        options: ManagerOptions,
        registry: WalletRegistry,
        sessions: SessionStore,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                options,
                registry,
                sessions,
                events,
                connector: RwLock::new(None),
                generation: AtomicU64::new(0),
                state: Mutex::new(WalletState::default()),
                address_observers: RwLock::new(HashMap::new()),
                chain_observers: RwLock::new(HashMap::new()),
                wallet_observers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create the process-wide manager. Fails if one already exists.
    pub fn initialize(
        options: ManagerOptions,
        registry: WalletRegistry,
        sessions: SessionStore,
        events: Arc<EventBus>,
    ) -> Result<WalletManager> {
        let mut slot = INSTANCE.lock();
        if slot.is_some() {
            return Err(ConnectorError::AlreadyInitialized);
        }

        let manager = Self::new(options, registry, sessions, events);
        *slot = Some(manager.clone());
        Ok(manager)
    }

    pub fn instance() -> Result<WalletManager> {
        INSTANCE.lock().clone().ok_or(ConnectorError::NotInitialized)
    }

    /// Drop the process-wide manager so `initialize` can run again
    pub fn destroy() {
        INSTANCE.lock().take();
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.inner.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    /// Make `connector` the active wallet.
    ///
    /// Address and chain already known to the connector are taken over, and
    /// later changes flow back through its change hooks.
    pub fn adopt(&self, connector: Option<Arc<dyn WalletConnector>>) -> Result<()> {
        let Some(connector) = connector else {
            self.inner.events.dispatch(EventType::ErrorInvalidWalletConnector);
            return Err(ConnectorError::InvalidConnector);
        };
        info!(wallet = %connector.wallet_type(), "adopting wallet connector");
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(address) = connector.current_address().filter(|address| !address.is_empty()) {
            self.inner.set_address(&address);
        }
        if let Some(chain_id) = connector.chain_id() {
            if !self.inner.set_chain(&chain_id) {
                return Err(ConnectorError::WrongNetwork(chain_id.to_string()));
            }
        }

        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        connector.set_on_address_change(Arc::new(move |address: &str| {
            let Some(inner) = weak.upgrade() else { return };
            if !inner.is_current(generation) {
                debug!(%address, "ignoring address change from a replaced connector");
                return;
            }
            inner.set_address(address);
            inner.events.dispatch(WalletEvent::AddressChanged {
                address: address.to_string(),
            });
        }));
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        connector.set_on_chain_change(Arc::new(move |chain_id: &ChainId| {
            let Some(inner) = weak.upgrade() else { return };
            if !inner.is_current(generation) {
                debug!(%chain_id, "ignoring chain change from a replaced connector");
                return;
            }
            inner.set_chain(chain_id);
            inner.events.dispatch(WalletEvent::ChainChanged {
                chain_id: chain_id.clone(),
            });
        }));

        let wallet_type = self.inner.state.lock().wallet_type;
        let observers: Vec<WalletCallback> = self.inner.wallet_observers.read().values().cloned().collect();
        for callback in observers {
            callback(wallet_type);
        }

        self.inner.events.dispatch(EventType::WalletChange);
        self.inner.save_session();
        *self.inner.connector.write() = Some(connector);
        Ok(())
    }

    /// Forget the active wallet and its session. Safe to call when nothing is connected.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    pub fn set_wallet_type(&self, wallet_type: WalletType) {
        self.inner.state.lock().wallet_type = Some(wallet_type);
        self.inner.save_session();
    }

    pub fn set_chain_type(&self, chain_type: ChainType) {
        self.inner.state.lock().chain_type = Some(chain_type);
        self.inner.save_session();
    }

    /// Restore the persisted session if auto-connect is enabled
    pub async fn auto_connect(&self) -> bool {
        if !self.inner.options.wallet_auto_connect {
            return false;
        }
        self.restore_session().await
    }

    /// Reconnect the wallet recorded in the session store.
    ///
    /// Returns `false` without side effects when there is nothing to restore.
    pub async fn restore_session(&self) -> bool {
        let events = &self.inner.events;
        let record = match self.inner.sessions.load() {
            Ok(SessionLookup::Found(record)) => record,
            Ok(SessionLookup::Expired) => {
                info!("stored wallet session expired");
                events.dispatch(EventType::ErrorAutoConnectExpired);
                return false;
            }
            Ok(SessionLookup::Empty | SessionLookup::Malformed) => return false,
            Err(e) => {
                warn!("failed to read wallet session: {}", e);
                return false;
            }
        };

        let (Some(wallet_type), Some(chain_type), Some(chain_id)) =
            (record.wallet_type, record.chain_type, record.chain_id.clone())
        else {
            return false;
        };
        if record.address.is_empty() {
            return false;
        }

        let Some(connector) = self.inner.registry.resolve(wallet_type) else {
            events.dispatch(EventType::ErrorNoMatchingConnector);
            return false;
        };

        match connector.is_unlocked().await {
            Ok(Some(false)) => {
                events.dispatch(EventType::ErrorUnlockRequired);
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(wallet = %wallet_type, "unlock check failed: {}", e);
                return false;
            }
        }

        match connector.restore_state(&record.address, &chain_id).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(wallet = %wallet_type, "restoring wallet state failed: {}", e);
                return false;
            }
        }

        if self.adopt(Some(connector)).is_err() {
            return false;
        }
        self.set_chain_type(chain_type);
        self.set_wallet_type(wallet_type);

        info!(wallet = %wallet_type, address = %record.address, "wallet session restored");
        events.dispatch(EventType::WalletAutoConnected);
        true
    }

    pub fn connector(&self) -> Option<Arc<dyn WalletConnector>> {
        self.inner.connector.read().clone()
    }

    pub fn state(&self) -> WalletState {
        self.inner.state.lock().clone()
    }

    pub fn current_address(&self) -> Option<String> {
        self.inner.state.lock().address.clone()
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.inner.state.lock().chain_id.clone()
    }

    pub fn wallet_type(&self) -> Option<WalletType> {
        self.inner.state.lock().wallet_type
    }

    pub fn chain_type(&self) -> Option<ChainType> {
        self.inner.state.lock().chain_type
    }

    /// A connector is active, reports an address, and its wallet type is set
    pub fn is_wallet_connected(&self) -> bool {
        let has_address = self
            .connector()
            .and_then(|connector| connector.current_address())
            .is_some_and(|address| !address.is_empty());
        has_address && self.wallet_type().is_some()
    }

    pub fn register_on_address_change<F>(&self, key: impl Into<String>, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner
            .address_observers
            .write()
            .insert(key.into(), Arc::new(callback));
    }

    pub fn deregister_on_address_change(&self, key: &str) -> bool {
        self.inner.address_observers.write().remove(key).is_some()
    }

    pub fn register_on_chain_change<F>(&self, key: impl Into<String>, callback: F)
    where
        F: Fn(&ChainId) + Send + Sync + 'static,
    {
        self.inner
            .chain_observers
            .write()
            .insert(key.into(), Arc::new(callback));
    }

    pub fn deregister_on_chain_change(&self, key: &str) -> bool {
        self.inner.chain_observers.write().remove(key).is_some()
    }

    pub fn register_on_wallet_change<F>(&self, key: impl Into<String>, callback: F)
    where
        F: Fn(Option<WalletType>) + Send + Sync + 'static,
    {
        self.inner
            .wallet_observers
            .write()
            .insert(key.into(), Arc::new(callback));
    }

    pub fn deregister_on_wallet_change(&self, key: &str) -> bool {
        self.inner.wallet_observers.write().remove(key).is_some()
    }
}

impl ManagerInner {
    fn set_address(&self, address: &str) {
        self.state.lock().address = Some(address.to_string());

        let observers: Vec<AddressCallback> = self.address_observers.read().values().cloned().collect();
        for callback in observers {
            callback(address);
        }
        self.save_session();
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Returns `false` when the chain-mismatch policy disconnected the wallet
    fn set_chain(&self, chain_id: &ChainId) -> bool {
        self.state.lock().chain_id = Some(chain_id.clone());

        let observers: Vec<ChainCallback> = self.chain_observers.read().values().cloned().collect();
        for callback in observers {
            callback(chain_id);
        }

        if self.options.auto_disconnect_on_chain_mismatch {
            if let Some(target) = self.options.target_chain_id {
                if !chain_id.same_network(target) {
                    warn!(%chain_id, target, "wallet switched to an unexpected chain, disconnecting");
                    self.disconnect();
                    self.events.dispatch(EventType::ErrorWrongNetwork);
                    return false;
                }
            }
        }

        self.save_session();
        true
    }

    fn disconnect(&self) {
        let previous = self.connector.write().take();
        self.state.lock().reset();
        if let Err(e) = self.sessions.clear() {
            warn!("failed to clear wallet session: {}", e);
        }
        if let Some(connector) = previous {
            info!(wallet = %connector.wallet_type(), "wallet disconnected");
        }
        self.events.dispatch(EventType::WalletDisconnect);
    }

    fn save_session(&self) {
        let record = self.state.lock().to_record();
        match self.sessions.save(&record) {
            Ok(()) => debug!(address = %record.address, "wallet session saved"),
            Err(e) => warn!("failed to save wallet session: {}", e),
        }
    }
}
