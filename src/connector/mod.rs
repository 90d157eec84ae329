//! Connector contract shared by every wallet backend.
//!
//! A connector talks to one concrete wallet. Beyond the core
//! [`WalletConnector`] operations a connector may expose optional
//! capabilities (QR, deep link, browser extension), queried through
//! [`WalletConnector::as_qr`] and friends rather than by downcasting.

pub mod provider;
pub mod registry;
pub mod remote;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ManagerOptions;
use crate::error::Result;
use crate::wallet::{ChainId, SignType, TransactionRequest, TransactionResult, WalletType};

pub use provider::{InjectedProvider, ProviderConnector, ProviderProfile};
pub use registry::{ConnectorFactory, WalletRegistry, WalletRegistryBuilder};
pub use remote::{
    ApprovalApi, ApprovalPoller, HttpApprovalApi, Platform, RemoteApprovalConnector, RemoteWallet,
};

pub type AddressCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type ChainCallback = Arc<dyn Fn(&ChainId) + Send + Sync>;
/// Receives the QR payload and, for activations, how long it stays valid in seconds
pub type QrCodeCallback = Arc<dyn Fn(&str, Option<u64>) + Send + Sync>;
pub type DeepLinkCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional interfaces a connector can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletInterface {
    Qr,
    DeepLink,
    Extension,
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn wallet_type(&self) -> WalletType;

    fn current_address(&self) -> Option<String>;

    fn chain_id(&self) -> Option<ChainId>;

    /// Replace the hook fired whenever the wallet reports a new address
    fn set_on_address_change(&self, callback: AddressCallback);

    /// Replace the hook fired whenever the wallet reports a new chain
    fn set_on_chain_change(&self, callback: ChainCallback);

    /// Ask the wallet for access. `Ok(false)` means the user or wallet declined.
    async fn activate(&self) -> Result<bool>;

    /// Personal-sign `message`
    async fn sign(&self, message: &str) -> Result<String>;

    async fn sign_typed_data(&self, params: &Value, sign_type: SignType) -> Result<String>;

    /// `None` when the wallet cannot report its lock state
    async fn is_unlocked(&self) -> Result<Option<bool>>;

    async fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TransactionResult>;

    /// Resume a previous session without user interaction
    async fn restore_state(&self, address: &str, chain_id: &ChainId) -> Result<bool>;

    /// Native token balance as a decimal string, `None` when it cannot be read
    async fn get_balance(&self) -> Result<Option<String>>;

    /// Link opening the application inside the wallet's mobile browser
    fn dapp_link(&self) -> Option<String> {
        None
    }

    fn as_qr(&self) -> Option<&dyn QrConnector> {
        None
    }

    fn as_deep_link(&self) -> Option<&dyn DeepLinkConnector> {
        None
    }

    fn as_extension(&self) -> Option<&dyn ExtensionConnector> {
        None
    }

    fn supports(&self, interface: WalletInterface) -> bool {
        match interface {
            WalletInterface::Qr => self.as_qr().is_some(),
            WalletInterface::DeepLink => self.as_deep_link().is_some(),
            WalletInterface::Extension => self.as_extension().is_some(),
        }
    }
}

/// Cancellation of requests waiting on out-of-process approval
pub trait PendingApprovalControl {
    fn abort_pending_activation(&self);
    fn abort_pending_sign(&self);
    fn abort_pending_transaction(&self);
}

/// Wallets approved by scanning a QR code
pub trait QrConnector: PendingApprovalControl + Send + Sync {
    /// QR payload of the request currently awaiting approval
    fn qr_code(&self) -> Option<String>;
    fn set_qr_code_callback(&self, callback: QrCodeCallback);
}

/// Wallets approved by following a deep link on the same device
pub trait DeepLinkConnector: PendingApprovalControl + Send + Sync {
    fn deep_link(&self) -> Option<String>;
    fn set_deep_link_callback(&self, callback: DeepLinkCallback);
}

/// Wallets installed as a browser extension
pub trait ExtensionConnector: Send + Sync {
    fn has_extension(&self) -> bool;
    fn install_link(&self) -> &str;
}

/// ABI call encoding, supplied by the host application
pub trait ContractEncoder: Send + Sync {
    /// Encode a call to the function described by `abi_item` as `0x` call data
    fn encode_call(&self, abi_item: &Value, params: &[Value]) -> Result<String>;
}

/// Address and chain change hooks, set by whoever owns the connector
#[derive(Default)]
pub struct ChangeHandlers {
    on_address: Mutex<Option<AddressCallback>>,
    on_chain: Mutex<Option<ChainCallback>>,
}

impl ChangeHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_address_change(&self, callback: AddressCallback) {
        *self.on_address.lock() = Some(callback);
    }

    pub fn set_on_chain_change(&self, callback: ChainCallback) {
        *self.on_chain.lock() = Some(callback);
    }

    // The lock is released before calling out, hooks may re-enter the connector.
    pub fn notify_address(&self, address: &str) {
        let callback = self.on_address.lock().clone();
        if let Some(callback) = callback {
            callback(address);
        }
    }

    pub fn notify_chain(&self, chain_id: &ChainId) {
        let callback = self.on_chain.lock().clone();
        if let Some(callback) = callback {
            callback(chain_id);
        }
    }
}

/// Everything a connector factory needs to build a connector
#[derive(Clone)]
pub struct ConnectorContext {
    pub options: Arc<ManagerOptions>,
    pub http: reqwest::Client,
    pub platform: Platform,
    pub providers: HashMap<WalletType, Arc<dyn InjectedProvider>>,
    pub approval_apis: HashMap<WalletType, Arc<dyn ApprovalApi>>,
    pub encoder: Option<Arc<dyn ContractEncoder>>,
}

impl ConnectorContext {
    pub fn new(options: ManagerOptions) -> Self {
        Self {
            options: Arc::new(options),
            http: reqwest::Client::new(),
            platform: Platform::Web,
            providers: HashMap::new(),
            approval_apis: HashMap::new(),
            encoder: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Make an injected provider available to the connector of `wallet`
    pub fn with_provider(mut self, wallet: WalletType, provider: Arc<dyn InjectedProvider>) -> Self {
        self.providers.insert(wallet, provider);
        self
    }

    /// Route remote approvals of `wallet` through `api` instead of its public endpoint
    pub fn with_approval_api(mut self, wallet: WalletType, api: Arc<dyn ApprovalApi>) -> Self {
        self.approval_apis.insert(wallet, api);
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ContractEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn provider(&self, wallet: WalletType) -> Option<Arc<dyn InjectedProvider>> {
        self.providers.get(&wallet).cloned()
    }
}
