use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    AddressCallback, ChainCallback, ChangeHandlers, ConnectorContext, ContractEncoder,
    ExtensionConnector, WalletConnector,
};
use crate::error::{ConnectorError, Result};
use crate::wallet::rpc::hex_quantity_to_decimal;
use crate::wallet::{
    ChainId, RpcFlavor, SignType, TransactionError, TransactionErrorKind, TransactionReceipt,
    TransactionRequest, TransactionResult, WalletType,
};

const METAMASK_INSTALL_LINK: &str =
    "https://chrome.google.com/webstore/detail/metamask/nkbihfbeogaeaoehlefnkodbefgpgknn";
const COINBASE_INSTALL_LINK: &str = "https://www.coinbase.com/wallet/downloads";
const METAMASK_DAPP_LINK: &str = "https://metamask.app.link/dapp/";
const DCENT_DAPP_BROWSER: &str = "https://link.dcentwallet.com/DAppBrowser/";
const KAIKAS_INSTALL_LINK: &str =
    "https://chrome.google.com/webstore/detail/kaikas/jblndlipeogpafnldhgmapagcccfchpi?hl=ko";

/// Receipt lookups after a provider accepted a transaction
const RECEIPT_POLL_ATTEMPTS: u32 = 60;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub type AccountsListener = Arc<dyn Fn(Vec<String>) + Send + Sync>;
pub type ChainListener = Arc<dyn Fn(ChainId) + Send + Sync>;

/// A wallet provider injected by the host, such as a browser extension or a
/// WalletConnect bridge session. Requests follow the EIP-1193 shape.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    fn is_present(&self) -> bool {
        true
    }

    /// Whether the provider announces itself as `wallet` (`isMetaMask`, `isKaikas`, ...)
    fn identifies_as(&self, wallet: WalletType) -> bool;

    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// `None` when the provider has no way to tell
    async fn is_unlocked(&self) -> Option<bool> {
        None
    }

    fn on_accounts_changed(&self, listener: AccountsListener);

    fn on_chain_changed(&self, listener: ChainListener);
}

/// How the lock state of a wallet is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockCheck {
    /// Ask the provider, reporting locked when it is missing
    Provider,
    Unsupported,
    AlwaysUnlocked,
}

/// Per-wallet behaviour of a [`ProviderConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub wallet: WalletType,
    pub flavor: RpcFlavor,
    /// Set for wallets shipped as a browser extension
    pub install_link: Option<&'static str>,
    pub unlock_check: UnlockCheck,
}

impl ProviderProfile {
    pub fn for_wallet(wallet: WalletType) -> Option<Self> {
        let (flavor, install_link, unlock_check) = match wallet {
            WalletType::Metamask => (RpcFlavor::Ethereum, Some(METAMASK_INSTALL_LINK), UnlockCheck::Provider),
            WalletType::Coinbase => (RpcFlavor::Ethereum, Some(COINBASE_INSTALL_LINK), UnlockCheck::Unsupported),
            WalletType::Kaikas => (RpcFlavor::Klaytn, Some(KAIKAS_INSTALL_LINK), UnlockCheck::Provider),
            WalletType::DcentEthereum => (RpcFlavor::Ethereum, None, UnlockCheck::Unsupported),
            WalletType::DcentKlaytn => (RpcFlavor::Klaytn, None, UnlockCheck::Unsupported),
            WalletType::WalletConnect => (RpcFlavor::Ethereum, None, UnlockCheck::AlwaysUnlocked),
            WalletType::Klip | WalletType::KaikasMobile => return None,
        };

        Some(Self {
            wallet,
            flavor,
            install_link,
            unlock_check,
        })
    }

    /// Link opening `base_url` in the wallet's in-app browser, for wallets that have one
    pub fn dapp_link(&self, base_url: &str) -> Option<String> {
        let network = match self.wallet {
            WalletType::Metamask => return Some(format!("{}{}", METAMASK_DAPP_LINK, base_url)),
            WalletType::DcentEthereum => "ethereum-mainnet",
            WalletType::DcentKlaytn => "klaytn-mainnet",
            _ => return None,
        };
        reqwest::Url::parse_with_params(DCENT_DAPP_BROWSER, &[("url", base_url), ("network", network)])
            .map(String::from)
            .ok()
    }

    fn accounts_method(&self) -> &'static str {
        match self.flavor {
            RpcFlavor::Ethereum => "eth_requestAccounts",
            RpcFlavor::Klaytn => "klay_requestAccounts",
        }
    }

    fn chain_method(&self) -> &'static str {
        match self.flavor {
            RpcFlavor::Ethereum => "eth_chainId",
            RpcFlavor::Klaytn => "net_version",
        }
    }
}

#[derive(Default)]
struct ProviderSession {
    address: Mutex<Option<String>>,
    chain_id: Mutex<Option<ChainId>>,
    handlers: ChangeHandlers,
}

impl ProviderSession {
    fn set_address(&self, address: &str) {
        *self.address.lock() = Some(address.to_string());
        self.handlers.notify_address(address);
    }

    fn set_chain_id(&self, chain_id: ChainId) {
        *self.chain_id.lock() = Some(chain_id.clone());
        self.handlers.notify_chain(&chain_id);
    }
}

/// Connector over an [`InjectedProvider`]
pub struct ProviderConnector {
    profile: ProviderProfile,
    provider: Option<Arc<dyn InjectedProvider>>,
    encoder: Option<Arc<dyn ContractEncoder>>,
    session: Arc<ProviderSession>,
    subscribed: AtomicBool,
    dapp_link: Option<String>,
}

impl ProviderConnector {
    pub fn new(
        profile: ProviderProfile,
        provider: Option<Arc<dyn InjectedProvider>>,
        encoder: Option<Arc<dyn ContractEncoder>>,
    ) -> Self {
        Self {
            profile,
            provider,
            encoder,
            session: Arc::new(ProviderSession::default()),
            subscribed: AtomicBool::new(false),
            dapp_link: None,
        }
    }

    /// Derive the in-app browser link from the application's public URL
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        self.dapp_link = base_url.and_then(|url| self.profile.dapp_link(url));
        self
    }

    /// Connector for `wallet` using the provider and encoder registered in `ctx`
    pub fn from_context(wallet: WalletType, ctx: &ConnectorContext) -> Option<Self> {
        let profile = ProviderProfile::for_wallet(wallet)?;
        let connector = Self::new(profile, ctx.provider(wallet), ctx.encoder.clone());
        Some(connector.with_base_url(ctx.options.base_url.as_deref()))
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    fn provider(&self) -> Result<&Arc<dyn InjectedProvider>> {
        self.provider
            .as_ref()
            .filter(|provider| provider.is_present())
            .ok_or(ConnectorError::ProviderUnavailable)
    }

    fn require_address(&self) -> Result<String> {
        self.current_address()
            .ok_or_else(|| TransactionError::new(TransactionErrorKind::InvalidAccount, "no connected account").into())
    }

    /// Forward provider change events to the session, once per connector
    fn subscribe(&self, provider: &Arc<dyn InjectedProvider>) {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }

        let session = self.session.clone();
        provider.on_accounts_changed(Arc::new(move |accounts: Vec<String>| {
            if let Some(account) = accounts.first() {
                session.set_address(account);
            }
        }));

        let session = self.session.clone();
        provider.on_chain_changed(Arc::new(move |chain_id: ChainId| {
            session.set_chain_id(chain_id);
        }));
    }

    fn call_data(&self, transaction: &TransactionRequest) -> Result<String> {
        if let Some(encoder) = &self.encoder {
            let abi = transaction.function_abi()?;
            return encoder.encode_call(abi, &transaction.params);
        }

        transaction
            .data
            .clone()
            .ok_or_else(|| TransactionError::invalid_parameters().into())
    }

    async fn wait_for_receipt(&self, provider: &Arc<dyn InjectedProvider>, hash: &str) -> Result<Value> {
        let method = self.profile.flavor.method("getTransactionReceipt");
        for attempt in 0..RECEIPT_POLL_ATTEMPTS {
            match provider.request(&method, json!([hash])).await {
                Ok(Value::Null) => {}
                Ok(receipt) => return Ok(receipt),
                Err(e) => debug!(%hash, attempt, "receipt lookup failed: {}", e),
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        Err(TransactionError::invalid_receipt().into())
    }
}

fn classify_send_error(err: ConnectorError) -> ConnectorError {
    let message = err.to_string();
    let kind = if message.to_lowercase().contains("insufficient funds") {
        TransactionErrorKind::InsufficientFunds
    } else {
        TransactionErrorKind::General
    };
    TransactionError::new(kind, message).into()
}

fn as_signature(value: Value) -> Result<String> {
    match value {
        Value::String(signature) => Ok(signature),
        other => Err(ConnectorError::Provider(format!("unexpected signature {}", other))),
    }
}

#[async_trait]
impl WalletConnector for ProviderConnector {
    fn wallet_type(&self) -> WalletType {
        self.profile.wallet
    }

    fn current_address(&self) -> Option<String> {
        self.session.address.lock().clone()
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.session.chain_id.lock().clone()
    }

    fn set_on_address_change(&self, callback: AddressCallback) {
        self.session.handlers.set_on_address_change(callback);
    }

    fn set_on_chain_change(&self, callback: ChainCallback) {
        self.session.handlers.set_on_chain_change(callback);
    }

    async fn activate(&self) -> Result<bool> {
        let Ok(provider) = self.provider() else {
            return Ok(false);
        };

        let accounts = match provider.request(self.profile.accounts_method(), json!([])).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(wallet = %self.profile.wallet, "account request rejected: {}", e);
                return Ok(false);
            }
        };
        let Some(address) = accounts.get(0).and_then(Value::as_str).map(str::to_string) else {
            return Ok(false);
        };
        self.session.set_address(&address);

        match provider.request(self.profile.chain_method(), json!([])).await {
            Ok(chain_id) => match serde_json::from_value::<ChainId>(chain_id) {
                Ok(chain_id) => self.session.set_chain_id(chain_id),
                Err(e) => warn!(wallet = %self.profile.wallet, "unreadable chain id: {}", e),
            },
            Err(e) => warn!(wallet = %self.profile.wallet, "chain id request failed: {}", e),
        }

        self.subscribe(provider);
        Ok(true)
    }

    async fn sign(&self, message: &str) -> Result<String> {
        let provider = self.provider()?;
        let address = self.current_address().unwrap_or_default();
        let (method, params) = match self.profile.flavor {
            RpcFlavor::Ethereum => ("personal_sign", json!([message, address])),
            RpcFlavor::Klaytn => ("klay_sign", json!([address, message])),
        };

        as_signature(provider.request(method, params).await?)
    }

    async fn sign_typed_data(&self, params: &Value, sign_type: SignType) -> Result<String> {
        let provider = self.provider()?;
        let method = sign_type.rpc_method()?;
        let address = self.current_address().unwrap_or_default();

        as_signature(provider.request(method, json!([address, params.to_string()])).await?)
    }

    async fn is_unlocked(&self) -> Result<Option<bool>> {
        Ok(match self.profile.unlock_check {
            UnlockCheck::Unsupported => None,
            UnlockCheck::AlwaysUnlocked => Some(true),
            UnlockCheck::Provider => match self.provider() {
                Ok(provider) => provider.is_unlocked().await,
                Err(_) => Some(false),
            },
        })
    }

    async fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TransactionResult> {
        let provider = self.provider()?;
        let from = self.require_address()?;
        let data = self.call_data(transaction)?;

        let mut fields = Map::new();
        fields.insert("from".into(), json!(from));
        fields.insert("data".into(), json!(data));
        let optional = [
            ("to", transaction.to.clone()),
            ("value", transaction.value.clone()),
            ("gas", transaction.gas.clone()),
            ("gasPrice", transaction.gas_price.clone()),
            ("maxFeePerGas", transaction.max_fee_per_gas.clone()),
            ("maxPriorityFeePerGas", transaction.max_priority_fee_per_gas.clone()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                fields.insert(key.into(), json!(value));
            }
        }
        if let Some(nonce) = transaction.nonce {
            fields.insert("nonce".into(), json!(nonce));
        }
        if let Some(chain_id) = transaction.chain_id {
            fields.insert("chainId".into(), json!(chain_id));
        }

        let method = self.profile.flavor.method("sendTransaction");
        let hash = provider
            .request(&method, json!([Value::Object(fields)]))
            .await
            .map_err(classify_send_error)?;
        let hash = hash
            .as_str()
            .ok_or_else(|| TransactionError::general("provider returned no transaction hash"))?
            .to_string();
        debug!(wallet = %self.profile.wallet, %hash, "transaction submitted");

        let raw = self.wait_for_receipt(provider, &hash).await?;
        let receipt = TransactionReceipt::from_rpc(&raw).ok_or_else(TransactionError::invalid_receipt)?;

        Ok(TransactionResult {
            transaction_hash: hash,
            receipt,
            native_receipt: raw,
        })
    }

    async fn restore_state(&self, address: &str, chain_id: &ChainId) -> Result<bool> {
        let Ok(provider) = self.provider() else {
            return Ok(false);
        };

        self.session.set_address(address);
        self.session.set_chain_id(chain_id.clone());
        self.subscribe(provider);
        Ok(true)
    }

    async fn get_balance(&self) -> Result<Option<String>> {
        let (Ok(provider), Some(address)) = (self.provider(), self.current_address()) else {
            return Ok(None);
        };

        let method = self.profile.flavor.method("getBalance");
        match provider.request(&method, json!([address, "latest"])).await {
            Ok(Value::String(balance)) => Ok(Some(hex_quantity_to_decimal(&balance))),
            Ok(other) => {
                warn!(wallet = %self.profile.wallet, "unexpected balance {}", other);
                Ok(None)
            }
            Err(e) => {
                warn!(wallet = %self.profile.wallet, "balance lookup failed: {}", e);
                Ok(None)
            }
        }
    }

    fn dapp_link(&self) -> Option<String> {
        self.dapp_link.clone()
    }

    fn as_extension(&self) -> Option<&dyn ExtensionConnector> {
        self.profile.install_link.map(|_| self as &dyn ExtensionConnector)
    }
}

impl ExtensionConnector for ProviderConnector {
    fn has_extension(&self) -> bool {
        self.provider
            .as_ref()
            .map_or(false, |provider| provider.is_present() && provider.identifies_as(self.profile.wallet))
    }

    fn install_link(&self) -> &str {
        self.profile.install_link.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerOptions;
    use crate::connector::WalletInterface;
    use std::collections::HashMap;

    /// Scripted provider answering each method with a fixed value
    #[derive(Default)]
    struct FakeProvider {
        wallet: Option<WalletType>,
        responses: Mutex<HashMap<String, Result<Value, String>>>,
        calls: Mutex<Vec<(String, Value)>>,
        unlocked: Option<bool>,
        accounts_listener: Mutex<Option<AccountsListener>>,
        chain_listener: Mutex<Option<ChainListener>>,
    }

    impl FakeProvider {
        fn answering(wallet: WalletType, responses: &[(&str, Value)]) -> Self {
            Self {
                wallet: Some(wallet),
                responses: Mutex::new(
                    responses
                        .iter()
                        .map(|(method, value)| (method.to_string(), Ok(value.clone())))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        fn fail(&self, method: &str, message: &str) {
            self.responses
                .lock()
                .insert(method.to_string(), Err(message.to_string()));
        }

        fn last_call(&self, method: &str) -> Option<Value> {
            self.calls
                .lock()
                .iter()
                .rev()
                .find(|(name, _)| name == method)
                .map(|(_, params)| params.clone())
        }
    }

    #[async_trait]
    impl InjectedProvider for FakeProvider {
        fn identifies_as(&self, wallet: WalletType) -> bool {
            self.wallet == Some(wallet)
        }

        async fn request(&self, method: &str, params: Value) -> Result<Value> {
            self.calls.lock().push((method.to_string(), params));
            match self.responses.lock().get(method) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(message)) => Err(ConnectorError::Provider(message.clone())),
                None => Err(ConnectorError::Provider(format!("{} not scripted", method))),
            }
        }

        async fn is_unlocked(&self) -> Option<bool> {
            self.unlocked
        }

        fn on_accounts_changed(&self, listener: AccountsListener) {
            *self.accounts_listener.lock() = Some(listener);
        }

        fn on_chain_changed(&self, listener: ChainListener) {
            *self.chain_listener.lock() = Some(listener);
        }
    }

    fn metamask(provider: Arc<FakeProvider>) -> ProviderConnector {
        ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::Metamask).unwrap(),
            Some(provider),
            None,
        )
    }

    fn receipt() -> Value {
        json!({
            "status": "0x1", "transactionHash": "0xhash", "transactionIndex": "0x0",
            "blockHash": "0xblock", "blockNumber": "0x1", "from": "0xme", "gasUsed": "0x1"
        })
    }

    #[tokio::test]
    async fn test_activate_reads_accounts_and_chain() {
        let provider = Arc::new(FakeProvider::answering(
            WalletType::Metamask,
            &[("eth_requestAccounts", json!(["0xme"])), ("eth_chainId", json!("0x1"))],
        ));
        let connector = metamask(provider.clone());

        assert!(connector.activate().await.unwrap());

        assert_eq!(connector.current_address().as_deref(), Some("0xme"));
        assert_eq!(connector.chain_id().and_then(|id| id.as_u64()), Some(1));
    }

    #[tokio::test]
    async fn test_activate_without_provider_or_accounts() {
        let connector = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::Kaikas).unwrap(),
            None,
            None,
        );
        assert!(!connector.activate().await.unwrap());

        let provider = Arc::new(FakeProvider::answering(
            WalletType::Metamask,
            &[("eth_requestAccounts", json!([]))],
        ));
        assert!(!metamask(provider).activate().await.unwrap());
    }

    #[tokio::test]
    async fn test_provider_events_reach_change_hooks() {
        let provider = Arc::new(FakeProvider::answering(
            WalletType::Kaikas,
            &[("klay_requestAccounts", json!(["0xa"])), ("net_version", json!(8217))],
        ));
        let connector = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::Kaikas).unwrap(),
            Some(provider.clone()),
            None,
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        connector.set_on_address_change(Arc::new(move |address: &str| sink.lock().push(address.to_string())));

        connector.activate().await.unwrap();
        let listener = provider.accounts_listener.lock().clone().unwrap();
        listener(vec!["0xb".to_string()]);
        listener(vec![]);
        let chain_listener = provider.chain_listener.lock().clone().unwrap();
        chain_listener(ChainId::from("0x3e9"));

        assert_eq!(seen.lock().clone(), vec!["0xa".to_string(), "0xb".to_string()]);
        assert_eq!(connector.chain_id().and_then(|id| id.as_u64()), Some(1001));
    }

    #[tokio::test]
    async fn test_sign_methods_by_flavor() {
        let provider = Arc::new(FakeProvider::answering(
            WalletType::Metamask,
            &[("personal_sign", json!("0xsig")), ("eth_signTypedData_v4", json!("0xtyped"))],
        ));
        let connector = metamask(provider.clone());
        connector.restore_state("0xme", &ChainId::Number(1)).await.unwrap();

        assert_eq!(connector.sign("hello").await.unwrap(), "0xsig");
        assert_eq!(provider.last_call("personal_sign"), Some(json!(["hello", "0xme"])));

        let typed = connector
            .sign_typed_data(&json!({"a": 1}), SignType::SignTypedDataV4)
            .await
            .unwrap();
        assert_eq!(typed, "0xtyped");
        assert!(matches!(
            connector.sign_typed_data(&json!({}), SignType::EthSign).await,
            Err(ConnectorError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_klaytn_sign_parameter_order() {
        let provider = Arc::new(FakeProvider::answering(WalletType::DcentKlaytn, &[("klay_sign", json!("0xk"))]));
        let connector = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::DcentKlaytn).unwrap(),
            Some(provider.clone()),
            None,
        );
        connector.restore_state("0xme", &ChainId::Number(8217)).await.unwrap();

        connector.sign("msg").await.unwrap();

        assert_eq!(provider.last_call("klay_sign"), Some(json!(["0xme", "msg"])));
    }

    #[tokio::test]
    async fn test_unlock_checks() {
        let provider = Arc::new(FakeProvider {
            unlocked: Some(false),
            ..FakeProvider::answering(WalletType::Metamask, &[])
        });
        assert_eq!(metamask(provider).is_unlocked().await.unwrap(), Some(false));

        let missing = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::Metamask).unwrap(),
            None,
            None,
        );
        assert_eq!(missing.is_unlocked().await.unwrap(), Some(false));

        let coinbase = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::Coinbase).unwrap(),
            None,
            None,
        );
        assert_eq!(coinbase.is_unlocked().await.unwrap(), None);

        let bridge = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::WalletConnect).unwrap(),
            None,
            None,
        );
        assert_eq!(bridge.is_unlocked().await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_send_transaction_with_encoded_data() {
        let provider = Arc::new(FakeProvider::answering(
            WalletType::Metamask,
            &[("eth_sendTransaction", json!("0xhash")), ("eth_getTransactionReceipt", receipt())],
        ));
        let connector = metamask(provider.clone());
        connector.restore_state("0xme", &ChainId::Number(1)).await.unwrap();
        let tx = TransactionRequest::new("0xcontract", "transfer").value("0x0").data("0xa9059cbb");

        let result = connector.send_transaction(&tx).await.unwrap();

        assert_eq!(result.transaction_hash, "0xhash");
        assert_eq!(result.receipt.status, "0x1");
        let sent = provider.last_call("eth_sendTransaction").unwrap();
        assert_eq!(sent[0]["from"], "0xme");
        assert_eq!(sent[0]["data"], "0xa9059cbb");
        assert!(sent[0].get("gas").is_none());
    }

    #[tokio::test]
    async fn test_send_transaction_errors() {
        let provider = Arc::new(FakeProvider::answering(WalletType::Metamask, &[]));
        provider.fail("eth_sendTransaction", "insufficient funds for gas * price + value");
        let connector = metamask(provider.clone());
        let tx = TransactionRequest::new("0xcontract", "transfer").data("0x");

        let err = connector.send_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == TransactionErrorKind::InvalidAccount));

        connector.restore_state("0xme", &ChainId::Number(1)).await.unwrap();
        let err = connector.send_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == TransactionErrorKind::InsufficientFunds));

        let no_data = TransactionRequest::new("0xcontract", "transfer");
        let err = connector.send_transaction(&no_data).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == TransactionErrorKind::InvalidParameters));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_never_mined() {
        let provider = Arc::new(FakeProvider::answering(
            WalletType::Metamask,
            &[("eth_sendTransaction", json!("0xhash")), ("eth_getTransactionReceipt", Value::Null)],
        ));
        let connector = metamask(provider);
        connector.restore_state("0xme", &ChainId::Number(1)).await.unwrap();

        let err = connector
            .send_transaction(&TransactionRequest::new("0xc", "f").data("0x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == TransactionErrorKind::InvalidReceipt));
    }

    #[tokio::test]
    async fn test_balance() {
        let provider = Arc::new(FakeProvider::answering(WalletType::Metamask, &[("eth_getBalance", json!("0x64"))]));
        let connector = metamask(provider.clone());
        assert_eq!(connector.get_balance().await.unwrap(), None);

        connector.restore_state("0xme", &ChainId::Number(1)).await.unwrap();
        assert_eq!(connector.get_balance().await.unwrap().as_deref(), Some("100"));

        provider.fail("eth_getBalance", "node down");
        assert_eq!(connector.get_balance().await.unwrap(), None);
    }

    #[test]
    fn test_extension_capability() {
        let provider = Arc::new(FakeProvider::answering(WalletType::Metamask, &[]));
        let connector = metamask(provider);
        assert!(connector.supports(WalletInterface::Extension));
        assert!(!connector.supports(WalletInterface::Qr));
        let extension = connector.as_extension().unwrap();
        assert!(extension.has_extension());
        assert_eq!(extension.install_link(), METAMASK_INSTALL_LINK);

        let dcent = ProviderConnector::new(
            ProviderProfile::for_wallet(WalletType::DcentEthereum).unwrap(),
            None,
            None,
        );
        assert!(!dcent.supports(WalletInterface::Extension));
        assert!(ProviderProfile::for_wallet(WalletType::Klip).is_none());
    }

    #[test]
    fn test_dapp_links_follow_base_url() {
        let options = ManagerOptions {
            base_url: Some("https://app.example.com".to_string()),
            ..ManagerOptions::default()
        };
        let ctx = ConnectorContext::new(options);

        let metamask = ProviderConnector::from_context(WalletType::Metamask, &ctx).unwrap();
        assert_eq!(
            metamask.dapp_link().as_deref(),
            Some("https://metamask.app.link/dapp/https://app.example.com")
        );

        let dcent = ProviderConnector::from_context(WalletType::DcentKlaytn, &ctx).unwrap();
        let link = dcent.dapp_link().unwrap();
        assert!(link.starts_with(DCENT_DAPP_BROWSER));
        assert!(link.contains("url=https%3A%2F%2Fapp.example.com"));
        assert!(link.ends_with("network=klaytn-mainnet"));

        let kaikas = ProviderConnector::from_context(WalletType::Kaikas, &ctx).unwrap();
        assert_eq!(kaikas.dapp_link(), None);

        let without_base = ConnectorContext::new(ManagerOptions::default());
        let metamask = ProviderConnector::from_context(WalletType::Metamask, &without_base).unwrap();
        assert_eq!(metamask.dapp_link(), None);
    }
}
