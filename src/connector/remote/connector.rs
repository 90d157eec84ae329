use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::api::{ApprovalApi, HttpApprovalApi, ResultUrl};
use super::links::{self, Platform};
use super::poller::{normalize_signature, ApprovalPoller, PollOutcome, MAX_POLL_ITERATIONS};
use super::protocol::{PrepareRequest, PrepareType, ResultResponse};
use crate::connector::{
    AddressCallback, ChainCallback, ChangeHandlers, ConnectorContext, DeepLinkCallback,
    DeepLinkConnector, PendingApprovalControl, QrCodeCallback, QrConnector, WalletConnector,
};
use crate::config::ManagerOptions;
use crate::error::{ConnectorError, Result};
use crate::wallet::{
    ChainId, ChainType, PendingApproval, RequestKind, RpcClient, RpcFlavor, SignType, TransactionError,
    TransactionReceipt, TransactionRequest, TransactionResult, WalletType,
};

const KLIP_A2A_URL: &str = "https://a2a-api.klipwallet.com/v2/a2a";
const KAIKAS_MOBILE_API_URL: &str = "https://api.kaikas.io/api/v1/k";

/// Wallets approved in a separate mobile app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWallet {
    Klip,
    KaikasMobile,
}

impl RemoteWallet {
    pub fn wallet_type(&self) -> WalletType {
        match self {
            RemoteWallet::Klip => WalletType::Klip,
            RemoteWallet::KaikasMobile => WalletType::KaikasMobile,
        }
    }

    /// Public prepare and result endpoints of the wallet
    pub fn endpoints(&self) -> (String, ResultUrl) {
        match self {
            RemoteWallet::Klip => (
                format!("{}/prepare", KLIP_A2A_URL),
                ResultUrl::Query(format!("{}/result", KLIP_A2A_URL)),
            ),
            RemoteWallet::KaikasMobile => (
                format!("{}/prepare", KAIKAS_MOBILE_API_URL),
                ResultUrl::Path(format!("{}/result", KAIKAS_MOBILE_API_URL)),
            ),
        }
    }

    /// Chain reported before activation. Kaikas mobile starts on the configured default.
    fn initial_chain(&self, options: &ManagerOptions) -> Option<ChainId> {
        match self {
            RemoteWallet::Klip => Some(ChainId::Number(ChainType::Klaytn.chain_id())),
            RemoteWallet::KaikasMobile => options.default_chain_id().map(ChainId::Number),
        }
    }

    fn signature_field(&self) -> &'static str {
        match self {
            RemoteWallet::Klip => "signature",
            RemoteWallet::KaikasMobile => "signed_data",
        }
    }

    fn qr_code(&self, request_key: &str) -> String {
        match self {
            RemoteWallet::Klip => links::klip_qr(request_key),
            RemoteWallet::KaikasMobile => links::kaikas_mobile_qr(request_key),
        }
    }

    fn deep_link(&self, request_key: &str, platform: Platform) -> String {
        match self {
            RemoteWallet::Klip => links::klip_deep_link(request_key, platform),
            RemoteWallet::KaikasMobile => links::kaikas_mobile_deep_link(request_key, platform),
        }
    }
}

#[derive(Default)]
struct Session {
    address: Option<String>,
    chain_id: Option<ChainId>,
}

/// Artifacts of the request currently awaiting approval
#[derive(Default)]
struct ApprovalLinks {
    request_key: Option<String>,
    qr_code: Option<String>,
    deep_link: Option<String>,
}

#[derive(Default)]
struct LinkCallbacks {
    qr_code: Option<QrCodeCallback>,
    deep_link: Option<DeepLinkCallback>,
}

/// Connector for wallets that approve requests out of process.
///
/// Every operation prepares a request, publishes its QR code and deep link,
/// then waits on the [`ApprovalPoller`] for the user to answer in the app.
pub struct RemoteApprovalConnector {
    wallet: RemoteWallet,
    app_name: String,
    platform: Platform,
    poller: ApprovalPoller,
    rpc: RpcClient,
    session: Mutex<Session>,
    links: Mutex<ApprovalLinks>,
    callbacks: Mutex<LinkCallbacks>,
    handlers: ChangeHandlers,
}

impl RemoteApprovalConnector {
    pub fn new(wallet: RemoteWallet, ctx: &ConnectorContext) -> Self {
        let api = ctx
            .approval_apis
            .get(&wallet.wallet_type())
            .cloned()
            .unwrap_or_else(|| {
                let (prepare_url, result_url) = wallet.endpoints();
                Arc::new(HttpApprovalApi::new(ctx.http.clone(), prepare_url, result_url))
                    as Arc<dyn ApprovalApi>
            });

        Self {
            wallet,
            app_name: ctx.options.app_name.clone(),
            platform: ctx.platform,
            poller: ApprovalPoller::new(api),
            rpc: RpcClient::with_http(ctx.http.clone(), ctx.options.json_rpc_url.clone()),
            session: Mutex::new(Session {
                address: None,
                chain_id: wallet.initial_chain(&ctx.options),
            }),
            links: Mutex::new(ApprovalLinks::default()),
            callbacks: Mutex::new(LinkCallbacks::default()),
            handlers: ChangeHandlers::new(),
        }
    }

    pub fn klip(ctx: &ConnectorContext) -> Self {
        Self::new(RemoteWallet::Klip, ctx)
    }

    pub fn kaikas_mobile(ctx: &ConnectorContext) -> Self {
        Self::new(RemoteWallet::KaikasMobile, ctx)
    }

    pub fn wallet(&self) -> RemoteWallet {
        self.wallet
    }

    pub fn poller(&self) -> &ApprovalPoller {
        &self.poller
    }

    /// Key of the request currently awaiting approval
    pub fn request_key(&self) -> Option<String> {
        self.links.lock().request_key.clone()
    }

    /// Switch the network Klip requests are sent on
    pub fn set_chain_type(&self, chain_type: ChainType) -> Result<()> {
        match (self.wallet, chain_type) {
            (RemoteWallet::Klip, ChainType::Klaytn | ChainType::Ethereum) => {
                self.set_chain_id(ChainId::Number(chain_type.chain_id()));
                Ok(())
            }
            _ => Err(ConnectorError::Unsupported("switching to this chain type")),
        }
    }

    /// Transfer native KLAY, returning the transaction hash
    pub async fn send_klay(&self, to: &str, amount: &str) -> Result<String> {
        if self.wallet != RemoteWallet::KaikasMobile {
            return Err(ConnectorError::Unsupported("send_klay"));
        }

        let request = self
            .request(PrepareType::SendKlay)
            .field("transaction", json!({ "to": to, "amount": amount }));
        let response = self.run(RequestKind::Transaction, request, None).await?;

        response
            .result_str("tx_hash")
            .map(str::to_string)
            .ok_or_else(|| TransactionError::general("approval carried no transaction hash").into())
    }

    /// Ask the wallet to track a token
    pub async fn watch_asset(&self, address: &str, symbol: &str, decimals: u8, name: &str) -> Result<()> {
        if self.wallet != RemoteWallet::KaikasMobile {
            return Err(ConnectorError::Unsupported("watch_asset"));
        }

        let request = self.request(PrepareType::WatchAsset).field(
            "watch_asset",
            json!({ "address": address, "symbol": symbol, "decimals": decimals, "name": name }),
        );
        self.run(RequestKind::Sign, request, None).await?;
        Ok(())
    }

    fn request(&self, kind: PrepareType) -> PrepareRequest {
        PrepareRequest::new(&self.app_name, kind)
    }

    fn chain_name(&self) -> &'static str {
        match self.session.lock().chain_id.as_ref().and_then(ChainId::as_u64) {
            Some(id) if id == ChainType::Klaytn.chain_id() => "klaytn",
            _ => "ethereum",
        }
    }

    /// Prepare `request`, track it under `kind` and publish its approval
    /// links. No polling starts on failure.
    async fn prepare(
        &self,
        kind: RequestKind,
        request: PrepareRequest,
        valid_for: Option<u64>,
    ) -> Result<PendingApproval> {
        let request_key = self
            .poller
            .api()
            .prepare(&request)
            .await?
            .into_request_key()
            .map_err(ConnectorError::Prepare)?;
        // link callbacks may abort, so the handle must exist before they run
        let pending = self.poller.track(kind, &request_key);

        let qr_code = self.wallet.qr_code(&request_key);
        let deep_link = self.wallet.deep_link(&request_key, self.platform);
        {
            let mut links = self.links.lock();
            links.request_key = Some(request_key.clone());
            links.qr_code = Some(qr_code.clone());
            links.deep_link = Some(deep_link.clone());
        }
        info!(wallet = %self.wallet.wallet_type(), %kind, %request_key, "remote request prepared");

        let (qr_callback, deep_link_callback) = {
            let callbacks = self.callbacks.lock();
            (callbacks.qr_code.clone(), callbacks.deep_link.clone())
        };
        if let Some(callback) = qr_callback {
            callback(&qr_code, valid_for);
        }
        if let Some(callback) = deep_link_callback {
            callback(&deep_link);
        }

        Ok(pending)
    }

    /// Poll a prepared request and clear its links once it settles
    async fn wait(&self, pending: PendingApproval) -> PollOutcome {
        let request_key = pending.request_key.clone();
        let outcome = self.poller.watch(pending).await;
        self.clear_links(&request_key);
        outcome
    }

    /// Prepare, wait, and map every non-completed outcome to an error
    async fn run(
        &self,
        kind: RequestKind,
        request: PrepareRequest,
        valid_for: Option<u64>,
    ) -> Result<ResultResponse> {
        let pending = self.prepare(kind, request, valid_for).await?;
        match self.wait(pending).await {
            PollOutcome::Completed(response) => Ok(response),
            PollOutcome::Cancelled => Err(ConnectorError::UserCancelled),
            PollOutcome::Errored(reason) => Err(ConnectorError::Remote(reason)),
            PollOutcome::TimedOut => Err(ConnectorError::Timeout),
            PollOutcome::Aborted => Err(ConnectorError::Aborted),
        }
    }

    // A newer request may have replaced the links while this one was polling.
    fn clear_links(&self, request_key: &str) {
        let mut links = self.links.lock();
        if links.request_key.as_deref() == Some(request_key) {
            *links = ApprovalLinks::default();
        }
    }

    fn set_address(&self, address: &str) {
        self.session.lock().address = Some(address.to_string());
        self.handlers.notify_address(address);
    }

    fn set_chain_id(&self, chain_id: ChainId) {
        self.session.lock().chain_id = Some(chain_id.clone());
        self.handlers.notify_chain(&chain_id);
    }

    async fn fetch_receipt(&self, transaction_hash: &str) -> Result<TransactionResult> {
        let raw = self
            .rpc
            .get_transaction_receipt(RpcFlavor::Klaytn, transaction_hash)
            .await
            .map_err(|e| TransactionError::general(e.to_string()))?
            .ok_or_else(TransactionError::invalid_receipt)?;
        let receipt = TransactionReceipt::from_rpc(&raw).ok_or_else(TransactionError::invalid_receipt)?;

        Ok(TransactionResult {
            transaction_hash: transaction_hash.to_string(),
            receipt,
            native_receipt: raw,
        })
    }
}

#[async_trait]
impl WalletConnector for RemoteApprovalConnector {
    fn wallet_type(&self) -> WalletType {
        self.wallet.wallet_type()
    }

    fn current_address(&self) -> Option<String> {
        self.session.lock().address.clone()
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.session.lock().chain_id.clone()
    }

    fn set_on_address_change(&self, callback: AddressCallback) {
        self.handlers.set_on_address_change(callback);
    }

    fn set_on_chain_change(&self, callback: ChainCallback) {
        self.handlers.set_on_chain_change(callback);
    }

    async fn activate(&self) -> Result<bool> {
        let request = self.request(PrepareType::Auth);
        let activation = self
            .prepare(RequestKind::Activation, request, Some(u64::from(MAX_POLL_ITERATIONS)))
            .await;
        let pending = match activation {
            Ok(pending) => pending,
            Err(e) => {
                warn!(wallet = %self.wallet.wallet_type(), "activation not prepared: {}", e);
                return Ok(false);
            }
        };

        match self.wait(pending).await {
            PollOutcome::Completed(response) => {
                let address = response.result_str("klaytn_address").unwrap_or_default().to_string();
                let chain_id = match self.wallet {
                    RemoteWallet::Klip => self.chain_id(),
                    RemoteWallet::KaikasMobile => response.chain_id.clone(),
                };
                self.set_address(&address);
                if let Some(chain_id) = chain_id {
                    self.set_chain_id(chain_id);
                }
                Ok(true)
            }
            PollOutcome::Aborted => Err(ConnectorError::Aborted),
            _ => Ok(false),
        }
    }

    async fn sign(&self, message: &str) -> Result<String> {
        let from = self.current_address();
        let request = match self.wallet {
            RemoteWallet::Klip => self
                .request(PrepareType::SignMessage)
                .field("chain", json!(self.chain_name()))
                .field(
                    "message",
                    json!({ "from": from, "value": message, "is_hex_encoded": message.starts_with("0x") }),
                ),
            RemoteWallet::KaikasMobile => self
                .request(PrepareType::Sign)
                .field("sign", json!({ "message": message })),
        };

        let response = self.run(RequestKind::Sign, request, None).await?;
        let signature = response
            .result_str(self.wallet.signature_field())
            .ok_or_else(|| ConnectorError::Remote("approval carried no signature".to_string()))?;

        Ok(normalize_signature(signature))
    }

    async fn sign_typed_data(&self, _params: &Value, _sign_type: SignType) -> Result<String> {
        Err(ConnectorError::Unsupported("sign_typed_data"))
    }

    async fn is_unlocked(&self) -> Result<Option<bool>> {
        Ok(None)
    }

    async fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TransactionResult> {
        let abi = transaction.function_abi()?;
        let to = transaction
            .to
            .as_deref()
            .ok_or_else(TransactionError::invalid_parameters)?;

        let mut request = self.request(PrepareType::ExecuteContract).field(
            "transaction",
            json!({
                "from": self.current_address(),
                "to": to,
                "value": transaction.value_or_zero(),
                "abi": abi.to_string(),
                "params": serde_json::to_string(&transaction.params)?,
            }),
        );
        if self.wallet == RemoteWallet::Klip {
            request = request.field("chain", json!(self.chain_name()));
        }

        let response = self.run(RequestKind::Transaction, request, None).await?;

        if self.wallet == RemoteWallet::Klip {
            let status = response.result_str("status").unwrap_or_default();
            if status != "success" {
                return Err(TransactionError::general(format!("transaction ended with status {:?}", status)).into());
            }
        }

        let transaction_hash = response
            .result_str("tx_hash")
            .ok_or_else(|| TransactionError::general("approval carried no transaction hash"))?;
        debug!(%transaction_hash, "fetching receipt");

        self.fetch_receipt(transaction_hash).await
    }

    async fn restore_state(&self, address: &str, chain_id: &ChainId) -> Result<bool> {
        self.set_address(address);
        self.set_chain_id(chain_id.clone());
        Ok(true)
    }

    async fn get_balance(&self) -> Result<Option<String>> {
        let Some(address) = self.current_address() else {
            return Ok(None);
        };

        match self.rpc.get_balance(RpcFlavor::Klaytn, &address).await {
            Ok(balance) => Ok(Some(balance)),
            Err(e) => {
                warn!(%address, "balance lookup failed: {}", e);
                Ok(None)
            }
        }
    }

    fn as_qr(&self) -> Option<&dyn QrConnector> {
        Some(self)
    }

    fn as_deep_link(&self) -> Option<&dyn DeepLinkConnector> {
        Some(self)
    }
}

impl PendingApprovalControl for RemoteApprovalConnector {
    fn abort_pending_activation(&self) {
        self.poller.abort(RequestKind::Activation);
    }

    fn abort_pending_sign(&self) {
        self.poller.abort(RequestKind::Sign);
    }

    fn abort_pending_transaction(&self) {
        self.poller.abort(RequestKind::Transaction);
    }
}

impl QrConnector for RemoteApprovalConnector {
    fn qr_code(&self) -> Option<String> {
        self.links.lock().qr_code.clone()
    }

    fn set_qr_code_callback(&self, callback: QrCodeCallback) {
        self.callbacks.lock().qr_code = Some(callback);
    }
}

impl DeepLinkConnector for RemoteApprovalConnector {
    fn deep_link(&self) -> Option<String> {
        self.links.lock().deep_link.clone()
    }

    fn set_deep_link_callback(&self, callback: DeepLinkCallback) {
        self.callbacks.lock().deep_link = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerOptions;
    use crate::connector::remote::protocol::PrepareResponse;
    use crate::connector::WalletInterface;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Approval API that answers prepare with a fixed key and replays results
    struct FakeApi {
        prepared: Mutex<Vec<Value>>,
        prepare_error: Option<String>,
        results: Mutex<VecDeque<Value>>,
        polls: Mutex<u32>,
    }

    impl FakeApi {
        fn new(results: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                prepared: Mutex::new(Vec::new()),
                prepare_error: None,
                results: Mutex::new(results.into()),
                polls: Mutex::new(0),
            })
        }

        fn rejecting(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                prepared: Mutex::new(Vec::new()),
                prepare_error: Some(reason.to_string()),
                results: Mutex::new(VecDeque::new()),
                polls: Mutex::new(0),
            })
        }

        fn polls(&self) -> u32 {
            *self.polls.lock()
        }

        fn last_prepared(&self) -> Value {
            self.prepared.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ApprovalApi for FakeApi {
        async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse> {
            self.prepared.lock().push(serde_json::to_value(request)?);
            let body = match &self.prepare_error {
                Some(reason) => json!({ "err": reason }),
                None => json!({ "request_key": "abc123", "status": "prepared" }),
            };
            Ok(serde_json::from_value(body)?)
        }

        async fn result(&self, _request_key: &str) -> Result<ResultResponse> {
            *self.polls.lock() += 1;
            let mut results = self.results.lock();
            let next = if results.len() > 1 {
                results.pop_front().unwrap()
            } else {
                results.front().cloned().unwrap_or(json!({ "status": "requested" }))
            };
            Ok(serde_json::from_value(next)?)
        }
    }

    fn connector(wallet: RemoteWallet, api: Arc<FakeApi>) -> RemoteApprovalConnector {
        let ctx = ConnectorContext::new(ManagerOptions::default())
            .with_platform(Platform::Ios)
            .with_approval_api(wallet.wallet_type(), api);
        RemoteApprovalConnector::new(wallet, &ctx)
    }

    #[test]
    fn test_capabilities() {
        let klip = connector(RemoteWallet::Klip, FakeApi::new(vec![]));
        assert!(klip.supports(WalletInterface::Qr));
        assert!(klip.supports(WalletInterface::DeepLink));
        assert!(!klip.supports(WalletInterface::Extension));
        assert_eq!(klip.chain_id(), Some(ChainId::Number(8217)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_klip_activation_publishes_links_then_clears_them() {
        let api = FakeApi::new(vec![
            json!({"status": "requested"}),
            json!({"status": "completed", "result": {"klaytn_address": "0xabc"}}),
        ]);
        let klip = connector(RemoteWallet::Klip, api.clone());
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        klip.set_qr_code_callback(Arc::new(move |qr: &str, valid_for: Option<u64>| {
            sink.lock().push((qr.to_string(), valid_for));
        }));

        assert!(klip.activate().await.unwrap());

        assert_eq!(api.last_prepared()["type"], "auth");
        assert_eq!(
            published.lock().clone(),
            vec![(links::klip_qr("abc123"), Some(300))]
        );
        assert_eq!(klip.current_address().as_deref(), Some("0xabc"));
        assert_eq!(klip.qr_code(), None);
        assert_eq!(klip.request_key(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_links_are_published_before_the_first_poll() {
        let api = FakeApi::new(vec![json!({"status": "completed", "result": {"klaytn_address": "0xabc"}})]);
        let klip = connector(RemoteWallet::Klip, api.clone());
        let polls_seen = Arc::new(Mutex::new(Vec::new()));
        let (qr_sink, link_sink) = (polls_seen.clone(), polls_seen.clone());
        let (qr_api, link_api) = (api.clone(), api.clone());
        klip.set_qr_code_callback(Arc::new(move |_: &str, _: Option<u64>| {
            qr_sink.lock().push(("qr", qr_api.polls()));
        }));
        klip.set_deep_link_callback(Arc::new(move |_: &str| {
            link_sink.lock().push(("deep_link", link_api.polls()));
        }));

        assert!(klip.activate().await.unwrap());

        assert_eq!(polls_seen.lock().clone(), vec![("qr", 0), ("deep_link", 0)]);
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_from_link_callback_stops_activation() {
        let api = FakeApi::new(vec![json!({"status": "requested"})]);
        let klip = Arc::new(connector(RemoteWallet::Klip, api.clone()));
        let weak = Arc::downgrade(&klip);
        klip.set_qr_code_callback(Arc::new(move |_: &str, _: Option<u64>| {
            if let Some(klip) = weak.upgrade() {
                klip.abort_pending_activation();
            }
        }));
        let started = tokio::time::Instant::now();

        let err = klip.activate().await.unwrap_err();

        assert!(matches!(err, ConnectorError::Aborted));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(api.polls(), 0);
        assert_eq!(klip.poller().pending().count(RequestKind::Activation), 0);
        assert_eq!(klip.request_key(), None);
    }

    #[test]
    fn test_kaikas_mobile_starts_on_configured_chain() {
        let options = ManagerOptions {
            chain_id: Some(1001),
            ..ManagerOptions::default()
        };
        let ctx = ConnectorContext::new(options).with_approval_api(WalletType::KaikasMobile, FakeApi::new(vec![]));

        assert_eq!(RemoteApprovalConnector::kaikas_mobile(&ctx).chain_id(), Some(ChainId::Number(1001)));
        assert_eq!(RemoteApprovalConnector::klip(&ctx).chain_id(), Some(ChainId::Number(8217)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_kaikas_mobile_activation_takes_chain_from_response() {
        let api = FakeApi::new(vec![json!({
            "status": "completed", "chain_id": 1001, "result": {"klaytn_address": "0x1"}
        })]);
        let wallet = connector(RemoteWallet::KaikasMobile, api);
        let links_seen = Arc::new(Mutex::new(None));
        let sink = links_seen.clone();
        wallet.set_deep_link_callback(Arc::new(move |link: &str| {
            *sink.lock() = Some(link.to_string());
        }));

        assert!(wallet.activate().await.unwrap());

        assert_eq!(wallet.chain_id(), Some(ChainId::Number(1001)));
        assert_eq!(
            links_seen.lock().as_deref(),
            Some("klutch://wallet/api?request_key=abc123")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_declined() {
        let api = FakeApi::new(vec![json!({"status": "canceled"})]);
        let klip = connector(RemoteWallet::Klip, api);
        assert!(!klip.activate().await.unwrap());

        let klip = connector(RemoteWallet::Klip, FakeApi::rejecting("rejected"));
        assert!(!klip.activate().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_rejects_activation() {
        let klip = Arc::new(connector(RemoteWallet::Klip, FakeApi::new(vec![])));
        let task = {
            let klip = klip.clone();
            tokio::spawn(async move { klip.activate().await })
        };
        tokio::time::sleep(Duration::from_millis(1500)).await;

        klip.abort_pending_activation();

        assert!(matches!(task.await.unwrap(), Err(ConnectorError::Aborted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_klip_sign_request_and_signature_fix() {
        let body = format!("0x{}", "a".repeat(128));
        let api = FakeApi::new(vec![json!({
            "status": "completed", "result": {"signature": format!("{}4056", body)}
        })]);
        let klip = connector(RemoteWallet::Klip, api.clone());
        klip.restore_state("0xfrom", &ChainId::Number(8217)).await.unwrap();

        let signature = klip.sign("0x68656c6c6f").await.unwrap();

        assert_eq!(signature, format!("{}1c", body));
        let prepared = api.last_prepared();
        assert_eq!(prepared["type"], "sign_message");
        assert_eq!(prepared["chain"], "klaytn");
        assert_eq!(prepared["message"]["from"], "0xfrom");
        assert_eq!(prepared["message"]["is_hex_encoded"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kaikas_mobile_sign_uses_signed_data() {
        let api = FakeApi::new(vec![json!({
            "status": "completed", "result": {"signed_data": "0xsigned"}
        })]);
        let wallet = connector(RemoteWallet::KaikasMobile, api.clone());

        assert_eq!(wallet.sign("hello").await.unwrap(), "0xsigned");
        assert_eq!(api.last_prepared()["sign"]["message"], "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_failures() {
        let klip = connector(RemoteWallet::Klip, FakeApi::new(vec![json!({"status": "canceled"})]));
        assert!(matches!(klip.sign("hi").await, Err(ConnectorError::UserCancelled)));

        let klip = connector(
            RemoteWallet::Klip,
            FakeApi::new(vec![json!({"status": "error", "message": "bad pin"})]),
        );
        assert!(matches!(klip.sign("hi").await, Err(ConnectorError::Remote(reason)) if reason == "bad pin"));

        let klip = connector(RemoteWallet::Klip, FakeApi::rejecting("rejected"));
        assert!(matches!(klip.sign("hi").await, Err(ConnectorError::Prepare(_))));

        assert!(matches!(
            klip.sign_typed_data(&json!({}), SignType::default()).await,
            Err(ConnectorError::Unsupported(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_requires_matching_abi() {
        let api = FakeApi::new(vec![]);
        let klip = connector(RemoteWallet::Klip, api.clone());
        let tx = TransactionRequest::new("0xcontract", "mint")
            .abi(vec![json!({"name": "transfer", "type": "function"})]);

        let err = klip.send_transaction(&tx).await.unwrap_err();

        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == crate::wallet::TransactionErrorKind::InvalidParameters));
        assert!(api.prepared.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_klip_transaction_failure_status() {
        let api = FakeApi::new(vec![json!({
            "status": "completed", "result": {"status": "fail", "tx_hash": "0xhash"}
        })]);
        let klip = connector(RemoteWallet::Klip, api.clone());
        let tx = TransactionRequest::new("0xcontract", "transfer")
            .abi(vec![json!({"name": "transfer", "type": "function"})])
            .param("0xto")
            .param(10);

        let err = klip.send_transaction(&tx).await.unwrap_err();

        assert!(matches!(err, ConnectorError::Transaction(_)));
        let prepared = api.last_prepared();
        assert_eq!(prepared["type"], "execute_contract");
        assert_eq!(prepared["transaction"]["value"], "0");
        assert_eq!(prepared["transaction"]["params"], r#"["0xto",10]"#);
        assert_eq!(prepared["transaction"]["abi"], r#"{"name":"transfer","type":"function"}"#);
    }

    #[tokio::test]
    async fn test_kaikas_mobile_transaction_fetches_receipt() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "klay_getTransactionReceipt"})))
            .with_status(200)
            .with_body(
                json!({"jsonrpc": "2.0", "id": 1, "result": {
                    "status": "0x1", "transactionHash": "0xhash", "transactionIndex": "0x0",
                    "blockHash": "0xblock", "blockNumber": "0x10", "from": "0xfrom",
                    "to": "0xcontract", "gasUsed": "0x5208"
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let api = FakeApi::new(vec![json!({"status": "completed", "result": {"tx_hash": "0xhash"}})]);
        let options = ManagerOptions {
            json_rpc_url: server.url(),
            ..ManagerOptions::default()
        };
        let ctx = ConnectorContext::new(options).with_approval_api(WalletType::KaikasMobile, api);
        let wallet = RemoteApprovalConnector::kaikas_mobile(&ctx);
        let tx = TransactionRequest::new("0xcontract", "transfer")
            .abi(vec![json!({"name": "transfer", "type": "function"})]);

        let result = wallet.send_transaction(&tx).await.unwrap();

        assert_eq!(result.transaction_hash, "0xhash");
        assert_eq!(result.receipt.block_hash, "0xblock");
    }

    #[tokio::test]
    async fn test_missing_receipt_is_invalid_receipt() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        let api = FakeApi::new(vec![json!({"status": "completed", "result": {"tx_hash": "0xhash"}})]);
        let options = ManagerOptions {
            json_rpc_url: server.url(),
            ..ManagerOptions::default()
        };
        let ctx = ConnectorContext::new(options).with_approval_api(WalletType::KaikasMobile, api);
        let wallet = RemoteApprovalConnector::kaikas_mobile(&ctx);
        let tx = TransactionRequest::new("0xcontract", "transfer")
            .abi(vec![json!({"name": "transfer", "type": "function"})]);

        let err = wallet.send_transaction(&tx).await.unwrap_err();

        assert!(matches!(err, ConnectorError::Transaction(e) if e.kind == crate::wallet::TransactionErrorKind::InvalidReceipt));
    }

    #[tokio::test(start_paused = true)]
    async fn test_kaikas_mobile_extras() {
        let api = FakeApi::new(vec![json!({"status": "completed", "result": {"tx_hash": "0xsent"}})]);
        let wallet = connector(RemoteWallet::KaikasMobile, api.clone());

        assert_eq!(wallet.send_klay("0xto", "1000").await.unwrap(), "0xsent");
        assert_eq!(api.last_prepared()["transaction"]["amount"], "1000");

        wallet.watch_asset("0xtoken", "TKN", 18, "Token").await.unwrap();
        assert_eq!(api.last_prepared()["watch_asset"]["symbol"], "TKN");

        let klip = connector(RemoteWallet::Klip, FakeApi::new(vec![]));
        assert!(matches!(klip.send_klay("0xto", "1").await, Err(ConnectorError::Unsupported(_))));
    }

    #[test]
    fn test_klip_chain_type_switch() {
        let klip = connector(RemoteWallet::Klip, FakeApi::new(vec![]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        klip.set_on_chain_change(Arc::new(move |chain: &ChainId| sink.lock().push(chain.clone())));

        klip.set_chain_type(ChainType::Ethereum).unwrap();
        assert_eq!(klip.chain_name(), "ethereum");
        assert!(klip.set_chain_type(ChainType::Polygon).is_err());

        assert_eq!(seen.lock().clone(), vec![ChainId::Number(1)]);
    }

    #[tokio::test]
    async fn test_balance_unavailable_without_address() {
        let klip = connector(RemoteWallet::Klip, FakeApi::new(vec![]));
        assert_eq!(klip.get_balance().await.unwrap(), None);
        assert_eq!(klip.is_unlocked().await.unwrap(), None);
    }
}
