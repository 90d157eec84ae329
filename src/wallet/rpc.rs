use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConnectorError, Result};

/// JSON-RPC method namespace spoken by a node or provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcFlavor {
    /// `eth_*` methods
    Ethereum,
    /// `klay_*` methods
    Klaytn,
}

impl RpcFlavor {
    pub fn method(&self, name: &str) -> String {
        match self {
            RpcFlavor::Ethereum => format!("eth_{}", name),
            RpcFlavor::Klaytn => format!("klay_{}", name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC client for balance and receipt queries
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), endpoint)
    }

    pub fn with_http(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue a raw JSON-RPC call. A `null` result is returned as `Value::Null`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(%method, id, "json-rpc call");

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(Duration::from_secs(30))
            .json(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse>()
            .await?;

        if let Some(error) = response.error {
            return Err(ConnectorError::Provider(format!(
                "{} failed ({}): {}",
                method, error.code, error.message
            )));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Native token balance of `address` as a decimal string
    pub async fn get_balance(&self, flavor: RpcFlavor, address: &str) -> Result<String> {
        let raw = self
            .call(&flavor.method("getBalance"), json!([address, "latest"]))
            .await?;
        let hex = raw
            .as_str()
            .ok_or_else(|| ConnectorError::Provider("balance is not a string".to_string()))?;

        Ok(hex_quantity_to_decimal(hex))
    }

    /// Receipt of `hash`, or `None` while it is not mined
    pub async fn get_transaction_receipt(&self, flavor: RpcFlavor, hash: &str) -> Result<Option<Value>> {
        let raw = self
            .call(&flavor.method("getTransactionReceipt"), json!([hash]))
            .await?;

        Ok(if raw.is_null() { None } else { Some(raw) })
    }
}

/// Convert a `0x` quantity to decimal. Values that do not fit 128 bits are returned as-is.
pub fn hex_quantity_to_decimal(quantity: &str) -> String {
    let digits = quantity.trim_start_matches("0x");
    if digits.is_empty() {
        return "0".to_string();
    }
    match u128::from_str_radix(digits, 16) {
        Ok(value) => value.to_string(),
        Err(_) => quantity.to_string(),
    }
}
