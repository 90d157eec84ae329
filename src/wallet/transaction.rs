use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Sub-kind of a failed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionErrorKind {
    General,
    InsufficientFunds,
    InvalidAmount,
    InvalidAccount,
    InvalidParameters,
    InvalidReceipt,
}

impl fmt::Display for TransactionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionErrorKind::General => "general",
            TransactionErrorKind::InsufficientFunds => "insufficient_funds",
            TransactionErrorKind::InvalidAmount => "invalid_amount",
            TransactionErrorKind::InvalidAccount => "invalid_account",
            TransactionErrorKind::InvalidParameters => "invalid_parameters",
            TransactionErrorKind::InvalidReceipt => "invalid_receipt",
        };
        f.write_str(name)
    }
}

/// Typed transaction failure. Callers match on `kind`, not on the message.
#[derive(Debug, Clone, Error)]
#[error("[{kind}] {message}")]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

impl TransactionError {
    pub fn new(kind: TransactionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(TransactionErrorKind::General, message)
    }

    pub fn invalid_parameters() -> Self {
        Self::new(TransactionErrorKind::InvalidParameters, "invalid transaction parameters")
    }

    pub fn invalid_receipt() -> Self {
        Self::new(TransactionErrorKind::InvalidReceipt, "transaction receipt is missing")
    }
}

/// A contract call to be approved and sent by a wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub to: Option<String>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub max_fee_per_gas: Option<String>,
    pub max_priority_fee_per_gas: Option<String>,
    pub nonce: Option<u64>,
    pub chain_id: Option<u64>,
    pub function_name: String,
    pub params: Vec<Value>,
    /// ABI of the target contract
    pub abi: Vec<Value>,
    /// Pre-encoded call data, used when no contract encoder is configured
    pub data: Option<String>,
}

impl TransactionRequest {
    pub fn new(to: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            function_name: function_name.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn gas(mut self, gas: impl Into<String>) -> Self {
        self.gas = Some(gas.into());
        self
    }

    pub fn param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn abi(mut self, abi: Vec<Value>) -> Self {
        self.abi = abi;
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Value as a decimal string, `"0"` when unset
    pub fn value_or_zero(&self) -> &str {
        self.value.as_deref().unwrap_or("0")
    }

    /// ABI entry for `function_name`
    pub fn function_abi(&self) -> Result<&Value, TransactionError> {
        filter_abi(&self.abi, &self.function_name).ok_or_else(TransactionError::invalid_parameters)
    }
}

/// Find the ABI entry whose `name` matches `function_name`
pub fn filter_abi<'a>(abi: &'a [Value], function_name: &str) -> Option<&'a Value> {
    abi.iter()
        .find(|item| item.get("name").and_then(Value::as_str) == Some(function_name))
}

/// Receipt fields common to every provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub status: String,
    pub transaction_hash: String,
    pub transaction_index: Value,
    pub block_hash: String,
    pub block_number: Value,
    pub from: String,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub gas_used: Value,
}

impl TransactionReceipt {
    /// Normalize a raw JSON-RPC receipt. Returns `None` when required fields are missing.
    pub fn from_rpc(raw: &Value) -> Option<Self> {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        let status = match raw.get("status")? {
            Value::Bool(ok) => if *ok { "1" } else { "0" }.to_string(),
            Value::String(status) => status.clone(),
            other => other.to_string(),
        };

        Some(Self {
            status,
            transaction_hash: text("transactionHash")?,
            transaction_index: raw.get("transactionIndex").cloned().unwrap_or(Value::Null),
            block_hash: text("blockHash")?,
            block_number: raw.get("blockNumber").cloned().unwrap_or(Value::Null),
            from: text("from")?,
            to: text("to"),
            contract_address: text("contractAddress"),
            gas_used: raw.get("gasUsed").cloned().unwrap_or(Value::Null),
        })
    }
}

/// Outcome of a sent transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_hash: String,
    pub receipt: TransactionReceipt,
    /// Receipt exactly as the provider returned it
    pub native_receipt: Value,
}
