use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wallet::ChainId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BappCallback {
    pub success: Option<String>,
    pub fail: Option<String>,
}

/// The requesting application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bapp {
    pub name: String,
    pub callback: BappCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareType {
    Auth,
    Sign,
    SignMessage,
    SendKlay,
    WatchAsset,
    ExecuteContract,
}

/// Body of `POST /prepare`
#[derive(Debug, Clone, Serialize)]
pub struct PrepareRequest {
    pub bapp: Bapp,
    #[serde(rename = "type")]
    pub kind: PrepareType,
    /// Type-specific fields, flattened into the body
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PrepareRequest {
    pub fn new(app_name: impl Into<String>, kind: PrepareType) -> Self {
        Self {
            bapp: Bapp {
                name: app_name.into(),
                callback: BappCallback::default(),
            },
            kind,
            fields: Map::new(),
        }
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrepareResponse {
    #[serde(default)]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub request_key: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl PrepareResponse {
    /// Request key of a successful prepare, or the reason it failed
    pub fn into_request_key(self) -> Result<String, String> {
        if let Some(reason) = error_text(self.err.as_ref()).or_else(|| error_text(self.error.as_ref())) {
            return Err(reason);
        }
        match self.request_key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err("response carried no request key".to_string()),
        }
    }
}

fn error_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Status reported by the result endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Prepared,
    Requested,
    Completed,
    Canceled,
    Error,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Body of `GET /result`
#[derive(Debug, Clone, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub request_key: Option<String>,
    pub status: RequestStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResultResponse {
    /// String field of the result payload
    pub fn result_str(&self, field: &str) -> Option<&str> {
        self.result.as_ref()?.get(field)?.as_str()
    }

    /// Best available description of a failed request
    pub fn failure_reason(&self) -> String {
        self.message
            .clone()
            .or_else(|| error_text(self.error.as_ref()))
            .unwrap_or_else(|| format!("request ended with status {:?}", self.status))
    }
}
