use thiserror::Error;

use crate::wallet::transaction::TransactionError;

pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;

/// Errors surfaced by connectors and the wallet manager
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A second `initialize` without an intervening `destroy`
    #[error("wallet manager is already initialized, only one instance is allowed per process")]
    AlreadyInitialized,

    #[error("wallet manager is not initialized, call initialize() first")]
    NotInitialized,

    #[error("invalid wallet connector")]
    InvalidConnector,

    /// The chain-mismatch policy disconnected the wallet
    #[error("wallet is on chain {0}, which is not the target network")]
    WrongNetwork(String),

    #[error("{0} is not supported by this connector")]
    Unsupported(&'static str),

    /// The prepare endpoint rejected the request; no polling was started
    #[error("failed to prepare request: {0}")]
    Prepare(String),

    #[error("user cancelled the request")]
    UserCancelled,

    #[error("remote wallet returned an error: {0}")]
    Remote(String),

    #[error("timed out waiting for the remote wallet")]
    Timeout,

    #[error("pending request was aborted")]
    Aborted,

    #[error("wallet provider is not available")]
    ProviderUnavailable,

    #[error("wallet provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render qr code: {0}")]
    Qr(String),
}

impl From<qrcode::types::QrError> for ConnectorError {
    fn from(err: qrcode::types::QrError) -> Self {
        ConnectorError::Qr(err.to_string())
    }
}
