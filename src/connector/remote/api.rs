use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::protocol::{PrepareRequest, PrepareResponse, ResultResponse};
use crate::error::{ConnectorError, Result};

/// The two endpoints of a remote-approval provider
#[async_trait]
pub trait ApprovalApi: Send + Sync {
    async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse>;

    async fn result(&self, request_key: &str) -> Result<ResultResponse>;
}

/// How the result endpoint takes the request key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultUrl {
    /// `{base}?request_key={key}`
    Query(String),
    /// `{base}/{key}`
    Path(String),
}

impl ResultUrl {
    pub fn for_key(&self, request_key: &str) -> String {
        match self {
            ResultUrl::Query(base) => format!("{}?request_key={}", base, request_key),
            ResultUrl::Path(base) => format!("{}/{}", base.trim_end_matches('/'), request_key),
        }
    }
}

/// [`ApprovalApi`] over HTTP
pub struct HttpApprovalApi {
    http: reqwest::Client,
    prepare_url: String,
    result_url: ResultUrl,
}

impl HttpApprovalApi {
    pub fn new(http: reqwest::Client, prepare_url: impl Into<String>, result_url: ResultUrl) -> Self {
        Self {
            http,
            prepare_url: prepare_url.into(),
            result_url,
        }
    }
}

#[async_trait]
impl ApprovalApi for HttpApprovalApi {
    async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse> {
        debug!(kind = ?request.kind, url = %self.prepare_url, "preparing remote request");

        let response = self
            .http
            .post(&self.prepare_url)
            .timeout(Duration::from_secs(30))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConnectorError::Prepare(format!(
                "prepare endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.json::<PrepareResponse>().await?)
    }

    async fn result(&self, request_key: &str) -> Result<ResultResponse> {
        let response = self
            .http
            .get(self.result_url.for_key(request_key))
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<ResultResponse>().await?)
    }
}
