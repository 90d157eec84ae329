use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options recognised by the wallet manager and the connectors it creates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerOptions {
    /// Name shown to the user in remote approval requests
    pub app_name: String,
    /// For hosts building a bridge SDK provider, such as Coinbase Wallet
    pub app_logo_url: Option<String>,
    /// Public URL of the application, opened by wallets with an in-app browser
    pub base_url: Option<String>,
    /// Node used for balance and receipt queries
    pub json_rpc_url: String,
    /// Default chain for connectors that need one
    pub chain_id: Option<u64>,
    /// Chain the application expects the wallet to be on
    pub target_chain_id: Option<u64>,
    pub wallet_auto_connect: bool,
    pub auto_disconnect_on_chain_mismatch: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            app_name: "wallet-connector".to_string(),
            app_logo_url: None,
            base_url: None,
            json_rpc_url: "https://public-en-cypress.klaytn.net".to_string(),
            chain_id: None,
            target_chain_id: None,
            wallet_auto_connect: false,
            auto_disconnect_on_chain_mismatch: false,
        }
    }
}

impl ManagerOptions {
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let options: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(options)
    }

    /// Chain a connector reports before the wallet tells it otherwise: the
    /// explicit default, else the target
    pub fn default_chain_id(&self) -> Option<u64> {
        self.chain_id.or(self.target_chain_id)
    }
}
