use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConnectorError, Result};

/// Wallet backends known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WalletType {
    #[serde(rename = "m")]
    Metamask,
    #[serde(rename = "k")]
    Kaikas,
    #[serde(rename = "kl")]
    Klip,
    #[serde(rename = "cb")]
    Coinbase,
    /// D'CENT in Ethereum mode
    #[serde(rename = "de")]
    DcentEthereum,
    /// D'CENT in Klaytn mode
    #[serde(rename = "dk")]
    DcentKlaytn,
    /// Kaikas mobile app, reached through QR / deep link
    #[serde(rename = "km")]
    KaikasMobile,
    #[serde(rename = "wc")]
    WalletConnect,
}

impl WalletType {
    pub const ALL: [WalletType; 8] = [
        WalletType::Metamask,
        WalletType::Kaikas,
        WalletType::Klip,
        WalletType::Coinbase,
        WalletType::DcentEthereum,
        WalletType::DcentKlaytn,
        WalletType::KaikasMobile,
        WalletType::WalletConnect,
    ];

    /// Short code used in persisted sessions
    pub fn code(&self) -> &'static str {
        match self {
            WalletType::Metamask => "m",
            WalletType::Kaikas => "k",
            WalletType::Klip => "kl",
            WalletType::Coinbase => "cb",
            WalletType::DcentEthereum => "de",
            WalletType::DcentKlaytn => "dk",
            WalletType::KaikasMobile => "km",
            WalletType::WalletConnect => "wc",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|wallet| wallet.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WalletType::Metamask => "MetaMask",
            WalletType::Kaikas => "Kaikas",
            WalletType::Klip => "Klip",
            WalletType::Coinbase => "Coinbase Wallet",
            WalletType::DcentEthereum => "D'CENT (Ethereum)",
            WalletType::DcentKlaytn => "D'CENT (Klaytn)",
            WalletType::KaikasMobile => "Kaikas Mobile",
            WalletType::WalletConnect => "WalletConnect",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Network families a wallet can connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    Ethereum,
    Klaytn,
    KlaytnTestnet,
    Polygon,
}

impl ChainType {
    pub fn chain_id(&self) -> u64 {
        match self {
            ChainType::Ethereum => 1,
            ChainType::Klaytn => 8217,
            ChainType::KlaytnTestnet => 1001,
            ChainType::Polygon => 137,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChainType::Ethereum => "Ethereum",
            ChainType::Klaytn => "Klaytn",
            ChainType::KlaytnTestnet => "Klaytn Testnet",
            ChainType::Polygon => "Polygon",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chain id as reported by a wallet.
///
/// Providers report either a JSON number or a string, which may be decimal
/// (`"8217"`) or hex (`"0x2019"`). Comparisons go through [`ChainId::as_u64`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainId {
    Number(u64),
    Text(String),
}

impl ChainId {
    /// Numeric value of the id, accepting decimal or `0x`-prefixed hex text
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ChainId::Number(id) => Some(*id),
            ChainId::Text(text) => {
                let text = text.trim();
                if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    u64::from_str_radix(hex, 16).ok()
                } else {
                    text.parse().ok()
                }
            }
        }
    }

    /// True when both ids denote the same network, regardless of encoding
    pub fn same_network(&self, other: u64) -> bool {
        self.as_u64() == Some(other)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId::Number(id)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        ChainId::Text(id.to_string())
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        ChainId::Text(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Number(id) => write!(f, "{}", id),
            ChainId::Text(text) => f.write_str(text),
        }
    }
}

/// Signing flavours a caller can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignType {
    #[serde(rename = "eth_sign")]
    EthSign,
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_signTypedData")]
    SignTypedData,
    #[default]
    #[serde(rename = "eth_signTypedData_v1")]
    SignTypedDataV1,
    #[serde(rename = "eth_signTypedData_v3")]
    SignTypedDataV3,
    #[serde(rename = "eth_signTypedData_v4")]
    SignTypedDataV4,
}

impl SignType {
    /// Provider RPC method used for typed-data signing
    pub fn rpc_method(&self) -> Result<&'static str> {
        match self {
            SignType::SignTypedData | SignType::SignTypedDataV1 => Ok("eth_signTypedData"),
            SignType::SignTypedDataV3 => Ok("eth_signTypedData_v3"),
            SignType::SignTypedDataV4 => Ok("eth_signTypedData_v4"),
            SignType::EthSign | SignType::PersonalSign => {
                Err(ConnectorError::Unsupported("typed data signing with this sign type"))
            }
        }
    }
}
