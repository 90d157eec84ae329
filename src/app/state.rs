use crate::wallet::{ChainId, ChainType, SessionRecord, WalletType};

/// What the manager knows about the connected wallet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletState {
    pub wallet_type: Option<WalletType>,
    pub chain_type: Option<ChainType>,
    pub address: Option<String>,
    pub chain_id: Option<ChainId>,
}

impl WalletState {
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            address: self.address.clone().unwrap_or_default(),
            chain_id: self.chain_id.clone(),
            chain_type: self.chain_type,
            wallet_type: self.wallet_type,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
