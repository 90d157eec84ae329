//! Wallet connector orchestration.
//!
//! A [`WalletManager`] owns one active [`WalletConnector`], mirrors its
//! address and chain into a persisted session, and fans lifecycle events out
//! over an [`EventBus`]. Connectors are created through a [`WalletRegistry`].

pub mod app;
pub mod config;
pub mod connector;
pub mod error;
pub mod wallet;

pub use app::{EventBus, EventType, WalletEvent, WalletManager, WalletState};
pub use config::ManagerOptions;
pub use connector::{
    ConnectorContext, ContractEncoder, InjectedProvider, RemoteApprovalConnector, WalletConnector,
    WalletInterface, WalletRegistry,
};
pub use error::{ConnectorError, Result};
pub use wallet::{ChainId, ChainType, SessionStore, SignType, TransactionRequest, WalletType};
