pub mod rpc;
pub mod signing_request;
pub mod storage;
pub mod transaction;
pub mod types;

pub use rpc::{RpcClient, RpcFlavor};
pub use signing_request::{ApprovalState, PendingApproval, PendingApprovals, RequestKind};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, SessionLookup, SessionRecord, SessionStore, StoreError,
    WALLET_STATE_KEY,
};
pub use transaction::{
    TransactionError, TransactionErrorKind, TransactionReceipt, TransactionRequest,
    TransactionResult,
};
pub use types::{ChainId, ChainType, SignType, WalletType};
