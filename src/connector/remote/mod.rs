//! Wallets that approve requests in a separate mobile app.
//!
//! A request is prepared over HTTP, shown to the user as a QR code or deep
//! link, then polled until the app reports a final status.

pub mod api;
pub mod connector;
pub mod links;
pub mod poller;
pub mod protocol;

pub use api::{ApprovalApi, HttpApprovalApi, ResultUrl};
pub use connector::{RemoteApprovalConnector, RemoteWallet};
pub use links::{render_qr, Platform};
pub use poller::{normalize_signature, ApprovalPoller, PollOutcome, MAX_POLL_ITERATIONS, POLL_INTERVAL};
pub use protocol::{PrepareRequest, PrepareResponse, PrepareType, RequestStatus, ResultResponse};
