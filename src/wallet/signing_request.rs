use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Operation awaiting approval in the remote wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Activation,
    Sign,
    Transaction,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Activation => write!(f, "activation"),
            RequestKind::Sign => write!(f, "sign"),
            RequestKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Lifecycle of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Idle,
    Prepared,
    Polling,
    Completed,
    Cancelled,
    Errored,
    TimedOut,
}

impl ApprovalState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApprovalState::Completed
                | ApprovalState::Cancelled
                | ApprovalState::Errored
                | ApprovalState::TimedOut
        )
    }
}

/// A prepared request whose result is being polled
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub id: Uuid,
    pub request_key: String,
    pub kind: RequestKind,
    pub created_at: DateTime<Utc>,
    /// Poll iterations allowed before the request times out
    pub deadline_iterations: u32,
    token: CancellationToken,
}

impl PendingApproval {
    pub fn new(kind: RequestKind, request_key: impl Into<String>, deadline_iterations: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_key: request_key.into(),
            kind,
            created_at: Utc::now(),
            deadline_iterations,
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Outstanding poll handles, grouped by kind.
///
/// Registration is additive: a second request of the same kind does not
/// displace the first. Only [`PendingApprovals::abort`] or the owning poll
/// loop finishing removes handles.
#[derive(Default)]
pub struct PendingApprovals {
    by_kind: Mutex<HashMap<RequestKind, Vec<PendingApproval>>>,
}

impl PendingApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request: PendingApproval) {
        self.by_kind.lock().entry(request.kind).or_default().push(request);
    }

    /// Drop a finished request without cancelling it
    pub fn release(&self, kind: RequestKind, id: Uuid) {
        if let Some(requests) = self.by_kind.lock().get_mut(&kind) {
            requests.retain(|request| request.id != id);
        }
    }

    /// Cancel every outstanding request of `kind`. Safe when nothing is pending.
    pub fn abort(&self, kind: RequestKind) -> usize {
        let aborted = self.by_kind.lock().remove(&kind).unwrap_or_default();
        for request in &aborted {
            request.token.cancel();
        }
        aborted.len()
    }

    pub fn count(&self, kind: RequestKind) -> usize {
        self.by_kind.lock().get(&kind).map_or(0, Vec::len)
    }
}
