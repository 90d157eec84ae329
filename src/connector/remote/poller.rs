use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::api::ApprovalApi;
use super::protocol::{RequestStatus, ResultResponse};
use crate::wallet::{ApprovalState, PendingApproval, PendingApprovals, RequestKind};

/// Delay between two polls of the result endpoint
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Polls allowed before a request times out
pub const MAX_POLL_ITERATIONS: u32 = 300;

/// Length of a well-formed `0x`-prefixed 65 byte signature
const SIGNATURE_HEX_LEN: usize = 132;

/// How a polled request ended
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(ResultResponse),
    Cancelled,
    Errored(String),
    TimedOut,
    /// Stopped by `abort` before reaching a terminal status
    Aborted,
}

impl PollOutcome {
    pub fn state(&self) -> ApprovalState {
        match self {
            PollOutcome::Completed(_) => ApprovalState::Completed,
            PollOutcome::Cancelled => ApprovalState::Cancelled,
            PollOutcome::Errored(_) => ApprovalState::Errored,
            PollOutcome::TimedOut => ApprovalState::TimedOut,
            PollOutcome::Aborted => ApprovalState::Idle,
        }
    }
}

/// Drives prepared requests to a terminal status by polling the result endpoint
#[derive(Clone)]
pub struct ApprovalPoller {
    api: Arc<dyn ApprovalApi>,
    pending: Arc<PendingApprovals>,
    interval: Duration,
    max_iterations: u32,
}

impl ApprovalPoller {
    pub fn new(api: Arc<dyn ApprovalApi>) -> Self {
        Self {
            api,
            pending: Arc::new(PendingApprovals::new()),
            interval: POLL_INTERVAL,
            max_iterations: MAX_POLL_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn api(&self) -> &Arc<dyn ApprovalApi> {
        &self.api
    }

    pub fn pending(&self) -> &PendingApprovals {
        &self.pending
    }

    /// Cancel every outstanding poll of `kind`
    pub fn abort(&self, kind: RequestKind) {
        let aborted = self.pending.abort(kind);
        if aborted > 0 {
            info!(%kind, aborted, "aborted pending remote requests");
        }
    }

    /// Register a handle for a freshly prepared request.
    ///
    /// From here on `abort(kind)` reaches the request, even before
    /// [`ApprovalPoller::watch`] starts polling it.
    pub fn track(&self, kind: RequestKind, request_key: &str) -> PendingApproval {
        let request = PendingApproval::new(kind, request_key, self.max_iterations);
        self.pending.register(request.clone());
        debug!(%kind, %request_key, state = ?ApprovalState::Prepared, "remote request tracked");
        request
    }

    /// Track and poll `request_key` in one step
    pub async fn poll(&self, kind: RequestKind, request_key: &str) -> PollOutcome {
        let request = self.track(kind, request_key);
        self.watch(request).await
    }

    /// Poll a tracked request every interval until a terminal status, the
    /// iteration ceiling, or an abort of its kind.
    ///
    /// Polls run one at a time, so a slow response delays the next tick
    /// instead of overlapping it.
    pub async fn watch(&self, request: PendingApproval) -> PollOutcome {
        let (kind, request_key, token) = (request.kind, request.request_key.as_str(), request.token());
        debug!(%kind, %request_key, state = ?ApprovalState::Polling, "polling remote request");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut iterations: u32 = 0;

        let outcome = loop {
            // cancellation wins over a due tick, including one aborted before the first poll
            tokio::select! {
                biased;
                _ = token.cancelled() => break PollOutcome::Aborted,
                _ = ticker.tick() => {}
            }

            let response = self.api.result(request_key).await;
            // an abort issued while the call was in flight discards its answer
            if request.is_aborted() {
                break PollOutcome::Aborted;
            }

            iterations += 1;
            if iterations > request.deadline_iterations {
                break PollOutcome::TimedOut;
            }

            match response {
                Ok(response) => match response.status {
                    RequestStatus::Completed => break PollOutcome::Completed(response),
                    RequestStatus::Canceled => break PollOutcome::Cancelled,
                    RequestStatus::Error | RequestStatus::Failed => {
                        break PollOutcome::Errored(response.failure_reason())
                    }
                    RequestStatus::Prepared | RequestStatus::Requested | RequestStatus::Unknown => {}
                },
                Err(e) => warn!(%kind, %request_key, iterations, "poll failed: {}", e),
            }
        };

        self.pending.release(kind, request.id);
        match &outcome {
            PollOutcome::Aborted => info!(%kind, %request_key, "remote request aborted"),
            PollOutcome::TimedOut => warn!(%kind, %request_key, iterations, "remote request timed out"),
            other => info!(%kind, %request_key, state = ?other.state(), "remote request finished"),
        }
        outcome
    }
}

/// Repair the recovery id of signatures returned by the mobile approval app.
///
/// The last byte sometimes arrives as the decimal code `4055`/`4056` instead
/// of `1b`/`1c`. Well-formed signatures are returned untouched.
pub fn normalize_signature(signature: &str) -> String {
    if signature.len() == SIGNATURE_HEX_LEN {
        return signature.to_string();
    }

    if let Some(body) = signature.strip_suffix("4055") {
        return format!("{}1b", body);
    }

    if let Some(body) = signature.strip_suffix("4056") {
        return format!("{}1c", body);
    }

    signature.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::remote::protocol::{PrepareRequest, PrepareResponse};
    use crate::error::{ConnectorError, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays scripted statuses, repeating the last one forever
    struct ScriptedApi {
        statuses: Mutex<VecDeque<serde_json::Value>>,
        polls: Mutex<u32>,
    }

    impl ScriptedApi {
        fn new(statuses: Vec<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                polls: Mutex::new(0),
            })
        }

        fn polls(&self) -> u32 {
            *self.polls.lock()
        }
    }

    #[async_trait]
    impl ApprovalApi for ScriptedApi {
        async fn prepare(&self, _request: &PrepareRequest) -> Result<PrepareResponse> {
            Err(ConnectorError::Prepare("not used".into()))
        }

        async fn result(&self, _request_key: &str) -> Result<ResultResponse> {
            *self.polls.lock() += 1;
            let mut statuses = self.statuses.lock();
            let next = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().unwrap()
            };
            Ok(serde_json::from_value(next)?)
        }
    }

    #[test]
    fn test_normalize_signature() {
        let canonical = format!("0x{}", "a".repeat(130));
        assert_eq!(normalize_signature(&canonical), canonical);

        let canonical_ending_4055 = format!("0x{}4055", "a".repeat(126));
        assert_eq!(canonical_ending_4055.len(), 132);
        assert_eq!(normalize_signature(&canonical_ending_4055), canonical_ending_4055);

        let body = format!("0x{}", "a".repeat(128));
        assert_eq!(normalize_signature(&format!("{}4055", body)), format!("{}1b", body));
        assert_eq!(normalize_signature(&format!("{}4056", body)), format!("{}1c", body));
        assert_eq!(normalize_signature("0xdeadbeef"), "0xdeadbeef");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_requested_polls() {
        let api = ScriptedApi::new(vec![
            json!({"status": "requested"}),
            json!({"status": "prepared"}),
            json!({"status": "completed", "result": {"signature": "0x1"}}),
        ]);
        let poller = ApprovalPoller::new(api.clone());

        let outcome = poller.poll(RequestKind::Sign, "k").await;

        match outcome {
            PollOutcome::Completed(response) => assert_eq!(response.result_str("signature"), Some("0x1")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(api.polls(), 3);
        assert_eq!(poller.pending().count(RequestKind::Sign), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_waits_one_interval() {
        let api = ScriptedApi::new(vec![json!({"status": "canceled"})]);
        let poller = ApprovalPoller::new(api.clone());
        let started = Instant::now();

        let outcome = poller.poll(RequestKind::Activation, "k").await;

        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(started.elapsed(), POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_and_failed_are_terminal() {
        let api = ScriptedApi::new(vec![json!({"status": "error", "message": "boom"})]);
        let outcome = ApprovalPoller::new(api).poll(RequestKind::Transaction, "k").await;
        assert!(matches!(outcome, PollOutcome::Errored(reason) if reason == "boom"));

        let api = ScriptedApi::new(vec![json!({"status": "failed"})]);
        let outcome = ApprovalPoller::new(api).poll(RequestKind::Transaction, "k").await;
        assert!(matches!(outcome, PollOutcome::Errored(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_stops_polling() {
        let api = ScriptedApi::new(vec![json!({"status": "requested"})]);
        let poller = ApprovalPoller::new(api.clone()).with_max_iterations(5);

        let outcome = poller.poll(RequestKind::Sign, "k").await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(api.polls(), 6);
        tokio::time::sleep(POLL_INTERVAL * 10).await;
        assert_eq!(api.polls(), 6);
        assert_eq!(poller.pending().count(RequestKind::Sign), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_polling() {
        let api = ScriptedApi::new(vec![json!({"status": "requested"})]);
        let poller = ApprovalPoller::new(api.clone());

        let task = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll(RequestKind::Sign, "k").await })
        };
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(poller.pending().count(RequestKind::Sign), 1);

        poller.abort(RequestKind::Sign);
        let outcome = task.await.unwrap();

        assert!(matches!(outcome, PollOutcome::Aborted));
        let polls = api.polls();
        assert_eq!(polls, 2);
        tokio::time::sleep(POLL_INTERVAL * 5).await;
        assert_eq!(api.polls(), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_before_first_poll() {
        let api = ScriptedApi::new(vec![json!({"status": "requested"})]);
        let poller = ApprovalPoller::new(api.clone());
        let started = Instant::now();

        let request = poller.track(RequestKind::Activation, "k");
        assert_eq!(poller.pending().count(RequestKind::Activation), 1);
        poller.abort(RequestKind::Activation);
        let outcome = poller.watch(request).await;

        assert!(matches!(outcome, PollOutcome::Aborted));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(api.polls(), 0);
        assert_eq!(poller.pending().count(RequestKind::Activation), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_other_kind_keeps_polling() {
        let api = ScriptedApi::new(vec![
            json!({"status": "requested"}),
            json!({"status": "requested"}),
            json!({"status": "completed", "result": {}}),
        ]);
        let poller = ApprovalPoller::new(api.clone());

        let task = {
            let poller = poller.clone();
            tokio::spawn(async move { poller.poll(RequestKind::Sign, "k").await })
        };
        tokio::time::sleep(Duration::from_millis(1500)).await;
        poller.abort(RequestKind::Transaction);

        assert!(matches!(task.await.unwrap(), PollOutcome::Completed(_)));
    }
}
