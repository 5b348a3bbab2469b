//! The wait state machine
//!
//! `Polling -> {Reached, Gone, Failed, TimedOut}`. One refresher per wait,
//! polled sequentially; the machine itself keeps nothing between calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::clock::{Clock, TokioClock};
use super::error::{WaitError, WaitFailure};
use super::policy::{GoneOutcome, Phase, PollPolicy};
use super::refresh::{Refresh, StatusRefresher, StatusSnapshot};

/// How a successful wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<S, R> {
    /// A target status was observed
    Reached(StatusSnapshot<S, R>),
    /// The object disappeared and the policy treats that as done;
    /// carries the last snapshot seen before it vanished
    Gone(Option<StatusSnapshot<S, R>>),
}

impl<S, R> Settled<S, R> {
    pub fn snapshot(&self) -> Option<&StatusSnapshot<S, R>> {
        match self {
            Settled::Reached(snapshot) => Some(snapshot),
            Settled::Gone(last) => last.as_ref(),
        }
    }

    pub fn into_snapshot(self) -> Option<StatusSnapshot<S, R>> {
        match self {
            Settled::Reached(snapshot) => Some(snapshot),
            Settled::Gone(last) => last,
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Settled::Gone(_))
    }
}

type WaitResult<R> = Result<
    Settled<<R as StatusRefresher>::Status, <R as StatusRefresher>::Object>,
    WaitFailure<<R as StatusRefresher>::Status, <R as StatusRefresher>::Object>,
>;

/// Drives refreshers to a target status
#[derive(Clone)]
pub struct Waiter {
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cancelling `token` ends every wait in progress with a timeout-class error
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Poll `refresher` until `policy` says stop
    ///
    /// `policy.timeout` is measured from the call, initial delay included.
    /// A refresh in flight when the deadline passes or the token is
    /// cancelled is abandoned. Every error carries the last snapshot seen.
    pub async fn wait<R>(&self, refresher: &R, policy: &PollPolicy<R::Status>) -> WaitResult<R>
    where
        R: StatusRefresher + ?Sized,
        R::Status: 'static,
    {
        // A timeout too large to represent never expires
        let deadline = self.clock.now().checked_add(policy.timeout);
        let mut last: Option<StatusSnapshot<R::Status, R::Object>> = None;

        log::debug!(
            "Waiting for {} to reach [{}] (timeout {:?})",
            refresher.describe(),
            policy.target_description(),
            policy.timeout
        );

        if !policy.initial_delay.is_zero() && !self.pause(policy.initial_delay).await {
            return Err(WaitFailure::new(self.cancelled(policy, &last), last));
        }

        let mut attempt: u32 = 0;
        loop {
            let remaining = self.remaining(deadline);
            if remaining.is_some_and(|r| r.is_zero()) {
                return Err(WaitFailure::new(self.timed_out(policy, &last), last));
            }

            let refreshed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(WaitFailure::new(self.cancelled(policy, &last), last));
                }
                result = refresher.refresh() => result,
                _ = self.expiry(remaining) => {
                    return Err(WaitFailure::new(self.timed_out(policy, &last), last));
                }
            };

            let snapshot = match refreshed {
                Ok(Refresh::Found(snapshot)) => snapshot,
                Ok(Refresh::Gone) => {
                    return match policy.on_gone {
                        GoneOutcome::Settle => {
                            log::info!("{} is gone", refresher.describe());
                            Ok(Settled::Gone(last))
                        }
                        GoneOutcome::Fail => Err(WaitFailure::new(
                            WaitError::NotFound {
                                description: refresher.describe(),
                            },
                            last,
                        )),
                    };
                }
                Err(e) => {
                    let error = WaitError::Query {
                        description: refresher.describe(),
                        source: Box::new(e),
                    };
                    return Err(WaitFailure::new(error, last));
                }
            };

            match policy.phase(&snapshot.status) {
                Phase::Target => {
                    log::info!("{} reached {}", refresher.describe(), snapshot.status);
                    return Ok(Settled::Reached(snapshot));
                }
                Phase::Unrecognized => {
                    log::warn!(
                        "{} reported unexpected status {}",
                        refresher.describe(),
                        snapshot.status
                    );
                    let error = WaitError::UnrecognizedStatus {
                        status: snapshot.status.to_string(),
                        target: policy.target_description(),
                    };
                    return Err(WaitFailure::new(error, Some(snapshot)));
                }
                Phase::Pending => {
                    log::debug!("{} is {}", refresher.describe(), snapshot.status);
                    last = Some(snapshot);
                }
            }

            let mut interval = policy.poll_interval(attempt);
            if let Some(remaining) = self.remaining(deadline) {
                interval = interval.min(remaining);
            }
            attempt = attempt.saturating_add(1);
            if !interval.is_zero() && !self.pause(interval).await {
                return Err(WaitFailure::new(self.cancelled(policy, &last), last));
            }
        }
    }

    fn remaining(&self, deadline: Option<Instant>) -> Option<Duration> {
        deadline.map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    /// Resolves when the deadline passes; never without one
    async fn expiry(&self, remaining: Option<Duration>) {
        match remaining {
            Some(remaining) => self.clock.sleep(remaining).await,
            None => std::future::pending().await,
        }
    }

    /// Sleep unless cancelled first; false on cancellation
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.clock.sleep(duration) => true,
        }
    }

    fn timed_out<S, R>(&self, policy: &PollPolicy<S>, last: &Option<StatusSnapshot<S, R>>) -> WaitError
    where
        S: PartialEq + std::fmt::Display + 'static,
    {
        WaitError::Timeout {
            target: policy.target_description(),
            last_status: last.as_ref().map(|s| s.status.to_string()),
            timeout: policy.timeout,
        }
    }

    fn cancelled<S, R>(&self, policy: &PollPolicy<S>, last: &Option<StatusSnapshot<S, R>>) -> WaitError
    where
        S: PartialEq + std::fmt::Display + 'static,
    {
        WaitError::Cancelled {
            target: policy.target_description(),
            last_status: last.as_ref().map(|s| s.status.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waiter::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::fmt;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum JobStatus {
        Queued,
        Running,
        Succeeded,
        Failed,
        Other(String),
    }

    impl fmt::Display for JobStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                JobStatus::Queued => write!(f, "QUEUED"),
                JobStatus::Running => write!(f, "RUNNING"),
                JobStatus::Succeeded => write!(f, "SUCCEEDED"),
                JobStatus::Failed => write!(f, "FAILED"),
                JobStatus::Other(s) => write!(f, "{}", s),
            }
        }
    }

    const PENDING: &[JobStatus] = &[JobStatus::Queued, JobStatus::Running];
    const TARGET: &[JobStatus] = &[JobStatus::Succeeded, JobStatus::Failed];

    #[derive(Debug, thiserror::Error)]
    #[error("describe failed: {0}")]
    struct DescribeError(String);

    type Step = Result<Refresh<JobStatus, usize>, DescribeError>;

    /// Plays back scripted steps, then reports RUNNING forever
    struct ScriptedRefresher {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedRefresher {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn statuses(statuses: &[JobStatus]) -> Self {
            Self::new(statuses.iter().cloned().map(found).collect())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn found(status: JobStatus) -> Step {
        Ok(Refresh::Found(StatusSnapshot::new(status, 0)))
    }

    #[async_trait]
    impl StatusRefresher for ScriptedRefresher {
        type Status = JobStatus;
        type Object = usize;
        type Error = DescribeError;

        fn describe(&self) -> String {
            "job (j-1)".to_string()
        }

        async fn refresh(&self) -> Step {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| found(JobStatus::Running));
            step.map(|r| match r {
                Refresh::Found(s) => Refresh::Found(StatusSnapshot::new(s.status, call)),
                Refresh::Gone => Refresh::Gone,
            })
        }
    }

    /// Never answers
    struct HangingRefresher;

    #[async_trait]
    impl StatusRefresher for HangingRefresher {
        type Status = JobStatus;
        type Object = ();
        type Error = DescribeError;

        fn describe(&self) -> String {
            "job (j-2)".to_string()
        }

        async fn refresh(&self) -> Result<Refresh<JobStatus, ()>, DescribeError> {
            std::future::pending().await
        }
    }

    fn policy(timeout_secs: u64) -> PollPolicy<JobStatus> {
        PollPolicy::new(PENDING, TARGET, Duration::from_secs(timeout_secs))
    }

    fn manual() -> (Arc<ManualClock>, Waiter) {
        let clock = Arc::new(ManualClock::new());
        let waiter = Waiter::new().with_clock(clock.clone());
        (clock, waiter)
    }

    #[tokio::test]
    async fn pending_then_target_returns_final_snapshot() {
        let (clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Succeeded,
        ]);

        let settled = waiter.wait(&refresher, &policy(60)).await.unwrap();

        let snapshot = settled.into_snapshot().unwrap();
        assert_eq!(snapshot.status, JobStatus::Succeeded);
        assert_eq!(snapshot.raw, 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(500), Duration::from_secs(1)]
        );
    }

    #[tokio::test]
    async fn failure_class_target_still_settles() {
        let (_clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[JobStatus::Running, JobStatus::Failed]);
        let settled = waiter.wait(&refresher, &policy(60)).await.unwrap();
        assert_eq!(settled.snapshot().unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn never_reaching_target_times_out_with_last_snapshot() {
        let (clock, waiter) = manual();
        let refresher = ScriptedRefresher::new(vec![]);

        let failure = waiter.wait(&refresher, &policy(60)).await.unwrap_err();

        assert!(failure.error.is_timeout());
        assert_eq!(failure.last_status(), Some(&JobStatus::Running));
        assert_eq!(failure.last.as_ref().unwrap().raw, refresher.calls());
        assert_eq!(clock.elapsed(), Duration::from_secs(60));
        assert_eq!(
            failure.to_string(),
            "timeout while waiting for state to become 'SUCCEEDED, FAILED' (last state: 'RUNNING', timeout: 60s)"
        );
    }

    #[tokio::test]
    async fn min_poll_interval_is_a_floor() {
        let (clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ]);
        let policy = policy(600).with_min_poll_interval(Duration::from_secs(5));

        waiter.wait(&refresher, &policy).await.unwrap();

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[tokio::test]
    async fn initial_delay_precedes_first_poll() {
        let (clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[JobStatus::Succeeded]);
        let policy = policy(60).with_initial_delay(Duration::from_secs(10));

        waiter.wait(&refresher, &policy).await.unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn initial_delay_counts_against_timeout() {
        let (_clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[JobStatus::Succeeded]);
        let policy = policy(5).with_initial_delay(Duration::from_secs(10));

        let failure = waiter.wait(&refresher, &policy).await.unwrap_err();

        assert!(failure.error.is_timeout());
        assert!(failure.last.is_none());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn unrepresentable_timeout_waits_without_deadline() {
        let (clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[JobStatus::Running, JobStatus::Succeeded]);
        let policy = policy(u64::MAX);

        let settled = waiter.wait(&refresher, &policy).await.unwrap();

        assert_eq!(settled.snapshot().unwrap().status, JobStatus::Succeeded);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[tokio::test]
    async fn unrecognized_status_fails_fast() {
        let (_clock, waiter) = manual();
        let refresher = ScriptedRefresher::statuses(&[
            JobStatus::Running,
            JobStatus::Other("PAUSED".to_string()),
        ]);

        let failure = waiter.wait(&refresher, &policy(60)).await.unwrap_err();

        assert!(matches!(
            failure.error,
            WaitError::UnrecognizedStatus { ref status, .. } if status == "PAUSED"
        ));
        assert_eq!(
            failure.last_status(),
            Some(&JobStatus::Other("PAUSED".to_string()))
        );
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn refresh_error_aborts_without_retry() {
        let (_clock, waiter) = manual();
        let refresher = ScriptedRefresher::new(vec![
            found(JobStatus::Running),
            Err(DescribeError("Rate exceeded".to_string())),
            found(JobStatus::Succeeded),
        ]);

        let failure = waiter.wait(&refresher, &policy(60)).await.unwrap_err();

        assert!(matches!(failure.error, WaitError::Query { .. }));
        assert_eq!(
            failure.to_string(),
            "error reading job (j-1): describe failed: Rate exceeded"
        );
        assert_eq!(failure.last_status(), Some(&JobStatus::Running));
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn gone_settles_or_fails_per_policy() {
        let (_clock, waiter) = manual();

        let refresher = ScriptedRefresher::new(vec![found(JobStatus::Running), Ok(Refresh::Gone)]);
        let settled = waiter
            .wait(&refresher, &policy(60).settle_when_gone())
            .await
            .unwrap();
        assert!(settled.is_gone());
        assert_eq!(settled.snapshot().unwrap().status, JobStatus::Running);

        let refresher = ScriptedRefresher::new(vec![Ok(Refresh::Gone)]);
        let failure = waiter.wait(&refresher, &policy(60)).await.unwrap_err();
        assert!(failure.error.is_not_found());
        assert!(failure.last.is_none());
    }

    #[tokio::test]
    async fn hanging_refresh_is_abandoned_at_deadline() {
        let (clock, waiter) = manual();
        let failure = waiter.wait(&HangingRefresher, &policy(30)).await.unwrap_err();
        assert!(matches!(failure.error, WaitError::Timeout { .. }));
        assert_eq!(clock.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn cancelled_token_returns_timeout_class_error() {
        let token = CancellationToken::new();
        token.cancel();
        let (_clock, waiter) = manual();
        let waiter = waiter.with_cancellation(token);
        let refresher = ScriptedRefresher::statuses(&[JobStatus::Succeeded]);

        let failure = waiter.wait(&refresher, &policy(60)).await.unwrap_err();

        assert!(matches!(failure.error, WaitError::Cancelled { .. }));
        assert!(failure.error.is_timeout());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_refresh() {
        let token = CancellationToken::new();
        let waiter = Waiter::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let failure = waiter
            .wait(&HangingRefresher, &policy(3600))
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(failure.error, WaitError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn refresh_is_idempotent_without_state_change() {
        let refresher = ScriptedRefresher::new(vec![]);
        let first = refresher.refresh().await.unwrap();
        let second = refresher.refresh().await.unwrap();
        match (first, second) {
            (Refresh::Found(a), Refresh::Found(b)) => assert_eq!(a.status, b.status),
            other => panic!("unexpected refresh results: {:?}", other),
        }
    }
}
