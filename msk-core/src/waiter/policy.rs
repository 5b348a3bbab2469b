//! Poll policies: which statuses keep a wait going, which end it, and how
//! often to look.

use std::fmt;
use std::time::Duration;

/// Upper bound on the delay between two polls unless the floor is higher
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Growth of the poll interval per attempt
pub const POLL_INTERVAL_STEP: Duration = Duration::from_millis(500);

/// Where an observed status falls relative to a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Target,
    Unrecognized,
}

/// What a wait does when the remote object disappears mid-poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneOutcome {
    /// The object being gone is the goal (deletions)
    Settle,
    /// The object vanishing is an error
    Fail,
}

/// Wait configuration for one operation kind
#[derive(Debug, Clone)]
pub struct PollPolicy<S: 'static> {
    pub pending: &'static [S],
    pub target: &'static [S],
    /// Hard ceiling measured from the start of the wait
    pub timeout: Duration,
    pub min_poll_interval: Duration,
    pub max_poll_interval: Duration,
    /// Sleep before the first poll
    pub initial_delay: Duration,
    pub on_gone: GoneOutcome,
}

impl<S: PartialEq> PollPolicy<S> {
    pub fn new(pending: &'static [S], target: &'static [S], timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            min_poll_interval: Duration::ZERO,
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
            initial_delay: Duration::ZERO,
            on_gone: GoneOutcome::Fail,
        }
    }

    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn settle_when_gone(mut self) -> Self {
        self.on_gone = GoneOutcome::Settle;
        self
    }

    /// Target membership wins over pending membership
    pub fn phase(&self, status: &S) -> Phase {
        if self.target.contains(status) {
            Phase::Target
        } else if self.pending.contains(status) {
            Phase::Pending
        } else {
            Phase::Unrecognized
        }
    }

    /// Delay after the `attempt`-th pending observation (0-based)
    ///
    /// Grows linearly by [`POLL_INTERVAL_STEP`], never drops below
    /// `min_poll_interval` and never exceeds `max(max_poll_interval,
    /// min_poll_interval)`. Non-decreasing in `attempt`.
    pub fn poll_interval(&self, attempt: u32) -> Duration {
        let cap = self.max_poll_interval.max(self.min_poll_interval);
        POLL_INTERVAL_STEP
            .saturating_mul(attempt.saturating_add(1))
            .max(self.min_poll_interval)
            .min(cap)
    }
}

impl<S: fmt::Display> PollPolicy<S> {
    /// Target statuses joined for messages, e.g. "CREATE_COMPLETE, CREATE_FAILED"
    pub fn target_description(&self) -> String {
        self.target
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
