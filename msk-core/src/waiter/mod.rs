//! Async operation waiter
//!
//! A remote operation is driven to completion by polling a
//! [`StatusRefresher`] under a [`PollPolicy`]. When the status reached is a
//! failure, callers explain it by classifying the operation's event log
//! ([`collect_failure_reasons`]) into a [`FailureReport`].
//!
//! ```text
//! refresher --> Waiter::wait --> Settled / WaitFailure
//!                                   |
//!                         pager --> collect_failure_reasons --> WaitError::TerminalFailure
//! ```

pub mod classify;
pub mod clock;
pub mod error;
pub mod events;
pub mod machine;
pub mod policy;
pub mod refresh;

pub use classify::{FailureReport, FailureStrategy, collect_failure_reasons};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{BoxError, WaitError, WaitFailure};
pub use events::{EventRecord, Page, Pager, for_each_event};
pub use machine::{Settled, Waiter};
pub use policy::{GoneOutcome, Phase, PollPolicy};
pub use refresh::{Refresh, StatusRefresher, StatusSnapshot};
