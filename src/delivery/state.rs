//! Retry bookkeeping for one logical publish.
//!
//! `RetryState` is owned by a single publish loop and never shared. The
//! decision of what to do after each attempt lives in `RetryState::record`
//! so the per-mode rules can be exercised without any I/O.

use crate::delivery::DeliveryMode;

/// Result of a single publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The broker accepted the message.
    Success,
    /// The broker replied with the failure token; it definitely did not
    /// accept the message.
    ExplicitFail,
    /// No reply in time; the broker may or may not have accepted it.
    Timeout,
}

/// Last known status of a logical publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishStatus {
    #[default]
    Pending,
    Success,
    ExplicitFail,
    Timeout,
    Exhausted,
}

/// What the publish loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Retry,
    Complete,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    timeouts: u32,
    retry_limit: u32,
    status: PublishStatus,
}

impl RetryState {
    pub fn new(retry_limit: u32) -> Self {
        Self {
            attempts: 0,
            timeouts: 0,
            retry_limit,
            status: PublishStatus::Pending,
        }
    }

    /// Marks that another request is about to be sent.
    pub fn begin_attempt(&mut self) {
        self.attempts += 1;
        self.status = PublishStatus::Pending;
    }

    /// Applies `mode`'s rule to the outcome of the latest attempt.
    ///
    /// Explicit failures always retry. Timeouts retry unless the mode bounds
    /// them and the timeout counter has reached `retry_limit`.
    pub fn record(&mut self, mode: DeliveryMode, outcome: AttemptOutcome) -> Next {
        match outcome {
            AttemptOutcome::Success => {
                self.status = PublishStatus::Success;
                Next::Complete
            }
            AttemptOutcome::ExplicitFail => {
                self.status = PublishStatus::ExplicitFail;
                Next::Retry
            }
            AttemptOutcome::Timeout => {
                self.status = PublishStatus::Timeout;
                if !mode.bounds_timeouts() {
                    return Next::Retry;
                }
                self.timeouts += 1;
                if self.timeouts < self.retry_limit {
                    Next::Retry
                } else {
                    self.status = PublishStatus::Exhausted;
                    Next::Exhausted
                }
            }
        }
    }

    /// Requests sent so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Timeouts counted against the ceiling. Stays at zero outside
    /// at-most-once.
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn status(&self) -> PublishStatus {
        self.status
    }
}
