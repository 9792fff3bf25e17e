//! The single wait primitive used by every time-bounded check.
//!
//! Observations are scheduled at `0, interval, 2 * interval, ...`, pushed
//! back when a probe runs long so that a full `interval` always separates the
//! end of one probe from the start of the next. Nothing runs past the
//! deadline: a probe still in flight when the budget ends is abandoned and
//! the previous observation is reported. Built on `tokio::time`, which makes
//! it testable with a paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Timing parameters for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Result of a bounded poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// An observation satisfied the condition.
    Ready {
        value: T,
        attempts: u32,
        elapsed: Duration,
    },
    /// The budget ran out; `last` is the final observation.
    TimedOut {
        last: T,
        attempts: u32,
        elapsed: Duration,
    },
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. } | PollOutcome::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Ready { elapsed, .. } | PollOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// The last observation, whether or not it satisfied the condition.
    pub fn into_value(self) -> T {
        match self {
            PollOutcome::Ready { value, .. } => value,
            PollOutcome::TimedOut { last, .. } => last,
        }
    }
}

/// Repeatedly run `probe` until `accept` holds for its output or the budget
/// is exhausted.
///
/// The first probe always runs to completion, even with a zero timeout.
/// Later probes are cut off at the deadline. A zero interval is raised to one
/// millisecond.
pub async fn poll_until<T, P, Fut, A>(config: PollConfig, mut probe: P, accept: A) -> PollOutcome<T>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = T>,
    A: Fn(&T) -> bool,
{
    let interval = config.interval.max(Duration::from_millis(1));
    let start = Instant::now();
    let deadline = start + config.timeout;
    let mut attempts = 0u32;
    let mut previous: Option<T> = None;

    loop {
        let observation = match previous.take() {
            None => probe().await,
            Some(last) => match tokio::time::timeout_at(deadline, probe()).await {
                Ok(observation) => observation,
                Err(_) => {
                    tracing::debug!(attempts, "Probe still running at deadline");
                    return timed_out(last, attempts, start);
                }
            },
        };
        attempts += 1;

        if accept(&observation) {
            return PollOutcome::Ready {
                value: observation,
                attempts,
                elapsed: start.elapsed(),
            };
        }

        let now = Instant::now();
        let next_tick = (start + interval * attempts).max(now + interval);
        if now >= deadline || next_tick > deadline {
            return timed_out(observation, attempts, start);
        }

        previous = Some(observation);
        tokio::time::sleep_until(next_tick).await;
    }
}

fn timed_out<T>(last: T, attempts: u32, start: Instant) -> PollOutcome<T> {
    tracing::debug!(
        attempts,
        elapsed_ms = %start.elapsed().as_millis(),
        "Poll budget exhausted"
    );
    PollOutcome::TimedOut {
        last,
        attempts,
        elapsed: start.elapsed(),
    }
}
