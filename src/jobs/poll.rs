//! Run-status polling for remote actor runs.
//!
//! A run moves `Submitted → Running → {Succeeded | Failed | Aborted | TimedOut}`.
//! The wait is bounded by `PollPolicy` (attempt count and/or wall clock) and
//! an optional caller deadline; hitting a bound ends the run as `TimedOut`.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl RunState {
    /// Map an actor platform status string. Transitional and unknown
    /// statuses count as still running.
    pub fn from_actor_status(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "ABORTED" => Self::Aborted,
            "TIMED-OUT" | "TIMED_OUT" => Self::TimedOut,
            "READY" | "RUNNING" | "TIMING-OUT" | "ABORTING" => Self::Running,
            other => {
                debug!("Unknown run status {:?}, treating as running", other);
                Self::Running
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Aborted | Self::TimedOut
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
            Self::TimedOut => "TIMED_OUT",
        };
        f.write_str(s)
    }
}

/// What a status check reports about a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub run_id: String,
    pub state: RunState,
    pub dataset_id: Option<String>,
}

impl RunSnapshot {
    fn timed_out(self) -> Self {
        Self {
            state: RunState::TimedOut,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    /// Doubles the interval after each check, capped at `max_interval`.
    Exponential { max_interval: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub backoff: Backoff,
    pub max_attempts: Option<u32>,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            max_attempts: None,
            max_wait: Some(Duration::from_secs(900)),
        }
    }
}

impl PollPolicy {
    /// Sleep durations between consecutive status checks.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let base_ms = (self.interval.as_millis() as u64).max(1);
        match self.backoff {
            Backoff::Fixed => Box::new(FixedInterval::from_millis(base_ms)),
            // tokio-retry yields base^n * factor; base 2 with factor interval/2
            // starts at `interval` and doubles.
            Backoff::Exponential { max_interval } => Box::new(
                ExponentialBackoff::from_millis(2)
                    .factor((base_ms / 2).max(1))
                    .max_delay(max_interval),
            ),
        }
    }
}

/// Call `check` until the run reaches a terminal state or a bound is hit.
///
/// `deadline` is an extra caller-imposed bound on top of `policy.max_wait`.
/// Dropping the returned future cancels the wait.
pub async fn wait_for_terminal<F, Fut>(
    policy: &PollPolicy,
    deadline: Option<Instant>,
    mut check: F,
) -> Result<RunSnapshot>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RunSnapshot>>,
{
    let started = Instant::now();
    let deadline = match (deadline, policy.max_wait.map(|w| started + w)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let mut delays = policy.delays();
    let mut state = RunState::Submitted;
    let mut attempts = 0u32;

    loop {
        let snapshot = check().await?;
        attempts += 1;

        if snapshot.state != state {
            debug!("Run {}: {} -> {}", snapshot.run_id, state, snapshot.state);
            state = snapshot.state;
        }

        if state.is_terminal() {
            info!(
                "Run {} finished as {} after {} checks ({:.1?})",
                snapshot.run_id,
                state,
                attempts,
                started.elapsed()
            );
            return Ok(snapshot);
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            warn!("Run {} still {} after {} checks, giving up", snapshot.run_id, state, attempts);
            return Ok(snapshot.timed_out());
        }

        let delay = delays.next().unwrap_or(policy.interval);
        if deadline.is_some_and(|d| Instant::now() + delay > d) {
            warn!(
                "Run {} still {} at deadline ({:.1?} elapsed), giving up",
                snapshot.run_id,
                state,
                started.elapsed()
            );
            return Ok(snapshot.timed_out());
        }

        info!("...still fetching, checking again in {:?}", delay);
        sleep(delay).await;
    }
}
