//! Bounded waiting for an asynchronously-provided dependency.

use std::time::Duration;

use crate::foundation::error::{CityPaperError, CityPaperResult};

/// Hard cap applied to every readiness wait, whatever the configuration says.
pub const MAX_READY_WAIT: Duration = Duration::from_secs(60);

/// Polling policy for [`wait_until_ready`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyPolicy {
    /// Delay between probes.
    pub poll_interval: Duration,
    /// Upper bound on the total wait. Clamped to [`MAX_READY_WAIT`].
    pub max_wait: Duration,
}

impl Default for ReadyPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl ReadyPolicy {
    /// Effective deadline after clamping.
    pub fn deadline(self) -> Duration {
        self.max_wait.min(MAX_READY_WAIT)
    }

    fn interval(self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }
}

/// Probe `is_ready` every `poll_interval` until it returns `true` or the deadline passes.
///
/// The first probe happens immediately. On timeout returns
/// [`CityPaperError::EngineUnavailable`] naming `what`.
pub async fn wait_until_ready<F>(
    what: &str,
    policy: ReadyPolicy,
    mut is_ready: F,
) -> CityPaperResult<Duration>
where
    F: FnMut() -> bool,
{
    let started = tokio::time::Instant::now();
    let deadline = policy.deadline();

    let poll = async {
        let mut ticker = tokio::time::interval(policy.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut probes: u32 = 0;
        loop {
            ticker.tick().await;
            probes = probes.saturating_add(1);
            if is_ready() {
                return probes;
            }
        }
    };

    match tokio::time::timeout(deadline, poll).await {
        Ok(probes) => {
            let waited = started.elapsed();
            tracing::debug!(what, probes, ?waited, "dependency ready");
            Ok(waited)
        }
        Err(_) => {
            tracing::error!(what, ?deadline, "dependency never became ready");
            Err(CityPaperError::engine_unavailable(format!(
                "{what} not available after {}ms",
                deadline.as_millis()
            )))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/ready.rs"]
mod tests;
