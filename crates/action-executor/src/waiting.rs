//! Polling wait used while resolving command elements

use std::time::Duration;

use thiserror::Error;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("condition not met within {0:?}")]
pub struct WaitTimeout(pub Duration);

/// Probe `check` until it yields a value or `timeout` elapses.
///
/// The first probe runs immediately, further probes run every `delay`. A probe
/// scheduled at the same instant as the deadline still runs before the wait
/// gives up.
pub async fn wait_for<T, F>(
    mut check: F,
    delay: Duration,
    timeout: Duration,
) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Option<T>,
{
    if let Some(value) = check() {
        return Ok(value);
    }
    if timeout.is_zero() {
        return Err(WaitTimeout(timeout));
    }

    let delay = delay.max(Duration::from_millis(1));
    let start = Instant::now();
    let deadline = start + timeout;
    let mut ticker = interval_at(start + delay, delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if let Some(value) = check() {
                    return Ok(value);
                }
            }
            _ = sleep_until(deadline) => return Err(WaitTimeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn immediate_hit_does_not_sleep() {
        let start = Instant::now();
        let value = wait_for(|| Some(7), Duration::from_millis(200), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_the_configured_interval() {
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let value = wait_for(
            || {
                calls.set(calls.get() + 1);
                (calls.get() == 3).then_some("ready")
            },
            Duration::from_millis(200),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(value, "ready");
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_deadline() {
        let start = Instant::now();
        let err = wait_for(
            || None::<()>,
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .await
        .unwrap_err();

        assert_eq!(err, WaitTimeout(Duration::from_millis(500)));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_fails_after_single_probe() {
        let calls = Cell::new(0u32);
        let result = wait_for(
            || {
                calls.set(calls.get() + 1);
                None::<()>
            },
            Duration::from_millis(200),
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
