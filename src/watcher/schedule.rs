//! Periodic scan trigger, independent of filesystem events.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval_at};

use super::WatchError;
use crate::notifier::Notifier;

/// Longest accepted interval: one year.
pub const MAX_SCAN_INTERVAL_MINS: u64 = 365 * 24 * 60;

/// Calls the notifier once per interval, forever.
///
/// The first call happens one full interval after [`run`](Self::run) starts,
/// not immediately.
pub struct ScheduledTrigger {
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl ScheduledTrigger {
    /// Create a trigger firing every `interval`.
    ///
    /// The interval must be non-zero and at most [`MAX_SCAN_INTERVAL_MINS`].
    pub fn new(notifier: Arc<dyn Notifier>, interval: Duration) -> Result<Self, WatchError> {
        let max = Duration::from_secs(MAX_SCAN_INTERVAL_MINS * 60);
        if interval.is_zero() || interval > max {
            return Err(WatchError::InvalidInterval {
                minutes: interval.as_secs() / 60,
                max: MAX_SCAN_INTERVAL_MINS,
            });
        }
        Ok(Self { notifier, interval })
    }

    /// Build from a whole number of minutes.
    pub fn every_minutes(notifier: Arc<dyn Notifier>, minutes: u64) -> Result<Self, WatchError> {
        let secs = minutes
            .checked_mul(60)
            .ok_or(WatchError::InvalidInterval {
                minutes,
                max: MAX_SCAN_INTERVAL_MINS,
            })?;
        Self::new(notifier, Duration::from_secs(secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until the task is dropped or aborted.
    ///
    /// A failed request is logged and the schedule carries on.
    pub async fn run(self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = interval_at(start, self.interval);
        // A slow request delays the next tick rather than bunching them up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        crate::debug_event!(
            "schedule",
            "started",
            "every {}s",
            self.interval.as_secs()
        );

        loop {
            ticker.tick().await;
            crate::log_event!("schedule", "running scheduled scan");
            if let Err(e) = self.notifier.trigger_scan().await {
                tracing::error!("[schedule] scheduled scan failed: {e}");
            }
        }
    }
}

impl std::fmt::Debug for ScheduledTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTrigger")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::CountingNotifier;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_interval() {
        let notifier = Arc::new(CountingNotifier::default());
        let trigger = ScheduledTrigger::every_minutes(notifier.clone(), 1).unwrap();
        assert_eq!(trigger.interval(), Duration::from_secs(60));

        let handle = tokio::spawn(trigger.run());

        // Nothing at startup
        sleep(Duration::from_secs(59)).await;
        assert_eq!(notifier.calls(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.calls(), 1);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(notifier.calls(), 3);

        handle.abort();
    }

    #[test]
    fn test_out_of_range_intervals_are_rejected() {
        let notifier: Arc<dyn Notifier> = Arc::new(CountingNotifier::default());

        // Would overflow when converted to seconds
        let err = ScheduledTrigger::every_minutes(notifier.clone(), u64::MAX / 60 + 1).unwrap_err();
        assert!(matches!(err, WatchError::InvalidInterval { .. }));

        assert!(ScheduledTrigger::every_minutes(notifier.clone(), 0).is_err());
        assert!(
            ScheduledTrigger::every_minutes(notifier.clone(), MAX_SCAN_INTERVAL_MINS + 1).is_err()
        );
        assert!(ScheduledTrigger::new(notifier.clone(), Duration::MAX).is_err());

        let longest = ScheduledTrigger::every_minutes(notifier, MAX_SCAN_INTERVAL_MINS).unwrap();
        assert_eq!(
            longest.interval(),
            Duration::from_secs(MAX_SCAN_INTERVAL_MINS * 60)
        );
    }
}
