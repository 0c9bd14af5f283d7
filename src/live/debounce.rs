use std::time::Duration;

use tokio::time::Instant;

use crate::transport::Notification;

/// Default window when a region sets no `debounce` attribute.
pub const DEFAULT_DEBOUNCE_MS: u64 = 20;

/// Trailing-edge debouncer: only handles timing and coalescing.
///
/// Notifications arriving within the window are merged into one; the merged
/// notification becomes ready once the window passes without a new arrival.
pub(crate) struct Debouncer {
    window: Duration,
    pending: Option<Notification>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_event: None,
        }
    }

    pub(crate) fn add(&mut self, notification: Notification) {
        match &mut self.pending {
            Some(pending) => pending.merge(notification),
            None => self.pending = Some(notification),
        }
        self.last_event = Some(Instant::now());
    }

    pub(crate) fn take_if_ready(&mut self) -> Option<Notification> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.pending.take()
    }

    pub(crate) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= self.window && self.pending.is_some()
    }

    /// Precise sleep duration until next possible ready time.
    pub(crate) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_debouncer_sleeps_long() {
        let debouncer = Debouncer::new(Duration::from_millis(20));
        assert!(!debouncer.is_ready());
        assert_eq!(debouncer.sleep_duration(), Duration::from_secs(86400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_quiet_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(20));
        debouncer.add(Notification::new("a"));
        assert!(debouncer.take_if_ready().is_none());

        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(debouncer.take_if_ready(), Some(Notification::new("a")));
        assert!(debouncer.take_if_ready().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_restarts_window_and_merges() {
        let mut debouncer = Debouncer::new(Duration::from_millis(20));
        debouncer.add(Notification::new("a").with_changed(["title"]));
        tokio::time::advance(Duration::from_millis(15)).await;
        debouncer.add(Notification::new("a").with_changed(["body"]));
        tokio::time::advance(Duration::from_millis(15)).await;

        assert!(!debouncer.is_ready());
        assert_eq!(debouncer.sleep_duration(), Duration::from_millis(5));

        tokio::time::advance(Duration::from_millis(5)).await;
        let merged = debouncer.take_if_ready().unwrap();
        assert_eq!(merged.changed, Some(vec!["title".to_string(), "body".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_window_is_immediate() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add(Notification::new("a"));
        assert!(debouncer.is_ready());
    }
}
