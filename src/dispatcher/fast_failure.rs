use std::time::Duration;
use tokio::time::Instant;

/// Debounces tight crash loops against a failing engine.
///
/// Two loop-level errors less than `window` apart trigger a `backoff` sleep. The
/// last-error timestamp moves on every error, whether or not backoff was triggered.
#[derive(Debug, Clone)]
pub struct FastFailureDetector {
    window: Duration,
    backoff: Duration,
    last_error: Option<Instant>,
}

impl FastFailureDetector {
    pub fn new(window: Duration, backoff: Duration) -> Self {
        Self {
            window,
            backoff,
            last_error: None,
        }
    }

    /// Record an error at `now`; returns the backoff to apply, if any
    pub fn record_error(&mut self, now: Instant) -> Option<Duration> {
        let backoff = self
            .last_error
            .map(|previous| now.saturating_duration_since(previous))
            .filter(|elapsed| *elapsed < self.window)
            .map(|_| self.backoff);
        self.last_error = Some(now);
        backoff
    }

    pub fn last_error(&self) -> Option<Instant> {
        self.last_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> FastFailureDetector {
        FastFailureDetector::new(Duration::from_millis(1_000), Duration::from_secs(10))
    }

    #[test]
    fn first_error_never_backs_off() {
        assert_eq!(detector().record_error(Instant::now()), None);
    }

    #[test]
    fn errors_400ms_apart_back_off() {
        let mut detector = detector();
        let start = Instant::now();

        detector.record_error(start);

        assert_eq!(
            detector.record_error(start + Duration::from_millis(400)),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn errors_5s_apart_do_not_back_off() {
        let mut detector = detector();
        let start = Instant::now();

        detector.record_error(start);

        assert_eq!(detector.record_error(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn timestamp_moves_on_every_error() {
        let mut detector = detector();
        let start = Instant::now();

        detector.record_error(start);
        assert!(detector.record_error(start + Duration::from_millis(500)).is_some());
        // measured from the second error, not the first
        assert!(detector.record_error(start + Duration::from_millis(1_400)).is_some());
        assert!(detector.record_error(start + Duration::from_millis(3_000)).is_none());
        assert_eq!(detector.last_error(), Some(start + Duration::from_millis(3_000)));
    }
}
