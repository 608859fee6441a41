use chrono::{DateTime, Duration, Utc};

/// Decides whether a stored record is still fresh enough to serve without a
/// provider refresh. The window is fixed at construction and shared by the
/// current-weather and forecast paths.
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    window: Duration,
}

impl StalenessPolicy {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs as i64),
        }
    }

    pub fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        self.is_fresh_at(cached_at, Utc::now())
    }

    /// Clock-injected form of `is_fresh`; a record aged exactly one window
    /// is already stale.
    pub fn is_fresh_at(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - cached_at < self.window
    }
}
