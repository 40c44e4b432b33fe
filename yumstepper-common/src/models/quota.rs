use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-windowed count limit: at most `limit` events at or after `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaWindow {
    pub limit: i64,
    pub since: DateTime<Utc>,
}

impl QuotaWindow {
    pub fn new(limit: i64, since: DateTime<Utc>) -> Self {
        Self { limit, since }
    }

    /// Whether one more event fits given `count` already in the window.
    pub fn admits(&self, count: i64) -> bool {
        count < self.limit
    }
}
