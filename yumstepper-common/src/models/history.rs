use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Steps,
    Checkin,
    Redemption,
}

/// One line of a user's point history. Fields that do not apply to the
/// source are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: Uuid,
    pub source: HistorySource,
    /// Negative for redemptions.
    pub points_earned: i64,
    pub date: DateTime<Utc>,
    pub step_count: Option<i64>,
    pub restaurant_name: Option<String>,
    pub point_multiplier: Option<i64>,
    pub reward_details: Option<String>,
}
