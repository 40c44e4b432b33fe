use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One day of walking for a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StepEntry {
    pub step_id: Uuid,
    pub user_id: Uuid,
    pub step_count: i64,
    pub date: NaiveDate,
    pub points_earned: i64,
    pub created_at: DateTime<Utc>,
}
