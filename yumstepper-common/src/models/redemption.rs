use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit row for a redemption. Also the event log the monthly
/// redemption cap counts against.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Redemption {
    pub redemption_id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub user_reward_id: Option<Uuid>,
    pub points_spent: i64,
    pub redemption_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedemptionHistoryRow {
    pub redemption_id: Uuid,
    pub points_spent: i64,
    pub redemption_date: DateTime<Utc>,
    pub reward_details: Option<String>,
}
