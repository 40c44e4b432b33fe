use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Whether a check-in's points have reached the user's balance yet.
/// Stored as the `processed` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinStatus {
    Pending,
    Processed,
}

impl CheckinStatus {
    pub fn from_processed(processed: bool) -> Self {
        if processed {
            CheckinStatus::Processed
        } else {
            CheckinStatus::Pending
        }
    }

    pub fn is_processed(self) -> bool {
        self == CheckinStatus::Processed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkin {
    pub checkin_id: Uuid,
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub receipt_image: Option<String>,
    pub check_in_points: i64,
    pub multiplier_points: i64,
    pub completion_reward_points: i64,
    pub points_earned: i64,
    pub status: CheckinStatus,
    pub created_at: DateTime<Utc>,
}

/// Check-in as submitted by the creation path. The point components are
/// already scored (distance, streaks) by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckin {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub receipt_image: Option<String>,
    pub check_in_points: i64,
    pub multiplier_points: i64,
    pub completion_reward_points: i64,
}

impl NewCheckin {
    /// Sum of the components; `None` on overflow.
    pub fn total_points(&self) -> Option<i64> {
        self.check_in_points
            .checked_add(self.multiplier_points)?
            .checked_add(self.completion_reward_points)
    }

    /// Builds the pending row to insert.
    pub fn into_pending(self, now: DateTime<Utc>) -> Result<Checkin, Error> {
        let points_earned = self
            .total_points()
            .ok_or_else(|| Error::InvalidInput("check-in points overflow".to_string()))?;
        Ok(Checkin {
            checkin_id: Uuid::new_v4(),
            user_id: self.user_id,
            restaurant_id: self.restaurant_id,
            latitude: self.latitude,
            longitude: self.longitude,
            receipt_image: self.receipt_image,
            check_in_points: self.check_in_points,
            multiplier_points: self.multiplier_points,
            completion_reward_points: self.completion_reward_points,
            points_earned,
            status: CheckinStatus::Pending,
            created_at: now,
        })
    }
}

/// Check-in projection used by the point history feed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckinHistoryRow {
    pub checkin_id: Uuid,
    pub points_earned: i64,
    pub multiplier_points: i64,
    pub created_at: DateTime<Utc>,
    pub restaurant_name: Option<String>,
}

/// Outcome of one pending check-in sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub credited: usize,
    pub points_credited: i64,
}
