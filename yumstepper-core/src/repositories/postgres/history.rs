use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::Error;
use crate::models::{CheckinHistoryRow, RedemptionHistoryRow, StepEntry};
use yumstepper_common::traits::repository_traits::HistoryRepository;

pub struct PostgresHistoryRepository {
    pool: Pool<Postgres>,
}

impl PostgresHistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PostgresHistoryRepository {
    async fn step_rows(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error> {
        let rows = sqlx::query_as::<_, StepEntry>(
            r#"
            SELECT step_id, user_id, step_count, date, points_earned, created_at
            FROM steps
            WHERE user_id = $1 AND deleted = FALSE
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn checkin_rows(&self, user_id: Uuid) -> Result<Vec<CheckinHistoryRow>, Error> {
        // LEFT JOIN: a soft-deleted restaurant still names past check-ins
        let rows = sqlx::query_as::<_, CheckinHistoryRow>(
            r#"
            SELECT c.checkin_id,
                   c.points_earned,
                   c.multiplier_points,
                   c.created_at,
                   r.name AS restaurant_name
            FROM checkins c
            LEFT JOIN restaurants r ON c.restaurant_id = r.restaurant_id
            WHERE c.user_id = $1 AND c.deleted = FALSE
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn redemption_rows(&self, user_id: Uuid) -> Result<Vec<RedemptionHistoryRow>, Error> {
        let rows = sqlx::query_as::<_, RedemptionHistoryRow>(
            r#"
            SELECT rd.redemption_id,
                   rd.points_spent,
                   rd.redemption_date,
                   rw.details AS reward_details
            FROM redemptions rd
            LEFT JOIN rewards rw ON rd.reward_id = rw.reward_id
            WHERE rd.user_id = $1 AND rd.deleted = FALSE
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
