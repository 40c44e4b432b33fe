use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::Error;
use crate::models::Redemption;
use crate::quota;
use yumstepper_common::traits::repository_traits::RedemptionRepository;

/// Read side of the redemption audit log. Rows are written only by
/// `PostgresUserRewardRepository::redeem`.
#[derive(Clone)]
pub struct PostgresRedemptionRepository {
    pool: Pool<Postgres>,
}

impl PostgresRedemptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedemptionRepository for PostgresRedemptionRepository {
    async fn get_redemption(&self, redemption_id: Uuid) -> Result<Option<Redemption>, Error> {
        let row = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT redemption_id, user_id, reward_id, user_reward_id,
                   points_spent, redemption_date
            FROM redemptions
            WHERE redemption_id = $1 AND deleted = FALSE
            "#,
        )
            .bind(redemption_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_redemptions_for_user(&self, user_id: Uuid) -> Result<Vec<Redemption>, Error> {
        let rows = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT redemption_id, user_id, reward_id, user_reward_id,
                   points_spent, redemption_date
            FROM redemptions
            WHERE user_id = $1 AND deleted = FALSE
            ORDER BY redemption_date DESC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn soft_delete_redemption(&self, redemption_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query(
            "UPDATE redemptions SET deleted = TRUE WHERE redemption_id = $1 AND deleted = FALSE",
        )
            .bind(redemption_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_in_window(&self, user_id: Uuid, reward_id: Uuid, since: DateTime<Utc>) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;
        quota::count_redemptions_since(&mut *conn, user_id, reward_id, since).await
    }
}
