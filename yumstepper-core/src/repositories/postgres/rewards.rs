// File: yumstepper-core/src/repositories/postgres/rewards.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::Error;
use crate::models::Reward;
use yumstepper_common::traits::repository_traits::RewardRepository;

pub struct PostgresRewardRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRewardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardRepository for PostgresRewardRepository {
    async fn create_reward(&self, reward: &Reward) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO rewards (
                reward_id,
                restaurant_id,
                details,
                points_required,
                expiration_date,
                qr_code,
                date_generated,
                deleted
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,FALSE)
            "#,
        )
            .bind(reward.reward_id)
            .bind(reward.restaurant_id)
            .bind(&reward.details)
            .bind(reward.points_required)
            .bind(reward.expiration_date)
            .bind(&reward.qr_code)
            .bind(reward.date_generated)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_reward(&self, reward_id: Uuid) -> Result<Option<Reward>, Error> {
        let row = sqlx::query_as::<_, Reward>(
            r#"
            SELECT
                reward_id,
                restaurant_id,
                details,
                points_required,
                expiration_date,
                qr_code,
                date_generated
            FROM rewards
            WHERE reward_id = $1 AND deleted = FALSE
            "#,
        )
            .bind(reward_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_rewards(&self) -> Result<Vec<Reward>, Error> {
        let rows = sqlx::query_as::<_, Reward>(
            r#"
            SELECT
                reward_id,
                restaurant_id,
                details,
                points_required,
                expiration_date,
                qr_code,
                date_generated
            FROM rewards
            WHERE deleted = FALSE
            ORDER BY expiration_date ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_rewards_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Reward>, Error> {
        let rows = sqlx::query_as::<_, Reward>(
            r#"
            SELECT
                reward_id,
                restaurant_id,
                details,
                points_required,
                expiration_date,
                qr_code,
                date_generated
            FROM rewards
            WHERE restaurant_id = $1 AND deleted = FALSE
            ORDER BY expiration_date ASC
            "#,
        )
            .bind(restaurant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_reward(&self, reward: &Reward) -> Result<bool, Error> {
        let res = sqlx::query(
            r#"
            UPDATE rewards
            SET details = $1,
                points_required = $2,
                expiration_date = $3,
                qr_code = $4
            WHERE reward_id = $5 AND deleted = FALSE
            "#,
        )
            .bind(&reward.details)
            .bind(reward.points_required)
            .bind(reward.expiration_date)
            .bind(&reward.qr_code)
            .bind(reward.reward_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn soft_delete_reward(&self, reward_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query("UPDATE rewards SET deleted = TRUE WHERE reward_id = $1 AND deleted = FALSE")
            .bind(reward_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
