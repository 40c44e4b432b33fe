// File: yumstepper-core/src/repositories/postgres/user_rewards.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use crate::models::{GrantStatus, QuotaWindow, RedeemReceipt, Redemption, Reward, UserReward};
use crate::quota;
use crate::repositories::postgres::user::{adjust_balance, lock_user_balance};
use yumstepper_common::traits::repository_traits::UserRewardRepository;

fn grant_from_row(r: &PgRow) -> Result<UserReward, Error> {
    Ok(UserReward {
        user_reward_id: r.try_get("user_reward_id")?,
        user_id: r.try_get("user_id")?,
        reward_id: r.try_get("reward_id")?,
        status: GrantStatus::from_redeemed(r.try_get("redeemed")?),
        redeemed_at: r.try_get("redeemed_at")?,
        created_at: r.try_get("created_at")?,
    })
}

/// Reward columns selected alongside a grant.
fn reward_from_grant_row(r: &PgRow, reward_id: Uuid) -> Result<Reward, Error> {
    Ok(Reward {
        reward_id,
        restaurant_id: r.try_get("restaurant_id")?,
        details: r.try_get("details")?,
        points_required: r.try_get("points_required")?,
        expiration_date: r.try_get("expiration_date")?,
        qr_code: r.try_get("qr_code")?,
        date_generated: r.try_get("date_generated")?,
    })
}

/// Owns every write to `user_rewards`, and the only writer of `redemptions`.
pub struct PostgresUserRewardRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUserRewardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRewardRepository for PostgresUserRewardRepository {
    async fn grant(&self, grant: &UserReward) -> Result<UserReward, Error> {
        let mut tx = self.pool.begin().await?;

        let reward_live: Option<bool> = sqlx::query_scalar(
            "SELECT TRUE FROM rewards WHERE reward_id = $1 AND deleted = FALSE",
        )
            .bind(grant.reward_id)
            .fetch_optional(&mut *tx)
            .await?;
        if reward_live.is_none() {
            return Err(Error::NotFound(format!("reward {}", grant.reward_id)));
        }

        let user_exists: Option<bool> = sqlx::query_scalar("SELECT TRUE FROM users WHERE user_id = $1")
            .bind(grant.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if user_exists.is_none() {
            return Err(Error::NotFound(format!("user {}", grant.user_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO user_rewards (
                user_reward_id, user_id, reward_id, redeemed, redeemed_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, reward_id) DO NOTHING
            "#,
        )
            .bind(grant.user_reward_id)
            .bind(grant.user_id)
            .bind(grant.reward_id)
            .bind(grant.status.is_redeemed())
            .bind(grant.redeemed_at)
            .bind(grant.created_at)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            SELECT user_reward_id, user_id, reward_id, redeemed, redeemed_at, created_at
            FROM user_rewards
            WHERE user_id = $1 AND reward_id = $2
            "#,
        )
            .bind(grant.user_id)
            .bind(grant.reward_id)
            .fetch_one(&mut *tx)
            .await?;
        let stored = grant_from_row(&row)?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<Option<UserReward>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT user_reward_id, user_id, reward_id, redeemed, redeemed_at, created_at
            FROM user_rewards
            WHERE user_reward_id = $1 AND user_id = $2
            "#,
        )
            .bind(user_reward_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(grant_from_row(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_grants_for_user(&self, user_id: Uuid) -> Result<Vec<UserReward>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_reward_id, user_id, reward_id, redeemed, redeemed_at, created_at
            FROM user_rewards
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(grant_from_row).collect()
    }

    async fn redeem(
        &self,
        user_id: Uuid,
        user_reward_id: Uuid,
        now: DateTime<Utc>,
        window: &QuotaWindow,
    ) -> Result<RedeemReceipt, Error> {
        let mut tx = self.pool.begin().await?;

        let balance = lock_user_balance(&mut *tx, user_id).await?;

        let row = sqlx::query(
            r#"
            SELECT ur.user_reward_id,
                   ur.user_id,
                   ur.reward_id,
                   ur.redeemed,
                   ur.redeemed_at,
                   ur.created_at,
                   r.restaurant_id,
                   r.details,
                   r.points_required,
                   r.expiration_date,
                   r.qr_code,
                   r.date_generated
            FROM user_rewards ur
            JOIN rewards r ON ur.reward_id = r.reward_id
            WHERE ur.user_reward_id = $1
              AND ur.user_id = $2
              AND r.deleted = FALSE
            FOR UPDATE OF ur
            "#,
        )
            .bind(user_reward_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("reward grant {}", user_reward_id)))?;

        let mut grant = grant_from_row(&row)?;
        let reward = reward_from_grant_row(&row, grant.reward_id)?;
        let points_required = reward.points_required;

        let next_status = grant.status.redeem(grant.user_reward_id)?;

        if reward.is_expired_at(now) {
            return Err(Error::Expired(reward.reward_id));
        }

        quota::enforce_monthly_redemption_cap(&mut *tx, user_id, grant.reward_id, window).await?;

        if balance < points_required {
            return Err(Error::InsufficientPoints {
                required: points_required,
                available: balance,
            });
        }

        sqlx::query(
            r#"
            UPDATE user_rewards
            SET redeemed = TRUE, redeemed_at = $1
            WHERE user_reward_id = $2
            "#,
        )
            .bind(now)
            .bind(grant.user_reward_id)
            .execute(&mut *tx)
            .await?;
        grant.status = next_status;
        grant.redeemed_at = Some(now);

        let new_balance = adjust_balance(&mut *tx, user_id, -points_required).await?;

        let redemption = Redemption {
            redemption_id: Uuid::new_v4(),
            user_id,
            reward_id: grant.reward_id,
            user_reward_id: Some(grant.user_reward_id),
            points_spent: points_required,
            redemption_date: now,
        };
        sqlx::query(
            r#"
            INSERT INTO redemptions (
                redemption_id, user_id, reward_id, user_reward_id,
                points_spent, redemption_date, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            "#,
        )
            .bind(redemption.redemption_id)
            .bind(redemption.user_id)
            .bind(redemption.reward_id)
            .bind(redemption.user_reward_id)
            .bind(redemption.points_spent)
            .bind(redemption.redemption_date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "grant {} redeemed by user {} for {} points (balance={})",
            grant.user_reward_id, user_id, points_required, new_balance
        );
        Ok(RedeemReceipt {
            grant,
            redemption,
            qr_code: reward.qr_code,
            new_balance,
        })
    }

    async fn delete_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query("DELETE FROM user_rewards WHERE user_reward_id = $1 AND user_id = $2")
            .bind(user_reward_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
