// File: yumstepper-core/src/repositories/postgres/checkins.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use crate::models::{Checkin, CheckinStatus, QuotaWindow};
use crate::quota;
use crate::repositories::postgres::user::{adjust_balance, lock_user_balance};
use yumstepper_common::traits::repository_traits::CheckinRepository;

const CHECKIN_COLUMNS: &str = r#"
    checkin_id, user_id, restaurant_id, latitude, longitude, receipt_image,
    check_in_points, multiplier_points, completion_reward_points,
    points_earned, processed, created_at
"#;

fn checkin_from_row(r: &PgRow) -> Result<Checkin, Error> {
    Ok(Checkin {
        checkin_id: r.try_get("checkin_id")?,
        user_id: r.try_get("user_id")?,
        restaurant_id: r.try_get("restaurant_id")?,
        latitude: r.try_get("latitude")?,
        longitude: r.try_get("longitude")?,
        receipt_image: r.try_get("receipt_image")?,
        check_in_points: r.try_get("check_in_points")?,
        multiplier_points: r.try_get("multiplier_points")?,
        completion_reward_points: r.try_get("completion_reward_points")?,
        points_earned: r.try_get("points_earned")?,
        status: CheckinStatus::from_processed(r.try_get("processed")?),
        created_at: r.try_get("created_at")?,
    })
}

#[derive(Clone)]
pub struct PostgresCheckinRepository {
    pool: Pool<Postgres>,
}

impl PostgresCheckinRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckinRepository for PostgresCheckinRepository {
    async fn insert_checkin_guarded(&self, checkin: &Checkin, window: &QuotaWindow) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        lock_user_balance(&mut *tx, checkin.user_id).await?;

        let restaurant_live: Option<bool> = sqlx::query_scalar(
            "SELECT TRUE FROM restaurants WHERE restaurant_id = $1 AND deleted = FALSE",
        )
            .bind(checkin.restaurant_id)
            .fetch_optional(&mut *tx)
            .await?;
        if restaurant_live.is_none() {
            return Err(Error::NotFound(format!("restaurant {}", checkin.restaurant_id)));
        }

        quota::enforce_daily_checkin_cap(&mut *tx, checkin.user_id, checkin.restaurant_id, window).await?;

        sqlx::query(
            r#"
            INSERT INTO checkins (
                checkin_id, user_id, restaurant_id, latitude, longitude, receipt_image,
                check_in_points, multiplier_points, completion_reward_points,
                points_earned, processed, created_at, deleted
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,FALSE)
            "#,
        )
            .bind(checkin.checkin_id)
            .bind(checkin.user_id)
            .bind(checkin.restaurant_id)
            .bind(checkin.latitude)
            .bind(checkin.longitude)
            .bind(&checkin.receipt_image)
            .bind(checkin.check_in_points)
            .bind(checkin.multiplier_points)
            .bind(checkin.completion_reward_points)
            .bind(checkin.points_earned)
            .bind(checkin.status.is_processed())
            .bind(checkin.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn count_checkins_since(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;
        quota::count_checkins_since(&mut *conn, user_id, restaurant_id, since).await
    }

    async fn get_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<Option<Checkin>, Error> {
        let sql = format!(
            "SELECT {} FROM checkins WHERE checkin_id = $1 AND user_id = $2 AND deleted = FALSE",
            CHECKIN_COLUMNS
        );
        let row_opt = sqlx::query(&sql)
            .bind(checkin_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(checkin_from_row(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_checkins(&self, user_id: Uuid) -> Result<Vec<Checkin>, Error> {
        let sql = format!(
            "SELECT {} FROM checkins WHERE user_id = $1 AND deleted = FALSE ORDER BY created_at DESC",
            CHECKIN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(checkin_from_row).collect()
    }

    async fn list_pending(&self, user_id: Uuid) -> Result<Vec<Checkin>, Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM checkins
            WHERE user_id = $1 AND processed = FALSE AND deleted = FALSE
            ORDER BY created_at ASC
            "#,
            CHECKIN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(checkin_from_row).collect()
    }

    async fn credit_checkin(&self, checkin_id: Uuid) -> Result<Option<i64>, Error> {
        let mut tx = self.pool.begin().await?;

        // Owner first, so the user row is always locked before the check-in row.
        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM checkins WHERE checkin_id = $1 AND deleted = FALSE",
        )
            .bind(checkin_id)
            .fetch_optional(&mut *tx)
            .await?;
        let user_id = owner.ok_or_else(|| Error::NotFound(format!("check-in {}", checkin_id)))?;

        lock_user_balance(&mut *tx, user_id).await?;

        let row = sqlx::query(
            r#"
            SELECT points_earned, processed
            FROM checkins
            WHERE checkin_id = $1 AND deleted = FALSE
            FOR UPDATE
            "#,
        )
            .bind(checkin_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("check-in {}", checkin_id)))?;

        let status = CheckinStatus::from_processed(row.try_get("processed")?);
        if status.is_processed() {
            debug!("check-in {} already processed; nothing to credit", checkin_id);
            return Ok(None);
        }
        let points: i64 = row.try_get("points_earned")?;

        adjust_balance(&mut *tx, user_id, points).await?;
        sqlx::query("UPDATE checkins SET processed = TRUE WHERE checkin_id = $1")
            .bind(checkin_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(points))
    }

    async fn soft_delete_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query(
            r#"
            UPDATE checkins
            SET deleted = TRUE
            WHERE checkin_id = $1 AND user_id = $2 AND deleted = FALSE
            "#,
        )
            .bind(checkin_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
