// File: yumstepper-core/src/repositories/postgres/steps.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use crate::models::StepEntry;
use crate::repositories::postgres::user::{adjust_balance, lock_user_balance};
use yumstepper_common::traits::repository_traits::StepRepository;

#[derive(Clone)]
pub struct PostgresStepRepository {
    pool: Pool<Postgres>,
}

impl PostgresStepRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepRepository for PostgresStepRepository {
    async fn insert_with_accrual(&self, entry: &StepEntry) -> Result<i64, Error> {
        let mut tx = self.pool.begin().await?;

        lock_user_balance(&mut *tx, entry.user_id).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO steps (
                step_id, user_id, step_count, date, points_earned, created_at, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            "#,
        )
            .bind(entry.step_id)
            .bind(entry.user_id)
            .bind(entry.step_count)
            .bind(entry.date)
            .bind(entry.points_earned)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await;

        match inserted.map_err(Error::from) {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(Error::InvalidInput(format!(
                    "steps for {} have already been recorded",
                    entry.date
                )));
            }
            Err(e) => return Err(e),
        }

        let new_balance = adjust_balance(&mut *tx, entry.user_id, entry.points_earned).await?;
        tx.commit().await?;

        debug!(
            "step entry {} credited {} points to user {} (balance={})",
            entry.step_id, entry.points_earned, entry.user_id, new_balance
        );
        Ok(new_balance)
    }

    async fn get_step(&self, user_id: Uuid, step_id: Uuid) -> Result<Option<StepEntry>, Error> {
        let row = sqlx::query_as::<_, StepEntry>(
            r#"
            SELECT step_id, user_id, step_count, date, points_earned, created_at
            FROM steps
            WHERE step_id = $1 AND user_id = $2 AND deleted = FALSE
            "#,
        )
            .bind(step_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_steps(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error> {
        let rows = sqlx::query_as::<_, StepEntry>(
            r#"
            SELECT step_id, user_id, step_count, date, points_earned, created_at
            FROM steps
            WHERE user_id = $1 AND deleted = FALSE
            ORDER BY date DESC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn soft_delete_step(&self, user_id: Uuid, step_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query(
            r#"
            UPDATE steps
            SET deleted = TRUE
            WHERE step_id = $1 AND user_id = $2 AND deleted = FALSE
            "#,
        )
            .bind(step_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
