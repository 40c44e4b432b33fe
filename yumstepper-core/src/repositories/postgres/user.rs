// src/repositories/postgres/user.rs

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::Error;
use crate::models::{ProfileUpdate, User};
use yumstepper_common::traits::repository_traits::UserRepository;

/// Locks the user's row for the rest of the transaction and returns the
/// current balance. Every balance-mutating transaction starts here.
pub(crate) async fn lock_user_balance(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, Error> {
    let balance: Option<i64> = sqlx::query_scalar(
        "SELECT points_earned FROM users WHERE user_id = $1 FOR UPDATE",
    )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    balance.ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
}

/// Relative balance change; never writes an absolute value. Returns the new
/// balance.
pub(crate) async fn adjust_balance(conn: &mut PgConnection, user_id: Uuid, delta: i64) -> Result<i64, Error> {
    let balance: i64 = sqlx::query_scalar(
        r#"
        UPDATE users
        SET points_earned = points_earned + $1
        WHERE user_id = $2
        RETURNING points_earned
        "#,
    )
        .bind(delta)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(balance)
}

pub struct PostgresUserRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (
                user_id, username, email, password_hash, points_earned, created_at
            )
            VALUES ($1, $2, $3, $4, 0, $5)
            "#,
        )
            .bind(user.user_id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await;

        match res.map_err(Error::from) {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(Error::InvalidInput(
                "username or email already exists".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, points_earned, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, points_earned, created_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, points_earned, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<User>, Error> {
        let res = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($1, username),
                email = COALESCE($2, email)
            WHERE user_id = $3
            RETURNING user_id, username, email, password_hash, points_earned, created_at
            "#,
        )
            .bind(&update.username)
            .bind(&update.email)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await;

        match res.map_err(Error::from) {
            Ok(user) => Ok(user),
            Err(e) if e.is_unique_violation() => Err(Error::InvalidInput(
                "username or email already exists".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn get_balance(&self, user_id: Uuid) -> Result<Option<i64>, Error> {
        let balance: Option<i64> = sqlx::query_scalar(
            "SELECT points_earned FROM users WHERE user_id = $1",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(balance)
    }
}
