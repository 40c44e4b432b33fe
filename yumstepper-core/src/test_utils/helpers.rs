use chrono::{Duration, Utc};
use sqlx::{Connection, PgConnection, Pool, Postgres};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::Error;
use crate::db::Database;
use crate::models::{Restaurant, Reward, User};

const TEST_DB: &str = "yumstepper_test";

/// Create the test database if it does not exist yet.
pub async fn ensure_test_database_exists() -> Result<(), Error> {
    let admin_url = std::env::var("DATABASE_ADMIN_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/postgres".to_string());

    let mut conn = PgConnection::connect(&admin_url).await?;

    let create_db_sql = format!("CREATE DATABASE {TEST_DB};");
    match sqlx::query(&create_db_sql).execute(&mut conn).await {
        Ok(_) => println!("Created test DB '{TEST_DB}'."),
        // 42P04 => duplicate_database
        Err(e) if e.as_database_error().and_then(|d| d.code()).as_deref() == Some("42P04") => {}
        Err(e) => return Err(Error::Database(e)),
    }

    Ok(())
}

/// Pool on `TEST_DATABASE_URL`, else `postgres://postgres@localhost/yumstepper_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| format!("postgres://postgres@localhost/{TEST_DB}"));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await?;

    Ok(pool)
}

/// Wipes every ledger table. Not used by the default setup since tests in
/// one binary run in parallel against the same database.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(r#"
        TRUNCATE TABLE
            redemptions,
            user_rewards,
            rewards,
            checkins,
            steps,
            restaurants,
            users
        RESTART IDENTITY CASCADE;
    "#)
        .execute(pool)
        .await?;

    Ok(())
}

/// Returns a migrated test DB handle. Each test isolates itself by creating
/// its own users/restaurants through the fixtures below.
pub async fn setup_test_database() -> Result<Database, Error> {
    ensure_test_database_exists().await?;

    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;

    Ok(db)
}

/// Inserts a user with a unique name and the given starting balance.
pub async fn create_test_user(pool: &Pool<Postgres>, balance: i64) -> Result<User, Error> {
    let tag = Uuid::new_v4().simple().to_string();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (user_id, username, email, password_hash, points_earned, created_at)
        VALUES ($1, $2, $3, 'x', $4, NOW())
        RETURNING user_id, username, email, password_hash, points_earned, created_at
        "#,
    )
        .bind(Uuid::new_v4())
        .bind(format!("walker_{tag}"))
        .bind(format!("walker_{tag}@example.com"))
        .bind(balance)
        .fetch_one(pool)
        .await?;

    Ok(user)
}

pub async fn create_test_restaurant(pool: &Pool<Postgres>, name: &str) -> Result<Restaurant, Error> {
    let restaurant = Restaurant::new(name, Some("1 Test Street"));
    sqlx::query(
        "INSERT INTO restaurants (restaurant_id, name, address, created_at) VALUES ($1, $2, $3, $4)",
    )
        .bind(restaurant.restaurant_id)
        .bind(&restaurant.name)
        .bind(&restaurant.address)
        .bind(restaurant.created_at)
        .execute(pool)
        .await?;

    Ok(restaurant)
}

/// Reward at `restaurant` costing `points`, expiring `days_valid` days from now
/// (negative for an already expired one).
pub async fn create_test_reward(
    pool: &Pool<Postgres>,
    restaurant_id: Uuid,
    points: i64,
    days_valid: i64,
) -> Result<Reward, Error> {
    let reward = Reward {
        reward_id: Uuid::new_v4(),
        restaurant_id,
        details: "Free side of fries".to_string(),
        points_required: points,
        expiration_date: Utc::now() + Duration::days(days_valid),
        qr_code: "test-qr".to_string(),
        date_generated: Utc::now(),
    };
    sqlx::query(
        r#"
        INSERT INTO rewards
            (reward_id, restaurant_id, details, points_required, expiration_date, qr_code, date_generated)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
        .bind(reward.reward_id)
        .bind(reward.restaurant_id)
        .bind(&reward.details)
        .bind(reward.points_required)
        .bind(reward.expiration_date)
        .bind(&reward.qr_code)
        .bind(reward.date_generated)
        .execute(pool)
        .await?;

    Ok(reward)
}
