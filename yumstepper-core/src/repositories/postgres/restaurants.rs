// src/repositories/postgres/restaurants.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::Error;
use crate::models::Restaurant;
use yumstepper_common::traits::repository_traits::RestaurantRepository;

pub struct PostgresRestaurantRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRestaurantRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantRepository for PostgresRestaurantRepository {
    async fn create_restaurant(&self, restaurant: &Restaurant) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO restaurants (restaurant_id, name, address, created_at, deleted)
            VALUES ($1, $2, $3, $4, FALSE)
            "#,
        )
            .bind(restaurant.restaurant_id)
            .bind(&restaurant.name)
            .bind(&restaurant.address)
            .bind(restaurant.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_restaurant(&self, restaurant_id: Uuid) -> Result<Option<Restaurant>, Error> {
        let row = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT restaurant_id, name, address, created_at
            FROM restaurants
            WHERE restaurant_id = $1 AND deleted = FALSE
            "#,
        )
            .bind(restaurant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, Error> {
        let rows = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT restaurant_id, name, address, created_at
            FROM restaurants
            WHERE deleted = FALSE
            ORDER BY name ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn soft_delete_restaurant(&self, restaurant_id: Uuid) -> Result<bool, Error> {
        let res = sqlx::query(
            "UPDATE restaurants SET deleted = TRUE WHERE restaurant_id = $1 AND deleted = FALSE",
        )
            .bind(restaurant_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
