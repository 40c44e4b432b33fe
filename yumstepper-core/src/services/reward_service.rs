use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::Error;
use crate::models::{NewReward, Restaurant, Reward, RewardUpdate};
use yumstepper_common::traits::repository_traits::{RestaurantRepository, RewardRepository};

const MIN_DETAILS_LEN: usize = 3;

/// Reward catalogue maintained by restaurants.
pub struct RewardService {
    rewards: Arc<dyn RewardRepository + Send + Sync>,
    restaurants: Arc<dyn RestaurantRepository + Send + Sync>,
}

impl RewardService {
    pub fn new(
        rewards: Arc<dyn RewardRepository + Send + Sync>,
        restaurants: Arc<dyn RestaurantRepository + Send + Sync>,
    ) -> Self {
        Self { rewards, restaurants }
    }

    pub async fn add_restaurant(&self, name: &str, address: Option<&str>) -> Result<Restaurant, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("restaurant name is required".to_string()));
        }
        let restaurant = Restaurant::new(name, address);
        self.restaurants.create_restaurant(&restaurant).await?;
        info!("Added restaurant {} ('{}')", restaurant.restaurant_id, restaurant.name);
        Ok(restaurant)
    }

    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>, Error> {
        self.restaurants.list_restaurants().await
    }

    /// Soft delete. Past check-ins keep naming it in history.
    pub async fn remove_restaurant(&self, restaurant_id: Uuid) -> Result<(), Error> {
        if self.restaurants.soft_delete_restaurant(restaurant_id).await? {
            info!("Removed restaurant {}", restaurant_id);
            Ok(())
        } else {
            Err(Error::NotFound(format!("restaurant {}", restaurant_id)))
        }
    }

    pub async fn create_reward(&self, new_reward: NewReward) -> Result<Reward, Error> {
        let now = Utc::now();
        validate_terms(&new_reward.details, new_reward.points_required, new_reward.expiration_date, now)?;

        if self.restaurants.get_restaurant(new_reward.restaurant_id).await?.is_none() {
            return Err(Error::NotFound(format!("restaurant {}", new_reward.restaurant_id)));
        }

        let reward_id = Uuid::new_v4();
        let qr_code = match new_reward.qr_code {
            Some(code) => code,
            None => default_qr_payload(
                reward_id,
                new_reward.restaurant_id,
                &new_reward.details,
                new_reward.points_required,
                new_reward.expiration_date,
            )?,
        };

        let reward = Reward {
            reward_id,
            restaurant_id: new_reward.restaurant_id,
            details: new_reward.details,
            points_required: new_reward.points_required,
            expiration_date: new_reward.expiration_date,
            qr_code,
            date_generated: now,
        };
        self.rewards.create_reward(&reward).await?;

        info!("Created reward {} ({} points) for restaurant {}", reward.reward_id, reward.points_required, reward.restaurant_id);
        Ok(reward)
    }

    pub async fn update_reward(&self, reward_id: Uuid, update: RewardUpdate) -> Result<Reward, Error> {
        let mut reward = self.get_reward(reward_id).await?;

        if let Some(details) = update.details {
            reward.details = details;
        }
        if let Some(points) = update.points_required {
            reward.points_required = points;
        }
        if let Some(expiration) = update.expiration_date {
            reward.expiration_date = expiration;
        }
        validate_terms(&reward.details, reward.points_required, reward.expiration_date, Utc::now())?;

        reward.qr_code = match update.qr_code {
            Some(code) => code,
            None => default_qr_payload(
                reward.reward_id,
                reward.restaurant_id,
                &reward.details,
                reward.points_required,
                reward.expiration_date,
            )?,
        };

        if !self.rewards.update_reward(&reward).await? {
            return Err(Error::NotFound(format!("reward {}", reward_id)));
        }
        Ok(reward)
    }

    pub async fn get_reward(&self, reward_id: Uuid) -> Result<Reward, Error> {
        self.rewards
            .get_reward(reward_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("reward {}", reward_id)))
    }

    pub async fn list_rewards(&self) -> Result<Vec<Reward>, Error> {
        self.rewards.list_rewards().await
    }

    pub async fn list_rewards_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Reward>, Error> {
        self.rewards.list_rewards_for_restaurant(restaurant_id).await
    }

    pub async fn delete_reward(&self, reward_id: Uuid) -> Result<(), Error> {
        if self.rewards.soft_delete_reward(reward_id).await? {
            info!("Deleted reward {}", reward_id);
            Ok(())
        } else {
            Err(Error::NotFound(format!("reward {}", reward_id)))
        }
    }
}

fn validate_terms(
    details: &str,
    points_required: i64,
    expiration_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    if details.trim().chars().count() < MIN_DETAILS_LEN {
        return Err(Error::InvalidInput(format!(
            "reward details must be at least {} characters",
            MIN_DETAILS_LEN
        )));
    }
    if points_required <= 0 {
        return Err(Error::InvalidInput("points_required must be positive".to_string()));
    }
    if expiration_date <= now {
        return Err(Error::InvalidInput("expiration_date must be in the future".to_string()));
    }
    Ok(())
}

/// What a front end encodes in the QR image when the caller supplies none.
fn default_qr_payload(
    reward_id: Uuid,
    restaurant_id: Uuid,
    details: &str,
    points_required: i64,
    expiration_date: DateTime<Utc>,
) -> Result<String, Error> {
    let payload = json!({
        "reward_id": reward_id,
        "restaurant_id": restaurant_id,
        "details": details,
        "points_required": points_required,
        "expiration_date": expiration_date,
    });
    Ok(serde_json::to_string(&payload)?)
}
