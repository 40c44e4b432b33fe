use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Checkin, CheckinHistoryRow, ProfileUpdate, QuotaWindow, RedeemReceipt, Redemption,
    RedemptionHistoryRow, Restaurant, Reward, StepEntry, User, UserReward,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), Error>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn list_users(&self) -> Result<Vec<User>, Error>;

    /// Changes username/email only. Returns `None` if the user does not exist.
    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<User>, Error>;

    async fn get_balance(&self, user_id: Uuid) -> Result<Option<i64>, Error>;
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn create_restaurant(&self, restaurant: &Restaurant) -> Result<(), Error>;
    async fn get_restaurant(&self, restaurant_id: Uuid) -> Result<Option<Restaurant>, Error>;
    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, Error>;
    async fn soft_delete_restaurant(&self, restaurant_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait StepRepository: Send + Sync {
    /// Inserts the entry and credits `entry.points_earned` to the user in one
    /// transaction. Returns the user's new balance.
    async fn insert_with_accrual(&self, entry: &StepEntry) -> Result<i64, Error>;

    async fn get_step(&self, user_id: Uuid, step_id: Uuid) -> Result<Option<StepEntry>, Error>;
    async fn list_steps(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error>;
    async fn soft_delete_step(&self, user_id: Uuid, step_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait CheckinRepository: Send + Sync {
    /// Inserts a pending check-in unless the user already has `window.limit`
    /// check-ins at that restaurant since `window.since`. The count and the
    /// insert share one transaction.
    async fn insert_checkin_guarded(&self, checkin: &Checkin, window: &QuotaWindow) -> Result<(), Error>;

    async fn count_checkins_since(
        &self,
        user_id: Uuid,
        restaurant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, Error>;

    async fn get_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<Option<Checkin>, Error>;
    async fn list_checkins(&self, user_id: Uuid) -> Result<Vec<Checkin>, Error>;
    async fn list_pending(&self, user_id: Uuid) -> Result<Vec<Checkin>, Error>;

    /// Applies the check-in's points to its user and marks it processed.
    /// Returns the points credited, or `None` when it was already processed.
    async fn credit_checkin(&self, checkin_id: Uuid) -> Result<Option<i64>, Error>;

    async fn soft_delete_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait RewardRepository: Send + Sync {
    async fn create_reward(&self, reward: &Reward) -> Result<(), Error>;
    async fn get_reward(&self, reward_id: Uuid) -> Result<Option<Reward>, Error>;
    async fn list_rewards(&self) -> Result<Vec<Reward>, Error>;
    async fn list_rewards_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Reward>, Error>;
    async fn update_reward(&self, reward: &Reward) -> Result<bool, Error>;
    async fn soft_delete_reward(&self, reward_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait UserRewardRepository: Send + Sync {
    /// Inserts the grant, or returns the one that already exists for the
    /// same (user, reward) pair.
    async fn grant(&self, grant: &UserReward) -> Result<UserReward, Error>;

    async fn get_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<Option<UserReward>, Error>;
    async fn list_grants_for_user(&self, user_id: Uuid) -> Result<Vec<UserReward>, Error>;

    /// Runs the whole redemption (checks, debit, grant transition, audit
    /// row) in one transaction.
    async fn redeem(
        &self,
        user_id: Uuid,
        user_reward_id: Uuid,
        now: DateTime<Utc>,
        window: &QuotaWindow,
    ) -> Result<RedeemReceipt, Error>;

    async fn delete_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait RedemptionRepository: Send + Sync {
    async fn get_redemption(&self, redemption_id: Uuid) -> Result<Option<Redemption>, Error>;
    async fn list_redemptions_for_user(&self, user_id: Uuid) -> Result<Vec<Redemption>, Error>;
    async fn soft_delete_redemption(&self, redemption_id: Uuid) -> Result<bool, Error>;
    async fn count_in_window(&self, user_id: Uuid, reward_id: Uuid, since: DateTime<Utc>) -> Result<i64, Error>;
}

/// Per-source reads backing the point history feed.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn step_rows(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error>;
    async fn checkin_rows(&self, user_id: Uuid) -> Result<Vec<CheckinHistoryRow>, Error>;
    async fn redemption_rows(&self, user_id: Uuid) -> Result<Vec<RedemptionHistoryRow>, Error>;
}
