use std::sync::Arc;
use chrono::{Local, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::Error;
use crate::models::{RedeemReceipt, Redemption, UserReward};
use crate::quota;
use yumstepper_common::traits::repository_traits::{RedemptionRepository, UserRewardRepository};

/// Grant -> redeem lifecycle of rewards, plus the redemption audit log.
pub struct RedemptionService {
    grants: Arc<dyn UserRewardRepository + Send + Sync>,
    redemptions: Arc<dyn RedemptionRepository + Send + Sync>,
}

impl RedemptionService {
    pub fn new(
        grants: Arc<dyn UserRewardRepository + Send + Sync>,
        redemptions: Arc<dyn RedemptionRepository + Send + Sync>,
    ) -> Self {
        Self { grants, redemptions }
    }

    /// Makes `reward_id` redeemable by the user. Granting twice returns the
    /// existing grant.
    pub async fn grant(&self, user_id: Uuid, reward_id: Uuid) -> Result<UserReward, Error> {
        let candidate = UserReward::new(user_id, reward_id);
        let stored = self.grants.grant(&candidate).await?;

        if stored.user_reward_id == candidate.user_reward_id {
            info!("Granted reward {} to user {}", reward_id, user_id);
        }
        Ok(stored)
    }

    /// Consumes the grant, debits the reward's price and writes the audit row,
    /// all or nothing. A second call for the same grant fails with
    /// `AlreadyRedeemed`.
    pub async fn redeem(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<RedeemReceipt, Error> {
        let window = quota::monthly_redemption_window(&Local::now());

        match self.grants.redeem(user_id, user_reward_id, Utc::now(), &window).await {
            Ok(receipt) => {
                info!(
                    "User {} redeemed grant {} for {} points (balance now {})",
                    user_id, user_reward_id, receipt.redemption.points_spent, receipt.new_balance
                );
                Ok(receipt)
            }
            Err(e) if e.is_expected() => {
                info!("Redemption of grant {} by user {} refused: {}", user_reward_id, user_id, e);
                Err(e)
            }
            Err(e) => {
                warn!("Redemption of grant {} by user {} failed: {}", user_reward_id, user_id, e);
                Err(e)
            }
        }
    }

    pub async fn get_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<UserReward, Error> {
        self.grants
            .get_grant(user_id, user_reward_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("reward grant {}", user_reward_id)))
    }

    pub async fn list_grants(&self, user_id: Uuid) -> Result<Vec<UserReward>, Error> {
        self.grants.list_grants_for_user(user_id).await
    }

    /// Administrative removal of a grant. Its redemption audit rows remain.
    pub async fn delete_grant(&self, user_id: Uuid, user_reward_id: Uuid) -> Result<(), Error> {
        if self.grants.delete_grant(user_id, user_reward_id).await? {
            info!("Deleted reward grant {} of user {}", user_reward_id, user_id);
            Ok(())
        } else {
            Err(Error::NotFound(format!("reward grant {}", user_reward_id)))
        }
    }

    pub async fn get_redemption(&self, redemption_id: Uuid) -> Result<Redemption, Error> {
        self.redemptions
            .get_redemption(redemption_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("redemption {}", redemption_id)))
    }

    pub async fn list_redemptions(&self, user_id: Uuid) -> Result<Vec<Redemption>, Error> {
        self.redemptions.list_redemptions_for_user(user_id).await
    }

    pub async fn delete_redemption(&self, redemption_id: Uuid) -> Result<(), Error> {
        if self.redemptions.soft_delete_redemption(redemption_id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("redemption {}", redemption_id)))
        }
    }

    /// How many more times the user may redeem `reward_id` this month.
    pub async fn remaining_this_month(&self, user_id: Uuid, reward_id: Uuid) -> Result<i64, Error> {
        let window = quota::monthly_redemption_window(&Local::now());
        let used = self.redemptions.count_in_window(user_id, reward_id, window.since).await?;
        Ok((window.limit - used).max(0))
    }
}
