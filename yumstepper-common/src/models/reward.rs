use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::redemption::Redemption;

/// A redeemable offer from a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reward {
    pub reward_id: Uuid,
    pub restaurant_id: Uuid,
    pub details: String,
    pub points_required: i64,
    pub expiration_date: DateTime<Utc>,
    /// Opaque payload a front end renders as a QR code.
    pub qr_code: String,
    pub date_generated: DateTime<Utc>,
}

impl Reward {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReward {
    pub restaurant_id: Uuid,
    pub details: String,
    pub points_required: i64,
    pub expiration_date: DateTime<Utc>,
    pub qr_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardUpdate {
    pub details: Option<String>,
    pub points_required: Option<i64>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub qr_code: Option<String>,
}

/// Lifecycle of a reward grant. `Redeemed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Granted,
    Redeemed,
}

impl GrantStatus {
    pub fn from_redeemed(redeemed: bool) -> Self {
        if redeemed {
            GrantStatus::Redeemed
        } else {
            GrantStatus::Granted
        }
    }

    pub fn is_redeemed(self) -> bool {
        self == GrantStatus::Redeemed
    }

    /// `Granted -> Redeemed`; anything else is rejected.
    pub fn redeem(self, user_reward_id: Uuid) -> Result<GrantStatus, Error> {
        match self {
            GrantStatus::Granted => Ok(GrantStatus::Redeemed),
            GrantStatus::Redeemed => Err(Error::AlreadyRedeemed(user_reward_id)),
        }
    }
}

/// A reward granted to a user (`user_rewards` row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReward {
    pub user_reward_id: Uuid,
    pub user_id: Uuid,
    pub reward_id: Uuid,
    pub status: GrantStatus,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserReward {
    pub fn new(user_id: Uuid, reward_id: Uuid) -> Self {
        Self {
            user_reward_id: Uuid::new_v4(),
            user_id,
            reward_id,
            status: GrantStatus::Granted,
            redeemed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Everything a caller needs after a successful redemption, including what
/// it takes to render the QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub grant: UserReward,
    pub redemption: Redemption,
    pub qr_code: String,
    pub new_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn grant_redeems_once() {
        let id = Uuid::new_v4();
        let status = GrantStatus::Granted.redeem(id).unwrap();
        assert_eq!(status, GrantStatus::Redeemed);

        match status.redeem(id) {
            Err(Error::AlreadyRedeemed(got)) => assert_eq!(got, id),
            other => panic!("expected AlreadyRedeemed, got {:?}", other),
        }
    }

    #[test]
    fn expiry_is_strictly_in_the_past() {
        let now = Utc::now();
        let reward = Reward {
            reward_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            details: "Free dumplings".to_string(),
            points_required: 100,
            expiration_date: now,
            qr_code: "{}".to_string(),
            date_generated: now - Duration::days(1),
        };
        assert!(!reward.is_expired_at(now));
        assert!(reward.is_expired_at(now + Duration::seconds(1)));
    }
}
