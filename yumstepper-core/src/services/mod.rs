// File: yumstepper-core/src/services/mod.rs

pub mod accrual_service;
pub mod redemption_service;
pub mod history_service;
pub mod reward_service;
pub mod user_service;

pub use accrual_service::{AccrualService, StepReceipt, points_for_steps};
pub use redemption_service::RedemptionService;
pub use history_service::{HistoryService, merge_history};
pub use reward_service::RewardService;
pub use user_service::UserService;

use std::sync::Arc;

use crate::Database;
use crate::repositories::postgres::{
    PostgresCheckinRepository,
    PostgresHistoryRepository,
    PostgresRedemptionRepository,
    PostgresRestaurantRepository,
    PostgresRewardRepository,
    PostgresStepRepository,
    PostgresUserRepository,
    PostgresUserRewardRepository,
};

/// All ledger services wired against one Postgres pool.
#[derive(Clone)]
pub struct LedgerServices {
    pub users: Arc<UserService>,
    pub accrual: Arc<AccrualService>,
    pub redemption: Arc<RedemptionService>,
    pub rewards: Arc<RewardService>,
    pub history: Arc<HistoryService>,
}

impl LedgerServices {
    pub fn new(db: &Database) -> Self {
        let pool = db.pool().clone();

        let restaurants = Arc::new(PostgresRestaurantRepository::new(pool.clone()));

        Self {
            users: Arc::new(UserService::new(Arc::new(PostgresUserRepository::new(pool.clone())))),
            accrual: Arc::new(AccrualService::new(
                Arc::new(PostgresStepRepository::new(pool.clone())),
                Arc::new(PostgresCheckinRepository::new(pool.clone())),
            )),
            redemption: Arc::new(RedemptionService::new(
                Arc::new(PostgresUserRewardRepository::new(pool.clone())),
                Arc::new(PostgresRedemptionRepository::new(pool.clone())),
            )),
            rewards: Arc::new(RewardService::new(
                Arc::new(PostgresRewardRepository::new(pool.clone())),
                restaurants,
            )),
            history: Arc::new(HistoryService::new(Arc::new(PostgresHistoryRepository::new(pool)))),
        }
    }
}
