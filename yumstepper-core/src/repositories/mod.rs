// src/repositories/mod.rs

pub use yumstepper_common::traits::repository_traits::{
    CheckinRepository,
    HistoryRepository,
    RedemptionRepository,
    RestaurantRepository,
    RewardRepository,
    StepRepository,
    UserRepository,
    UserRewardRepository,
};

pub use postgres::{
    PostgresCheckinRepository,
    PostgresHistoryRepository,
    PostgresRedemptionRepository,
    PostgresRestaurantRepository,
    PostgresRewardRepository,
    PostgresStepRepository,
    PostgresUserRepository,
    PostgresUserRewardRepository,
};

pub mod postgres;
