// src/repositories/postgres/mod.rs

pub mod user;
pub mod restaurants;
pub mod steps;
pub mod checkins;
pub mod rewards;
pub mod user_rewards;
pub mod redemptions;
pub mod history;

pub use user::PostgresUserRepository;
pub use restaurants::PostgresRestaurantRepository;
pub use steps::PostgresStepRepository;
pub use checkins::PostgresCheckinRepository;
pub use rewards::PostgresRewardRepository;
pub use user_rewards::PostgresUserRewardRepository;
pub use redemptions::PostgresRedemptionRepository;
pub use history::PostgresHistoryRepository;
