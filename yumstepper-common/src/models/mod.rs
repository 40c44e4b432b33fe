// File: yumstepper-common/src/models/mod.rs
pub mod user;
pub mod restaurant;
pub mod step;
pub mod checkin;
pub mod reward;
pub mod redemption;
pub mod quota;
pub mod history;

pub use user::{NewUser, ProfileUpdate, User};
pub use restaurant::Restaurant;
pub use step::StepEntry;
pub use checkin::{Checkin, CheckinHistoryRow, CheckinStatus, NewCheckin, SweepReport};
pub use reward::{GrantStatus, NewReward, RedeemReceipt, Reward, RewardUpdate, UserReward};
pub use redemption::{Redemption, RedemptionHistoryRow};
pub use quota::QuotaWindow;
pub use history::{HistoryEntry, HistorySource};
