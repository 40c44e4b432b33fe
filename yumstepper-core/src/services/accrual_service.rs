use std::sync::Arc;
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Error;
use crate::models::{Checkin, NewCheckin, StepEntry, SweepReport};
use crate::quota;
use yumstepper_common::traits::repository_traits::{CheckinRepository, StepRepository};

pub const STEPS_PER_AWARD: i64 = 1000;
pub const POINTS_PER_AWARD: i64 = 10;

/// `floor(step_count / 1000) * 10`; zero for non-positive counts.
pub fn points_for_steps(step_count: i64) -> i64 {
    if step_count <= 0 {
        return 0;
    }
    (step_count / STEPS_PER_AWARD) * POINTS_PER_AWARD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReceipt {
    pub entry: StepEntry,
    pub new_balance: i64,
}

/// Turns walking and restaurant visits into balance credits.
pub struct AccrualService {
    steps: Arc<dyn StepRepository + Send + Sync>,
    checkins: Arc<dyn CheckinRepository + Send + Sync>,
}

impl AccrualService {
    pub fn new(
        steps: Arc<dyn StepRepository + Send + Sync>,
        checkins: Arc<dyn CheckinRepository + Send + Sync>,
    ) -> Self {
        Self { steps, checkins }
    }

    /// Records one day of steps and credits its points in the same
    /// transaction. `date` defaults to today (server-local).
    pub async fn record_steps(
        &self,
        user_id: Uuid,
        step_count: i64,
        date: Option<NaiveDate>,
    ) -> Result<StepReceipt, Error> {
        if step_count <= 0 {
            return Err(Error::InvalidInput(format!(
                "step_count must be positive, got {}",
                step_count
            )));
        }

        let entry = StepEntry {
            step_id: Uuid::new_v4(),
            user_id,
            step_count,
            date: date.unwrap_or_else(|| Local::now().date_naive()),
            points_earned: points_for_steps(step_count),
            created_at: Utc::now(),
        };

        let new_balance = self.steps.insert_with_accrual(&entry).await?;
        info!(
            "Recorded {} steps for user {} on {} => +{} points",
            step_count, user_id, entry.date, entry.points_earned
        );

        Ok(StepReceipt { entry, new_balance })
    }

    pub async fn list_steps(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error> {
        self.steps.list_steps(user_id).await
    }

    pub async fn get_step(&self, user_id: Uuid, step_id: Uuid) -> Result<StepEntry, Error> {
        self.steps
            .get_step(user_id, step_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("step entry {}", step_id)))
    }

    /// Hides the entry from history. Points already credited stay credited.
    pub async fn delete_step(&self, user_id: Uuid, step_id: Uuid) -> Result<(), Error> {
        if self.steps.soft_delete_step(user_id, step_id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("step entry {}", step_id)))
        }
    }

    /// Creates a pending check-in, subject to the daily per-restaurant cap.
    /// Points reach the balance through `process_pending_checkins`.
    pub async fn check_in(&self, new_checkin: NewCheckin) -> Result<Checkin, Error> {
        validate_checkin(&new_checkin)?;

        let window = quota::daily_checkin_window(&Local::now());
        let checkin = new_checkin.into_pending(Utc::now())?;

        match self.checkins.insert_checkin_guarded(&checkin, &window).await {
            Ok(()) => {
                info!(
                    "Check-in {} by user {} at restaurant {} pending ({} points)",
                    checkin.checkin_id, checkin.user_id, checkin.restaurant_id, checkin.points_earned
                );
                Ok(checkin)
            }
            Err(Error::QuotaExceeded(msg)) => {
                info!(
                    "Check-in refused for user {} at restaurant {}: {}",
                    checkin.user_id, checkin.restaurant_id, msg
                );
                Err(Error::QuotaExceeded(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// Read-only preview of the daily cap. The authoritative check happens
    /// inside `check_in`.
    pub async fn can_check_in(&self, user_id: Uuid, restaurant_id: Uuid) -> Result<bool, Error> {
        let window = quota::daily_checkin_window(&Local::now());
        let count = self
            .checkins
            .count_checkins_since(user_id, restaurant_id, window.since)
            .await?;
        Ok(window.admits(count))
    }

    pub async fn list_checkins(&self, user_id: Uuid) -> Result<Vec<Checkin>, Error> {
        self.checkins.list_checkins(user_id).await
    }

    pub async fn get_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<Checkin, Error> {
        self.checkins
            .get_checkin(user_id, checkin_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("check-in {}", checkin_id)))
    }

    pub async fn delete_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<(), Error> {
        if self.checkins.soft_delete_checkin(user_id, checkin_id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("check-in {}", checkin_id)))
        }
    }

    /// Credits a single check-in. `None` if it had already been credited.
    pub async fn credit_checkin(&self, checkin_id: Uuid) -> Result<Option<i64>, Error> {
        self.checkins.credit_checkin(checkin_id).await
    }

    /// Credits every pending check-in of the user, one transaction each.
    /// Safe to call repeatedly.
    pub async fn process_pending_checkins(&self, user_id: Uuid) -> Result<SweepReport, Error> {
        let pending = self.checkins.list_pending(user_id).await?;
        debug!("Found {} pending check-ins for user {}", pending.len(), user_id);

        let mut report = SweepReport::default();
        for checkin in pending {
            match self.checkins.credit_checkin(checkin.checkin_id).await {
                Ok(Some(points)) => {
                    report.credited += 1;
                    report.points_credited += points;
                }
                Ok(None) => {
                    debug!("Check-in {} was credited concurrently", checkin.checkin_id);
                }
                // soft-deleted between the listing and the credit
                Err(Error::NotFound(what)) => {
                    warn!("Skipping {}: no longer available", what);
                }
                Err(e) => return Err(e),
            }
        }

        if report.credited > 0 {
            info!(
                "Credited {} check-ins ({} points) for user {}",
                report.credited, report.points_credited, user_id
            );
        }
        Ok(report)
    }
}

fn validate_checkin(c: &NewCheckin) -> Result<(), Error> {
    if !c.latitude.is_finite() || !(-90.0..=90.0).contains(&c.latitude) {
        return Err(Error::InvalidInput(format!("invalid latitude {}", c.latitude)));
    }
    if !c.longitude.is_finite() || !(-180.0..=180.0).contains(&c.longitude) {
        return Err(Error::InvalidInput(format!("invalid longitude {}", c.longitude)));
    }
    if c.check_in_points < 0 || c.multiplier_points < 0 || c.completion_reward_points < 0 {
        return Err(Error::InvalidInput("check-in points cannot be negative".to_string()));
    }
    if c.total_points().is_none() {
        return Err(Error::InvalidInput("check-in points overflow".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};
    use crate::models::{CheckinStatus, QuotaWindow};

    mock! {
        pub Steps {}

        #[async_trait]
        impl StepRepository for Steps {
            async fn insert_with_accrual(&self, entry: &StepEntry) -> Result<i64, Error>;
            async fn get_step(&self, user_id: Uuid, step_id: Uuid) -> Result<Option<StepEntry>, Error>;
            async fn list_steps(&self, user_id: Uuid) -> Result<Vec<StepEntry>, Error>;
            async fn soft_delete_step(&self, user_id: Uuid, step_id: Uuid) -> Result<bool, Error>;
        }
    }

    mock! {
        pub Checkins {}

        #[async_trait]
        impl CheckinRepository for Checkins {
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
            async fn credit_checkin(&self, checkin_id: Uuid) -> Result<Option<i64>, Error>;
            async fn soft_delete_checkin(&self, user_id: Uuid, checkin_id: Uuid) -> Result<bool, Error>;
        }
    }

    fn service(steps: MockSteps, checkins: MockCheckins) -> AccrualService {
        AccrualService::new(Arc::new(steps), Arc::new(checkins))
    }

    fn new_checkin(user_id: Uuid) -> NewCheckin {
        NewCheckin {
            user_id,
            restaurant_id: Uuid::new_v4(),
            latitude: 40.7128,
            longitude: -74.0060,
            receipt_image: None,
            check_in_points: 5,
            multiplier_points: 2,
            completion_reward_points: 1,
        }
    }

    #[test]
    fn step_points_follow_thousand_step_buckets() {
        assert_eq!(points_for_steps(0), 0);
        assert_eq!(points_for_steps(999), 0);
        assert_eq!(points_for_steps(1000), 10);
        assert_eq!(points_for_steps(1999), 10);
        assert_eq!(points_for_steps(12_345), 120);
        assert_eq!(points_for_steps(-5), 0);
    }

    #[tokio::test]
    async fn non_positive_step_counts_never_reach_the_store() {
        // no expectations: any repository call panics
        let svc = service(MockSteps::new(), MockCheckins::new());

        for bad in [0, -1, -1000] {
            match svc.record_steps(Uuid::new_v4(), bad, None).await {
                Err(Error::InvalidInput(_)) => {}
                other => panic!("expected InvalidInput for {}, got {:?}", bad, other),
            }
        }
    }

    #[tokio::test]
    async fn record_steps_passes_computed_points() {
        let user_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let mut steps = MockSteps::new();
        steps
            .expect_insert_with_accrual()
            .withf(move |e| e.user_id == user_id && e.step_count == 1999 && e.points_earned == 10 && e.date == date)
            .times(1)
            .returning(|_| Ok(110));

        let svc = service(steps, MockCheckins::new());
        let receipt = assert_ok!(svc.record_steps(user_id, 1999, Some(date)).await);
        assert_eq!(receipt.entry.points_earned, 10);
        assert_eq!(receipt.new_balance, 110);
    }

    #[tokio::test]
    async fn check_in_is_created_pending_with_summed_points() {
        let user_id = Uuid::new_v4();
        let mut checkins = MockCheckins::new();
        checkins
            .expect_insert_checkin_guarded()
            .withf(|c, w| c.status == CheckinStatus::Pending && c.points_earned == 8 && w.limit == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(MockSteps::new(), checkins);
        let created = assert_ok!(svc.check_in(new_checkin(user_id)).await);
        assert_eq!(created.user_id, user_id);
        assert!(!created.status.is_processed());
    }

    #[tokio::test]
    async fn check_in_surfaces_quota_exceeded() {
        let mut checkins = MockCheckins::new();
        checkins
            .expect_insert_checkin_guarded()
            .returning(|_, _| Err(Error::QuotaExceeded("daily".to_string())));

        let svc = service(MockSteps::new(), checkins);
        let err = assert_err!(svc.check_in(new_checkin(Uuid::new_v4())).await);
        assert!(matches!(err, Error::QuotaExceeded(_)));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn check_in_rejects_bad_coordinates() {
        let svc = service(MockSteps::new(), MockCheckins::new());
        let mut c = new_checkin(Uuid::new_v4());
        c.latitude = 123.0;
        assert!(matches!(svc.check_in(c).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn check_in_rejects_overflowing_points() {
        // no expectations: reaching the repository panics
        let svc = service(MockSteps::new(), MockCheckins::new());
        let mut c = new_checkin(Uuid::new_v4());
        c.check_in_points = i64::MAX;
        c.multiplier_points = 1;
        c.completion_reward_points = 0;

        let err = assert_err!(svc.check_in(c).await);
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn sweep_counts_only_fresh_credits() {
        let user_id = Uuid::new_v4();
        let first = new_checkin(user_id).into_pending(Utc::now()).unwrap();
        let second = new_checkin(user_id).into_pending(Utc::now()).unwrap();
        let first_id = first.checkin_id;
        let second_id = second.checkin_id;

        let mut checkins = MockCheckins::new();
        checkins
            .expect_list_pending()
            .with(eq(user_id))
            .times(1)
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        checkins
            .expect_credit_checkin()
            .with(eq(first_id))
            .times(1)
            .returning(|_| Ok(Some(8)));
        checkins
            .expect_credit_checkin()
            .with(eq(second_id))
            .times(1)
            .returning(|_| Ok(None));

        let svc = service(MockSteps::new(), checkins);
        let report = svc.process_pending_checkins(user_id).await.unwrap();
        assert_eq!(report, SweepReport { credited: 1, points_credited: 8 });
    }
}
