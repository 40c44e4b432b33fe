use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use crate::models::{CheckinHistoryRow, HistoryEntry, HistorySource, RedemptionHistoryRow, StepEntry};
use yumstepper_common::traits::repository_traits::HistoryRepository;

pub struct HistoryService {
    repo: Arc<dyn HistoryRepository + Send + Sync>,
}

impl HistoryService {
    pub fn new(repo: Arc<dyn HistoryRepository + Send + Sync>) -> Self {
        Self { repo }
    }

    /// Steps, check-ins and redemptions of one user, newest first.
    pub async fn point_history(&self, user_id: Uuid) -> Result<Vec<HistoryEntry>, Error> {
        let steps = self.repo.step_rows(user_id).await?;
        let checkins = self.repo.checkin_rows(user_id).await?;
        let redemptions = self.repo.redemption_rows(user_id).await?;
        debug!(
            "History for {}: {} steps, {} check-ins, {} redemptions",
            user_id, steps.len(), checkins.len(), redemptions.len()
        );

        Ok(merge_history(steps, checkins, redemptions))
    }
}

fn source_rank(source: HistorySource) -> u8 {
    match source {
        HistorySource::Redemption => 0,
        HistorySource::Checkin => 1,
        HistorySource::Steps => 2,
    }
}

/// Normalizes the three sources into one feed sorted by date descending.
/// Equal timestamps order redemption, check-in, steps.
pub fn merge_history(
    steps: Vec<StepEntry>,
    checkins: Vec<CheckinHistoryRow>,
    redemptions: Vec<RedemptionHistoryRow>,
) -> Vec<HistoryEntry> {
    let mut feed = Vec::with_capacity(steps.len() + checkins.len() + redemptions.len());

    feed.extend(steps.into_iter().map(|s| HistoryEntry {
        entry_id: s.step_id,
        source: HistorySource::Steps,
        points_earned: s.points_earned,
        date: s.created_at,
        step_count: Some(s.step_count),
        restaurant_name: None,
        point_multiplier: None,
        reward_details: None,
    }));

    feed.extend(checkins.into_iter().map(|c| HistoryEntry {
        entry_id: c.checkin_id,
        source: HistorySource::Checkin,
        points_earned: c.points_earned,
        date: c.created_at,
        step_count: None,
        restaurant_name: c.restaurant_name,
        point_multiplier: Some(c.multiplier_points),
        reward_details: None,
    }));

    feed.extend(redemptions.into_iter().map(|r| HistoryEntry {
        entry_id: r.redemption_id,
        source: HistorySource::Redemption,
        points_earned: -r.points_spent,
        date: r.redemption_date,
        step_count: None,
        restaurant_name: None,
        point_multiplier: None,
        reward_details: r.reward_details,
    }));

    feed.sort_by(|a, b| match b.date.cmp(&a.date) {
        Ordering::Equal => source_rank(a.source).cmp(&source_rank(b.source)),
        other => other,
    });
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    #[test]
    fn merges_three_sources_newest_first() {
        let user_id = Uuid::new_v4();
        let t0 = Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap();

        let steps = vec![StepEntry {
            step_id: Uuid::new_v4(),
            user_id,
            step_count: 5400,
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            points_earned: 5,
            created_at: t0,
        }];
        let checkins = vec![CheckinHistoryRow {
            checkin_id: Uuid::new_v4(),
            points_earned: 3,
            multiplier_points: 1,
            created_at: t0 + Duration::hours(2),
            restaurant_name: Some("Noodle Bar".to_string()),
        }];
        let redemptions = vec![RedemptionHistoryRow {
            redemption_id: Uuid::new_v4(),
            points_spent: 10,
            redemption_date: t0 + Duration::hours(1),
            reward_details: Some("Free tea".to_string()),
        }];

        let feed = merge_history(steps, checkins, redemptions);
        let sources: Vec<_> = feed.iter().map(|e| e.source).collect();
        assert_eq!(
            sources,
            vec![HistorySource::Checkin, HistorySource::Redemption, HistorySource::Steps]
        );
        let points: Vec<_> = feed.iter().map(|e| e.points_earned).collect();
        assert_eq!(points, vec![3, -10, 5]);

        assert_eq!(feed[0].restaurant_name.as_deref(), Some("Noodle Bar"));
        assert_eq!(feed[1].reward_details.as_deref(), Some("Free tea"));
        assert_eq!(feed[2].step_count, Some(5400));
        assert!(feed[2].restaurant_name.is_none());
    }

    #[test]
    fn ties_are_ordered_by_source() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let steps = vec![StepEntry {
            step_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            step_count: 1000,
            date: at.date_naive(),
            points_earned: 10,
            created_at: at,
        }];
        let redemptions = vec![RedemptionHistoryRow {
            redemption_id: Uuid::new_v4(),
            points_spent: 10,
            redemption_date: at,
            reward_details: None,
        }];

        let feed = merge_history(steps, vec![], redemptions);
        assert_eq!(feed[0].source, HistorySource::Redemption);
        assert_eq!(feed[1].source, HistorySource::Steps);
    }

    #[test]
    fn empty_history_is_empty() {
        assert!(merge_history(vec![], vec![], vec![]).is_empty());
    }
}
