// src/quota.rs
//
// Anti-abuse caps. Counts are read from the durable event tables on the same
// transaction connection as the write they gate, after the caller has locked
// the user's row, so two concurrent requests cannot both pass the check.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use crate::models::QuotaWindow;

pub const MAX_DAILY_CHECKINS_PER_RESTAURANT: i64 = 2;
pub const MAX_MONTHLY_REDEMPTIONS_PER_REWARD: i64 = 3;

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // midnight skipped by a DST jump
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Midnight of `now`'s calendar day in `now`'s own time zone.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    local_midnight(&now.timezone(), now.date_naive())
}

/// Midnight of the first day of `now`'s calendar month in `now`'s time zone.
pub fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

pub fn daily_checkin_window<Tz: TimeZone>(now: &DateTime<Tz>) -> QuotaWindow {
    QuotaWindow::new(MAX_DAILY_CHECKINS_PER_RESTAURANT, start_of_day(now))
}

pub fn monthly_redemption_window<Tz: TimeZone>(now: &DateTime<Tz>) -> QuotaWindow {
    QuotaWindow::new(MAX_MONTHLY_REDEMPTIONS_PER_REWARD, start_of_month(now))
}

pub async fn count_checkins_since(
    conn: &mut PgConnection,
    user_id: Uuid,
    restaurant_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM checkins
        WHERE user_id = $1
          AND restaurant_id = $2
          AND created_at >= $3
          AND deleted = FALSE
        "#,
    )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn count_redemptions_since(
    conn: &mut PgConnection,
    user_id: Uuid,
    reward_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM redemptions
        WHERE user_id = $1
          AND reward_id = $2
          AND redemption_date >= $3
          AND deleted = FALSE
        "#,
    )
        .bind(user_id)
        .bind(reward_id)
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn enforce_daily_checkin_cap(
    conn: &mut PgConnection,
    user_id: Uuid,
    restaurant_id: Uuid,
    window: &QuotaWindow,
) -> Result<(), Error> {
    let count = count_checkins_since(conn, user_id, restaurant_id, window.since).await?;
    debug!("user {} has {} check-ins at restaurant {} today", user_id, count, restaurant_id);
    if window.admits(count) {
        Ok(())
    } else {
        Err(Error::QuotaExceeded(format!(
            "daily check-in limit of {} reached for this restaurant",
            window.limit
        )))
    }
}

pub async fn enforce_monthly_redemption_cap(
    conn: &mut PgConnection,
    user_id: Uuid,
    reward_id: Uuid,
    window: &QuotaWindow,
) -> Result<(), Error> {
    let count = count_redemptions_since(conn, user_id, reward_id, window.since).await?;
    debug!("user {} has {} redemptions of reward {} this month", user_id, count, reward_id);
    if window.admits(count) {
        Ok(())
    } else {
        Err(Error::QuotaExceeded(format!(
            "monthly redemption limit of {} reached for this reward",
            window.limit
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn start_of_day_uses_local_midnight() {
        let now = at(-5, 2024, 11, 15, 23, 30);
        let start = start_of_day(&now);
        // 2024-11-15 00:00 at UTC-5
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 11, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn start_of_month_is_first_day_midnight() {
        let now = at(2, 2024, 3, 31, 1, 0);
        let start = start_of_month(&now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap());
    }

    #[test]
    fn windows_carry_the_caps() {
        let now = at(0, 2024, 6, 10, 12, 0);
        let daily = daily_checkin_window(&now);
        assert_eq!(daily.limit, 2);
        assert!(daily.admits(1));
        assert!(!daily.admits(2));

        let monthly = monthly_redemption_window(&now);
        assert_eq!(monthly.limit, 3);
        assert_eq!(monthly.since, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(monthly.admits(2));
        assert!(!monthly.admits(3));
    }
}
