use std::sync::Arc;
use chrono::{Duration, Local};
use uuid::Uuid;

use yumstepper_core::{
    Database, Error,
    models::{CheckinStatus, NewCheckin, SweepReport},
    quota,
    repositories::CheckinRepository,
    repositories::postgres::{PostgresCheckinRepository, PostgresStepRepository},
    services::AccrualService,
};
use yumstepper_core::test_utils::helpers::{
    create_test_restaurant, create_test_user, setup_test_database,
};

fn accrual(db: &Database) -> AccrualService {
    AccrualService::new(
        Arc::new(PostgresStepRepository::new(db.pool().clone())),
        Arc::new(PostgresCheckinRepository::new(db.pool().clone())),
    )
}

fn visit(user_id: Uuid, restaurant_id: Uuid, base: i64, multiplier: i64) -> NewCheckin {
    NewCheckin {
        user_id,
        restaurant_id,
        latitude: 43.65,
        longitude: -79.38,
        receipt_image: None,
        check_in_points: base,
        multiplier_points: multiplier,
        completion_reward_points: 0,
    }
}

async fn balance(db: &Database, user_id: Uuid) -> Result<i64, Error> {
    let balance: i64 = sqlx::query_scalar("SELECT points_earned FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db.pool())
        .await?;
    Ok(balance)
}

#[tokio::test]
async fn test_checkin_is_pending_until_swept() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Noodle Bar").await?;
    let svc = accrual(&db);

    let checkin = svc.check_in(visit(user.user_id, place.restaurant_id, 20, 5)).await?;
    assert_eq!(checkin.status, CheckinStatus::Pending);
    assert_eq!(checkin.points_earned, 25);
    assert_eq!(balance(&db, user.user_id).await?, 0);

    let report = svc.process_pending_checkins(user.user_id).await?;
    assert_eq!(report, SweepReport { credited: 1, points_credited: 25 });
    assert_eq!(balance(&db, user.user_id).await?, 25);

    let stored = svc.get_checkin(user.user_id, checkin.checkin_id).await?;
    assert_eq!(stored.status, CheckinStatus::Processed);
    Ok(())
}

#[tokio::test]
async fn test_sweep_is_idempotent() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let a = create_test_restaurant(db.pool(), "Taco Stand").await?;
    let b = create_test_restaurant(db.pool(), "Pho House").await?;
    let svc = accrual(&db);

    svc.check_in(visit(user.user_id, a.restaurant_id, 10, 0)).await?;
    svc.check_in(visit(user.user_id, b.restaurant_id, 15, 3)).await?;

    let first = svc.process_pending_checkins(user.user_id).await?;
    assert_eq!(first, SweepReport { credited: 2, points_credited: 28 });

    let second = svc.process_pending_checkins(user.user_id).await?;
    assert_eq!(second, SweepReport::default());
    assert_eq!(balance(&db, user.user_id).await?, 28);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_sweeps_credit_each_checkin_once() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Bagel Shop").await?;
    let svc = Arc::new(accrual(&db));

    svc.check_in(visit(user.user_id, place.restaurant_id, 12, 0)).await?;
    svc.check_in(visit(user.user_id, place.restaurant_id, 8, 0)).await?;

    let mut handles = Vec::new();
    for _ in 0..3 {
        let svc = svc.clone();
        let user_id = user.user_id;
        handles.push(tokio::spawn(async move { svc.process_pending_checkins(user_id).await }));
    }
    let mut total = 0;
    for handle in handles {
        total += handle.await.expect("task panicked")?.points_credited;
    }

    assert_eq!(total, 20);
    assert_eq!(balance(&db, user.user_id).await?, 20);
    Ok(())
}

#[tokio::test]
async fn test_third_checkin_same_day_is_refused() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Burger Joint").await?;
    let other = create_test_restaurant(db.pool(), "Salad Place").await?;
    let svc = accrual(&db);

    svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await?;
    assert!(svc.can_check_in(user.user_id, place.restaurant_id).await?);
    svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await?;
    assert!(!svc.can_check_in(user.user_id, place.restaurant_id).await?);

    let third = svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await;
    assert!(matches!(third, Err(Error::QuotaExceeded(_))));
    assert_eq!(svc.list_checkins(user.user_id).await?.len(), 2);

    // the cap is per restaurant
    svc.check_in(visit(user.user_id, other.restaurant_id, 10, 0)).await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_checkins_respect_daily_cap() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Dumpling House").await?;
    let svc = Arc::new(accrual(&db));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let svc = svc.clone();
        let new_checkin = visit(user.user_id, place.restaurant_id, 10, 0);
        handles.push(tokio::spawn(async move { svc.check_in(new_checkin).await }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => accepted += 1,
            Err(Error::QuotaExceeded(_)) => {}
            Err(e) => return Err(e),
        }
    }
    assert_eq!(accepted, 2);
    Ok(())
}

#[tokio::test]
async fn test_checkin_at_unknown_restaurant_is_not_found() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;

    let result = accrual(&db).check_in(visit(user.user_id, Uuid::new_v4(), 10, 0)).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_deleted_pending_checkin_is_never_credited() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Ramen Spot").await?;
    let svc = accrual(&db);

    let checkin = svc.check_in(visit(user.user_id, place.restaurant_id, 30, 0)).await?;
    svc.delete_checkin(user.user_id, checkin.checkin_id).await?;

    let report = svc.process_pending_checkins(user.user_id).await?;
    assert_eq!(report.credited, 0);
    assert_eq!(balance(&db, user.user_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_yesterdays_checkins_do_not_count_today() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Corner Cafe").await?;
    let repo = PostgresCheckinRepository::new(db.pool().clone());
    let svc = accrual(&db);

    // one hour before today's local midnight
    let yesterday = quota::start_of_day(&Local::now()) - Duration::hours(1);
    let yesterday_window = quota::daily_checkin_window(&yesterday.with_timezone(&Local));
    for _ in 0..2 {
        let checkin = visit(user.user_id, place.restaurant_id, 10, 0).into_pending(yesterday)?;
        repo.insert_checkin_guarded(&checkin, &yesterday_window).await?;
    }

    // yesterday's cap was hit, today starts fresh
    assert!(svc.can_check_in(user.user_id, place.restaurant_id).await?);
    svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await?;
    svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await?;
    let third = svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await;
    assert!(matches!(third, Err(Error::QuotaExceeded(_))));
    Ok(())
}

#[tokio::test]
async fn test_checkins_at_local_midnight_count_today() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let user = create_test_user(db.pool(), 0).await?;
    let place = create_test_restaurant(db.pool(), "Night Owl Diner").await?;
    let repo = PostgresCheckinRepository::new(db.pool().clone());
    let svc = accrual(&db);

    let midnight = quota::start_of_day(&Local::now());
    let window = quota::daily_checkin_window(&Local::now());
    for _ in 0..2 {
        let checkin = visit(user.user_id, place.restaurant_id, 10, 0).into_pending(midnight)?;
        repo.insert_checkin_guarded(&checkin, &window).await?;
    }

    let result = svc.check_in(visit(user.user_id, place.restaurant_id, 10, 0)).await;
    assert!(matches!(result, Err(Error::QuotaExceeded(_))));
    Ok(())
}
