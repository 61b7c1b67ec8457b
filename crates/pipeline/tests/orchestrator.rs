//! Integration tests for the publishing orchestrator: step ordering,
//! idempotency guard, failure marking and per-platform outcomes.

mod common;

use assert_matches::assert_matches;
use cadence_core::error::CoreError;
use cadence_core::social::{ReelStatus, SocialIdentity};
use cadence_core::types::DbId;
use cadence_db::repositories::ReelRepo;
use cadence_pipeline::{PipelineError, ScheduleReelInput};
use chrono::{Duration, Utc};
use common::{harness, reel_count, seed_client, video, Call, FakeStrategy};
use sqlx::PgPool;

fn input(client_id: DbId, identity: SocialIdentity, minutes_ahead: i64) -> ScheduleReelInput {
    ScheduleReelInput {
        client_id,
        title: "Friday sourdough".into(),
        description: Some("Out of the oven at 7".into()),
        social_identity: identity,
        scheduled_date: Utc::now() + Duration::minutes(minutes_ahead),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn instagram_reel_is_persisted_then_deferred(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Instagram));
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    let scheduled = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 5), video())
        .await
        .unwrap();

    assert_eq!(scheduled.status, ReelStatus::Scheduled);
    assert_eq!(scheduled.container_id, "instagram-container-1");

    let reel = ReelRepo::find_by_id(&pool, scheduled.reel_id).await.unwrap().unwrap();
    assert_eq!(reel.status().unwrap(), ReelStatus::Scheduled);
    assert!(reel.needs_local_publish);
    assert_eq!(reel.client_id, Some(client_id));

    assert_eq!(
        h.strategy.calls(),
        vec![
            Call::CreateContainer,
            Call::Schedule("instagram-container-1".into()),
            Call::Upload("instagram-container-1".into()),
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn container_failure_writes_nothing(pool: PgPool) {
    let mut strategy = FakeStrategy::new(SocialIdentity::Instagram);
    strategy.fail_create = true;
    let h = harness(&pool, strategy);
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 30), video())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        PipelineError::Core(CoreError::Upstream(ref msg)) if msg.starts_with("Failed to create media container")
    );
    assert_eq!(reel_count(&pool).await, 0);
    assert_eq!(h.strategy.calls(), vec![Call::CreateContainer]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_container_is_a_conflict(pool: PgPool) {
    let mut strategy = FakeStrategy::new(SocialIdentity::Instagram);
    strategy.fixed_container = Some("17990000000000001".into());
    let h = harness(&pool, strategy);
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    h.scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 30), video())
        .await
        .unwrap();
    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 60), video())
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::Conflict(_)));
    assert_eq!(reel_count(&pool).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn schedule_failure_marks_reel_failed(pool: PgPool) {
    let mut strategy = FakeStrategy::new(SocialIdentity::Instagram);
    strategy.fail_schedule = true;
    let h = harness(&pool, strategy);
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 30), video())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Upstream(_)));

    let reel = ReelRepo::find_by_container_id(&pool, "instagram-container-1")
        .await
        .unwrap()
        .expect("row is written before scheduling");
    assert_eq!(reel.status().unwrap(), ReelStatus::Failed);
    assert!(reel
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("The video file is corrupted"));
    assert!(!reel.needs_local_publish);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_client_is_not_found(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Instagram));

    let err = h
        .scheduler
        .schedule_reel(input(9_999, SocialIdentity::Instagram, 30), video())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        PipelineError::Core(CoreError::NotFound { entity: "Client", id: 9_999 })
    );
    assert!(h.strategy.calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_without_credentials_is_not_found(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Instagram));
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;
    sqlx::query("UPDATE clients SET access_token = '' WHERE id = $1")
        .bind(client_id)
        .execute(&pool)
        .await
        .unwrap();

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Instagram, 30), video())
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::NotFound { .. }));
    assert!(h.strategy.calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn identity_mismatch_is_rejected(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Instagram));
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Facebook, 30), video())
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
    assert_eq!(reel_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unregistered_identity_fails_fast(pool: PgPool) {
    // Only Instagram is wired.
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Instagram));
    let client_id = seed_client(&pool, SocialIdentity::Facebook).await;

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Facebook, 30), video())
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Platform(_));
    assert_eq!(reel_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn facebook_far_ahead_is_scheduled_natively(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Facebook));
    let client_id = seed_client(&pool, SocialIdentity::Facebook).await;

    let scheduled = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Facebook, 120), video())
        .await
        .unwrap();

    assert_eq!(scheduled.status, ReelStatus::Scheduled);
    let reel = ReelRepo::find_by_id(&pool, scheduled.reel_id).await.unwrap().unwrap();
    assert!(!reel.needs_local_publish);
    assert_eq!(h.strategy.publish_count(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn facebook_too_soon_is_published_immediately(pool: PgPool) {
    let h = harness(&pool, FakeStrategy::new(SocialIdentity::Facebook));
    let client_id = seed_client(&pool, SocialIdentity::Facebook).await;

    let scheduled = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Facebook, 2), video())
        .await
        .unwrap();

    assert_eq!(scheduled.status, ReelStatus::Published);
    assert!(scheduled.video_url.as_deref().is_some_and(|u| !u.is_empty()));

    let reel = ReelRepo::find_by_id(&pool, scheduled.reel_id).await.unwrap().unwrap();
    assert_eq!(reel.status().unwrap(), ReelStatus::Published);
    assert_eq!(reel.media_id.as_deref(), Some("media-facebook-container-1"));
    assert!(reel.published_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn instagram_reel_is_a_local_publish_job_before_upload_finishes(pool: PgPool) {
    let mut strategy = FakeStrategy::new(SocialIdentity::Instagram);
    strategy.stall_upload = true;
    let h = harness(&pool, strategy);
    let client_id = seed_client(&pool, SocialIdentity::Instagram).await;

    // Dropping the request mid-upload leaves the row as a crash would.
    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(300),
        h.scheduler
            .schedule_reel(input(client_id, SocialIdentity::Instagram, 5), video()),
    )
    .await;
    assert!(outcome.is_err());

    let reel = ReelRepo::find_by_container_id(&pool, "instagram-container-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reel.status().unwrap(), ReelStatus::Scheduled);
    assert!(reel.needs_local_publish);

    let report = h
        .arranger
        .sweep(Utc::now() + Duration::minutes(6))
        .await
        .unwrap();
    assert_eq!(report.claimed, 1);
    assert_eq!(report.published, 1);

    let reel = ReelRepo::find_by_id(&pool, reel.id).await.unwrap().unwrap();
    assert_eq!(reel.status().unwrap(), ReelStatus::Published);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_immediate_publish_marks_reel_failed(pool: PgPool) {
    let mut strategy = FakeStrategy::new(SocialIdentity::Facebook);
    strategy.reject_publish = true;
    let h = harness(&pool, strategy);
    let client_id = seed_client(&pool, SocialIdentity::Facebook).await;

    let err = h
        .scheduler
        .schedule_reel(input(client_id, SocialIdentity::Facebook, 2), video())
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Upstream(_)));

    let reel = ReelRepo::find_by_container_id(&pool, "facebook-container-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reel.status().unwrap(), ReelStatus::Failed);
    assert!(reel
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("reported failure"));
    assert!(reel.published_at.is_none());
}
