//! Integration tests for client CRUD, search and deletion guards.

use cadence_core::pagination::PageRequest;
use cadence_core::social::SocialIdentity;
use cadence_db::models::client::{ClientFilter, CreateClient, UpdateClient};
use cadence_db::models::reel::CreateReel;
use cadence_db::repositories::{ClientRepo, ReelRepo};
use chrono::{Duration, Utc};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_client(identity: SocialIdentity, name: &str, username: &str) -> CreateClient {
    CreateClient {
        social_identity: identity,
        name: name.to_string(),
        username: username.to_string(),
        description: Some(format!("{name} official account")),
        access_token: "long-lived-token".to_string(),
        account_id: format!("acct-{username}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_and_find_client(pool: PgPool) {
    let created = ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap();

    let found = ClientRepo::find_by_id(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Bakery");
    assert_eq!(found.identity().unwrap(), SocialIdentity::Instagram);
    assert!(found.has_credentials());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_name_username_in_same_identity_conflicts(pool: PgPool) {
    ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap();

    let err = ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("should be a database error");
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_clients_identity_name_username"));

    // Same pair on the other network is a different account.
    ClientRepo::create(&pool, &new_client(SocialIdentity::Facebook, "Bakery", "bakery"))
        .await
        .expect("same pair on another identity should be allowed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn name_taken_ignores_the_row_being_edited(pool: PgPool) {
    let client = ClientRepo::create(&pool, &new_client(SocialIdentity::Facebook, "Cafe", "cafe"))
        .await
        .unwrap();

    assert!(ClientRepo::name_taken(&pool, "FACEBOOK", "Cafe", "cafe", None).await.unwrap());
    assert!(!ClientRepo::name_taken(&pool, "FACEBOOK", "Cafe", "cafe", Some(client.id))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_and_paginates(pool: PgPool) {
    for i in 0..12 {
        ClientRepo::create(
            &pool,
            &new_client(SocialIdentity::Instagram, &format!("Shop {i}"), &format!("shop{i}")),
        )
        .await
        .unwrap();
    }
    ClientRepo::create(&pool, &new_client(SocialIdentity::Facebook, "Gym", "gym"))
        .await
        .unwrap();

    let filter = ClientFilter {
        search: Some("shop".into()),
        social_identity: Some(SocialIdentity::Instagram),
    };
    let (first, total) = ClientRepo::list(&pool, &filter, PageRequest::new(Some(1), Some(5)))
        .await
        .unwrap();
    assert_eq!(total, 12);
    assert_eq!(first.len(), 5);

    let (last, _) = ClientRepo::list(&pool, &filter, PageRequest::new(Some(3), Some(5)))
        .await
        .unwrap();
    assert_eq!(last.len(), 2);

    let facebook_only = ClientFilter {
        search: None,
        social_identity: Some(SocialIdentity::Facebook),
    };
    let (rows, total) = ClientRepo::list(&pool, &facebook_only, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].username, "gym");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn search_matches_description(pool: PgPool) {
    ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap();

    let filter = ClientFilter {
        search: Some("OFFICIAL".into()),
        social_identity: None,
    };
    let (_, total) = ClientRepo::list(&pool, &filter, PageRequest::default()).await.unwrap();
    assert_eq!(total, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_applies_only_given_fields(pool: PgPool) {
    let client = ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap();

    let updated = ClientRepo::update(
        &pool,
        client.id,
        &UpdateClient {
            name: Some("Bakery & Co".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "Bakery & Co");
    assert_eq!(updated.username, "bakery");
    assert_eq!(updated.access_token, client.access_token);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_is_blocked_while_reels_are_scheduled(pool: PgPool) {
    let client = ClientRepo::create(&pool, &new_client(SocialIdentity::Instagram, "Bakery", "bakery"))
        .await
        .unwrap();
    let reel = ReelRepo::create(
        &pool,
        &CreateReel {
            client_id: client.id,
            container_id: "container-1".into(),
            title: "Launch".into(),
            description: None,
            scheduled_date: Utc::now() + Duration::hours(1),
            needs_local_publish: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(ClientRepo::pending_reel_count(&pool, client.id).await.unwrap(), 1);
    assert!(!ClientRepo::delete_if_idle(&pool, client.id).await.unwrap());

    ReelRepo::mark_published(&pool, reel.id, Some("media-1"), "https://example.com/reel/1")
        .await
        .unwrap()
        .unwrap();

    assert!(ClientRepo::delete_if_idle(&pool, client.id).await.unwrap());
    let orphan = ReelRepo::find_by_id(&pool, reel.id).await.unwrap().unwrap();
    assert_eq!(orphan.client_id, None, "published history survives client deletion");
}
