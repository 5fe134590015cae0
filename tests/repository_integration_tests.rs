use chrono::{Duration, Utc};
use eventsx_api::{
    AppError,
    models::{Event, EventChanges, FieldUpdate, NewAccount, NewEvent, ProfileChanges, Role},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for one test. Requires a reachable Postgres in `DATABASE_URL`,
/// so these tests are ignored by default: `cargo test -- --ignored`.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

async fn create_test_account(repo: &PostgresRepository) -> Uuid {
    repo.create_account(NewAccount {
        name: "Integration".to_string(),
        email: format!("{}@test.com", Uuid::new_v4()),
        password_hash: "$argon2id$placeholder".to_string(),
        role: Role::Student,
        governorate: "Cairo".to_string(),
    })
    .await
    .expect("Failed to create test account")
    .id
}

async fn create_test_event(repo: &PostgresRepository, category: &str) -> Event {
    repo.create_event(NewEvent {
        title: "Integration Event".to_string(),
        description: "Created by the integration suite".to_string(),
        date: Utc::now() + Duration::days(3),
        location: "Cairo".to_string(),
        category: category.to_string(),
        cost: 12.5,
    })
    .await
    .expect("Failed to create test event")
}

// --- Accounts ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_account_rejects_duplicate_email() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = format!("{}@test.com", Uuid::new_v4());

    let new_account = || NewAccount {
        name: "Dup".to_string(),
        email: email.clone(),
        password_hash: "hash".to_string(),
        role: Role::Student,
        governorate: "Giza".to_string(),
    };

    let created = repo.create_account(new_account()).await.unwrap();
    assert!(created.enrolled_events.is_empty());

    let err = repo.create_account(new_account()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = repo.find_account_by_email(&email).await.unwrap().unwrap();
    assert_eq!(stored.account.id, created.id);
    assert_eq!(stored.password_hash, "hash");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_profile_sets_and_clears_fields() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_account(&repo).await;

    let set = ProfileChanges {
        name: Some("Renamed".to_string()),
        phone_number: FieldUpdate::Set("0100".to_string()),
        birthday: FieldUpdate::Set(chrono::NaiveDate::from_ymd_opt(2000, 2, 29).unwrap()),
        ..ProfileChanges::default()
    };
    let account = repo.update_profile(id, set).await.unwrap().unwrap();
    assert_eq!(account.name, "Renamed");
    assert_eq!(account.phone_number.as_deref(), Some("0100"));

    let clear = ProfileChanges {
        birthday: FieldUpdate::Clear,
        ..ProfileChanges::default()
    };
    let account = repo.update_profile(id, clear).await.unwrap().unwrap();
    assert!(account.birthday.is_none());
    assert_eq!(account.phone_number.as_deref(), Some("0100"));

    let missing = repo
        .update_profile(Uuid::new_v4(), ProfileChanges {
            name: Some("Ghost".to_string()),
            ..ProfileChanges::default()
        })
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_back_references_have_set_semantics() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_account(&repo).await;
    let event = create_test_event(&repo, "misc").await;

    repo.add_enrolled_event(id, event.id).await.unwrap();
    repo.add_enrolled_event(id, event.id).await.unwrap();
    let account = repo.get_account(id).await.unwrap().unwrap();
    assert_eq!(account.enrolled_events, vec![event.id]);

    repo.remove_enrolled_event(id, event.id).await.unwrap();
    repo.remove_enrolled_event(id, event.id).await.unwrap();
    let account = repo.get_account(id).await.unwrap().unwrap();
    assert!(account.enrolled_events.is_empty());
}

// --- Events ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_event_crud_and_case_insensitive_category() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = format!("Cat-{}", Uuid::new_v4());
    let event = create_test_event(&repo, &category).await;

    let by_category = repo
        .list_events_by_category(&category.to_lowercase())
        .await
        .unwrap();
    assert_eq!(by_category, vec![event.clone()]);

    let changes = EventChanges {
        title: Some("Renamed Event".to_string()),
        ..EventChanges::default()
    };
    let updated = repo.update_event(event.id, changes).await.unwrap().unwrap();
    assert_eq!(updated.title, "Renamed Event");
    assert_eq!(updated.cost, event.cost);

    let deleted = repo.delete_event(event.id).await.unwrap();
    assert_eq!(deleted.map(|e| e.id), Some(event.id));
    assert!(repo.get_event(event.id).await.unwrap().is_none());
    assert!(repo.delete_event(event.id).await.unwrap().is_none());
}

// --- Enrollments ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_enrollment_pair_is_unique_and_listed_newest_first() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_account(&repo).await;
    let first = create_test_event(&repo, "misc").await;
    let second = create_test_event(&repo, "misc").await;

    repo.insert_enrollment(id, first.id).await.unwrap();
    let err = repo.insert_enrollment(id, first.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    repo.insert_enrollment(id, second.id).await.unwrap();

    let listed = repo.list_enrollments(id).await.unwrap();
    let events: Vec<Uuid> = listed.iter().map(|row| row.event.id).collect();
    assert_eq!(events, vec![second.id, first.id]);

    assert!(repo.delete_enrollment(id, first.id).await.unwrap().is_some());
    assert!(repo.find_enrollment(id, first.id).await.unwrap().is_none());
    assert!(repo.delete_enrollment(id, first.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_deleting_event_cascades_to_enrollments() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_account(&repo).await;
    let event = create_test_event(&repo, "misc").await;
    repo.insert_enrollment(id, event.id).await.unwrap();

    repo.delete_event(event.id).await.unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE event_id = $1")
        .bind(event.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
