use crate::{
    error::{AppError, AppResult, is_unique_violation},
    models::{
        Account, Enrollment, EnrollmentWithEvent, Event, EventChanges, FieldUpdate, NewAccount,
        NewEvent, ProfileChanges, StoredAccount,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The store interface used by every flow. Two implementations exist:
/// [`PostgresRepository`] for deployments and `memory::MemoryRepository` for local
/// runs and tests. Both must enforce the same uniqueness constraints atomically:
/// one account per email, one enrollment per (account, event) pair.
///
/// Every method surfaces store failures as `AppError::Internal`; nothing is retried.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    /// Looks up by an already-normalized email. Includes the hash, for login only.
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<StoredAccount>>;
    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>>;
    /// Fails with `AppError::Conflict` when the email is already taken.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account>;
    /// Returns `None` when the account does not exist.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Account>>;
    /// Set-add to the back-reference list: no duplicate insertion.
    async fn add_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()>;
    async fn remove_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()>;

    // --- Events ---
    /// All events, ascending by date.
    async fn list_events(&self) -> AppResult<Vec<Event>>;
    /// Case-insensitive category match, ascending by date.
    async fn list_events_by_category(&self, category: &str) -> AppResult<Vec<Event>>;
    /// Up to `limit` events in random order.
    async fn random_events(&self, limit: i64) -> AppResult<Vec<Event>>;
    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>>;
    async fn create_event(&self, event: NewEvent) -> AppResult<Event>;
    /// Partial update; `None` fields are left untouched.
    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>>;
    /// Returns the deleted event. Enrollments referencing it are removed with it.
    async fn delete_event(&self, id: Uuid) -> AppResult<Option<Event>>;

    // --- Enrollments ---
    async fn find_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>>;
    /// Fails with `AppError::Conflict` when the pair is already enrolled.
    async fn insert_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Enrollment>;
    /// Returns the deleted enrollment, or `None` if the pair was not enrolled.
    async fn delete_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>>;
    /// Most recent first.
    async fn list_enrollments(&self, account_id: Uuid) -> AppResult<Vec<EnrollmentWithEvent>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

pub const DUPLICATE_ACCOUNT: &str = "User with this email already exists";
pub const ALREADY_ENROLLED: &str = "You are already enrolled in this event";

const ACCOUNT_COLUMNS: &str = "id, name, email, role, governorate, birthday, gender, phone_number, \
     profile_picture, enrolled_events, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, title, description, date, location, category, cost";

/// Flat row of the enrollment/event join.
#[derive(FromRow)]
struct EnrollmentEventRow {
    enrollment_id: Uuid,
    user_id: Uuid,
    enrolled_at: DateTime<Utc>,
    id: Uuid,
    title: String,
    description: String,
    date: DateTime<Utc>,
    location: String,
    category: String,
    cost: f64,
}

impl From<EnrollmentEventRow> for EnrollmentWithEvent {
    fn from(row: EnrollmentEventRow) -> Self {
        EnrollmentWithEvent {
            id: row.enrollment_id,
            user_id: row.user_id,
            enrolled_at: row.enrolled_at,
            event: Event {
                id: row.id,
                title: row.title,
                description: row.description,
                date: row.date,
                location: row.location,
                category: row.category,
                cost: row.cost,
            },
        }
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Uniqueness is enforced by table constraints, so concurrent requests cannot
/// both succeed in creating the same account or enrollment.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Pushes one nullable column assignment for a partial update.
fn push_field_update<'a, T>(
    set: &mut sqlx::query_builder::Separated<'_, 'a, Postgres, &'static str>,
    column: &'static str,
    update: FieldUpdate<T>,
) where
    T: 'a + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send,
{
    match update {
        FieldUpdate::Keep => {}
        FieldUpdate::Clear => {
            set.push(format!("{} = NULL", column));
        }
        FieldUpdate::Set(value) => {
            set.push(format!("{} = ", column));
            set.push_bind_unseparated(value);
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<StoredAccount>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE email = $1",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, StoredAccount>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// create_account
    ///
    /// Single-statement insert: either the whole account is persisted or nothing is.
    /// The `UNIQUE (email)` constraint turns a concurrent duplicate into a conflict.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, governorate) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role)
            .bind(&account.governorate)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(DUPLICATE_ACCOUNT.to_string())
                } else {
                    e.into()
                }
            })
    }

    /// update_profile
    ///
    /// Builds the SET clause from the supplied changes only, so omitted fields keep
    /// their stored values and cleared fields become NULL.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Account>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        {
            let mut set = builder.separated(", ");
            set.push("updated_at = NOW()");
            if let Some(name) = changes.name {
                set.push("name = ");
                set.push_bind_unseparated(name);
            }
            push_field_update(&mut set, "birthday", changes.birthday);
            push_field_update(&mut set, "gender", changes.gender);
            push_field_update(&mut set, "phone_number", changes.phone_number);
            push_field_update(&mut set, "profile_picture", changes.profile_picture);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {}", ACCOUNT_COLUMNS));

        let row = builder
            .build_query_as::<Account>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn add_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET enrolled_events = array_append(enrolled_events, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(enrolled_events))",
        )
        .bind(account_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET enrolled_events = array_remove(enrolled_events, $2) WHERE id = $1",
        )
        .bind(account_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let sql = format!("SELECT {} FROM events ORDER BY date ASC", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, Event>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_events_by_category(&self, category: &str) -> AppResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE LOWER(category) = LOWER($1) ORDER BY date ASC",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn random_events(&self, limit: i64) -> AppResult<Vec<Event>> {
        let sql = format!("SELECT {} FROM events ORDER BY random() LIMIT $1", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_event(&self, event: NewEvent) -> AppResult<Event> {
        let sql = format!(
            "INSERT INTO events (id, title, description, date, location, category, cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(Uuid::new_v4())
            .bind(event.title)
            .bind(event.description)
            .bind(event.date)
            .bind(event.location)
            .bind(event.category)
            .bind(event.cost)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_event
    ///
    /// Uses `COALESCE` so that only the fields present in `changes` are written.
    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>> {
        let sql = format!(
            "UPDATE events SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                date = COALESCE($4, date), \
                location = COALESCE($5, location), \
                category = COALESCE($6, category), \
                cost = COALESCE($7, cost) \
             WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.date)
            .bind(changes.location)
            .bind(changes.category)
            .bind(changes.cost)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let sql = format!("DELETE FROM events WHERE id = $1 RETURNING {}", EVENT_COLUMNS);
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>> {
        Ok(sqlx::query_as::<_, Enrollment>(
            "SELECT id, user_id, event_id, enrolled_at FROM enrollments \
             WHERE user_id = $1 AND event_id = $2",
        )
        .bind(account_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// insert_enrollment
    ///
    /// The `UNIQUE (user_id, event_id)` constraint is the race guard: of two concurrent
    /// inserts for the same pair, exactly one succeeds and the other becomes a conflict.
    async fn insert_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            "INSERT INTO enrollments (id, user_id, event_id, enrolled_at) \
             VALUES ($1, $2, $3, NOW()) \
             RETURNING id, user_id, event_id, enrolled_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(ALREADY_ENROLLED.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn delete_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>> {
        Ok(sqlx::query_as::<_, Enrollment>(
            "DELETE FROM enrollments WHERE user_id = $1 AND event_id = $2 \
             RETURNING id, user_id, event_id, enrolled_at",
        )
        .bind(account_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_enrollments(&self, account_id: Uuid) -> AppResult<Vec<EnrollmentWithEvent>> {
        let rows = sqlx::query_as::<_, EnrollmentEventRow>(
            r#"
            SELECT
                en.id AS enrollment_id, en.user_id, en.enrolled_at,
                ev.id, ev.title, ev.description, ev.date, ev.location, ev.category, ev.cost
            FROM enrollments en
            JOIN events ev ON ev.id = en.event_id
            WHERE en.user_id = $1
            ORDER BY en.enrolled_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EnrollmentWithEvent::from).collect())
    }
}
