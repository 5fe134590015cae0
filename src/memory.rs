use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Account, Enrollment, EnrollmentWithEvent, Event, EventChanges, NewAccount, NewEvent,
        ProfileChanges, StoredAccount,
    },
    repository::{ALREADY_ENROLLED, DUPLICATE_ACCOUNT, Repository},
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, StoredAccount>,
    events: HashMap<Uuid, Event>,
    // Insertion sequence breaks ties between equal timestamps.
    enrollments: Vec<(u64, Enrollment)>,
    next_seq: u64,
}

/// MemoryRepository
///
/// In-process implementation of `Repository`. Used when no `DATABASE_URL` is
/// configured locally, and by the test suite. All checks and writes for one call
/// happen under a single write lock, which gives the same atomic uniqueness
/// guarantees as the Postgres constraints.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    /// When true, back-reference list updates fail with a simulated store error.
    fail_back_references: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose back-reference updates always fail; enrollment rows still work.
    pub fn with_failing_back_references() -> Self {
        let repo = Self::default();
        repo.fail_back_references.store(true, Ordering::SeqCst);
        repo
    }

    fn back_reference_guard(&self) -> AppResult<()> {
        if self.fail_back_references.load(Ordering::SeqCst) {
            return Err(AppError::internal("simulated back-reference store failure"));
        }
        Ok(())
    }
}

fn sort_by_date(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|e| e.date);
    events
}

fn shuffled(mut events: Vec<Event>, limit: usize) -> Vec<Event> {
    use rand::seq::SliceRandom;
    events.shuffle(&mut rand::rng());
    events.truncate(limit);
    events
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<StoredAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|stored| stored.account.email == email)
            .cloned())
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(&id).map(|stored| stored.account.clone()))
    }

    async fn create_account(&self, new: NewAccount) -> AppResult<Account> {
        let mut tables = self.tables.write().await;
        if tables
            .accounts
            .values()
            .any(|stored| stored.account.email == new.email)
        {
            return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            governorate: new.governorate,
            birthday: None,
            gender: None,
            phone_number: None,
            profile_picture: None,
            enrolled_events: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(
            account.id,
            StoredAccount {
                account: account.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(account)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Account>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.accounts.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(&mut stored.account);
        stored.account.updated_at = Utc::now();
        Ok(Some(stored.account.clone()))
    }

    async fn add_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()> {
        self.back_reference_guard()?;
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.accounts.get_mut(&account_id) {
            if !stored.account.enrolled_events.contains(&event_id) {
                stored.account.enrolled_events.push(event_id);
            }
        }
        Ok(())
    }

    async fn remove_enrolled_event(&self, account_id: Uuid, event_id: Uuid) -> AppResult<()> {
        self.back_reference_guard()?;
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.accounts.get_mut(&account_id) {
            stored.account.enrolled_events.retain(|id| *id != event_id);
        }
        Ok(())
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(sort_by_date(tables.events.values().cloned().collect()))
    }

    async fn list_events_by_category(&self, category: &str) -> AppResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let matching = tables
            .events
            .values()
            .filter(|e| e.category.to_lowercase() == category.to_lowercase())
            .cloned()
            .collect();
        Ok(sort_by_date(matching))
    }

    async fn random_events(&self, limit: i64) -> AppResult<Vec<Event>> {
        let all: Vec<Event> = {
            let tables = self.tables.read().await;
            tables.events.values().cloned().collect()
        };
        Ok(shuffled(all, limit.max(0) as usize))
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&id).cloned())
    }

    async fn create_event(&self, new: NewEvent) -> AppResult<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            date: new.date,
            location: new.location,
            category: new.category,
            cost: new.cost,
        };
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> AppResult<Option<Event>> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(description) = changes.description {
            event.description = description;
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(location) = changes.location {
            event.location = location;
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        if let Some(cost) = changes.cost {
            event.cost = cost;
        }
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let mut tables = self.tables.write().await;
        let removed = tables.events.remove(&id);
        if removed.is_some() {
            tables.enrollments.retain(|(_, e)| e.event_id != id);
        }
        Ok(removed)
    }

    async fn find_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .find(|(_, e)| e.user_id == account_id && e.event_id == event_id)
            .map(|(_, e)| e.clone()))
    }

    async fn insert_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if tables
            .enrollments
            .iter()
            .any(|(_, e)| e.user_id == account_id && e.event_id == event_id)
        {
            return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: account_id,
            event_id,
            enrolled_at: Utc::now(),
        };
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.enrollments.push((seq, enrollment.clone()));
        Ok(enrollment)
    }

    async fn delete_enrollment(&self, account_id: Uuid, event_id: Uuid) -> AppResult<Option<Enrollment>> {
        let mut tables = self.tables.write().await;
        let position = tables
            .enrollments
            .iter()
            .position(|(_, e)| e.user_id == account_id && e.event_id == event_id);
        Ok(position.map(|idx| tables.enrollments.remove(idx).1))
    }

    async fn list_enrollments(&self, account_id: Uuid) -> AppResult<Vec<EnrollmentWithEvent>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(u64, EnrollmentWithEvent)> = tables
            .enrollments
            .iter()
            .filter(|(_, e)| e.user_id == account_id)
            .filter_map(|(seq, e)| {
                tables.events.get(&e.event_id).map(|event| {
                    (
                        *seq,
                        EnrollmentWithEvent {
                            id: e.id,
                            user_id: e.user_id,
                            enrolled_at: e.enrolled_at,
                            event: event.clone(),
                        },
                    )
                })
            })
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.enrolled_at
                .cmp(&a.enrolled_at)
                .then_with(|| b_seq.cmp(a_seq))
        });
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}
