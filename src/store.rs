use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateTraining, Injury, InjuryStatus, Role, Training, User};

/// Caller-visible failure taxonomy shared by every roster operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
}

/// Document store for the roster: three collections keyed by id.
///
/// Closure-based updates run under the collection write lock, so a
/// membership check plus the matching mutation is a single atomic
/// operation rather than an application-level read-modify-write.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    trainings: RwLock<HashMap<Uuid, Training>>,
    injuries: RwLock<HashMap<Uuid, Injury>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- users ---

    pub async fn create_user(
        &self,
        name: String,
        email: String,
        role: Role,
    ) -> Result<User, RosterError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(RosterError::Conflict("email already in use"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn find_user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Users in the order of `ids`; unknown ids are skipped.
    pub async fn users_by_ids(&self, ids: &[Uuid]) -> Vec<User> {
        let users = self.users.read().await;
        ids.iter().filter_map(|id| users.get(id).cloned()).collect()
    }

    /// Newest first, optional case-insensitive name/email substring match.
    pub async fn list_users(&self, query: Option<&str>, limit: usize) -> Vec<User> {
        let users = self.users.read().await;
        let needle = query.map(str::to_lowercase);
        let mut matched: Vec<User> = users
            .values()
            .filter(|u| match &needle {
                Some(q) => {
                    u.name.to_lowercase().contains(q) || u.email.to_lowercase().contains(q)
                }
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit);
        matched
    }

    pub async fn delete_user(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    // --- trainings ---

    pub async fn create_training(&self, trainer_id: Uuid, req: CreateTraining) -> Training {
        let now = Utc::now();
        let training = Training {
            id: Uuid::new_v4(),
            date_time: req.date_time,
            location: req.location,
            description: req.description,
            notes: req.notes,
            status: req.status.unwrap_or_default(),
            postponed_date: None,
            trainer_id,
            attendees: Vec::new(),
            attendance: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.trainings
            .write()
            .await
            .insert(training.id, training.clone());
        training
    }

    pub async fn find_training(&self, id: Uuid) -> Option<Training> {
        self.trainings.read().await.get(&id).cloned()
    }

    pub async fn trainings_where(&self, pred: impl Fn(&Training) -> bool) -> Vec<Training> {
        self.trainings
            .read()
            .await
            .values()
            .filter(|t| pred(t))
            .cloned()
            .collect()
    }

    /// Applies `f` to the training under the write lock. Returns `None`
    /// when the id is unknown; `updated_at` is bumped only when the
    /// closure succeeds.
    pub async fn update_training<R, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Training) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let mut trainings = self.trainings.write().await;
        let training = trainings.get_mut(&id)?;
        match f(training) {
            Ok(value) => {
                training.updated_at = Utc::now();
                Some(Ok(value))
            }
            Err(err) => Some(Err(err)),
        }
    }

    pub async fn delete_training(&self, id: Uuid) -> Option<Training> {
        self.trainings.write().await.remove(&id)
    }

    pub async fn count_trainings(&self) -> usize {
        self.trainings.read().await.len()
    }

    pub async fn count_registrations(&self) -> usize {
        self.trainings
            .read()
            .await
            .values()
            .map(|t| t.attendees.len())
            .sum()
    }

    // --- injuries ---

    pub async fn create_injury(
        &self,
        training_id: Uuid,
        player_id: Uuid,
        description: String,
        date: chrono::DateTime<Utc>,
    ) -> Injury {
        let now = Utc::now();
        let injury = Injury {
            id: Uuid::new_v4(),
            training_id,
            player_id,
            description,
            date,
            status: InjuryStatus::Active,
            resolved_date: None,
            created_at: now,
            updated_at: now,
        };
        self.injuries.write().await.insert(injury.id, injury.clone());
        injury
    }

    pub async fn find_injury(&self, id: Uuid) -> Option<Injury> {
        self.injuries.read().await.get(&id).cloned()
    }

    pub async fn injuries_where(&self, pred: impl Fn(&Injury) -> bool) -> Vec<Injury> {
        self.injuries
            .read()
            .await
            .values()
            .filter(|i| pred(i))
            .cloned()
            .collect()
    }

    pub async fn update_injury<R, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Injury) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let mut injuries = self.injuries.write().await;
        let injury = injuries.get_mut(&id)?;
        match f(injury) {
            Ok(value) => {
                injury.updated_at = Utc::now();
                Some(Ok(value))
            }
            Err(err) => Some(Err(err)),
        }
    }
}
