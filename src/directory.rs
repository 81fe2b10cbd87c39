use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{Identity, ensure_role};
use crate::models::{CreateUser, Role, Statistics, UserCounts, UserSummary};
use crate::store::{MemoryStore, RosterError};
use crate::validation::validate_required_text;

const LIST_LIMIT: usize = 200;

/// Admin-facing user directory. Entries mirror the identity provider's
/// accounts; credentials are never handled here.
pub struct Directory {
    store: Arc<MemoryStore>,
}

impl Directory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        identity: &Identity,
        query: Option<&str>,
    ) -> Result<Vec<UserSummary>, RosterError> {
        ensure_role(identity, Role::Admin)?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        Ok(self
            .store
            .list_users(query, LIST_LIMIT)
            .await
            .iter()
            .map(UserSummary::from)
            .collect())
    }

    pub async fn create(
        &self,
        identity: &Identity,
        req: CreateUser,
    ) -> Result<UserSummary, RosterError> {
        ensure_role(identity, Role::Admin)?;
        validate_required_text("name", &req.name)?;
        validate_required_text("email", &req.email)?;
        let user = self.store.create_user(req.name, req.email, req.role).await?;
        Ok(UserSummary::from(&user))
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), RosterError> {
        ensure_role(identity, Role::Admin)?;
        if id == identity.user_id {
            return Err(RosterError::Validation("cannot delete yourself".into()));
        }
        if self.store.delete_user(id).await {
            Ok(())
        } else {
            Err(RosterError::NotFound("user"))
        }
    }

    pub async fn statistics(&self, identity: &Identity) -> Result<Statistics, RosterError> {
        ensure_role(identity, Role::Admin)?;
        let users = self.store.list_users(None, usize::MAX).await;
        let count = |role: Role| users.iter().filter(|u| u.role == role).count();
        Ok(Statistics {
            users: UserCounts {
                total: users.len(),
                admins: count(Role::Admin),
                trainers: count(Role::Trainer),
                players: count(Role::Player),
            },
            trainings: self.store.count_trainings().await,
            registrations: self.store.count_registrations().await,
        })
    }
}
