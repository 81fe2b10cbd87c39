use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{Identity, ensure_role, ensure_training_owner};
use crate::models::{Injury, InjuryStatus, InjuryView, RecordInjury, Role, Training};
use crate::store::{MemoryStore, RosterError};
use crate::validation::validate_required_text;

/// Post-session injury ledger, scoped to the trainings a trainer owns.
/// Injuries are never deleted; only their status toggles.
pub struct InjuryLedger {
    store: Arc<MemoryStore>,
}

fn build_view(injury: Injury, training: &Training, player_name: String) -> InjuryView {
    InjuryView {
        id: injury.id,
        training_id: injury.training_id,
        training_date: training.date_time,
        training_location: training.location.clone(),
        player_id: injury.player_id,
        player_name,
        description: injury.description,
        date: injury.date,
        status: injury.status,
        resolved_date: injury.resolved_date,
    }
}

impl InjuryLedger {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Records an injury for a player who was registered for the
    /// session. Only the owning trainer may write to the ledger.
    pub async fn record(
        &self,
        identity: &Identity,
        req: RecordInjury,
    ) -> Result<InjuryView, RosterError> {
        let training = self
            .store
            .find_training(req.training_id)
            .await
            .ok_or(RosterError::NotFound("training"))?;
        ensure_training_owner(identity, &training)?;
        validate_required_text("description", &req.description)?;
        if !training.is_attendee(req.player_id) {
            return Err(RosterError::Validation(
                "player was not registered for this training".into(),
            ));
        }

        let injury = self
            .store
            .create_injury(
                req.training_id,
                req.player_id,
                req.description,
                req.date.unwrap_or_else(Utc::now),
            )
            .await;
        let player_name = self.player_name(injury.player_id).await;
        Ok(build_view(injury, &training, player_name))
    }

    /// All injuries across the caller's trainings, newest first,
    /// optionally narrowed to one status.
    pub async fn list(
        &self,
        identity: &Identity,
        status: Option<InjuryStatus>,
    ) -> Result<Vec<InjuryView>, RosterError> {
        ensure_role(identity, Role::Trainer)?;
        let owned = self
            .store
            .trainings_where(|t| t.trainer_id == identity.user_id)
            .await;
        let owned_ids: HashSet<Uuid> = owned.iter().map(|t| t.id).collect();
        let trainings: HashMap<Uuid, &Training> = owned.iter().map(|t| (t.id, t)).collect();

        let mut injuries = self
            .store
            .injuries_where(|i| {
                owned_ids.contains(&i.training_id) && status.is_none_or(|s| i.status == s)
            })
            .await;
        injuries.sort_by(|a, b| b.date.cmp(&a.date));

        let player_ids: Vec<Uuid> = injuries
            .iter()
            .map(|i| i.player_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let player_names: HashMap<Uuid, String> = self
            .store
            .users_by_ids(&player_ids)
            .await
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(injuries
            .into_iter()
            .filter_map(|injury| {
                let training = trainings.get(&injury.training_id)?;
                let name = player_names
                    .get(&injury.player_id)
                    .cloned()
                    .unwrap_or_else(|| "N/A".into());
                Some(build_view(injury, training, name))
            })
            .collect())
    }

    /// Resolving stamps `resolved_date`; reactivating clears it.
    pub async fn set_status(
        &self,
        identity: &Identity,
        id: Uuid,
        status: InjuryStatus,
    ) -> Result<InjuryView, RosterError> {
        let injury = self
            .store
            .find_injury(id)
            .await
            .ok_or(RosterError::NotFound("injury"))?;
        let training = self
            .store
            .find_training(injury.training_id)
            .await
            .ok_or(RosterError::NotFound("training"))?;
        ensure_training_owner(identity, &training)?;

        let updated = self
            .store
            .update_injury(id, |i| {
                i.status = status;
                i.resolved_date = match status {
                    InjuryStatus::Resolved => Some(Utc::now()),
                    InjuryStatus::Active => None,
                };
                Ok::<_, RosterError>(i.clone())
            })
            .await
            .ok_or(RosterError::NotFound("injury"))??;
        let player_name = self.player_name(updated.player_id).await;
        Ok(build_view(updated, &training, player_name))
    }

    async fn player_name(&self, player_id: Uuid) -> String {
        self.store
            .find_user(player_id)
            .await
            .map(|u| u.name)
            .unwrap_or_else(|| "N/A".into())
    }
}
