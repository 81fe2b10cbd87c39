use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{Identity, ensure_role, ensure_training_owner};
use crate::models::{
    CreateTraining, EditTraining, HistoryEntry, Role, Training, TrainingDetail, TrainingStatus,
    TrainingSummary, TrainingView, UpcomingTraining, User, UserRef,
};
use crate::notifier::{CancelledTraining, NotificationDispatcher};
use crate::store::{MemoryStore, RosterError};
use crate::validation::validate_required_text;

/// Trainer-side list filters: date window on the original instant and
/// a case-insensitive location substring.
#[derive(Debug, Clone, Default)]
pub struct TrainingFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// Owns the training lifecycle: the status state machine with its
/// cascades, player registration, and the role-shaped read side.
pub struct TrainingManager {
    store: Arc<MemoryStore>,
    dispatcher: NotificationDispatcher,
}

struct CancellationFanOut {
    attendee_ids: Vec<Uuid>,
    summary: CancelledTraining,
}

fn cancellation_summary(training: &Training) -> CancelledTraining {
    CancelledTraining {
        date_time: training.date_time,
        location: training.location.clone(),
        description: training.description.clone(),
    }
}

fn user_ref(user: User) -> UserRef {
    UserRef {
        id: user.id,
        name: user.name,
        email: user.email,
    }
}

impl TrainingManager {
    pub fn new(store: Arc<MemoryStore>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        req: CreateTraining,
    ) -> Result<TrainingView, RosterError> {
        ensure_role(identity, Role::Trainer)?;
        validate_required_text("location", &req.location)?;
        let training = self.store.create_training(identity.user_id, req).await;
        Ok(TrainingView::from(&training))
    }

    /// Applies a partial edit. Status cascades:
    /// - active -> postponed clears the attendee roster;
    /// - leaving postponed clears the postponed date;
    /// - the first transition into cancelled fans out one notice per
    ///   attendee without blocking the caller.
    pub async fn edit(
        &self,
        identity: &Identity,
        id: Uuid,
        patch: EditTraining,
    ) -> Result<TrainingView, RosterError> {
        let identity = *identity;
        let (view, fan_out) = self
            .store
            .update_training(id, move |t| {
                ensure_training_owner(&identity, t)?;
                if let Some(location) = patch.location {
                    validate_required_text("location", &location)?;
                    t.location = location;
                }
                if let Some(date_time) = patch.date_time {
                    t.date_time = date_time;
                }
                if let Some(description) = patch.description {
                    t.description = description;
                }
                if let Some(notes) = patch.notes {
                    t.notes = notes;
                }

                let mut fan_out = None;
                if let Some(status) = patch.status {
                    let was_active = t.status == TrainingStatus::Active;
                    let was_cancelled = t.status == TrainingStatus::Cancelled;
                    t.status = status;
                    if status == TrainingStatus::Postponed {
                        if let Some(postponed_date) = patch.postponed_date {
                            t.postponed_date = postponed_date;
                        }
                        // Players must re-register once a firm date exists.
                        if was_active {
                            t.attendees.clear();
                        }
                    } else {
                        t.postponed_date = None;
                    }
                    if status == TrainingStatus::Cancelled
                        && !was_cancelled
                        && !t.attendees.is_empty()
                    {
                        fan_out = Some(CancellationFanOut {
                            attendee_ids: t.attendees.clone(),
                            summary: cancellation_summary(t),
                        });
                    }
                } else if let Some(postponed_date) = patch.postponed_date {
                    t.postponed_date = postponed_date;
                }

                Ok((TrainingView::from(&*t), fan_out))
            })
            .await
            .ok_or(RosterError::NotFound("training"))??;

        if let Some(fan_out) = fan_out {
            let recipients = self.store.users_by_ids(&fan_out.attendee_ids).await;
            self.dispatcher
                .dispatch_cancellations(recipients, fan_out.summary);
        }
        Ok(view)
    }

    /// Deletes the training; any registered attendees are notified
    /// first, the same fan-out as a cancellation.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), RosterError> {
        let training = self
            .store
            .find_training(id)
            .await
            .ok_or(RosterError::NotFound("training"))?;
        ensure_training_owner(identity, &training)?;

        if !training.attendees.is_empty() {
            let recipients = self.store.users_by_ids(&training.attendees).await;
            self.dispatcher
                .dispatch_cancellations(recipients, cancellation_summary(&training));
        }
        self.store.delete_training(id).await;
        Ok(())
    }

    pub async fn register(&self, identity: &Identity, id: Uuid) -> Result<(), RosterError> {
        ensure_role(identity, Role::Player)?;
        let player_id = identity.user_id;
        let now = Utc::now();
        self.store
            .update_training(id, move |t| {
                if t.status == TrainingStatus::Cancelled {
                    return Err(RosterError::InvalidState("training is cancelled"));
                }
                if t.status == TrainingStatus::Postponed && t.postponed_date.is_none() {
                    return Err(RosterError::InvalidState(
                        "training is postponed, new date not set yet",
                    ));
                }
                if t.target_date() < now {
                    return Err(RosterError::InvalidState("training has already taken place"));
                }
                if t.is_attendee(player_id) {
                    return Err(RosterError::Conflict("already registered"));
                }
                t.attendees.push(player_id);
                Ok(())
            })
            .await
            .ok_or(RosterError::NotFound("training"))?
    }

    /// A player may always withdraw, whatever the status or date.
    pub async fn unregister(&self, identity: &Identity, id: Uuid) -> Result<(), RosterError> {
        ensure_role(identity, Role::Player)?;
        let player_id = identity.user_id;
        self.store
            .update_training(id, move |t| {
                if !t.is_attendee(player_id) {
                    return Err(RosterError::Conflict("not registered"));
                }
                t.attendees.retain(|a| *a != player_id);
                Ok(())
            })
            .await
            .ok_or(RosterError::NotFound("training"))?
    }

    /// Replaces the attendance record with the supplied ids, filtered
    /// to players who actually registered. Idempotent: repeated calls
    /// overwrite prior marks.
    pub async fn mark_attendance(
        &self,
        identity: &Identity,
        id: Uuid,
        player_ids: Vec<Uuid>,
    ) -> Result<Vec<Uuid>, RosterError> {
        let identity = *identity;
        let now = Utc::now();
        self.store
            .update_training(id, move |t| {
                ensure_training_owner(&identity, t)?;
                if t.date_time > now {
                    return Err(RosterError::InvalidState(
                        "cannot mark attendance for a future training",
                    ));
                }
                let mut seen = HashSet::new();
                let confirmed: Vec<Uuid> = player_ids
                    .into_iter()
                    .filter(|id| t.attendees.contains(id) && seen.insert(*id))
                    .collect();
                t.attendance = confirmed.clone();
                Ok(confirmed)
            })
            .await
            .ok_or(RosterError::NotFound("training"))?
    }

    pub async fn list_for_trainer(
        &self,
        identity: &Identity,
        filter: &TrainingFilter,
    ) -> Result<Vec<TrainingSummary>, RosterError> {
        ensure_role(identity, Role::Trainer)?;
        let needle = filter.location.as_deref().map(str::to_lowercase);
        let mut items = self
            .store
            .trainings_where(|t| {
                t.trainer_id == identity.user_id
                    && filter.from.is_none_or(|from| t.date_time >= from)
                    && filter.to.is_none_or(|to| t.date_time <= to)
                    && needle
                        .as_deref()
                        .is_none_or(|n| t.location.to_lowercase().contains(n))
            })
            .await;
        items.sort_by_key(|t| t.date_time);

        let now = Utc::now();
        Ok(items
            .into_iter()
            .map(|t| TrainingSummary {
                id: t.id,
                date_time: t.date_time,
                postponed_date: t.postponed_date,
                location: t.location,
                description: t.description,
                notes: t.notes,
                status: t.status,
                attendees_count: t.attendees.len(),
                attendance_count: t.attendance.len(),
                is_past: t.date_time < now,
            })
            .collect())
    }

    /// Upcoming sessions a player could attend: active ones still
    /// ahead, plus postponed ones whose new date is set and ahead.
    pub async fn list_upcoming_for_player(
        &self,
        identity: &Identity,
    ) -> Result<Vec<UpcomingTraining>, RosterError> {
        ensure_role(identity, Role::Player)?;
        let now = Utc::now();

        let mut active = self
            .store
            .trainings_where(|t| t.status == TrainingStatus::Active && t.date_time >= now)
            .await;
        active.sort_by_key(|t| t.date_time);

        let mut postponed = self
            .store
            .trainings_where(|t| {
                t.status == TrainingStatus::Postponed
                    && t.postponed_date.is_some_and(|d| d >= now)
            })
            .await;
        postponed.sort_by_key(|t| t.postponed_date);

        let items: Vec<Training> = active.into_iter().chain(postponed).collect();
        let trainer_names = self.trainer_names(&items).await;
        Ok(items
            .into_iter()
            .map(|t| {
                let is_registered = t.is_attendee(identity.user_id);
                UpcomingTraining {
                    id: t.id,
                    date_time: t.date_time,
                    postponed_date: t.postponed_date,
                    location: t.location,
                    description: t.description,
                    status: t.status,
                    trainer_name: trainer_name_for(&trainer_names, t.trainer_id),
                    is_registered,
                }
            })
            .collect())
    }

    /// Past, non-cancelled sessions, newest first, flagged with the
    /// player's own registration and attendance.
    pub async fn history(&self, identity: &Identity) -> Result<Vec<HistoryEntry>, RosterError> {
        ensure_role(identity, Role::Player)?;
        let now = Utc::now();
        let mut items = self
            .store
            .trainings_where(|t| t.date_time < now && t.status != TrainingStatus::Cancelled)
            .await;
        items.sort_by(|a, b| b.date_time.cmp(&a.date_time));

        let trainer_names = self.trainer_names(&items).await;
        Ok(items
            .into_iter()
            .map(|t| {
                let was_registered = t.is_attendee(identity.user_id);
                let attended = t.attendance.contains(&identity.user_id);
                HistoryEntry {
                    id: t.id,
                    date_time: t.date_time,
                    location: t.location,
                    description: t.description,
                    trainer_name: trainer_name_for(&trainer_names, t.trainer_id),
                    was_registered,
                    attended,
                }
            })
            .collect())
    }

    pub async fn detail(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<TrainingDetail, RosterError> {
        let training = self
            .store
            .find_training(id)
            .await
            .ok_or(RosterError::NotFound("training"))?;
        if identity.role == Role::Trainer {
            ensure_training_owner(identity, &training)?;
        }

        let trainer_name = self
            .store
            .find_user(training.trainer_id)
            .await
            .map(|u| u.name)
            .unwrap_or_else(|| "N/A".into());
        let attendees = self.store.users_by_ids(&training.attendees).await;
        let attendance = self.store.users_by_ids(&training.attendance).await;

        // Notes are a trainer-facing field; players never see them.
        let own = training.trainer_id == identity.user_id || identity.role == Role::Admin;
        Ok(TrainingDetail {
            id: training.id,
            date_time: training.date_time,
            postponed_date: training.postponed_date,
            location: training.location,
            description: training.description,
            notes: if own { training.notes } else { None },
            status: training.status,
            trainer_name,
            attendees: attendees.into_iter().map(user_ref).collect(),
            attendance: attendance.into_iter().map(user_ref).collect(),
        })
    }

    async fn trainer_names(&self, trainings: &[Training]) -> HashMap<Uuid, String> {
        let ids: Vec<Uuid> = trainings
            .iter()
            .map(|t| t.trainer_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        self.store
            .users_by_ids(&ids)
            .await
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect()
    }
}

fn trainer_name_for(names: &HashMap<Uuid, String>, trainer_id: Uuid) -> String {
    names.get(&trainer_id).cloned().unwrap_or_else(|| "N/A".into())
}
