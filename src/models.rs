use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Trainer,
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Trainer => "trainer",
            Role::Player => "player",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "trainer" => Ok(Role::Trainer),
            "player" => Ok(Role::Player),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    #[default]
    Active,
    Postponed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    Active,
    Resolved,
}

/// Directory entry mirrored from the identity provider. Credentials
/// never reach this service.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One scheduled session, owned by the trainer who created it.
///
/// `attendees` is the pre-session roster (players who registered),
/// `attendance` the post-session record of who actually showed up.
/// Neither list may hold duplicate ids.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Training {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: TrainingStatus,
    pub postponed_date: Option<DateTime<Utc>>,
    pub trainer_id: Uuid,
    pub attendees: Vec<Uuid>,
    pub attendance: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Training {
    pub fn is_attendee(&self, player_id: Uuid) -> bool {
        self.attendees.contains(&player_id)
    }

    /// The instant the session will actually take place: the new date
    /// when postponed with one set, the original date otherwise.
    pub fn target_date(&self) -> DateTime<Utc> {
        match self.status {
            TrainingStatus::Postponed => self.postponed_date.unwrap_or(self.date_time),
            _ => self.date_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Injury {
    pub id: Uuid,
    pub training_id: Uuid,
    pub player_id: Uuid,
    pub description: String,
    pub date: DateTime<Utc>,
    pub status: InjuryStatus,
    pub resolved_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- request payloads ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTraining {
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TrainingStatus>,
}

/// Partial edit; absent fields are left untouched. The optional fields
/// (`description`, `notes`, `postponed_date`) distinguish "absent"
/// from an explicit `null` that clears them.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EditTraining {
    pub date_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    pub status: Option<TrainingStatus>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub postponed_date: Option<Option<DateTime<Utc>>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceSheet {
    pub player_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordInjury {
    pub training_id: Uuid,
    pub player_id: Uuid,
    pub description: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateInjury {
    pub status: InjuryStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

// --- response projections ---

/// Trainer-facing row in the training list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingSummary {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub postponed_date: Option<DateTime<Utc>>,
    pub location: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: TrainingStatus,
    pub attendees_count: usize,
    pub attendance_count: usize,
    pub is_past: bool,
}

/// Player-facing row: upcoming sessions open for registration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingTraining {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub postponed_date: Option<DateTime<Utc>>,
    pub location: String,
    pub description: Option<String>,
    pub status: TrainingStatus,
    pub trainer_name: String,
    pub is_registered: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
    pub trainer_name: String,
    pub was_registered: bool,
    pub attended: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingDetail {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub postponed_date: Option<DateTime<Utc>>,
    pub location: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: TrainingStatus,
    pub trainer_name: String,
    pub attendees: Vec<UserRef>,
    pub attendance: Vec<UserRef>,
}

/// Shape returned from create/edit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingView {
    pub id: Uuid,
    pub date_time: DateTime<Utc>,
    pub postponed_date: Option<DateTime<Utc>>,
    pub location: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: TrainingStatus,
}

impl From<&Training> for TrainingView {
    fn from(t: &Training) -> Self {
        Self {
            id: t.id,
            date_time: t.date_time,
            postponed_date: t.postponed_date,
            location: t.location.clone(),
            description: t.description.clone(),
            notes: t.notes.clone(),
            status: t.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceRecorded {
    pub message: String,
    pub attendance: Vec<Uuid>,
}

/// Injury enriched with the player and training it refers to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InjuryView {
    pub id: Uuid,
    pub training_id: Uuid,
    pub training_date: DateTime<Utc>,
    pub training_location: String,
    pub player_id: Uuid,
    pub player_name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub status: InjuryStatus,
    pub resolved_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserCounts {
    pub total: usize,
    pub admins: usize,
    pub trainers: usize,
    pub players: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Statistics {
    pub users: UserCounts,
    pub trainings: usize,
    pub registrations: usize,
}
