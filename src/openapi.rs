use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{
    AttendanceRecorded, AttendanceSheet, CreateTraining, CreateUser, EditTraining, HistoryEntry,
    InjuryStatus, InjuryView, RecordInjury, Role, Statistics, TrainingDetail, TrainingStatus,
    TrainingSummary, TrainingView, UpcomingTraining, UpdateInjury, UserCounts, UserRef,
    UserSummary,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-id"))),
        );
        components.add_security_scheme(
            "user_role",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-role"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::list_trainings,
        crate::handlers::training_history,
        crate::handlers::training_detail,
        crate::handlers::create_training,
        crate::handlers::edit_training,
        crate::handlers::delete_training,
        crate::handlers::register,
        crate::handlers::unregister,
        crate::handlers::mark_attendance,
        crate::handlers::record_injury,
        crate::handlers::list_injuries,
        crate::handlers::update_injury,
        crate::handlers::list_users,
        crate::handlers::create_user,
        crate::handlers::delete_user,
        crate::handlers::user_statistics
    ),
    components(schemas(
        Role,
        TrainingStatus,
        InjuryStatus,
        CreateTraining,
        EditTraining,
        AttendanceSheet,
        AttendanceRecorded,
        RecordInjury,
        UpdateInjury,
        CreateUser,
        TrainingSummary,
        UpcomingTraining,
        HistoryEntry,
        TrainingDetail,
        TrainingView,
        UserRef,
        UserSummary,
        UserCounts,
        Statistics,
        InjuryView
    )),
    tags(
        (name = "trainings", description = "Training sessions, registration and attendance"),
        (name = "injuries", description = "Injury ledger"),
        (name = "users", description = "User directory and statistics"),
        (name = "meta", description = "Service metadata")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
