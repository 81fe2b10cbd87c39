use axum::extract::{FromRequest, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::{
    AttendanceRecorded, AttendanceSheet, CreateTraining, CreateUser, EditTraining, InjuryStatus,
    RecordInjury, Role, UpdateInjury,
};
use crate::trainings::TrainingFilter;
use crate::AppState;

/// JSON body extractor whose rejection carries the API's `{"error"}`
/// shape and a 400 instead of axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, serde::Deserialize, IntoParams)]
pub struct TrainingListQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

#[derive(Debug, serde::Deserialize, IntoParams)]
pub struct InjuryListQuery {
    pub status: Option<InjuryStatus>,
}

#[derive(Debug, serde::Deserialize, IntoParams)]
pub struct UserListQuery {
    pub q: Option<String>,
}

#[utoipa::path(get, path = "/", tag = "meta")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "TrainMate API",
        "endpoints": {
            "/trainings": "Training sessions and registration",
            "/injuries": "Injury ledger",
            "/users": "User directory (admin)"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "meta")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "meta")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/trainings",
    params(TrainingListQuery),
    responses(
        (status = 200, description = "Role-shaped training list"),
        (status = 403, description = "Role has no training list")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn list_trainings(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<TrainingListQuery>,
) -> Result<Response, ApiError> {
    match identity.role {
        Role::Trainer => {
            let filter = TrainingFilter {
                from: query.from,
                to: query.to,
                location: query.location,
            };
            let items = state.trainings.list_for_trainer(&identity, &filter).await?;
            Ok(Json(items).into_response())
        }
        Role::Player => {
            let items = state.trainings.list_upcoming_for_player(&identity).await?;
            Ok(Json(items).into_response())
        }
        Role::Admin => Err(ApiError::Forbidden(
            "no training list for admin accounts".into(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/trainings/history",
    responses(
        (status = 200, description = "Past, non-cancelled trainings for the calling player"),
        (status = 403, description = "Caller is not a player")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn training_history(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.trainings.history(&identity).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/trainings/{id}",
    params(("id" = Uuid, Path, description = "Training id")),
    responses(
        (status = 200, description = "Training detail with rosters"),
        (status = 403, description = "Trainer does not own this training"),
        (status = 404, description = "Unknown training")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn training_detail(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.trainings.detail(&identity, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/trainings",
    request_body = CreateTraining,
    responses(
        (status = 201, description = "Training created"),
        (status = 400, description = "Missing required fields"),
        (status = 403, description = "Caller is not a trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn create_training(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(payload): JsonBody<CreateTraining>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.trainings.create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    patch,
    path = "/trainings/{id}",
    params(("id" = Uuid, Path, description = "Training id")),
    request_body = EditTraining,
    responses(
        (status = 200, description = "Updated training"),
        (status = 403, description = "Caller does not own this training"),
        (status = 404, description = "Unknown training")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn edit_training(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<EditTraining>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.trainings.edit(&identity, id, payload).await?;
    Ok(Json(view))
}

#[utoipa::path(
    delete,
    path = "/trainings/{id}",
    params(("id" = Uuid, Path, description = "Training id")),
    responses(
        (status = 204, description = "Training deleted, attendees notified"),
        (status = 403, description = "Caller does not own this training"),
        (status = 404, description = "Unknown training")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn delete_training(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.trainings.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/trainings/{id}/register",
    params(("id" = Uuid, Path, description = "Training id")),
    responses(
        (status = 201, description = "Registered"),
        (status = 400, description = "Registration window closed"),
        (status = 404, description = "Unknown training"),
        (status = 409, description = "Already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn register(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.trainings.register(&identity, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"message": "Registered successfully"})),
    ))
}

#[utoipa::path(
    delete,
    path = "/trainings/{id}/unregister",
    params(("id" = Uuid, Path, description = "Training id")),
    responses(
        (status = 204, description = "Unregistered"),
        (status = 404, description = "Unknown training"),
        (status = 409, description = "Caller was not registered")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn unregister(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.trainings.unregister(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/trainings/{id}/attendance",
    params(("id" = Uuid, Path, description = "Training id")),
    request_body = AttendanceSheet,
    responses(
        (status = 200, description = "Attendance replaced", body = AttendanceRecorded),
        (status = 400, description = "Training has not taken place yet"),
        (status = 403, description = "Caller does not own this training"),
        (status = 404, description = "Unknown training")
    ),
    security(("bearer_auth" = [])),
    tag = "trainings"
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AttendanceSheet>,
) -> Result<impl IntoResponse, ApiError> {
    let attendance = state
        .trainings
        .mark_attendance(&identity, id, payload.player_ids)
        .await?;
    Ok(Json(AttendanceRecorded {
        message: "Attendance marked".into(),
        attendance,
    }))
}

#[utoipa::path(
    post,
    path = "/injuries",
    request_body = RecordInjury,
    responses(
        (status = 201, description = "Injury recorded"),
        (status = 400, description = "Player was not registered or description missing"),
        (status = 403, description = "Caller does not own the training"),
        (status = 404, description = "Unknown training")
    ),
    security(("bearer_auth" = [])),
    tag = "injuries"
)]
pub async fn record_injury(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(payload): JsonBody<RecordInjury>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.injuries.record(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/injuries",
    params(InjuryListQuery),
    responses(
        (status = 200, description = "Injuries across the caller's trainings, newest first"),
        (status = 403, description = "Caller is not a trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "injuries"
)]
pub async fn list_injuries(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<InjuryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.injuries.list(&identity, query.status).await?;
    Ok(Json(items))
}

#[utoipa::path(
    patch,
    path = "/injuries/{id}",
    params(("id" = Uuid, Path, description = "Injury id")),
    request_body = UpdateInjury,
    responses(
        (status = 200, description = "Updated injury"),
        (status = 403, description = "Caller does not own the training"),
        (status = 404, description = "Unknown injury")
    ),
    security(("bearer_auth" = [])),
    tag = "injuries"
)]
pub async fn update_injury(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateInjury>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.injuries.set_status(&identity, id, payload.status).await?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Directory entries, newest first"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.directory.list(&identity, query.q.as_deref()).await?;
    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Directory entry created"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(payload): JsonBody<CreateUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.directory.create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Directory entry removed"),
        (status = 400, description = "Self-deletion rejected"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown user")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.directory.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/statistics",
    responses(
        (status = 200, description = "User, training and registration counts"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn user_statistics(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.directory.statistics(&identity).await?;
    Ok(Json(stats))
}
