pub mod auth;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod injuries;
pub mod models;
pub mod notifier;
pub mod openapi;
pub mod settings;
pub mod store;
pub mod trainings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use handlers::{
    create_training, create_user, delete_training, delete_user, edit_training, healthz_live,
    healthz_ready, list_injuries, list_trainings, list_users, mark_attendance, record_injury,
    register, root, training_detail, training_history, unregister, update_injury, user_statistics,
};
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::directory::Directory;
use crate::injuries::InjuryLedger;
use crate::notifier::NotificationDispatcher;
use crate::openapi::ApiDoc;
use crate::settings::Settings;
use crate::store::MemoryStore;
use crate::trainings::TrainingManager;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<MemoryStore>,
    pub trainings: Arc<TrainingManager>,
    pub injuries: Arc<InjuryLedger>,
    pub directory: Arc<Directory>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher::new(settings.notifier_base_url.clone());
        Self {
            settings,
            store: store.clone(),
            trainings: Arc::new(TrainingManager::new(store.clone(), dispatcher)),
            injuries: Arc::new(InjuryLedger::new(store.clone())),
            directory: Arc::new(Directory::new(store)),
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings);

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting TrainMate API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/trainings", get(list_trainings).post(create_training))
        .route("/trainings/history", get(training_history))
        .route(
            "/trainings/{id}",
            get(training_detail)
                .patch(edit_training)
                .delete(delete_training),
        )
        .route("/trainings/{id}/register", post(register))
        .route("/trainings/{id}/unregister", delete(unregister))
        .route("/trainings/{id}/attendance", post(mark_attendance))
        .route("/injuries", get(list_injuries).post(record_injury))
        .route("/injuries/{id}", patch(update_injury))
        .route("/users", get(list_users).post(create_user))
        .route("/users/statistics", get(user_statistics))
        .route("/users/{id}", delete(delete_user))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(CorsLayer::permissive()).layer(trace_layer)
}
