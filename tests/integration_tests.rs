use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tower::Service;
use trainmate::models::{CreateTraining, Role, User};
use trainmate::settings::Settings;
use trainmate::store::{MemoryStore, RosterError};
use trainmate::{AppState, build_router};
use url::Url;
use uuid::Uuid;

const TOKEN: &str = "test-token-123";

/// Helper function to create test app state; the notifier webhook is
/// optional and only wired in the fan-out tests.
fn create_test_state(notifier_base_url: Option<Url>) -> AppState {
    AppState::new(Settings {
        debug: true,
        auth_token: TOKEN.to_string(),
        enable_swagger: false,
        port: 8080,
        notifier_base_url,
    })
}

async fn seed_user(state: &AppState, name: &str, role: Role) -> User {
    state
        .store
        .create_user(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            role,
        )
        .await
        .unwrap()
}

fn training_in_days(days: i64) -> CreateTraining {
    CreateTraining {
        date_time: Utc::now() + Duration::days(days),
        location: "Main hall".into(),
        description: None,
        notes: None,
        status: None,
    }
}

async fn seed_attendees(store: &MemoryStore, training_id: Uuid, attendees: Vec<Uuid>) {
    let seeded: Option<Result<(), RosterError>> = store
        .update_training(training_id, move |t| {
            t.attendees = attendees;
            Ok(())
        })
        .await;
    seeded.unwrap().unwrap();
}

fn request(method: Method, uri: &str, caller: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    if let Some(user) = caller {
        builder = builder
            .header("x-user-id", user.id.to_string())
            .header("x-user-role", user.role.as_str());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to extract response body as JSON
async fn response_body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    // Arrange
    let mut app = build_router(create_test_state(None));

    // Act
    let response = app
        .call(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["message"], "TrainMate API");
}

#[tokio::test]
async fn test_healthz_endpoints() {
    let mut app = build_router(create_test_state(None));

    for uri in ["/healthz/live", "/healthz/ready"] {
        let response = app
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body_json(response.into_body()).await;
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn test_trainings_require_auth() {
    let mut app = build_router(create_test_state(None));

    // No token at all.
    let response = app
        .call(
            Request::builder()
                .uri("/trainings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong token.
    let response = app
        .call(
            Request::builder()
                .uri("/trainings")
                .header(header::AUTHORIZATION, "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Valid token but no identity headers.
    let response = app
        .call(
            Request::builder()
                .uri("/trainings")
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["error"], "missing or malformed x-user-id header");
}

#[tokio::test]
async fn test_training_crud_and_role_shaped_listing() {
    // Arrange
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let player = seed_user(&state, "Ana", Role::Player).await;
    let admin = seed_user(&state, "Root", Role::Admin).await;
    let mut app = build_router(state);

    // Act - trainer creates a session
    let date_time = Utc::now() + Duration::days(7);
    let response = app
        .call(request(
            Method::POST,
            "/trainings",
            Some(&trainer),
            Some(json!({
                "date_time": date_time.to_rfc3339(),
                "location": "Main hall",
                "description": "Team practice"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_body_json(response.into_body()).await;
    assert_eq!(created["status"], "active");
    let id = created["id"].as_str().unwrap().to_string();

    // Trainer listing carries counters.
    let response = app
        .call(request(Method::GET, "/trainings", Some(&trainer), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_body_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["attendees_count"], 0);
    assert_eq!(listed[0]["is_past"], false);

    // Player listing carries the trainer name and registration flag.
    let response = app
        .call(request(Method::GET, "/trainings", Some(&player), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_body_json(response.into_body()).await;
    assert_eq!(listed[0]["trainer_name"], "Coach");
    assert_eq!(listed[0]["is_registered"], false);

    // Admins have no training list.
    let response = app
        .call(request(Method::GET, "/trainings", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Players may not create.
    let response = app
        .call(request(
            Method::POST,
            "/trainings",
            Some(&player),
            Some(json!({
                "date_time": date_time.to_rfc3339(),
                "location": "Main hall"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Blank location is rejected.
    let response = app
        .call(request(
            Method::POST,
            "/trainings",
            Some(&trainer),
            Some(json!({
                "date_time": date_time.to_rfc3339(),
                "location": "   "
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Delete, then the detail is gone.
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/trainings/{id}"),
            Some(&trainer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app
        .call(request(
            Method::GET,
            &format!("/trainings/{id}"),
            Some(&trainer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_flow() {
    // Arrange
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let player = seed_user(&state, "Ana", Role::Player).await;
    let training = state.store.create_training(trainer.id, training_in_days(7)).await;
    let mut app = build_router(state);

    // Act - register
    let response = app
        .call(request(
            Method::POST,
            &format!("/trainings/{}/register", training.id),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["message"], "Registered successfully");

    // Registering again conflicts.
    let response = app
        .call(request(
            Method::POST,
            &format!("/trainings/{}/register", training.id),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["error"], "already registered");

    // Unregister, then unregistering again conflicts too.
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/trainings/{}/unregister", training.id),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/trainings/{}/unregister", training.id),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_postpone_scenario_over_http() {
    // Arrange
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let player = seed_user(&state, "Ana", Role::Player).await;
    let mut app = build_router(state);

    let response = app
        .call(request(
            Method::POST,
            "/trainings",
            Some(&trainer),
            Some(json!({
                "date_time": (Utc::now() + Duration::days(7)).to_rfc3339(),
                "location": "Main hall"
            })),
        ))
        .await
        .unwrap();
    let id = response_body_json(response.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    app.call(request(
        Method::POST,
        &format!("/trainings/{id}/register"),
        Some(&player),
        None,
    ))
    .await
    .unwrap();

    // Act - postpone with no new date: roster cleared, registration shut
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/trainings/{id}"),
            Some(&trainer),
            Some(json!({"status": "postponed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["status"], "postponed");
    assert_eq!(body["postponed_date"], Value::Null);

    let response = app
        .call(request(
            Method::POST,
            &format!("/trainings/{id}/register"),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["error"], "training is postponed, new date not set yet");

    // New date announced: registration reopens.
    let new_date = Utc::now() + Duration::days(21);
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/trainings/{id}"),
            Some(&trainer),
            Some(json!({"postponed_date": new_date.to_rfc3339()})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .call(request(
            Method::POST,
            &format!("/trainings/{id}/register"),
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Back to active: the postponed date is wiped.
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/trainings/{id}"),
            Some(&trainer),
            Some(json!({"status": "active"})),
        ))
        .await
        .unwrap();
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["status"], "active");
    assert_eq!(body["postponed_date"], Value::Null);
}

#[tokio::test]
async fn test_attendance_and_history() {
    // Arrange - a session that already took place, with one registration
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let player = seed_user(&state, "Ana", Role::Player).await;
    let training = state.store.create_training(trainer.id, training_in_days(-1)).await;
    seed_attendees(&state.store, training.id, vec![player.id]).await;
    let mut app = build_router(state);

    // Act - mark attendance, with an unregistered id mixed in
    let response = app
        .call(request(
            Method::POST,
            &format!("/trainings/{}/attendance", training.id),
            Some(&trainer),
            Some(json!({"player_ids": [player.id, Uuid::new_v4()]})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["message"], "Attendance marked");
    assert_eq!(body["attendance"], json!([player.id]));

    // History flags the player's attendance.
    let response = app
        .call(request(
            Method::GET,
            "/trainings/history",
            Some(&player),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = response_body_json(response.into_body()).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["was_registered"], true);
    assert_eq!(history[0]["attended"], true);
}

#[tokio::test]
async fn test_injury_lifecycle_over_http() {
    // Arrange
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let player = seed_user(&state, "Ana", Role::Player).await;
    let training = state.store.create_training(trainer.id, training_in_days(-1)).await;
    seed_attendees(&state.store, training.id, vec![player.id]).await;
    let mut app = build_router(state);

    // Act - record
    let response = app
        .call(request(
            Method::POST,
            "/injuries",
            Some(&trainer),
            Some(json!({
                "training_id": training.id,
                "player_id": player.id,
                "description": "sprained ankle"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let injury = response_body_json(response.into_body()).await;
    assert_eq!(injury["status"], "active");
    assert_eq!(injury["player_name"], "Ana");
    let injury_id = injury["id"].as_str().unwrap().to_string();

    // Recording for an unregistered player is rejected.
    let response = app
        .call(request(
            Method::POST,
            "/injuries",
            Some(&trainer),
            Some(json!({
                "training_id": training.id,
                "player_id": Uuid::new_v4(),
                "description": "bruise"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Resolve, then the active filter comes back empty.
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/injuries/{injury_id}"),
            Some(&trainer),
            Some(json!({"status": "resolved"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = response_body_json(response.into_body()).await;
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolved_date"].is_string());

    let response = app
        .call(request(
            Method::GET,
            "/injuries?status=active",
            Some(&trainer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let active = response_body_json(response.into_body()).await;
    assert!(active.as_array().unwrap().is_empty());

    // Players have no ledger access.
    let response = app
        .call(request(Method::GET, "/injuries", Some(&player), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_incomplete_body_yields_validation_error() {
    // Arrange
    let state = create_test_state(None);
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let mut app = build_router(state);

    // Act - injury report missing player_id and description
    let response = app
        .call(request(
            Method::POST,
            "/injuries",
            Some(&trainer),
            Some(json!({"training_id": Uuid::new_v4()})),
        ))
        .await
        .unwrap();

    // Assert - same status and body shape as any other validation failure
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_body_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_user_directory_over_http() {
    // Arrange
    let state = create_test_state(None);
    let admin = seed_user(&state, "Root", Role::Admin).await;
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let mut app = build_router(state);

    // Non-admins are locked out.
    let response = app
        .call(request(Method::GET, "/users", Some(&trainer), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Act - create, duplicate conflicts
    let response = app
        .call(request(
            Method::POST,
            "/users",
            Some(&admin),
            Some(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "role": "player"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_body_json(response.into_body()).await;
    let ana_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .call(request(
            Method::POST,
            "/users",
            Some(&admin),
            Some(json!({
                "name": "Ana B",
                "email": "ana@example.com",
                "role": "player"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Filtered listing.
    let response = app
        .call(request(Method::GET, "/users?q=ana", Some(&admin), None))
        .await
        .unwrap();
    let listed = response_body_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Ana");

    // Statistics count by role.
    let response = app
        .call(request(
            Method::GET,
            "/users/statistics",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = response_body_json(response.into_body()).await;
    assert_eq!(stats["users"]["total"], 3);
    assert_eq!(stats["users"]["players"], 1);

    // Self-deletion is rejected, deleting Ana works.
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/users/{}", admin.id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/users/{ana_id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_cancellation_fans_out_to_attendees() {
    // Arrange - a webhook sink and two registered players
    let mock_server = MockServer::start();
    let webhook = mock_server.mock(|when, then| {
        when.method(POST).path("/cancellations");
        then.status(200);
    });

    let state = create_test_state(Some(Url::parse(&mock_server.base_url()).unwrap()));
    let trainer = seed_user(&state, "Coach", Role::Trainer).await;
    let ana = seed_user(&state, "Ana", Role::Player).await;
    let bo = seed_user(&state, "Bo", Role::Player).await;
    let store = state.store.clone();
    let training = store.create_training(trainer.id, training_in_days(7)).await;
    seed_attendees(&store, training.id, vec![ana.id, bo.id]).await;
    let mut app = build_router(state);

    // Act - cancel
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/trainings/{}", training.id),
            Some(&trainer),
            Some(json!({"status": "cancelled"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_json(response.into_body()).await;
    assert_eq!(body["status"], "cancelled");

    // Assert - delivery is spawned, so poll until both notices land
    for _ in 0..50 {
        if webhook.hits() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(webhook.hits(), 2);

    // Cancelling a second time sends nothing further.
    let response = app
        .call(request(
            Method::PATCH,
            &format!("/trainings/{}", training.id),
            Some(&trainer),
            Some(json!({"status": "cancelled"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(webhook.hits(), 2);

    // Deleting a session with a roster notifies the same way.
    let doomed = store
        .create_training(trainer.id, training_in_days(8))
        .await;
    seed_attendees(&store, doomed.id, vec![ana.id]).await;
    let response = app
        .call(request(
            Method::DELETE,
            &format!("/trainings/{}", doomed.id),
            Some(&trainer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    for _ in 0..50 {
        if webhook.hits() >= 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(webhook.hits(), 3);
}

#[tokio::test]
async fn test_foreign_trainer_cannot_touch_training() {
    let state = create_test_state(None);
    let owner = seed_user(&state, "Coach", Role::Trainer).await;
    let rival = seed_user(&state, "Rival", Role::Trainer).await;
    let training = state.store.create_training(owner.id, training_in_days(7)).await;
    let mut app = build_router(state);

    for req in [
        request(
            Method::PATCH,
            &format!("/trainings/{}", training.id),
            Some(&rival),
            Some(json!({"location": "Elsewhere"})),
        ),
        request(
            Method::DELETE,
            &format!("/trainings/{}", training.id),
            Some(&rival),
            None,
        ),
        request(
            Method::GET,
            &format!("/trainings/{}", training.id),
            Some(&rival),
            None,
        ),
    ] {
        let response = app.call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
