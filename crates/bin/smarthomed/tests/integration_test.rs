//! End-to-end tests for the full smarthomed stack.
//!
//! Each test wires the complete application (in-memory `SQLite`, real repos,
//! real engine, real axum router, real HTTP dispatcher) and exercises it
//! through `tower::ServiceExt::oneshot`. Devices are `wiremock` servers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smarthome_adapter_dispatch_reqwest::{self as dispatch, HttpDispatcher};
use smarthome_adapter_http_axum::router;
use smarthome_adapter_http_axum::state::{AppState, Backend, EngineConfig, Repositories};
use smarthome_adapter_storage_sqlite_sqlx::{
    Config, Database, SqliteActionRepository, SqliteAutomationRepository,
    SqliteControllerRepository, SqliteDelayedTaskRepository, SqliteRecurringTaskRepository,
};
use smarthome_app::ports::SystemClock;

struct Stack;

impl Backend for Stack {
    type Actions = Arc<SqliteActionRepository>;
    type Controllers = Arc<SqliteControllerRepository>;
    type Automations = Arc<SqliteAutomationRepository>;
    type Recurring = Arc<SqliteRecurringTaskRepository>;
    type Delayed = Arc<SqliteDelayedTaskRepository>;
    type Dispatcher = HttpDispatcher;
    type Clock = SystemClock;
}

async fn database() -> Database {
    Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise")
}

/// Wire a fresh engine over `db`; calling it twice on one database plays
/// a process restart.
fn state(db: &Database) -> AppState<Stack> {
    let pool = db.pool().clone();
    let repos = Repositories::<Stack> {
        actions: Arc::new(SqliteActionRepository::new(pool.clone())),
        controllers: Arc::new(SqliteControllerRepository::new(pool.clone())),
        automations: Arc::new(SqliteAutomationRepository::new(pool.clone())),
        recurring: Arc::new(SqliteRecurringTaskRepository::new(pool.clone())),
        delayed: Arc::new(SqliteDelayedTaskRepository::new(pool)),
    };
    let dispatcher = HttpDispatcher::new(&dispatch::Config {
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let mut config = EngineConfig::default();
    config.runner.loop_interval = Duration::from_millis(50);
    AppState::new(repos, dispatcher, SystemClock, config)
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_owned()
}

async fn device(answers: &[(&str, &str)]) -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in answers {
        Mock::given(method("GET"))
            .and(path(*route))
            .respond_with(ResponseTemplate::new(200).set_body_string(*body))
            .mount(&server)
            .await;
    }
    server
}

async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}

/// Register `paths` as actions of one controller living at `server`.
async fn controller(app: &axum::Router, server: &MockServer, paths: &[&str]) -> (String, Vec<String>) {
    let mut ids = Vec::new();
    for p in paths {
        let (status, action) = call(
            app,
            "POST",
            "/api/actions",
            Some(json!({"name": p, "path": p})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(id(&action));
    }
    let (status, ctrl) = call(
        app,
        "POST",
        "/api/controllers",
        Some(json!({"name": "Greenhouse", "address": server.address().to_string(), "action_ids": ids})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (id(&ctrl), ids)
}

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let db = database().await;
    let app = router::build(state(&db));

    let (status, _) = call(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn should_call_device_when_running_action() {
    let db = database().await;
    let app = router::build(state(&db));
    let server = device(&[("/fan/on", "spinning")]).await;
    let (ctrl, acts) = controller(&app, &server, &["/fan/on"]).await;

    let (status, body) = call(&app, "GET", &format!("/api/run/{ctrl}/{}", acts[0]), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "body": "spinning"}));
    assert_eq!(hits(&server, "/fan/on").await, 1);
}

#[tokio::test]
async fn should_report_failure_when_device_answers_error() {
    let db = database().await;
    let app = router::build(state(&db));
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (ctrl, acts) = controller(&app, &server, &["/fan/on"]).await;

    let (status, body) = call(&app, "GET", &format!("/api/run/{ctrl}/{}", acts[0]), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn should_follow_value_edge_when_threshold_holds() {
    let db = database().await;
    let app = router::build(state(&db));
    let server = device(&[("/tank/fill", "15"), ("/pump/on", "ok")]).await;
    let (ctrl, acts) = controller(&app, &server, &["/tank/fill", "/pump/on"]).await;

    let (_, graph) = call(&app, "POST", "/api/automations", Some(json!({"name": "Tank"}))).await;
    let graph = id(&graph);
    let mut nodes = Vec::new();
    for action in &acts {
        let (_, node) = call(
            &app,
            "POST",
            &format!("/api/automations/{graph}/nodes"),
            Some(json!({"controller_id": ctrl, "action_id": action})),
        )
        .await;
        nodes.push(id(&node));
    }
    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/automations/{graph}/edges"),
        Some(json!({
            "source": nodes[0],
            "target": nodes[1],
            "condition": {
                "type": "by_value",
                "operator": ">",
                "threshold": {"kind": "number", "value": 10.0},
                "loop": true
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    call(&app, "GET", &format!("/api/run/{ctrl}/{}", acts[0]), None).await;

    for _ in 0..100 {
        if hits(&server, "/pump/on").await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(hits(&server, "/pump/on").await, 1);
    assert_eq!(hits(&server, "/tank/fill").await, 1);
}

#[tokio::test]
async fn should_restore_recurring_and_delayed_jobs_after_restart() {
    let db = database().await;
    let server = device(&[("/valve/open", "open"), ("/valve/close", "closed")]).await;

    let first = state(&db);
    let app = router::build(first.clone());
    let (ctrl, acts) = controller(&app, &server, &["/valve/close"]).await;
    let (_, open) = call(
        &app,
        "POST",
        "/api/actions",
        Some(json!({"name": "open", "path": "/valve/open", "opposite_action_id": acts[0]})),
    )
    .await;
    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/controllers/{ctrl}"),
        Some(json!({"name": "Greenhouse", "address": server.address().to_string(), "action_ids": [acts[0], id(&open)]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({
            "controller_id": ctrl,
            "action_id": acts[0],
            "schedule": {"type": "daily", "minute": 0, "hour": 9}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, run) = call(
        &app,
        "GET",
        &format!("/api/run/{ctrl}/{}?minutes_to_run_opposite=30", id(&open)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["ok"], true);
    assert_eq!(first.scheduler.pending_jobs().len(), 2);

    let second = state(&db);
    let report = second.scheduler.restore().await.unwrap();

    assert_eq!(report.recurring, 1);
    assert_eq!(report.delayed, 1);
    assert_eq!(second.scheduler.pending_jobs().len(), 2);
    assert_eq!(second.scheduler.run_due().await, 0);
    assert_eq!(hits(&server, "/valve/close").await, 0);
}
