//! Test harness: the real router over in-memory `SQLite` and a stub device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use smarthome_adapter_storage_sqlite_sqlx::{
    Config, SqliteActionRepository, SqliteAutomationRepository, SqliteControllerRepository,
    SqliteDelayedTaskRepository, SqliteRecurringTaskRepository,
};
use smarthome_app::ports::{Dispatcher, SystemClock};
use smarthome_domain::dispatch::DispatchOutcome;

use crate::state::{AppState, Backend, EngineConfig, Repositories};

/// Answers with a canned outcome per `address + path`, `failed("")` otherwise.
#[derive(Default)]
pub(crate) struct StubDispatcher {
    answers: Mutex<HashMap<String, DispatchOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl StubDispatcher {
    pub(crate) fn answer(&self, address: &str, path: &str, outcome: DispatchOutcome) {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(format!("{address}{path}"), outcome);
    }

    fn called(&self, path: &str) -> bool {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|call| call.ends_with(path))
    }

    /// Chains run on spawned tasks; give them a moment to reach the device.
    pub(crate) async fn wait_for_call(&self, path: &str) -> bool {
        for _ in 0..100 {
            if self.called(path) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Dispatcher for StubDispatcher {
    async fn invoke(&self, address: &str, path: &str) -> DispatchOutcome {
        let key = format!("{address}{path}");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| DispatchOutcome::failed(""))
    }
}

pub(crate) struct TestBackend;

impl Backend for TestBackend {
    type Actions = Arc<SqliteActionRepository>;
    type Controllers = Arc<SqliteControllerRepository>;
    type Automations = Arc<SqliteAutomationRepository>;
    type Recurring = Arc<SqliteRecurringTaskRepository>;
    type Delayed = Arc<SqliteDelayedTaskRepository>;
    type Dispatcher = Arc<StubDispatcher>;
    type Clock = SystemClock;
}

pub(crate) struct Harness {
    pub(crate) router: Router,
    pub(crate) state: AppState<TestBackend>,
    pub(crate) dispatcher: Arc<StubDispatcher>,
}

pub(crate) async fn harness() -> Harness {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .unwrap();
    let pool = db.pool().clone();
    let repos = Repositories::<TestBackend> {
        actions: Arc::new(SqliteActionRepository::new(pool.clone())),
        controllers: Arc::new(SqliteControllerRepository::new(pool.clone())),
        automations: Arc::new(SqliteAutomationRepository::new(pool.clone())),
        recurring: Arc::new(SqliteRecurringTaskRepository::new(pool.clone())),
        delayed: Arc::new(SqliteDelayedTaskRepository::new(pool)),
    };
    let dispatcher = Arc::new(StubDispatcher::default());
    let state = AppState::new(
        repos,
        Arc::clone(&dispatcher),
        SystemClock,
        EngineConfig::default(),
    );
    Harness {
        router: crate::router::build(state.clone()),
        state,
        dispatcher,
    }
}

impl Harness {
    pub(crate) async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub(crate) async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub(crate) async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }
}
