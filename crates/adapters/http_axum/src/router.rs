//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, Backend};

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and includes a [`TraceLayer`] that
/// logs each HTTP request/response at the `DEBUG` level.
pub fn build<B: Backend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, harness};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use smarthome_domain::dispatch::DispatchOutcome;

    async fn pump(h: &Harness) -> (String, String, String) {
        let (_, off) = h
            .post("/api/actions", json!({"name": "Pump off", "path": "/pump/off"}))
            .await;
        let (_, on) = h
            .post(
                "/api/actions",
                json!({"name": "Pump on", "path": "/pump/on", "opposite_action_id": off["id"]}),
            )
            .await;
        let (status, ctrl) = h
            .post(
                "/api/controllers",
                json!({"name": "Garden", "address": "10.0.0.7", "action_ids": [on["id"], off["id"]]}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (id(&ctrl), id(&on), id(&off))
    }

    fn id(value: &Value) -> String {
        value["id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let h = harness().await;

        let (status, _) = h.send("GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_run_actuator_and_report_outcome() {
        let h = harness().await;
        let (ctrl, on, _) = pump(&h).await;
        h.dispatcher
            .answer("10.0.0.7", "/pump/on", DispatchOutcome::succeeded("running"));

        let (status, body) = h.get(&format!("/api/run/{ctrl}/{on}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "body": "running"}));
    }

    #[tokio::test]
    async fn should_plan_opposite_when_minutes_given() {
        let h = harness().await;
        let (ctrl, on, off) = pump(&h).await;
        h.dispatcher
            .answer("10.0.0.7", "/pump/on", DispatchOutcome::succeeded("running"));

        let (status, body) = h
            .get(&format!("/api/run/{ctrl}/{on}?minutes_to_run_opposite=20"))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delayed_task"]["action_id"], json!(off));
        let (_, delayed) = h.get("/api/scheduled-tasks").await;
        assert_eq!(delayed.as_array().unwrap().len(), 1);
        assert_eq!(delayed[0]["state"], "active");
        assert_eq!(h.state.scheduler.pending_jobs().len(), 1);
    }

    #[tokio::test]
    async fn should_return_reading_when_action_is_sensor() {
        let h = harness().await;
        let (_, sensor) = h
            .post(
                "/api/actions",
                json!({"name": "Moisture", "path": "/moisture", "is_sensor": true}),
            )
            .await;
        let (_, ctrl) = h
            .post(
                "/api/controllers",
                json!({"name": "Bed", "address": "10.0.0.8", "action_ids": [sensor["id"]]}),
            )
            .await;
        h.dispatcher
            .answer("10.0.0.8", "/moisture", DispatchOutcome::succeeded("37.5"));

        let (status, body) = h
            .get(&format!("/api/run/{}/{}", id(&ctrl), id(&sensor)))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"value": 37.5}));
    }

    #[tokio::test]
    async fn should_return_bad_gateway_when_sensor_is_unreachable() {
        let h = harness().await;
        let (_, sensor) = h
            .post(
                "/api/actions",
                json!({"name": "Moisture", "path": "/moisture", "is_sensor": true}),
            )
            .await;
        let (_, ctrl) = h
            .post(
                "/api/controllers",
                json!({"name": "Bed", "address": "10.0.0.8", "action_ids": [sensor["id"]]}),
            )
            .await;

        let (status, _) = h
            .get(&format!("/api/run/{}/{}", id(&ctrl), id(&sensor)))
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_controller() {
        let h = harness().await;
        let (_, _, off) = pump(&h).await;

        let (status, body) = h
            .get(&format!(
                "/api/run/00000000-0000-4000-8000-000000000000/{off}"
            ))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Controller"));
    }

    #[tokio::test]
    async fn should_return_bad_request_when_id_is_malformed() {
        let h = harness().await;

        let (status, _) = h.send("GET", "/api/actions/not-a-uuid", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_filter_actions_by_kind() {
        let h = harness().await;
        pump(&h).await;
        h.post(
            "/api/actions",
            json!({"name": "Moisture", "path": "/moisture", "is_sensor": true}),
        )
        .await;

        let (_, sensors) = h.get("/api/actions?kind=sensors").await;
        let (_, actuators) = h.get("/api/actions?kind=actuators").await;

        assert_eq!(sensors.as_array().unwrap().len(), 1);
        assert_eq!(actuators.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_schedule_and_cancel_recurring_task() {
        let h = harness().await;
        let (ctrl, on, _) = pump(&h).await;

        let (status, task) = h
            .post(
                "/api/tasks",
                json!({
                    "controller_id": ctrl,
                    "action_id": on,
                    "schedule": {"type": "weekly", "minute": 30, "hour": 6, "weekday": 0}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["schedule"]["type"], "weekly");
        assert_eq!(h.state.scheduler.pending_jobs().len(), 1);

        let (_, listed) = h.get(&format!("/api/controllers/{ctrl}/tasks")).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = h
            .send("DELETE", &format!("/api/tasks/{}", id(&task)), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(h.state.scheduler.pending_jobs().is_empty());
    }

    #[tokio::test]
    async fn should_reject_weekly_task_without_weekday() {
        let h = harness().await;
        let (ctrl, on, _) = pump(&h).await;

        let (status, body) = h
            .post(
                "/api/tasks",
                json!({
                    "controller_id": ctrl,
                    "action_id": on,
                    "schedule": {"type": "weekly", "minute": 30, "hour": 6}
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("weekday"));
        assert!(h.state.scheduler.pending_jobs().is_empty());
    }

    #[tokio::test]
    async fn should_reschedule_task_on_put() {
        let h = harness().await;
        let (ctrl, on, _) = pump(&h).await;
        let (_, task) = h
            .post(
                "/api/tasks",
                json!({
                    "controller_id": ctrl,
                    "action_id": on,
                    "schedule": {"type": "daily", "minute": 0, "hour": 6}
                }),
            )
            .await;

        let (status, updated) = h
            .send(
                "PUT",
                &format!("/api/tasks/{}", id(&task)),
                Some(json!({"schedule": {"type": "monthly", "minute": 0, "hour": 6, "month_day": 1}})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["schedule"]["type"], "monthly");
        assert_eq!(h.state.scheduler.pending_jobs().len(), 1);
    }

    #[tokio::test]
    async fn should_propagate_chain_built_through_api() {
        let h = harness().await;
        let (ctrl, on, off) = pump(&h).await;
        h.dispatcher
            .answer("10.0.0.7", "/pump/on", DispatchOutcome::succeeded("running"));
        h.dispatcher
            .answer("10.0.0.7", "/pump/off", DispatchOutcome::succeeded("stopped"));

        let (_, graph) = h.post("/api/automations", json!({"name": "Flush"})).await;
        let graph = id(&graph);
        let (_, source) = h
            .post(
                &format!("/api/automations/{graph}/nodes"),
                json!({"controller_id": ctrl, "action_id": on, "position": {"x": 0.0, "y": 0.0}}),
            )
            .await;
        let (_, target) = h
            .post(
                &format!("/api/automations/{graph}/nodes"),
                json!({"controller_id": ctrl, "action_id": off}),
            )
            .await;
        let (status, _) = h
            .post(
                &format!("/api/automations/{graph}/edges"),
                json!({"source": source["id"], "target": target["id"], "condition": {"type": "by_trigger"}}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        h.get(&format!("/api/run/{ctrl}/{on}")).await;

        assert!(h.dispatcher.wait_for_call("/pump/off").await);
    }

    #[tokio::test]
    async fn should_reject_boolean_threshold_with_ordering_operator() {
        let h = harness().await;
        let (ctrl, on, off) = pump(&h).await;
        let (_, graph) = h.post("/api/automations", json!({"name": "Flush"})).await;
        let graph = id(&graph);
        let (_, source) = h
            .post(
                &format!("/api/automations/{graph}/nodes"),
                json!({"controller_id": ctrl, "action_id": on}),
            )
            .await;
        let (_, target) = h
            .post(
                &format!("/api/automations/{graph}/nodes"),
                json!({"controller_id": ctrl, "action_id": off}),
            )
            .await;

        let (status, _) = h
            .post(
                &format!("/api/automations/{graph}/edges"),
                json!({
                    "source": source["id"],
                    "target": target["id"],
                    "condition": {
                        "type": "by_value",
                        "operator": ">",
                        "threshold": {"kind": "boolean", "value": true}
                    }
                }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, stored) = h.get(&format!("/api/automations/{graph}")).await;
        assert!(stored["edges"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_deactivate_automation_on_put() {
        let h = harness().await;
        let (_, graph) = h.post("/api/automations", json!({"name": "Flush"})).await;

        let (status, updated) = h
            .send(
                "PUT",
                &format!("/api/automations/{}", id(&graph)),
                Some(json!({"active": false})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["active"], false);
        assert_eq!(updated["name"], "Flush");
    }
}
