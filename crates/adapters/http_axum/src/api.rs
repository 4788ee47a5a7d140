//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod actions;
#[allow(clippy::missing_errors_doc)]
pub mod automations;
#[allow(clippy::missing_errors_doc)]
pub mod controllers;
#[allow(clippy::missing_errors_doc)]
pub mod run;
#[allow(clippy::missing_errors_doc)]
pub mod tasks;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::{AppState, Backend};

/// Build the `/api` sub-router.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        // Invocation
        .route("/run/{controller_id}/{action_id}", get(run::run::<B>))
        // Actions
        .route(
            "/actions",
            get(actions::list::<B>).post(actions::create::<B>),
        )
        .route(
            "/actions/{id}",
            get(actions::get::<B>)
                .put(actions::update::<B>)
                .delete(actions::delete::<B>),
        )
        // Controllers
        .route(
            "/controllers",
            get(controllers::list::<B>).post(controllers::create::<B>),
        )
        .route(
            "/controllers/{id}",
            get(controllers::get::<B>)
                .put(controllers::update::<B>)
                .delete(controllers::delete::<B>),
        )
        .route("/controllers/{id}/tasks", get(tasks::list_for_controller::<B>))
        // Recurring tasks
        .route("/tasks", get(tasks::list::<B>).post(tasks::create::<B>))
        .route(
            "/tasks/{id}",
            get(tasks::get::<B>)
                .put(tasks::update::<B>)
                .delete(tasks::delete::<B>),
        )
        // Delayed tasks
        .route("/scheduled-tasks", get(tasks::list_delayed::<B>))
        .route("/scheduled-tasks/{id}", get(tasks::get_delayed::<B>))
        // Automations
        .route(
            "/automations",
            get(automations::list::<B>).post(automations::create::<B>),
        )
        .route(
            "/automations/{id}",
            get(automations::get::<B>)
                .put(automations::update::<B>)
                .delete(automations::delete::<B>),
        )
        .route(
            "/automations/{id}/nodes",
            post(automations::add_node::<B>),
        )
        .route(
            "/automations/{id}/nodes/{node_id}",
            put(automations::move_node::<B>).delete(automations::remove_node::<B>),
        )
        .route(
            "/automations/{id}/edges",
            post(automations::add_edge::<B>),
        )
        .route(
            "/automations/{id}/edges/{edge_id}",
            put(automations::update_edge::<B>).delete(automations::remove_edge::<B>),
        )
}
