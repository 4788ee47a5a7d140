//! `GET /api/run/{controller_id}/{action_id}`: invoke an action now.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use smarthome_app::services::action_service::Invocation;
use smarthome_domain::id::{ActionId, ControllerId};
use smarthome_domain::task::DelayedTask;

use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// Run the action's opposite this many minutes later.
    pub minutes_to_run_opposite: Option<u32>,
}

/// Sensor readings come back as `{"value": …}`, actuator calls as
/// `{"ok": …, "body": …, "delayed_task": …}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunResponse {
    Reading {
        value: f64,
    },
    Actuated {
        ok: bool,
        body: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        delayed_task: Option<DelayedTask>,
    },
}

impl From<Invocation> for RunResponse {
    fn from(invocation: Invocation) -> Self {
        match invocation {
            Invocation::Reading(value) => Self::Reading { value },
            Invocation::Actuated {
                ok,
                body,
                delayed_task,
            } => Self::Actuated {
                ok,
                body,
                delayed_task,
            },
        }
    }
}

pub async fn run<B: Backend>(
    State(state): State<AppState<B>>,
    Path((controller_id, action_id)): Path<(ControllerId, ActionId)>,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunResponse>, ApiError> {
    let invocation = state
        .actions
        .invoke_action(controller_id, action_id, query.minutes_to_run_opposite)
        .await?;
    Ok(Json(invocation.into()))
}
