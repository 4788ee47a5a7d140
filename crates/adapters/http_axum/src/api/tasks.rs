//! JSON REST handlers for recurring and delayed tasks.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use smarthome_app::services::task_service::RecurringTaskUpdate;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{ActionId, ControllerId, DelayedTaskId, RecurringTaskId};
use smarthome_domain::task::{DelayedTask, RecurringTask, Schedule, ScheduleKind};

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// Flat schedule fields, checked against the schedule kind.
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(rename = "type")]
    pub kind: ScheduleKind,
    pub minute: u8,
    pub hour: u8,
    pub weekday: Option<u8>,
    pub month_day: Option<u8>,
}

impl TryFrom<ScheduleRequest> for Schedule {
    type Error = SmartHomeError;

    fn try_from(req: ScheduleRequest) -> Result<Self, Self::Error> {
        Schedule::from_parts(req.kind, req.minute, req.hour, req.weekday, req.month_day)
    }
}

/// Request body for creating a recurring task.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub controller_id: ControllerId,
    pub action_id: ActionId,
    pub schedule: ScheduleRequest,
}

/// Request body for rescheduling a recurring task. Absent fields are kept.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub action_id: Option<ActionId>,
    pub schedule: Option<ScheduleRequest>,
}

/// `GET /api/tasks`
pub async fn list<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<RecurringTask>>, ApiError> {
    Ok(Json(state.tasks.list_recurring_tasks().await?))
}

/// `GET /api/controllers/{id}/tasks`
pub async fn list_for_controller<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ControllerId>,
) -> Result<Json<Vec<RecurringTask>>, ApiError> {
    Ok(Json(state.tasks.list_controller_tasks(id).await?))
}

/// `GET /api/tasks/{id}`
pub async fn get<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<RecurringTaskId>,
) -> Result<Json<RecurringTask>, ApiError> {
    Ok(Json(state.tasks.get_recurring_task(id).await?))
}

/// `POST /api/tasks`
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<RecurringTask>), ApiError> {
    let schedule = Schedule::try_from(req.schedule)?;
    let task = state
        .tasks
        .create_recurring_task(req.controller_id, req.action_id, schedule)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /api/tasks/{id}`
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<RecurringTaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<RecurringTask>, ApiError> {
    let update = RecurringTaskUpdate {
        action_id: req.action_id,
        schedule: req.schedule.map(Schedule::try_from).transpose()?,
    };
    Ok(Json(state.tasks.update_recurring_task(id, update).await?))
}

/// `DELETE /api/tasks/{id}`
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<RecurringTaskId>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete_recurring_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/scheduled-tasks`
pub async fn list_delayed<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<DelayedTask>>, ApiError> {
    Ok(Json(state.tasks.list_delayed_tasks().await?))
}

/// `GET /api/scheduled-tasks/{id}`
pub async fn get_delayed<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<DelayedTaskId>,
) -> Result<Json<DelayedTask>, ApiError> {
    Ok(Json(state.tasks.get_delayed_task(id).await?))
}
