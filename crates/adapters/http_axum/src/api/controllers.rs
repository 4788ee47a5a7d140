//! JSON REST handlers for controllers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use smarthome_domain::controller::Controller;
use smarthome_domain::id::{ActionId, ControllerId};

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// Request body for creating or replacing a controller.
#[derive(Debug, Deserialize)]
pub struct ControllerRequest {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub action_ids: Vec<ActionId>,
}

/// `GET /api/controllers`
pub async fn list<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<Controller>>, ApiError> {
    Ok(Json(state.catalog.list_controllers().await?))
}

/// `GET /api/controllers/{id}`
pub async fn get<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ControllerId>,
) -> Result<Json<Controller>, ApiError> {
    Ok(Json(state.catalog.get_controller(id).await?))
}

/// `POST /api/controllers`
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    Json(req): Json<ControllerRequest>,
) -> Result<(StatusCode, Json<Controller>), ApiError> {
    let controller = Controller::new(req.name, req.address, req.action_ids)?;
    let created = state.catalog.create_controller(controller).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/controllers/{id}`
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ControllerId>,
    Json(req): Json<ControllerRequest>,
) -> Result<Json<Controller>, ApiError> {
    let mut controller = Controller::new(req.name, req.address, req.action_ids)?;
    controller.id = id;
    Ok(Json(state.catalog.update_controller(controller).await?))
}

/// `DELETE /api/controllers/{id}`
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ControllerId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_controller(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
