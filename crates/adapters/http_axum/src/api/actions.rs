//! JSON REST handlers for the action catalog.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use smarthome_app::services::catalog_service::ActionFilter;
use smarthome_domain::action::Action;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::ActionId;

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// Request body for creating or replacing an action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    pub path: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_sensor: bool,
    pub opposite_action_id: Option<ActionId>,
}

impl ActionRequest {
    fn into_action(self, id: Option<ActionId>) -> Result<Action, SmartHomeError> {
        let mut builder = Action::builder()
            .name(self.name)
            .path(self.path)
            .sensor(self.is_sensor);
        if let Some(id) = id {
            builder = builder.id(id);
        }
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(opposite) = self.opposite_action_id {
            builder = builder.opposite(opposite);
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Sensors,
    Actuators,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<ActionKind>,
}

/// `GET /api/actions?kind=sensors|actuators`
pub async fn list<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Action>>, ApiError> {
    let filter = match query.kind {
        None => ActionFilter::All,
        Some(ActionKind::Sensors) => ActionFilter::Sensors,
        Some(ActionKind::Actuators) => ActionFilter::Actuators,
    };
    Ok(Json(state.catalog.list_actions(filter).await?))
}

/// `GET /api/actions/{id}`
pub async fn get<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ActionId>,
) -> Result<Json<Action>, ApiError> {
    Ok(Json(state.catalog.get_action(id).await?))
}

/// `POST /api/actions`
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    Json(req): Json<ActionRequest>,
) -> Result<(StatusCode, Json<Action>), ApiError> {
    let action = req.into_action(None)?;
    let created = state.catalog.create_action(action).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/actions/{id}`
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ActionId>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Action>, ApiError> {
    let action = req.into_action(Some(id))?;
    Ok(Json(state.catalog.update_action(action).await?))
}

/// `DELETE /api/actions/{id}`
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<ActionId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_action(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
