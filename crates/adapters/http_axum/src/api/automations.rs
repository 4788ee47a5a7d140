//! JSON REST handlers for automation graphs.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use smarthome_domain::automation::{
    AutomationEdge, AutomationGraph, AutomationNode, Condition, Position,
};
use smarthome_domain::id::{ActionId, AutomationId, ControllerId, EdgeId, NodeId};

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// Request body for creating an automation.
#[derive(Debug, Deserialize)]
pub struct CreateAutomationRequest {
    pub name: String,
}

/// Request body for renaming or (de)activating an automation.
#[derive(Debug, Deserialize)]
pub struct UpdateAutomationRequest {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddNodeRequest {
    pub controller_id: ControllerId,
    pub action_id: ActionId,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Deserialize)]
pub struct MoveNodeRequest {
    pub position: Position,
}

#[derive(Debug, Deserialize)]
pub struct AddEdgeRequest {
    pub source: NodeId,
    pub target: NodeId,
    pub condition: Condition,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEdgeRequest {
    pub condition: Condition,
}

/// `GET /api/automations`
pub async fn list<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<AutomationGraph>>, ApiError> {
    Ok(Json(state.automations.list_automations().await?))
}

/// `GET /api/automations/{id}`
pub async fn get<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<AutomationId>,
) -> Result<Json<AutomationGraph>, ApiError> {
    Ok(Json(state.automations.get_automation(id).await?))
}

/// `POST /api/automations`
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    Json(req): Json<CreateAutomationRequest>,
) -> Result<(StatusCode, Json<AutomationGraph>), ApiError> {
    let graph = state.automations.create_automation(&req.name).await?;
    Ok((StatusCode::CREATED, Json(graph)))
}

/// `PUT /api/automations/{id}`
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<AutomationId>,
    Json(req): Json<UpdateAutomationRequest>,
) -> Result<Json<AutomationGraph>, ApiError> {
    let graph = state
        .automations
        .update_automation(id, req.name, req.active)
        .await?;
    Ok(Json(graph))
}

/// `DELETE /api/automations/{id}`
pub async fn delete<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<AutomationId>,
) -> Result<StatusCode, ApiError> {
    state.automations.delete_automation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/automations/{id}/nodes`
pub async fn add_node<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<AutomationId>,
    Json(req): Json<AddNodeRequest>,
) -> Result<(StatusCode, Json<AutomationNode>), ApiError> {
    let node = state
        .automations
        .add_node(id, req.controller_id, req.action_id, req.position)
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// `PUT /api/automations/{id}/nodes/{node_id}`
pub async fn move_node<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, node_id)): Path<(AutomationId, NodeId)>,
    Json(req): Json<MoveNodeRequest>,
) -> Result<Json<AutomationNode>, ApiError> {
    let node = state
        .automations
        .move_node(id, node_id, req.position)
        .await?;
    Ok(Json(node))
}

/// `DELETE /api/automations/{id}/nodes/{node_id}`, attached edges go too.
pub async fn remove_node<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, node_id)): Path<(AutomationId, NodeId)>,
) -> Result<StatusCode, ApiError> {
    state.automations.remove_node(id, node_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/automations/{id}/edges`
pub async fn add_edge<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<AutomationId>,
    Json(req): Json<AddEdgeRequest>,
) -> Result<(StatusCode, Json<AutomationEdge>), ApiError> {
    let edge = state
        .automations
        .add_edge(id, req.source, req.target, req.condition)
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

/// `PUT /api/automations/{id}/edges/{edge_id}`
pub async fn update_edge<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, edge_id)): Path<(AutomationId, EdgeId)>,
    Json(req): Json<UpdateEdgeRequest>,
) -> Result<Json<AutomationEdge>, ApiError> {
    let edge = state
        .automations
        .update_edge(id, edge_id, req.condition)
        .await?;
    Ok(Json(edge))
}

/// `DELETE /api/automations/{id}/edges/{edge_id}`
pub async fn remove_edge<B: Backend>(
    State(state): State<AppState<B>>,
    Path((id, edge_id)): Path<(AutomationId, EdgeId)>,
) -> Result<StatusCode, ApiError> {
    state.automations.remove_edge(id, edge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
