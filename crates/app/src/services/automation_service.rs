//! Automation service: use-cases for editing automation graphs.
//!
//! Every edit loads the graph, applies the change through the domain model
//! (which rejects unknown nodes and invalid conditions) and stores the whole
//! graph back. Running chains pick the change up at their next step.

use smarthome_domain::automation::{
    AutomationEdge, AutomationGraph, AutomationNode, Condition, Position,
};
use smarthome_domain::error::{NotFoundError, SmartHomeError, ValidationError};
use smarthome_domain::id::{ActionId, AutomationId, ControllerId, EdgeId, NodeId};

use crate::ports::{AutomationRepository, ControllerRepository};

/// Application service for automation graph editing.
pub struct AutomationService<GR, CR> {
    graphs: GR,
    controllers: CR,
}

impl<GR, CR> AutomationService<GR, CR>
where
    GR: AutomationRepository + Send + Sync,
    CR: ControllerRepository + Send + Sync,
{
    /// Create a new service backed by the given repositories.
    pub fn new(graphs: GR, controllers: CR) -> Self {
        Self {
            graphs,
            controllers,
        }
    }

    /// Create an empty, active automation.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if the name is empty, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn create_automation(&self, name: &str) -> Result<AutomationGraph, SmartHomeError> {
        let graph = AutomationGraph::new(name)?;
        self.graphs.create(graph).await
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no automation with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_automation(&self, id: AutomationId) -> Result<AutomationGraph, SmartHomeError> {
        self.graphs.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_automations(&self) -> Result<Vec<AutomationGraph>, SmartHomeError> {
        self.graphs.get_all().await
    }

    /// Rename and/or (de)activate an automation. Deactivating stops any
    /// chain of this graph at its next step.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or
    /// [`SmartHomeError::Validation`] for an empty name.
    #[tracing::instrument(skip(self))]
    pub async fn update_automation(
        &self,
        id: AutomationId,
        name: Option<String>,
        active: Option<bool>,
    ) -> Result<AutomationGraph, SmartHomeError> {
        let mut graph = self.get_automation(id).await?;
        if let Some(name) = name {
            graph.name = name;
        }
        if let Some(active) = active {
            graph.active = active;
        }
        graph.validate()?;
        self.graphs.update(graph).await
    }

    /// Delete an automation by id.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_automation(&self, id: AutomationId) -> Result<(), SmartHomeError> {
        self.graphs.delete(id).await
    }

    /// Add a node invoking `action_id` on `controller_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or
    /// controller, [`ValidationError::ActionNotExposed`] when the controller
    /// does not list the action, and [`ValidationError::DuplicateNode`] when
    /// the graph already has a node for that pair.
    #[tracing::instrument(skip(self))]
    pub async fn add_node(
        &self,
        id: AutomationId,
        controller_id: ControllerId,
        action_id: ActionId,
        position: Position,
    ) -> Result<AutomationNode, SmartHomeError> {
        let controller = self
            .controllers
            .get_by_id(controller_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Controller",
                id: controller_id.to_string(),
            })?;
        if !controller.exposes(action_id) {
            return Err(ValidationError::ActionNotExposed {
                controller: controller_id.to_string(),
                action: action_id.to_string(),
            }
            .into());
        }

        let mut graph = self.get_automation(id).await?;
        let node = graph
            .add_node(AutomationNode::new(controller_id, action_id, position))?
            .clone();
        self.graphs.update(graph).await?;
        Ok(node)
    }

    /// Update the cosmetic position of a node.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or node.
    #[tracing::instrument(skip(self))]
    pub async fn move_node(
        &self,
        id: AutomationId,
        node_id: NodeId,
        position: Position,
    ) -> Result<AutomationNode, SmartHomeError> {
        let mut graph = self.get_automation(id).await?;
        let node = graph
            .nodes
            .iter_mut()
            .find(|node| node.id == node_id)
            .ok_or_else(|| node_not_found(node_id))?;
        node.position = position;
        let node = node.clone();
        self.graphs.update(graph).await?;
        Ok(node)
    }

    /// Remove a node and every edge attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or node.
    #[tracing::instrument(skip(self))]
    pub async fn remove_node(&self, id: AutomationId, node_id: NodeId) -> Result<(), SmartHomeError> {
        let mut graph = self.get_automation(id).await?;
        if !graph.remove_node(node_id) {
            return Err(node_not_found(node_id));
        }
        self.graphs.update(graph).await?;
        Ok(())
    }

    /// Connect two nodes of the graph.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation, and
    /// [`SmartHomeError::Validation`] when an endpoint is not in the graph or
    /// the condition is invalid.
    #[tracing::instrument(skip(self))]
    pub async fn add_edge(
        &self,
        id: AutomationId,
        source: NodeId,
        target: NodeId,
        condition: Condition,
    ) -> Result<AutomationEdge, SmartHomeError> {
        let mut graph = self.get_automation(id).await?;
        let edge = graph.add_edge(source, target, condition)?.clone();
        self.graphs.update(graph).await?;
        Ok(edge)
    }

    /// Replace the condition of an edge.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or
    /// edge, and [`SmartHomeError::Validation`] for an invalid condition.
    #[tracing::instrument(skip(self))]
    pub async fn update_edge(
        &self,
        id: AutomationId,
        edge_id: EdgeId,
        condition: Condition,
    ) -> Result<AutomationEdge, SmartHomeError> {
        condition.validate()?;
        let mut graph = self.get_automation(id).await?;
        let edge = graph
            .edges
            .iter_mut()
            .find(|edge| edge.id == edge_id)
            .ok_or_else(|| edge_not_found(edge_id))?;
        edge.condition = condition;
        let edge = edge.clone();
        self.graphs.update(graph).await?;
        Ok(edge)
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown automation or edge.
    #[tracing::instrument(skip(self))]
    pub async fn remove_edge(&self, id: AutomationId, edge_id: EdgeId) -> Result<(), SmartHomeError> {
        let mut graph = self.get_automation(id).await?;
        if !graph.remove_edge(edge_id) {
            return Err(edge_not_found(edge_id));
        }
        self.graphs.update(graph).await?;
        Ok(())
    }
}

fn node_not_found(id: NodeId) -> SmartHomeError {
    NotFoundError {
        entity: "AutomationNode",
        id: id.to_string(),
    }
    .into()
}

fn edge_not_found(id: EdgeId) -> SmartHomeError {
    NotFoundError {
        entity: "AutomationEdge",
        id: id.to_string(),
    }
    .into()
}
