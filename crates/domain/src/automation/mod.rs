//! Automation graph: event-triggered chains of device actions.
//!
//! A graph is a flat set of [`AutomationNode`]s connected by directed
//! [`AutomationEdge`]s, each guarded by a [`Condition`]. Firing the action
//! of a *root* node (one without incoming edges) starts a chain that walks
//! the edges forward. Edges reference nodes by id, so cycles are allowed.

pub mod condition;

pub use condition::{Condition, Operator, Threshold, Verdict};

use serde::{Deserialize, Serialize};

use crate::error::{SmartHomeError, ValidationError};
use crate::id::{ActionId, AutomationId, ControllerId, EdgeId, NodeId};
use crate::time::{Timestamp, now};

/// Cosmetic placement of a node in an editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A `(controller, action)` pair placed in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationNode {
    pub id: NodeId,
    pub controller_id: ControllerId,
    pub action_id: ActionId,
    #[serde(default)]
    pub position: Position,
    /// Unique within the graph: `"<controller_id>;<action_id>"`.
    pub key: String,
}

impl AutomationNode {
    #[must_use]
    pub fn new(controller_id: ControllerId, action_id: ActionId, position: Position) -> Self {
        Self {
            id: NodeId::new(),
            controller_id,
            action_id,
            position,
            key: Self::key_for(controller_id, action_id),
        }
    }

    #[must_use]
    pub fn key_for(controller_id: ControllerId, action_id: ActionId) -> String {
        format!("{controller_id};{action_id}")
    }

    #[must_use]
    pub fn targets(&self, controller_id: ControllerId, action_id: ActionId) -> bool {
        self.controller_id == controller_id && self.action_id == action_id
    }
}

/// Directed, guarded link between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub condition: Condition,
}

/// A named automation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationGraph {
    pub id: AutomationId,
    pub name: String,
    /// Inactive graphs never start chains, and running chains stop at
    /// their next step once the graph is deactivated.
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<AutomationNode>,
    #[serde(default)]
    pub edges: Vec<AutomationEdge>,
    pub created_at: Timestamp,
}

impl AutomationGraph {
    /// Create an empty, active graph.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] if `name` is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, SmartHomeError> {
        let graph = Self {
            id: AutomationId::new(),
            name: name.into(),
            active: true,
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: now(),
        };
        graph.validate()?;
        Ok(graph)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&AutomationNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Edges leaving `node`, in insertion order.
    pub fn edges_from(&self, node: NodeId) -> impl Iterator<Item = &AutomationEdge> {
        self.edges.iter().filter(move |edge| edge.source == node)
    }

    #[must_use]
    pub fn is_root(&self, node: NodeId) -> bool {
        !self.edges.iter().any(|edge| edge.target == node)
    }

    /// Root nodes that represent the given `(controller, action)` pair.
    pub fn roots_for(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> impl Iterator<Item = &AutomationNode> {
        self.nodes
            .iter()
            .filter(move |node| node.targets(controller_id, action_id) && self.is_root(node.id))
    }

    /// Add a node, enforcing key uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateNode`] when the graph already has a
    /// node for the same `(controller, action)` pair.
    pub fn add_node(&mut self, node: AutomationNode) -> Result<&AutomationNode, SmartHomeError> {
        if self.nodes.iter().any(|existing| existing.key == node.key) {
            return Err(ValidationError::DuplicateNode(node.key).into());
        }
        self.nodes.push(node);
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    /// Remove a node together with every edge touching it.
    ///
    /// Returns `false` if the node was not part of the graph.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges
            .retain(|edge| edge.source != id && edge.target != id);
        true
    }

    /// Add an edge after checking its endpoints and its condition.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when an endpoint is not in the
    /// graph or the condition is rejected by [`Condition::validate`].
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        condition: Condition,
    ) -> Result<&AutomationEdge, SmartHomeError> {
        for endpoint in [source, target] {
            if self.node(endpoint).is_none() {
                return Err(ValidationError::UnknownNode(endpoint.to_string()).into());
            }
        }
        condition.validate()?;
        self.edges.push(AutomationEdge {
            id: EdgeId::new(),
            source,
            target,
            condition,
        });
        Ok(&self.edges[self.edges.len() - 1])
    }

    /// Returns `false` if the edge was not part of the graph.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != id);
        self.edges.len() != before
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when the name is empty, two
    /// nodes share a key, an edge points outside the node set, or an edge
    /// condition is invalid.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if self.nodes[..index].iter().any(|other| other.key == node.key) {
                return Err(ValidationError::DuplicateNode(node.key.clone()).into());
            }
        }
        for edge in &self.edges {
            for endpoint in [edge.source, edge.target] {
                if self.node(endpoint).is_none() {
                    return Err(ValidationError::UnknownNode(endpoint.to_string()).into());
                }
            }
            edge.condition.validate()?;
        }
        Ok(())
    }
}
