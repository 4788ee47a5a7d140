//! Controller: a network-addressable device exposing one or more actions.

use serde::{Deserialize, Serialize};

use crate::error::{SmartHomeError, ValidationError};
use crate::id::{ActionId, ControllerId};

/// A device reachable over HTTP at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub id: ControllerId,
    pub name: String,
    /// Host (and optional port or scheme), e.g. `192.168.1.20` or `http://relay.local:8080`.
    pub address: String,
    #[serde(default)]
    pub action_ids: Vec<ActionId>,
}

impl Controller {
    /// Create a controller with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if `name` or `address` is empty.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        action_ids: Vec<ActionId>,
    ) -> Result<Self, SmartHomeError> {
        let controller = Self {
            id: ControllerId::new(),
            name: name.into(),
            address: address.into(),
            action_ids,
        };
        controller.validate()?;
        Ok(controller)
    }

    /// Whether this controller exposes the given action.
    #[must_use]
    pub fn exposes(&self, action_id: ActionId) -> bool {
        self.action_ids.contains(&action_id)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] or [`ValidationError::EmptyAddress`].
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.address.trim().is_empty() {
            return Err(ValidationError::EmptyAddress.into());
        }
        Ok(())
    }
}
