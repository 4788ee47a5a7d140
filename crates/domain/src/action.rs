//! Action: a named capability exposed by a controller.
//!
//! Sensors answer with a numeric reading; actuators perform an effect and
//! answer with a success indicator. An actuator may name an *opposite*
//! action that reverses its effect ("turn off" for "turn on").

use serde::{Deserialize, Serialize};

use crate::error::{SmartHomeError, ValidationError};
use crate::id::ActionId;

/// A device capability reachable at `<controller address><path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    /// Path appended to the controller address, e.g. `/relay/on`.
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_sensor: bool,
    #[serde(default)]
    pub opposite_action_id: Option<ActionId>,
}

impl Action {
    /// Create a builder for constructing an [`Action`].
    #[must_use]
    pub fn builder() -> ActionBuilder {
        ActionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `path` is empty ([`ValidationError::EmptyPath`])
    /// - the action names itself as opposite ([`ValidationError::SelfOpposite`])
    /// - a sensor declares an opposite ([`ValidationError::SensorHasNoOpposite`])
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.path.trim().is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }
        if let Some(opposite) = self.opposite_action_id {
            if opposite == self.id {
                return Err(ValidationError::SelfOpposite.into());
            }
            if self.is_sensor {
                return Err(ValidationError::SensorHasNoOpposite(self.id.to_string()).into());
            }
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Action`].
#[derive(Debug, Default)]
pub struct ActionBuilder {
    id: Option<ActionId>,
    name: Option<String>,
    path: Option<String>,
    description: Option<String>,
    is_sensor: bool,
    opposite_action_id: Option<ActionId>,
}

impl ActionBuilder {
    #[must_use]
    pub fn id(mut self, id: ActionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    #[must_use]
    pub fn opposite(mut self, opposite: ActionId) -> Self {
        self.opposite_action_id = Some(opposite);
        self
    }

    /// Consume the builder, validate, and return an [`Action`].
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<Action, SmartHomeError> {
        let action = Action {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            path: self.path.unwrap_or_default(),
            description: self.description,
            is_sensor: self.is_sensor,
            opposite_action_id: self.opposite_action_id,
        };
        action.validate()?;
        Ok(action)
    }
}
