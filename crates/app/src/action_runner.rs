//! Action runner: resolves `(controller, action)` ids and calls the device.

use smarthome_domain::action::Action;
use smarthome_domain::controller::Controller;
use smarthome_domain::dispatch::DispatchOutcome;
use smarthome_domain::error::{NotFoundError, SensorReadError, SmartHomeError, ValidationError};
use smarthome_domain::id::{ActionId, ControllerId};

use crate::ports::{ActionRepository, ControllerRepository, Dispatcher};

/// Looks up controllers and actions, then dispatches device calls.
///
/// Never starts automation chains; see
/// [`AutomationRunner`](crate::automation_runner::AutomationRunner) for that.
pub struct ActionRunner<CR, AR, D> {
    controllers: CR,
    actions: AR,
    dispatcher: D,
}

impl<CR, AR, D> ActionRunner<CR, AR, D>
where
    CR: ControllerRepository + Send + Sync,
    AR: ActionRepository + Send + Sync,
    D: Dispatcher,
{
    pub fn new(controllers: CR, actions: AR, dispatcher: D) -> Self {
        Self {
            controllers,
            actions,
            dispatcher,
        }
    }

    /// Load a controller and one of the actions it exposes.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when either record is missing and
    /// [`ValidationError::ActionNotExposed`] when the controller does not
    /// list the action.
    pub async fn resolve(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> Result<(Controller, Action), SmartHomeError> {
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
        let action = self
            .actions
            .get_by_id(action_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Action",
                id: action_id.to_string(),
            })?;
        Ok((controller, action))
    }

    /// Call an already resolved action.
    #[tracing::instrument(skip_all, fields(controller = %controller.name, action = %action.name))]
    pub async fn run(&self, controller: &Controller, action: &Action) -> DispatchOutcome {
        let outcome = self
            .dispatcher
            .invoke(&controller.address, &action.path)
            .await;
        if outcome.ok {
            tracing::debug!(body = %outcome.body, "action succeeded");
        } else {
            tracing::warn!(body = %outcome.body, "action failed");
        }
        outcome
    }

    /// Resolve then call an action.
    ///
    /// # Errors
    ///
    /// Propagates lookup errors from [`ActionRunner::resolve`]. A failing
    /// device call is not an error.
    pub async fn dispatch(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> Result<DispatchOutcome, SmartHomeError> {
        let (controller, action) = self.resolve(controller_id, action_id).await?;
        Ok(self.run(&controller, &action).await)
    }

    /// Read a numeric value from a sensor action.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::SensorRead`] when the device call fails or
    /// its body is not a number, besides lookup errors.
    #[tracing::instrument(skip(self))]
    pub async fn read_sensor(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> Result<f64, SmartHomeError> {
        let (controller, action) = self.resolve(controller_id, action_id).await?;
        Ok(self.read(&controller, &action).await?)
    }

    /// Read an already resolved sensor.
    ///
    /// # Errors
    ///
    /// Returns [`SensorReadError`] when the call fails or the body is not a
    /// number.
    pub async fn read(
        &self,
        controller: &Controller,
        action: &Action,
    ) -> Result<f64, SensorReadError> {
        let reading = self
            .dispatcher
            .read_sensor(&controller.address, &action.path)
            .await?;
        tracing::debug!(sensor = %action.name, reading, "sensor read");
        Ok(reading)
    }
}
