//! Action service: top-level invocation of a controller action.

use std::sync::Arc;

use smarthome_domain::action::Action;
use smarthome_domain::controller::Controller;
use smarthome_domain::error::{SmartHomeError, ValidationError};
use smarthome_domain::id::{ActionId, ControllerId};
use smarthome_domain::task::DelayedTask;

use crate::automation_runner::AutomationRunner;
use crate::ports::{
    ActionRepository, AutomationRepository, Clock, ControllerRepository, DelayedTaskRepository,
    Dispatcher, RecurringTaskRepository,
};
use crate::scheduler::JobScheduler;

/// Result of [`ActionService::invoke_action`].
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// A sensor answered with a numeric value.
    Reading(f64),
    /// An actuator was called.
    Actuated {
        ok: bool,
        body: String,
        /// Opposite action planned by this invocation, if one was requested.
        delayed_task: Option<DelayedTask>,
    },
}

type Runner<GR, CR, AR, D> = Arc<AutomationRunner<GR, CR, AR, D>>;

/// Invokes actions on behalf of a user request.
pub struct ActionService<GR, CR, AR, D, RR, DR, K> {
    runner: Runner<GR, CR, AR, D>,
    scheduler: Arc<JobScheduler<RR, DR, Runner<GR, CR, AR, D>, K>>,
}

impl<GR, CR, AR, D, RR, DR, K> ActionService<GR, CR, AR, D, RR, DR, K>
where
    GR: AutomationRepository + Send + Sync + 'static,
    CR: ControllerRepository + Send + Sync + 'static,
    AR: ActionRepository + Send + Sync + 'static,
    D: Dispatcher + 'static,
    RR: RecurringTaskRepository + Send + Sync,
    DR: DelayedTaskRepository + Send + Sync,
    K: Clock,
{
    pub fn new(
        runner: Runner<GR, CR, AR, D>,
        scheduler: Arc<JobScheduler<RR, DR, Runner<GR, CR, AR, D>, K>>,
    ) -> Self {
        Self { runner, scheduler }
    }

    /// Invoke an action the way a user does.
    ///
    /// Sensors are read and return their value; `opposite_after_minutes` is
    /// ignored for them. Actuators are called and, on success, start the
    /// automation chains rooted at them. When `opposite_after_minutes` is
    /// set, a delayed task running the action's opposite is stored and
    /// scheduled before the actuator is called.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] or
    /// [`ValidationError::ActionNotExposed`] for unknown targets,
    /// [`SmartHomeError::SensorRead`] when a sensor gives no number,
    /// [`ValidationError::NoOppositeAction`] or
    /// [`ValidationError::InvalidDelay`] for an unusable opposite request.
    /// A failing actuator is reported through `ok`, not as an error.
    #[tracing::instrument(skip(self))]
    pub async fn invoke_action(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
        opposite_after_minutes: Option<u32>,
    ) -> Result<Invocation, SmartHomeError> {
        let actions = self.runner.action_runner();
        let (controller, action) = actions.resolve(controller_id, action_id).await?;

        if action.is_sensor {
            if opposite_after_minutes.is_some() {
                tracing::debug!("opposite delay ignored for a sensor");
            }
            let reading = actions.read(&controller, &action).await?;
            return Ok(Invocation::Reading(reading));
        }

        let delayed_task = match opposite_after_minutes {
            Some(minutes) => Some(self.plan_opposite(&controller, &action, minutes).await?),
            None => None,
        };

        let dispatched = self.runner.invoke(&controller, &action).await;
        Ok(Invocation::Actuated {
            ok: dispatched.outcome.ok,
            body: dispatched.outcome.body,
            delayed_task,
        })
    }

    async fn plan_opposite(
        &self,
        controller: &Controller,
        action: &Action,
        minutes: u32,
    ) -> Result<DelayedTask, SmartHomeError> {
        let opposite_id = action
            .opposite_action_id
            .ok_or_else(|| ValidationError::NoOppositeAction(action.id.to_string()))?;
        let task = DelayedTask::new(controller.id, opposite_id, minutes, self.scheduler.now())?;
        self.runner
            .action_runner()
            .resolve(controller.id, opposite_id)
            .await?;
        let task = self.scheduler.submit_delayed(task).await?;
        tracing::info!(task = %task.id, minutes, "opposite action planned");
        Ok(task)
    }
}
