//! Task service: use-cases for recurring and delayed tasks.

use std::sync::Arc;

use smarthome_domain::error::{NotFoundError, SmartHomeError, ValidationError};
use smarthome_domain::id::{ActionId, ControllerId, DelayedTaskId, RecurringTaskId};
use smarthome_domain::task::{DelayedTask, RecurringTask, Schedule};

use crate::ports::{
    ActionRepository, Clock, ControllerRepository, DelayedTaskRepository,
    RecurringTaskRepository,
};
use crate::scheduler::{ActionExecutor, JobScheduler};

/// Fields of a recurring task that can be edited.
#[derive(Debug, Clone, Default)]
pub struct RecurringTaskUpdate {
    pub action_id: Option<ActionId>,
    pub schedule: Option<Schedule>,
}

/// Application service for task management. Jobs are kept in sync with the
/// stored tasks through the scheduler.
pub struct TaskService<CR, AR, RR, DR, X, K> {
    controllers: CR,
    actions: AR,
    recurring: RR,
    delayed: DR,
    scheduler: Arc<JobScheduler<RR, DR, X, K>>,
}

impl<CR, AR, RR, DR, X, K> TaskService<CR, AR, RR, DR, X, K>
where
    CR: ControllerRepository + Send + Sync,
    AR: ActionRepository + Send + Sync,
    RR: RecurringTaskRepository + Send + Sync,
    DR: DelayedTaskRepository + Send + Sync,
    X: ActionExecutor,
    K: Clock,
{
    pub fn new(
        controllers: CR,
        actions: AR,
        recurring: RR,
        delayed: DR,
        scheduler: Arc<JobScheduler<RR, DR, X, K>>,
    ) -> Self {
        Self {
            controllers,
            actions,
            recurring,
            delayed,
            scheduler,
        }
    }

    /// Store a recurring task and register its job.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown controller or
    /// action, [`SmartHomeError::Validation`] when the controller does not
    /// expose the action or the schedule is out of range.
    #[tracing::instrument(skip(self))]
    pub async fn create_recurring_task(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
        schedule: Schedule,
    ) -> Result<RecurringTask, SmartHomeError> {
        self.check_target(controller_id, action_id).await?;
        let task = self
            .scheduler
            .submit_recurring(RecurringTask::new(controller_id, action_id, schedule))
            .await?;
        tracing::info!(task = %task.id, "recurring task created");
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no task with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_recurring_task(
        &self,
        id: RecurringTaskId,
    ) -> Result<RecurringTask, SmartHomeError> {
        self.recurring.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "RecurringTask",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_recurring_tasks(&self) -> Result<Vec<RecurringTask>, SmartHomeError> {
        self.recurring.get_all().await
    }

    /// Recurring tasks targeting one controller.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_controller_tasks(
        &self,
        controller_id: ControllerId,
    ) -> Result<Vec<RecurringTask>, SmartHomeError> {
        let mut tasks = self.recurring.get_all().await?;
        tasks.retain(|task| task.controller_id == controller_id);
        Ok(tasks)
    }

    /// Change the action or schedule of a task and re-register its job.
    ///
    /// # Errors
    ///
    /// Same as [`TaskService::create_recurring_task`], plus
    /// [`SmartHomeError::NotFound`] for an unknown task.
    #[tracing::instrument(skip(self))]
    pub async fn update_recurring_task(
        &self,
        id: RecurringTaskId,
        update: RecurringTaskUpdate,
    ) -> Result<RecurringTask, SmartHomeError> {
        let mut task = self.get_recurring_task(id).await?;
        if let Some(action_id) = update.action_id {
            task.action_id = action_id;
        }
        if let Some(schedule) = update.schedule {
            schedule.validate()?;
            task.schedule = schedule;
        }
        self.check_target(task.controller_id, task.action_id).await?;
        self.scheduler.schedule_recurring(task).await
    }

    /// Cancel the job of a task and delete it.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no task with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_recurring_task(
        &self,
        id: RecurringTaskId,
    ) -> Result<RecurringTask, SmartHomeError> {
        self.scheduler.remove_recurring(id).await
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_delayed_tasks(&self) -> Result<Vec<DelayedTask>, SmartHomeError> {
        self.delayed.get_all().await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no task with `id` exists.
    pub async fn get_delayed_task(&self, id: DelayedTaskId) -> Result<DelayedTask, SmartHomeError> {
        self.delayed.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "DelayedTask",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn check_target(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> Result<(), SmartHomeError> {
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
        self.actions
            .get_by_id(action_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Action",
                id: action_id.to_string(),
            })?;
        Ok(())
    }
}
