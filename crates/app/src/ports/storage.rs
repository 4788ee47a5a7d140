//! Storage port: repository traits for persistence.
//!
//! Every `update` replaces the whole stored record, which the backing
//! store must apply atomically per record.

use std::future::Future;
use std::sync::Arc;

use smarthome_domain::action::Action;
use smarthome_domain::automation::AutomationGraph;
use smarthome_domain::controller::Controller;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{ActionId, AutomationId, ControllerId, DelayedTaskId, RecurringTaskId};
use smarthome_domain::task::{DelayedTask, RecurringTask};

/// Repository for [`Action`]s.
pub trait ActionRepository {
    fn create(&self, action: Action) -> impl Future<Output = Result<Action, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: ActionId,
    ) -> impl Future<Output = Result<Option<Action>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Action>, SmartHomeError>> + Send;

    fn update(&self, action: Action) -> impl Future<Output = Result<Action, SmartHomeError>> + Send;

    fn delete(&self, id: ActionId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for [`Controller`]s.
pub trait ControllerRepository {
    fn create(
        &self,
        controller: Controller,
    ) -> impl Future<Output = Result<Controller, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: ControllerId,
    ) -> impl Future<Output = Result<Option<Controller>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Controller>, SmartHomeError>> + Send;

    fn update(
        &self,
        controller: Controller,
    ) -> impl Future<Output = Result<Controller, SmartHomeError>> + Send;

    fn delete(&self, id: ControllerId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for [`AutomationGraph`]s, stored as whole documents.
pub trait AutomationRepository {
    fn create(
        &self,
        graph: AutomationGraph,
    ) -> impl Future<Output = Result<AutomationGraph, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<AutomationGraph>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<AutomationGraph>, SmartHomeError>> + Send;

    /// Get all graphs whose `active` flag is set.
    fn get_active(
        &self,
    ) -> impl Future<Output = Result<Vec<AutomationGraph>, SmartHomeError>> + Send;

    fn update(
        &self,
        graph: AutomationGraph,
    ) -> impl Future<Output = Result<AutomationGraph, SmartHomeError>> + Send;

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for [`RecurringTask`]s.
pub trait RecurringTaskRepository {
    fn create(
        &self,
        task: RecurringTask,
    ) -> impl Future<Output = Result<RecurringTask, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: RecurringTaskId,
    ) -> impl Future<Output = Result<Option<RecurringTask>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<RecurringTask>, SmartHomeError>> + Send;

    fn update(
        &self,
        task: RecurringTask,
    ) -> impl Future<Output = Result<RecurringTask, SmartHomeError>> + Send;

    fn delete(&self, id: RecurringTaskId)
    -> impl Future<Output = Result<(), SmartHomeError>> + Send;
}

/// Repository for [`DelayedTask`]s.
pub trait DelayedTaskRepository {
    fn create(
        &self,
        task: DelayedTask,
    ) -> impl Future<Output = Result<DelayedTask, SmartHomeError>> + Send;

    fn get_by_id(
        &self,
        id: DelayedTaskId,
    ) -> impl Future<Output = Result<Option<DelayedTask>, SmartHomeError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<DelayedTask>, SmartHomeError>> + Send;

    /// Get all tasks still in the `Active` state.
    fn get_active(&self) -> impl Future<Output = Result<Vec<DelayedTask>, SmartHomeError>> + Send;

    fn update(
        &self,
        task: DelayedTask,
    ) -> impl Future<Output = Result<DelayedTask, SmartHomeError>> + Send;
}

impl<T: ActionRepository + Send + Sync> ActionRepository for Arc<T> {
    fn create(&self, action: Action) -> impl Future<Output = Result<Action, SmartHomeError>> + Send {
        (**self).create(action)
    }

    fn get_by_id(
        &self,
        id: ActionId,
    ) -> impl Future<Output = Result<Option<Action>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Action>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn update(&self, action: Action) -> impl Future<Output = Result<Action, SmartHomeError>> + Send {
        (**self).update(action)
    }

    fn delete(&self, id: ActionId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: ControllerRepository + Send + Sync> ControllerRepository for Arc<T> {
    fn create(
        &self,
        controller: Controller,
    ) -> impl Future<Output = Result<Controller, SmartHomeError>> + Send {
        (**self).create(controller)
    }

    fn get_by_id(
        &self,
        id: ControllerId,
    ) -> impl Future<Output = Result<Option<Controller>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Controller>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn update(
        &self,
        controller: Controller,
    ) -> impl Future<Output = Result<Controller, SmartHomeError>> + Send {
        (**self).update(controller)
    }

    fn delete(&self, id: ControllerId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for Arc<T> {
    fn create(
        &self,
        graph: AutomationGraph,
    ) -> impl Future<Output = Result<AutomationGraph, SmartHomeError>> + Send {
        (**self).create(graph)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<AutomationGraph>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<AutomationGraph>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn get_active(
        &self,
    ) -> impl Future<Output = Result<Vec<AutomationGraph>, SmartHomeError>> + Send {
        (**self).get_active()
    }

    fn update(
        &self,
        graph: AutomationGraph,
    ) -> impl Future<Output = Result<AutomationGraph, SmartHomeError>> + Send {
        (**self).update(graph)
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: RecurringTaskRepository + Send + Sync> RecurringTaskRepository for Arc<T> {
    fn create(
        &self,
        task: RecurringTask,
    ) -> impl Future<Output = Result<RecurringTask, SmartHomeError>> + Send {
        (**self).create(task)
    }

    fn get_by_id(
        &self,
        id: RecurringTaskId,
    ) -> impl Future<Output = Result<Option<RecurringTask>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<RecurringTask>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn update(
        &self,
        task: RecurringTask,
    ) -> impl Future<Output = Result<RecurringTask, SmartHomeError>> + Send {
        (**self).update(task)
    }

    fn delete(
        &self,
        id: RecurringTaskId,
    ) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        (**self).delete(id)
    }
}

impl<T: DelayedTaskRepository + Send + Sync> DelayedTaskRepository for Arc<T> {
    fn create(
        &self,
        task: DelayedTask,
    ) -> impl Future<Output = Result<DelayedTask, SmartHomeError>> + Send {
        (**self).create(task)
    }

    fn get_by_id(
        &self,
        id: DelayedTaskId,
    ) -> impl Future<Output = Result<Option<DelayedTask>, SmartHomeError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<DelayedTask>, SmartHomeError>> + Send {
        (**self).get_all()
    }

    fn get_active(&self) -> impl Future<Output = Result<Vec<DelayedTask>, SmartHomeError>> + Send {
        (**self).get_active()
    }

    fn update(
        &self,
        task: DelayedTask,
    ) -> impl Future<Output = Result<DelayedTask, SmartHomeError>> + Send {
        (**self).update(task)
    }
}
