//! Shared application state for axum handlers.

use std::sync::Arc;

use smarthome_app::action_runner::ActionRunner;
use smarthome_app::automation_runner::{AutomationRunner, RunnerConfig};
use smarthome_app::ports::{
    ActionRepository, AutomationRepository, Clock, ControllerRepository, DelayedTaskRepository,
    Dispatcher, RecurringTaskRepository,
};
use smarthome_app::scheduler::{JobScheduler, SchedulerConfig};
use smarthome_app::services::action_service::ActionService;
use smarthome_app::services::automation_service::AutomationService;
use smarthome_app::services::catalog_service::CatalogService;
use smarthome_app::services::task_service::TaskService;

/// The concrete adapter types a server is built from. Handlers are generic
/// over this one parameter.
pub trait Backend: Send + Sync + 'static {
    type Actions: ActionRepository + Clone + Send + Sync + 'static;
    type Controllers: ControllerRepository + Clone + Send + Sync + 'static;
    type Automations: AutomationRepository + Clone + Send + Sync + 'static;
    type Recurring: RecurringTaskRepository + Clone + Send + Sync + 'static;
    type Delayed: DelayedTaskRepository + Clone + Send + Sync + 'static;
    type Dispatcher: Dispatcher + 'static;
    type Clock: Clock + 'static;
}

pub type Runner<B> = AutomationRunner<
    <B as Backend>::Automations,
    <B as Backend>::Controllers,
    <B as Backend>::Actions,
    <B as Backend>::Dispatcher,
>;

pub type Scheduler<B> = JobScheduler<
    <B as Backend>::Recurring,
    <B as Backend>::Delayed,
    Arc<Runner<B>>,
    <B as Backend>::Clock,
>;

pub type Catalog<B> = CatalogService<<B as Backend>::Actions, <B as Backend>::Controllers>;

pub type Automations<B> =
    AutomationService<<B as Backend>::Automations, <B as Backend>::Controllers>;

pub type Actions<B> = ActionService<
    <B as Backend>::Automations,
    <B as Backend>::Controllers,
    <B as Backend>::Actions,
    <B as Backend>::Dispatcher,
    <B as Backend>::Recurring,
    <B as Backend>::Delayed,
    <B as Backend>::Clock,
>;

pub type Tasks<B> = TaskService<
    <B as Backend>::Controllers,
    <B as Backend>::Actions,
    <B as Backend>::Recurring,
    <B as Backend>::Delayed,
    Arc<Runner<B>>,
    <B as Backend>::Clock,
>;

/// One repository per stored record kind.
pub struct Repositories<B: Backend> {
    pub actions: B::Actions,
    pub controllers: B::Controllers,
    pub automations: B::Automations,
    pub recurring: B::Recurring,
    pub delayed: B::Delayed,
}

/// Engine tuning forwarded to the runner and the scheduler.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub runner: RunnerConfig,
    pub scheduler: SchedulerConfig,
}

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the backend types themselves do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<B: Backend> {
    /// Action and controller catalog.
    pub catalog: Arc<Catalog<B>>,
    /// Automation graph editing.
    pub automations: Arc<Automations<B>>,
    /// On-demand action invocation.
    pub actions: Arc<Actions<B>>,
    /// Recurring and delayed task management.
    pub tasks: Arc<Tasks<B>>,
    /// Job scheduler; the owner of the state starts and stops it.
    pub scheduler: Arc<Scheduler<B>>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            automations: Arc::clone(&self.automations),
            actions: Arc::clone(&self.actions),
            tasks: Arc::clone(&self.tasks),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<B: Backend> AppState<B> {
    /// Wire the runners, the scheduler and every service over `repos`.
    ///
    /// The scheduler is neither restored nor started here.
    pub fn new(
        repos: Repositories<B>,
        dispatcher: B::Dispatcher,
        clock: B::Clock,
        config: EngineConfig,
    ) -> Self {
        let action_runner = Arc::new(ActionRunner::new(
            repos.controllers.clone(),
            repos.actions.clone(),
            dispatcher,
        ));
        let runner = Arc::new(AutomationRunner::new(
            repos.automations.clone(),
            action_runner,
            config.runner,
        ));
        let scheduler = Arc::new(JobScheduler::new(
            repos.recurring.clone(),
            repos.delayed.clone(),
            Arc::clone(&runner),
            clock,
            config.scheduler,
        ));

        Self {
            catalog: Arc::new(CatalogService::new(
                repos.actions.clone(),
                repos.controllers.clone(),
            )),
            automations: Arc::new(AutomationService::new(
                repos.automations,
                repos.controllers.clone(),
            )),
            actions: Arc::new(ActionService::new(runner, Arc::clone(&scheduler))),
            tasks: Arc::new(TaskService::new(
                repos.controllers,
                repos.actions,
                repos.recurring,
                repos.delayed,
                Arc::clone(&scheduler),
            )),
            scheduler,
        }
    }
}
