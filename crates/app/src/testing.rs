//! In-memory fakes shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::TimeDelta;

use smarthome_domain::action::Action;
use smarthome_domain::automation::AutomationGraph;
use smarthome_domain::controller::Controller;
use smarthome_domain::dispatch::DispatchOutcome;
use smarthome_domain::error::{NotFoundError, SmartHomeError};
use smarthome_domain::id::{
    ActionId, AutomationId, ControllerId, DelayedTaskId, RecurringTaskId,
};
use smarthome_domain::task::{DelayedTask, RecurringTask};
use smarthome_domain::time::Timestamp;

use crate::action_runner::ActionRunner;
use crate::automation_runner::{AutomationRunner, RunnerConfig};
use crate::ports::{
    ActionRepository, AutomationRepository, Clock, ControllerRepository, DelayedTaskRepository,
    Dispatcher, RecurringTaskRepository,
};
use crate::scheduler::{JobScheduler, SchedulerConfig};
use crate::services::action_service::ActionService;

pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Display + Send + Sync;
    const ENTITY: &'static str;
    fn key(&self) -> Self::Id;
}

macro_rules! record {
    ($ty:ty, $id:ty, $entity:literal) => {
        impl Record for $ty {
            type Id = $id;
            const ENTITY: &'static str = $entity;
            fn key(&self) -> $id {
                self.id
            }
        }
    };
}

record!(Action, ActionId, "Action");
record!(Controller, ControllerId, "Controller");
record!(AutomationGraph, AutomationId, "Automation");
record!(RecurringTask, RecurringTaskId, "RecurringTask");
record!(DelayedTask, DelayedTaskId, "DelayedTask");

pub struct InMemory<V: Record> {
    store: Mutex<HashMap<V::Id, V>>,
    offline: AtomicBool,
}

impl<V: Record> Default for InMemory<V> {
    fn default() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }
}

impl<V: Record> InMemory<V> {
    /// While offline, every repository call fails with a storage error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn available(&self) -> Result<(), SmartHomeError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SmartHomeError::Storage(Box::new(std::io::Error::other(
                "storage offline",
            ))));
        }
        Ok(())
    }

    pub fn insert(&self, id: V::Id, value: V) {
        self.store.lock().unwrap().insert(id, value);
    }

    pub fn get(&self, id: V::Id) -> Option<V> {
        self.store.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<V> {
        self.store.lock().unwrap().values().cloned().collect()
    }

    pub fn update_with(&self, id: V::Id, edit: impl FnOnce(&mut V)) {
        let mut store = self.store.lock().unwrap();
        edit(store.get_mut(&id).unwrap());
    }

    fn put(&self, value: V) -> Result<V, SmartHomeError> {
        self.available()?;
        self.insert(value.key(), value.clone());
        Ok(value)
    }

    fn replace(&self, value: V) -> Result<V, SmartHomeError> {
        self.available()?;
        let mut store = self.store.lock().unwrap();
        let Some(slot) = store.get_mut(&value.key()) else {
            return Err(not_found::<V>(value.key()));
        };
        *slot = value.clone();
        Ok(value)
    }

    fn remove(&self, id: V::Id) -> Result<(), SmartHomeError> {
        self.available()?;
        match self.store.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(not_found::<V>(id)),
        }
    }
}

fn not_found<V: Record>(id: V::Id) -> SmartHomeError {
    NotFoundError {
        entity: V::ENTITY,
        id: id.to_string(),
    }
    .into()
}

macro_rules! crud {
    ($ty:ty, $id:ty) => {
        fn create(&self, value: $ty) -> impl Future<Output = Result<$ty, SmartHomeError>> + Send {
            let result = self.put(value);
            async { result }
        }

        fn get_by_id(
            &self,
            id: $id,
        ) -> impl Future<Output = Result<Option<$ty>, SmartHomeError>> + Send {
            let result = self.available().map(|()| self.get(id));
            async { result }
        }

        fn get_all(&self) -> impl Future<Output = Result<Vec<$ty>, SmartHomeError>> + Send {
            let result = self.all();
            async { Ok(result) }
        }

        fn update(&self, value: $ty) -> impl Future<Output = Result<$ty, SmartHomeError>> + Send {
            let result = self.replace(value);
            async { result }
        }
    };
}

impl ActionRepository for InMemory<Action> {
    crud!(Action, ActionId);

    fn delete(&self, id: ActionId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let result = self.remove(id);
        async { result }
    }
}

impl ControllerRepository for InMemory<Controller> {
    crud!(Controller, ControllerId);

    fn delete(&self, id: ControllerId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let result = self.remove(id);
        async { result }
    }
}

impl AutomationRepository for InMemory<AutomationGraph> {
    crud!(AutomationGraph, AutomationId);

    fn get_active(
        &self,
    ) -> impl Future<Output = Result<Vec<AutomationGraph>, SmartHomeError>> + Send {
        let result: Vec<_> = self.all().into_iter().filter(|g| g.active).collect();
        async { Ok(result) }
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let result = self.remove(id);
        async { result }
    }
}

impl RecurringTaskRepository for InMemory<RecurringTask> {
    crud!(RecurringTask, RecurringTaskId);

    fn delete(
        &self,
        id: RecurringTaskId,
    ) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        let result = self.remove(id);
        async { result }
    }
}

impl DelayedTaskRepository for InMemory<DelayedTask> {
    crud!(DelayedTask, DelayedTaskId);

    fn get_active(&self) -> impl Future<Output = Result<Vec<DelayedTask>, SmartHomeError>> + Send {
        let result: Vec<_> = self.all().into_iter().filter(DelayedTask::is_active).collect();
        async { Ok(result) }
    }
}

/// Dispatcher answering from per-endpoint scripts.
///
/// Outcomes are consumed in order; the last one repeats forever. Endpoints
/// without a script fail with an empty body.
#[derive(Default)]
pub struct ScriptedDispatcher {
    scripts: Mutex<HashMap<String, VecDeque<DispatchOutcome>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDispatcher {
    pub fn script(
        &self,
        address: &str,
        path: &str,
        outcomes: impl IntoIterator<Item = DispatchOutcome>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .insert(format!("{address}{path}"), outcomes.into_iter().collect());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, address: &str, path: &str) -> usize {
        let key = format!("{address}{path}");
        self.calls.lock().unwrap().iter().filter(|c| **c == key).count()
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn invoke(&self, address: &str, path: &str) -> impl Future<Output = DispatchOutcome> + Send {
        let key = format!("{address}{path}");
        self.calls.lock().unwrap().push(key.clone());
        let mut scripts = self.scripts.lock().unwrap();
        let outcome = match scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| DispatchOutcome::failed("")),
            None => DispatchOutcome::failed(""),
        };
        async { outcome }
    }
}

pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(at("2024-05-01T08:00:00Z")),
        }
    }
}

impl ManualClock {
    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

pub fn at(rfc3339: &str) -> Timestamp {
    chrono::DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .to_utc()
}

pub type TestActionRunner =
    ActionRunner<Arc<InMemory<Controller>>, Arc<InMemory<Action>>, Arc<ScriptedDispatcher>>;

pub type TestAutomationRunner = AutomationRunner<
    Arc<InMemory<AutomationGraph>>,
    Arc<InMemory<Controller>>,
    Arc<InMemory<Action>>,
    Arc<ScriptedDispatcher>,
>;

pub type TestScheduler = JobScheduler<
    Arc<InMemory<RecurringTask>>,
    Arc<InMemory<DelayedTask>>,
    Arc<TestAutomationRunner>,
    Arc<ManualClock>,
>;

pub type TestActionService = ActionService<
    Arc<InMemory<AutomationGraph>>,
    Arc<InMemory<Controller>>,
    Arc<InMemory<Action>>,
    Arc<ScriptedDispatcher>,
    Arc<InMemory<RecurringTask>>,
    Arc<InMemory<DelayedTask>>,
    Arc<ManualClock>,
>;

/// Every fake wired together.
#[derive(Default)]
pub struct World {
    pub actions: Arc<InMemory<Action>>,
    pub controllers: Arc<InMemory<Controller>>,
    pub graphs: Arc<InMemory<AutomationGraph>>,
    pub recurring: Arc<InMemory<RecurringTask>>,
    pub delayed: Arc<InMemory<DelayedTask>>,
    pub dispatcher: Arc<ScriptedDispatcher>,
    pub clock: Arc<ManualClock>,
}

impl World {
    /// Store a controller at `address` exposing one actuator per path.
    pub fn controller(&self, address: &str, paths: &[&str]) -> (ControllerId, Vec<ActionId>) {
        let action_ids = paths
            .iter()
            .map(|path| {
                let action = Action::builder()
                    .name(path.trim_start_matches('/'))
                    .path(*path)
                    .build()
                    .unwrap();
                let id = action.id;
                self.actions.insert(id, action);
                id
            })
            .collect::<Vec<_>>();
        let controller = Controller::new(address, address, action_ids.clone()).unwrap();
        let id = controller.id;
        self.controllers.insert(id, controller);
        (id, action_ids)
    }

    pub fn action_runner(&self) -> TestActionRunner {
        ActionRunner::new(
            Arc::clone(&self.controllers),
            Arc::clone(&self.actions),
            Arc::clone(&self.dispatcher),
        )
    }

    pub fn automation_runner(&self) -> Arc<TestAutomationRunner> {
        Arc::new(AutomationRunner::new(
            Arc::clone(&self.graphs),
            Arc::new(self.action_runner()),
            RunnerConfig::default(),
        ))
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> Arc<TestScheduler> {
        Arc::new(JobScheduler::new(
            Arc::clone(&self.recurring),
            Arc::clone(&self.delayed),
            self.automation_runner(),
            Arc::clone(&self.clock),
            config,
        ))
    }
}
