//! Job scheduler: recurring calendar jobs and one-off delayed jobs.
//!
//! Jobs live in an in-memory table keyed by [`JobId`]; the id is also
//! stored on the task record so a restarted process (or a rescheduled
//! task) can cancel whatever was registered before. A background ticker
//! started with [`JobScheduler::start`] fires due jobs on their own tasks.
//! Tests drive the same logic through [`JobScheduler::run_due`] with a
//! manual [`Clock`].
//!
//! A job is flagged as running while its callback executes and is never
//! picked up again until the callback completes, so a job can't overlap
//! itself. Delayed jobs are single-shot: the retry job is registered by
//! the callback of the failed attempt.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use smarthome_domain::dispatch::DispatchOutcome;
use smarthome_domain::error::{NotFoundError, SmartHomeError, ValidationError};
use smarthome_domain::id::{ActionId, ControllerId, DelayedTaskId, JobId, RecurringTaskId};
use smarthome_domain::task::{DelayedTask, RecurringTask, Schedule};
use smarthome_domain::time::{self, Timestamp};

use crate::automation_runner::AutomationRunner;
use crate::ports::{
    ActionRepository, AutomationRepository, Clock, ControllerRepository, DelayedTaskRepository,
    Dispatcher, RecurringTaskRepository,
};

/// Performs the top-level invocation behind a job.
pub trait ActionExecutor: Send + Sync {
    fn execute(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> impl Future<Output = Result<DispatchOutcome, SmartHomeError>> + Send;
}

/// Jobs go through the automation runner, so a successful job starts the
/// chains rooted at its action like any other top-level invocation.
impl<GR, CR, AR, D> ActionExecutor for Arc<AutomationRunner<GR, CR, AR, D>>
where
    GR: AutomationRepository + Send + Sync + 'static,
    CR: ControllerRepository + Send + Sync + 'static,
    AR: ActionRepository + Send + Sync + 'static,
    D: Dispatcher + 'static,
{
    fn execute(
        &self,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> impl Future<Output = Result<DispatchOutcome, SmartHomeError>> + Send {
        async move {
            let dispatched = self.invoke_by_id(controller_id, action_id).await?;
            Ok(dispatched.outcome)
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the background ticker looks for due jobs.
    pub tick: Duration,
    /// Failed attempts after which a delayed task is abandoned.
    pub retry_threshold: u32,
    /// Wait before retrying a failed delayed task.
    pub retry_window: Duration,
    /// How late a delayed task may still fire at its planned time after a
    /// restart. Later than that, it fires this long after the restart.
    pub late_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            retry_threshold: 5,
            retry_window: Duration::from_secs(10),
            late_grace: Duration::from_secs(10),
        }
    }
}

/// The task a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTarget {
    Recurring(RecurringTaskId),
    Delayed(DelayedTaskId),
}

/// A registered job, as listed by [`JobScheduler::pending_jobs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub id: JobId,
    pub target: JobTarget,
    pub next_fire: Timestamp,
}

/// Outcome of [`JobScheduler::restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub recurring: usize,
    pub delayed: usize,
}

enum Trigger {
    Once,
    Cron(Box<cron::Schedule>),
}

struct Job {
    target: JobTarget,
    trigger: Trigger,
    next_fire: Timestamp,
    running: bool,
}

/// Registers, fires and retries task jobs.
pub struct JobScheduler<RR, DR, X, K> {
    recurring: RR,
    delayed: DR,
    executor: X,
    clock: K,
    config: SchedulerConfig,
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl<RR, DR, X, K> JobScheduler<RR, DR, X, K>
where
    RR: RecurringTaskRepository + Send + Sync,
    DR: DelayedTaskRepository + Send + Sync,
    X: ActionExecutor,
    K: Clock,
{
    pub fn new(recurring: RR, delayed: DR, executor: X, clock: K, config: SchedulerConfig) -> Self {
        Self {
            recurring,
            delayed,
            executor,
            clock,
            config,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Current time as seen by the scheduler.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register (or re-register) the job of a recurring task and persist
    /// its new job id. Any job previously registered for the task is
    /// cancelled once the new id is stored, and kept when storing fails.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSchedule`] when the schedule never
    /// fires, or a storage error when the task can't be saved.
    #[tracing::instrument(skip_all, fields(task = %task.id))]
    pub async fn schedule_recurring(
        &self,
        mut task: RecurringTask,
    ) -> Result<RecurringTask, SmartHomeError> {
        let schedule = cron_schedule(&task.schedule)?;
        let next_fire = schedule
            .after(&self.clock.now())
            .next()
            .ok_or_else(|| ValidationError::InvalidSchedule(task.schedule.cron_expression()))?;

        let job_id = JobId::new();
        let previous = task.job_id.replace(job_id);
        let task = self.recurring.update(task).await?;
        if let Some(previous) = previous {
            self.cancel(previous);
        }
        self.jobs().insert(
            job_id,
            Job {
                target: JobTarget::Recurring(task.id),
                trigger: Trigger::Cron(Box::new(schedule)),
                next_fire,
                running: false,
            },
        );
        tracing::info!(job = %job_id, %next_fire, "recurring task scheduled");
        Ok(task)
    }

    /// Register the one-off job of an active delayed task and persist its
    /// job id. Inactive tasks are returned untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the task can't be saved.
    #[tracing::instrument(skip_all, fields(task = %task.id))]
    pub async fn schedule_delayed(
        &self,
        mut task: DelayedTask,
    ) -> Result<DelayedTask, SmartHomeError> {
        if !task.is_active() {
            return Ok(task);
        }
        let next_fire = task.resume_at(self.clock.now(), time::delta(self.config.late_grace));

        let job_id = JobId::new();
        let previous = task.job_id.replace(job_id);
        let task = self.delayed.update(task).await?;
        if let Some(previous) = previous {
            self.cancel(previous);
        }
        self.insert_once(job_id, task.id, next_fire);
        tracing::info!(job = %job_id, %next_fire, "delayed task scheduled");
        Ok(task)
    }

    /// Store a new recurring task and register its job.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for an out-of-range schedule,
    /// or a storage error.
    pub async fn submit_recurring(
        &self,
        task: RecurringTask,
    ) -> Result<RecurringTask, SmartHomeError> {
        task.schedule.validate()?;
        let task = self.recurring.create(task).await?;
        self.schedule_recurring(task).await
    }

    /// Store a new delayed task and register its job.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn submit_delayed(&self, task: DelayedTask) -> Result<DelayedTask, SmartHomeError> {
        let task = self.delayed.create(task).await?;
        self.schedule_delayed(task).await
    }

    /// Cancel the job of a recurring task, then delete the task.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when the task does not exist, or
    /// a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_recurring(
        &self,
        id: RecurringTaskId,
    ) -> Result<RecurringTask, SmartHomeError> {
        let task = self
            .recurring
            .get_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "RecurringTask",
                id: id.to_string(),
            })?;
        if let Some(job_id) = task.job_id {
            self.cancel(job_id);
        }
        self.recurring.delete(id).await?;
        Ok(task)
    }

    /// Re-register every recurring task and every active delayed task,
    /// typically once at startup. Tasks that fail to register are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the tasks can't be listed.
    pub async fn restore(&self) -> Result<RestoreReport, SmartHomeError> {
        let mut report = RestoreReport::default();

        for task in self.recurring.get_all().await? {
            let id = task.id;
            match self.schedule_recurring(task).await {
                Ok(_) => report.recurring += 1,
                Err(err) => tracing::warn!(task = %id, error = %err, "recurring task not restored"),
            }
        }
        for task in self.delayed.get_active().await? {
            let id = task.id;
            match self.schedule_delayed(task).await {
                Ok(_) => report.delayed += 1,
                Err(err) => tracing::warn!(task = %id, error = %err, "delayed task not restored"),
            }
        }

        tracing::info!(
            recurring = report.recurring,
            delayed = report.delayed,
            "scheduler restored"
        );
        Ok(report)
    }

    /// Drop a job. Returns `false` if it was not registered.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let removed = self.jobs().remove(&job_id).is_some();
        if removed {
            tracing::debug!(job = %job_id, "job cancelled");
        }
        removed
    }

    /// Registered jobs, soonest first.
    #[must_use]
    pub fn pending_jobs(&self) -> Vec<PendingJob> {
        let mut pending: Vec<_> = self
            .jobs()
            .iter()
            .map(|(id, job)| PendingJob {
                id: *id,
                target: job.target,
                next_fire: job.next_fire,
            })
            .collect();
        pending.sort_by_key(|job| job.next_fire);
        pending
    }

    #[must_use]
    pub fn next_fire(&self, job_id: JobId) -> Option<Timestamp> {
        self.jobs().get(&job_id).map(|job| job.next_fire)
    }

    /// Fire every job due at the clock's current time, one after the
    /// other. Returns how many fired.
    pub async fn run_due(&self) -> usize {
        let due = self.take_due(self.clock.now());
        let count = due.len();
        for (job_id, target) in due {
            self.fire(job_id, target).await;
        }
        count
    }

    fn take_due(&self, now: Timestamp) -> Vec<(JobId, JobTarget)> {
        let mut jobs = self.jobs();
        let mut due: Vec<_> = jobs
            .iter_mut()
            .filter(|(_, job)| !job.running && job.next_fire <= now)
            .map(|(id, job)| {
                job.running = true;
                (job.next_fire, *id, job.target)
            })
            .collect();
        due.sort_by_key(|(next_fire, _, _)| *next_fire);
        due.into_iter().map(|(_, id, target)| (id, target)).collect()
    }

    async fn fire(&self, job_id: JobId, target: JobTarget) {
        match target {
            JobTarget::Recurring(task_id) => self.fire_recurring(job_id, task_id).await,
            JobTarget::Delayed(task_id) => self.fire_delayed(job_id, task_id).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn fire_recurring(&self, job_id: JobId, task_id: RecurringTaskId) {
        match self.recurring.get_by_id(task_id).await {
            Ok(Some(task)) if task.job_id == Some(job_id) => {
                match self
                    .executor
                    .execute(task.controller_id, task.action_id)
                    .await
                {
                    Ok(outcome) if outcome.ok => tracing::info!("recurring task ran"),
                    Ok(_) => tracing::warn!("recurring task failed, waiting for next occurrence"),
                    Err(err) => tracing::warn!(error = %err, "recurring task could not run"),
                }
            }
            Ok(_) => {
                tracing::debug!("recurring task gone or rescheduled, dropping job");
                self.cancel(job_id);
                return;
            }
            Err(err) => tracing::error!(error = %err, "failed to load recurring task"),
        }
        self.reschedule(job_id);
    }

    /// Compute the next occurrence of a cron job once its callback is done.
    fn reschedule(&self, job_id: JobId) {
        let now = self.clock.now();
        let mut jobs = self.jobs();
        let next = jobs.get(&job_id).and_then(|job| match &job.trigger {
            Trigger::Cron(schedule) => schedule.after(&now).next(),
            Trigger::Once => None,
        });
        match (next, jobs.get_mut(&job_id)) {
            (Some(next_fire), Some(job)) => {
                job.next_fire = next_fire;
                job.running = false;
                tracing::debug!(job = %job_id, %next_fire, "job rescheduled");
            }
            (None, Some(_)) => {
                jobs.remove(&job_id);
            }
            (_, None) => {}
        }
    }

    #[tracing::instrument(skip(self))]
    async fn fire_delayed(&self, job_id: JobId, task_id: DelayedTaskId) {
        if !self.cancel(job_id) {
            return;
        }
        let mut task = match self.delayed.get_by_id(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::debug!("delayed task gone, dropping job");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load delayed task");
                self.retry_later(job_id, task_id);
                return;
            }
        };
        if !task.is_active() || task.job_id != Some(job_id) {
            tracing::debug!("stale delayed job ignored");
            return;
        }

        if task.has_exhausted(self.config.retry_threshold) {
            task.mark_exhausted();
            tracing::warn!(retries = task.retry_count, "delayed task gave up");
            if self.save_delayed(task).await.is_none() {
                self.retry_later(job_id, task_id);
            }
            return;
        }

        let succeeded = match self
            .executor
            .execute(task.controller_id, task.action_id)
            .await
        {
            Ok(outcome) => outcome.ok,
            Err(err) => {
                tracing::warn!(error = %err, "delayed task could not run");
                false
            }
        };

        if succeeded {
            task.mark_done();
            tracing::info!(retries = task.retry_count, "delayed task done");
            self.save_delayed(task).await;
            return;
        }

        let retry_job = JobId::new();
        task.record_failure(retry_job);
        let next_fire = self.clock.now() + time::delta(self.config.retry_window);
        tracing::info!(retries = task.retry_count, %next_fire, "delayed task failed, retrying");
        // The stored row keeps pointing at `job_id` when the save fails.
        match self.save_delayed(task).await {
            Some(task) => self.insert_once(retry_job, task.id, next_fire),
            None => self.insert_once(job_id, task_id, next_fire),
        }
    }

    fn retry_later(&self, job_id: JobId, task_id: DelayedTaskId) {
        let next_fire = self.clock.now() + time::delta(self.config.retry_window);
        tracing::info!(job = %job_id, %next_fire, "delayed job re-armed");
        self.insert_once(job_id, task_id, next_fire);
    }

    async fn save_delayed(&self, task: DelayedTask) -> Option<DelayedTask> {
        match self.delayed.update(task).await {
            Ok(task) => Some(task),
            Err(err) => {
                tracing::error!(error = %err, "failed to save delayed task");
                None
            }
        }
    }

    fn insert_once(&self, job_id: JobId, task_id: DelayedTaskId, next_fire: Timestamp) {
        self.jobs().insert(
            job_id,
            Job {
                target: JobTarget::Delayed(task_id),
                trigger: Trigger::Once,
                next_fire,
                running: false,
            },
        );
    }
}

impl<RR, DR, X, K> JobScheduler<RR, DR, X, K>
where
    RR: RecurringTaskRepository + Send + Sync + 'static,
    DR: DelayedTaskRepository + Send + Sync + 'static,
    X: ActionExecutor + 'static,
    K: Clock + 'static,
{
    /// Spawn the background ticker. Each due job runs on its own task.
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let this = Arc::clone(self);

        let task = tokio::spawn(async move {
            tracing::info!(tick = ?this.config.tick, "scheduler started");
            let mut ticker = interval(this.config.tick.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for (job_id, target) in this.take_due(this.clock.now()) {
                            let this = Arc::clone(&this);
                            tokio::spawn(async move { this.fire(job_id, target).await });
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}

/// Running background ticker.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop picking up due jobs and wait for the ticker to exit. Jobs
    /// already running finish on their own.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "scheduler ticker aborted");
        }
    }
}

fn cron_schedule(schedule: &Schedule) -> Result<cron::Schedule, SmartHomeError> {
    schedule.validate()?;
    let expression = schedule.cron_expression();
    cron::Schedule::from_str(&expression)
        .map_err(|_| ValidationError::InvalidSchedule(expression).into())
}
