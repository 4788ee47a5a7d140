//! `SQLite` implementations of the task repositories.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::{DelayedTaskRepository, RecurringTaskRepository};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{DelayedTaskId, RecurringTaskId};
use smarthome_domain::task::{DelayedTask, DelayedTaskState, RecurringTask};

use crate::error::{StorageError, expect_row};
use crate::row::{self, decode_error};

#[derive(Debug, thiserror::Error)]
#[error("unknown delayed task state {0:?}")]
struct UnknownState(String);

fn state_to_str(state: DelayedTaskState) -> &'static str {
    match state {
        DelayedTaskState::Active => "active",
        DelayedTaskState::Done => "done",
        DelayedTaskState::Exhausted => "exhausted",
    }
}

fn state_from_str(value: String) -> Result<DelayedTaskState, UnknownState> {
    match value.as_str() {
        "active" => Ok(DelayedTaskState::Active),
        "done" => Ok(DelayedTaskState::Done),
        "exhausted" => Ok(DelayedTaskState::Exhausted),
        _ => Err(UnknownState(value)),
    }
}

struct RecurringWrapper(RecurringTask);

impl<'r> FromRow<'r, SqliteRow> for RecurringWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(RecurringTask {
            id: row::id(row, "id")?,
            controller_id: row::id(row, "controller_id")?,
            action_id: row::id(row, "action_id")?,
            schedule: row::json(row, "schedule")?,
            job_id: row::optional_id(row, "job_id")?,
        }))
    }
}

struct DelayedWrapper(DelayedTask);

impl<'r> FromRow<'r, SqliteRow> for DelayedWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let state: String = row.try_get("state")?;
        Ok(Self(DelayedTask {
            id: row::id(row, "id")?,
            controller_id: row::id(row, "controller_id")?,
            action_id: row::id(row, "action_id")?,
            delay_minutes: row::count(row, "delay_minutes")?,
            state: state_from_str(state).map_err(decode_error)?,
            retry_count: row::count(row, "retry_count")?,
            job_id: row::optional_id(row, "job_id")?,
            created_at: row::timestamp(row, "created_at")?,
        }))
    }
}

/// `SQLite`-backed recurring task repository.
pub struct SqliteRecurringTaskRepository {
    pool: SqlitePool,
}

impl SqliteRecurringTaskRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RecurringTaskRepository for SqliteRecurringTaskRepository {
    async fn create(&self, task: RecurringTask) -> Result<RecurringTask, SmartHomeError> {
        let schedule = serde_json::to_string(&task.schedule).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO recurring_tasks (id, controller_id, action_id, schedule, job_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.controller_id.to_string())
        .bind(task.action_id.to_string())
        .bind(&schedule)
        .bind(task.job_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(task)
    }

    async fn get_by_id(&self, id: RecurringTaskId) -> Result<Option<RecurringTask>, SmartHomeError> {
        let row: Option<RecurringWrapper> =
            sqlx::query_as("SELECT * FROM recurring_tasks WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<RecurringTask>, SmartHomeError> {
        let rows: Vec<RecurringWrapper> = sqlx::query_as("SELECT * FROM recurring_tasks")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, task: RecurringTask) -> Result<RecurringTask, SmartHomeError> {
        let schedule = serde_json::to_string(&task.schedule).map_err(StorageError::from)?;

        let result = sqlx::query(
            "UPDATE recurring_tasks SET controller_id = ?, action_id = ?, schedule = ?, job_id = ? WHERE id = ?",
        )
        .bind(task.controller_id.to_string())
        .bind(task.action_id.to_string())
        .bind(&schedule)
        .bind(task.job_id.map(|id| id.to_string()))
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        expect_row(&result, "RecurringTask", task.id)?;

        Ok(task)
    }

    async fn delete(&self, id: RecurringTaskId) -> Result<(), SmartHomeError> {
        let result = sqlx::query("DELETE FROM recurring_tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        expect_row(&result, "RecurringTask", id)
    }
}

/// `SQLite`-backed delayed task repository. Finished tasks are kept for
/// inspection; only their state changes.
pub struct SqliteDelayedTaskRepository {
    pool: SqlitePool,
}

impl SqliteDelayedTaskRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DelayedTaskRepository for SqliteDelayedTaskRepository {
    async fn create(&self, task: DelayedTask) -> Result<DelayedTask, SmartHomeError> {
        sqlx::query(
            "INSERT INTO delayed_tasks (id, controller_id, action_id, delay_minutes, state, retry_count, job_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.controller_id.to_string())
        .bind(task.action_id.to_string())
        .bind(i64::from(task.delay_minutes))
        .bind(state_to_str(task.state))
        .bind(i64::from(task.retry_count))
        .bind(task.job_id.map(|id| id.to_string()))
        .bind(task.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(task)
    }

    async fn get_by_id(&self, id: DelayedTaskId) -> Result<Option<DelayedTask>, SmartHomeError> {
        let row: Option<DelayedWrapper> =
            sqlx::query_as("SELECT * FROM delayed_tasks WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<DelayedTask>, SmartHomeError> {
        let rows: Vec<DelayedWrapper> =
            sqlx::query_as("SELECT * FROM delayed_tasks ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_active(&self) -> Result<Vec<DelayedTask>, SmartHomeError> {
        let rows: Vec<DelayedWrapper> =
            sqlx::query_as("SELECT * FROM delayed_tasks WHERE state = ? ORDER BY created_at")
                .bind(state_to_str(DelayedTaskState::Active))
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, task: DelayedTask) -> Result<DelayedTask, SmartHomeError> {
        let result = sqlx::query(
            "UPDATE delayed_tasks SET state = ?, retry_count = ?, job_id = ? WHERE id = ?",
        )
        .bind(state_to_str(task.state))
        .bind(i64::from(task.retry_count))
        .bind(task.job_id.map(|id| id.to_string()))
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        expect_row(&result, "DelayedTask", task.id)?;

        Ok(task)
    }
}
