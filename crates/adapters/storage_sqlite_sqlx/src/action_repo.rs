//! `SQLite` implementations of [`ActionRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::ActionRepository;
use smarthome_domain::action::Action;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::ActionId;

use crate::error::{StorageError, expect_row};
use crate::row;

struct Wrapper(Action);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Action {
            id: row::id(row, "id")?,
            name: row.try_get("name")?,
            path: row.try_get("path")?,
            description: row.try_get("description")?,
            is_sensor: row.try_get("is_sensor")?,
            opposite_action_id: row::optional_id(row, "opposite_action_id")?,
        }))
    }
}

/// `SQLite`-backed action repository.
pub struct SqliteActionRepository {
    pool: SqlitePool,
}

impl SqliteActionRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ActionRepository for SqliteActionRepository {
    async fn create(&self, action: Action) -> Result<Action, SmartHomeError> {
        sqlx::query(
            "INSERT INTO actions (id, name, path, description, is_sensor, opposite_action_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(action.id.to_string())
        .bind(&action.name)
        .bind(&action.path)
        .bind(&action.description)
        .bind(action.is_sensor)
        .bind(action.opposite_action_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(action)
    }

    async fn get_by_id(&self, id: ActionId) -> Result<Option<Action>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM actions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<Action>, SmartHomeError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM actions ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, action: Action) -> Result<Action, SmartHomeError> {
        let result = sqlx::query(
            "UPDATE actions SET name = ?, path = ?, description = ?, is_sensor = ?, opposite_action_id = ? WHERE id = ?",
        )
        .bind(&action.name)
        .bind(&action.path)
        .bind(&action.description)
        .bind(action.is_sensor)
        .bind(action.opposite_action_id.map(|id| id.to_string()))
        .bind(action.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        expect_row(&result, "Action", action.id)?;

        Ok(action)
    }

    async fn delete(&self, id: ActionId) -> Result<(), SmartHomeError> {
        let result = sqlx::query("DELETE FROM actions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        expect_row(&result, "Action", id)
    }
}
