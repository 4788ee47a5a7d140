//! `SQLite` implementation of [`ControllerRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::ControllerRepository;
use smarthome_domain::controller::Controller;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::ControllerId;

use crate::error::{StorageError, expect_row};
use crate::row;

struct Wrapper(Controller);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Controller {
            id: row::id(row, "id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            action_ids: row::json(row, "action_ids")?,
        }))
    }
}

/// `SQLite`-backed controller repository. The exposed action ids are kept
/// as a JSON array.
pub struct SqliteControllerRepository {
    pool: SqlitePool,
}

impl SqliteControllerRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ControllerRepository for SqliteControllerRepository {
    async fn create(&self, controller: Controller) -> Result<Controller, SmartHomeError> {
        let action_ids =
            serde_json::to_string(&controller.action_ids).map_err(StorageError::from)?;

        sqlx::query("INSERT INTO controllers (id, name, address, action_ids) VALUES (?, ?, ?, ?)")
            .bind(controller.id.to_string())
            .bind(&controller.name)
            .bind(&controller.address)
            .bind(&action_ids)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(controller)
    }

    async fn get_by_id(&self, id: ControllerId) -> Result<Option<Controller>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM controllers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<Controller>, SmartHomeError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM controllers ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, controller: Controller) -> Result<Controller, SmartHomeError> {
        let action_ids =
            serde_json::to_string(&controller.action_ids).map_err(StorageError::from)?;

        let result =
            sqlx::query("UPDATE controllers SET name = ?, address = ?, action_ids = ? WHERE id = ?")
                .bind(&controller.name)
                .bind(&controller.address)
                .bind(&action_ids)
                .bind(controller.id.to_string())
                .execute(&self.pool)
                .await
                .map_err(StorageError::from)?;
        expect_row(&result, "Controller", controller.id)?;

        Ok(controller)
    }

    async fn delete(&self, id: ControllerId) -> Result<(), SmartHomeError> {
        let result = sqlx::query("DELETE FROM controllers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        expect_row(&result, "Controller", id)
    }
}
