//! `SQLite` implementation of [`AutomationRepository`].
//!
//! A graph is one row; its nodes and edges are JSON documents so that an
//! update swaps the whole graph in a single statement.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::AutomationRepository;
use smarthome_domain::automation::AutomationGraph;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::AutomationId;

use crate::error::{StorageError, expect_row};
use crate::row;

struct Wrapper(AutomationGraph);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(AutomationGraph {
            id: row::id(row, "id")?,
            name: row.try_get("name")?,
            active: row.try_get("active")?,
            nodes: row::json(row, "nodes")?,
            edges: row::json(row, "edges")?,
            created_at: row::timestamp(row, "created_at")?,
        }))
    }
}

/// `SQLite`-backed automation graph repository.
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &'static str) -> Result<Vec<AutomationGraph>, SmartHomeError> {
        let rows: Vec<Wrapper> = sqlx::query_as(query)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, graph: AutomationGraph) -> Result<AutomationGraph, SmartHomeError> {
        let nodes = serde_json::to_string(&graph.nodes).map_err(StorageError::from)?;
        let edges = serde_json::to_string(&graph.edges).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO automations (id, name, active, nodes, edges, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(graph.id.to_string())
        .bind(&graph.name)
        .bind(graph.active)
        .bind(&nodes)
        .bind(&edges)
        .bind(graph.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(graph)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<AutomationGraph>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM automations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<AutomationGraph>, SmartHomeError> {
        self.fetch("SELECT * FROM automations ORDER BY created_at, name")
            .await
    }

    async fn get_active(&self) -> Result<Vec<AutomationGraph>, SmartHomeError> {
        self.fetch("SELECT * FROM automations WHERE active = 1 ORDER BY created_at, name")
            .await
    }

    async fn update(&self, graph: AutomationGraph) -> Result<AutomationGraph, SmartHomeError> {
        let nodes = serde_json::to_string(&graph.nodes).map_err(StorageError::from)?;
        let edges = serde_json::to_string(&graph.edges).map_err(StorageError::from)?;

        let result = sqlx::query(
            "UPDATE automations SET name = ?, active = ?, nodes = ?, edges = ? WHERE id = ?",
        )
        .bind(&graph.name)
        .bind(graph.active)
        .bind(&nodes)
        .bind(&edges)
        .bind(graph.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        expect_row(&result, "Automation", graph.id)?;

        Ok(graph)
    }

    async fn delete(&self, id: AutomationId) -> Result<(), SmartHomeError> {
        let result = sqlx::query("DELETE FROM automations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        expect_row(&result, "Automation", id)
    }
}
