//! # smarthome-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `smarthome-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows; nested documents (graph
//!   nodes and edges, schedules, action lists) are stored as JSON columns
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for port traits) and `smarthome-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod action_repo;
pub mod automation_repo;
pub mod controller_repo;
pub mod error;
pub mod pool;
pub mod task_repo;

mod row;

pub use action_repo::SqliteActionRepository;
pub use automation_repo::SqliteAutomationRepository;
pub use controller_repo::SqliteControllerRepository;
pub use pool::{Config, Database};
pub use task_repo::{SqliteDelayedTaskRepository, SqliteRecurringTaskRepository};
