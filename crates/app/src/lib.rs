//! # smarthome-app
//!
//! Application layer: the execution engine, use-cases and **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ActionRepository`, `ControllerRepository` — the device catalog
//!   - `AutomationRepository` — automation graphs
//!   - `RecurringTaskRepository`, `DelayedTaskRepository` — scheduled work
//!   - `Dispatcher` — calling a device over the network
//!   - `Clock` — the scheduler's notion of "now"
//! - Run the engine:
//!   - `ActionRunner` — resolve ids and call the device
//!   - `AutomationRunner` — propagate automation chains
//!   - `JobScheduler` — recurring and delayed jobs with retry
//! - Define **driving/inbound ports** as use-case structs:
//!   - `ActionService` — invoke an action, optionally planning its opposite
//!   - `TaskService`, `AutomationService`, `CatalogService` — editing
//!
//! ## Dependency rule
//! Depends on `smarthome-domain` only (plus `tokio` for timers and tasks and
//! `cron` for calendar schedules). Never imports adapter crates. Adapters
//! depend on *this* crate, not the reverse.

pub mod action_runner;
pub mod automation_runner;
pub mod ports;
pub mod scheduler;
pub mod services;

#[cfg(test)]
mod testing;
