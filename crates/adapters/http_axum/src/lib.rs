//! # smarthome-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON REST API** for the action and controller catalog,
//!   automation graphs, recurring tasks and delayed tasks
//! - Run actions on demand (`/api/run/{controller_id}/{action_id}`)
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`SmartHomeError`](smarthome_domain::error::SmartHomeError) into
//!   status codes
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for port traits and services) and
//! `smarthome-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
