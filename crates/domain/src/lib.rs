//! # smarthome-domain
//!
//! Pure domain model for the smarthome execution engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Controllers** (network-addressable devices) and the **Actions** they expose
//! - Define **Automation graphs** (nodes, edges and the conditions guarding them)
//! - Define **Tasks** (recurring calendar schedules and one-off delayed runs)
//! - Define the normalized **dispatch outcome** of a device call
//! - Contain all invariant enforcement and pure evaluation logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod automation;
pub mod controller;
pub mod dispatch;
pub mod task;
