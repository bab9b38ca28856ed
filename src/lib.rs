//! # Busfleet Backend
//!
//! Scheduling and conflict-resolution engine for a school bus fleet.
//!
//! The engine assigns a driver, a vehicle, and a route to a calendar date
//! and shift while guaranteeing no double-booking of any of the three
//! resources, and derives per-stop arrival estimates for the route of a
//! schedule. Reference directories (drivers, buses, routes, stops,
//! students) are consumed as read-only lookups; the engine never creates
//! them as a side effect.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: identifier newtypes shared across layers
//! - [`models`]: domain entities, the status state machine, the schedule
//!   reference codec, and time-of-day handling
//! - [`services`]: business logic (conflict detection, schedule store
//!   operations, stop-time interpolation)
//! - [`db`]: repository traits and the local / Postgres implementations
//! - [`http`]: axum-based HTTP server and request handlers
//!
//! ## Backends
//!
//! Two repository backends are available behind feature flags, matching
//! typical deployment needs:
//!
//! - `local-repo`: in-memory repository for unit tests and local
//!   development
//! - `postgres-repo`: Diesel + r2d2 backed Postgres repository; the
//!   composite unique indexes on (date, shift, driver/bus/route) are the
//!   authoritative double-booking guard

pub mod api;

pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
