//! # TaskHub Shared Library
//!
//! Types and business logic shared by the TaskHub API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, JWT and axum middleware
//! - `events`: change events and their wire format
//! - `broadcast`: group fan-out to realtime connections (in-process or Redis)
//! - `notifier`: announces task changes on the broadcast channel
//! - `store`: task write path that notifies on every change
//! - `redis`: Redis connection wrapper

pub mod auth;
pub mod broadcast;
pub mod db;
pub mod events;
pub mod models;
pub mod notifier;
pub mod redis;
pub mod store;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
