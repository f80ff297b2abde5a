//! # TaskHub API Server Library
//!
//! HTTP and WebSocket front end for TaskHub.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors with JSON error responses
//! - `middleware`: Security headers
//! - `realtime`: WebSocket gateway pushing task snapshots
//! - `routes`: REST route handlers
//! - `validation`: Field validators for request bodies

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod validation;
