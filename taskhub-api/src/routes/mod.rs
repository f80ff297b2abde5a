/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and token endpoints
/// - `categories`: The caller's categories
/// - `tasks`: The caller's tasks

pub mod auth;
pub mod categories;
pub mod health;
pub mod tasks;
