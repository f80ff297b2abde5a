/// Redis integration for cross-instance fan-out
///
/// A single TaskHub server fans change events out in memory. When several
/// instances sit behind a load balancer, each one publishes events to Redis
/// and relays what it hears back to its own sockets:
///
/// ```text
/// instance A ──PUBLISH──> taskhub:group:tasks ──PSUBSCRIBE──> instance A, B, ...
/// ```
///
/// The relaying itself lives in `broadcast::redis`; this module only wraps
/// the connection.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
