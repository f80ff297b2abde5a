/// Change events exchanged between the write path and realtime connections
///
/// An event carries no data beyond its type. A connection that receives one
/// re-reads the task snapshot itself.

use serde::{Deserialize, Serialize};

pub mod serialization;

pub use serialization::{
    deserialize_event, group_channel, group_from_channel, serialize_event, SerializationError,
};

/// Group every realtime task connection joins
pub const TASKS_GROUP: &str = "tasks";

/// Event delivered to every member of a broadcast group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// Some task was created, updated or deleted
    TaskUpdate,
}
