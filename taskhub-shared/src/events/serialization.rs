/// Group event serialization for Redis pub/sub
///
/// Events cross instance boundaries as JSON strings on one Redis channel per
/// group.
///
/// # Format
///
/// ```text
/// {"type":"task_update"}
/// ```
///
/// # Channel Naming
///
/// - `taskhub:group:{group}`: one channel per broadcast group
/// - `taskhub:group:*`: the pattern every instance subscribes to
///
/// # Example
///
/// ```
/// use taskhub_shared::events::{GroupEvent, TASKS_GROUP};
/// use taskhub_shared::events::serialization::{deserialize_event, group_channel, serialize_event};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let payload = serialize_event(&GroupEvent::TaskUpdate)?;
/// assert_eq!(payload, r#"{"type":"task_update"}"#);
/// assert_eq!(deserialize_event(&payload)?, GroupEvent::TaskUpdate);
/// assert_eq!(group_channel(TASKS_GROUP), "taskhub:group:tasks");
/// # Ok(())
/// # }
/// ```

use thiserror::Error;

use super::GroupEvent;

/// Prefix shared by every group channel
pub const GROUP_CHANNEL_PREFIX: &str = "taskhub:group:";

/// Pattern matching every group channel
pub const GROUP_CHANNEL_PATTERN: &str = "taskhub:group:*";

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Channel name outside the group namespace
    #[error("Not a group channel: {0}")]
    InvalidChannel(String),
}

/// Encodes an event as its JSON wire form
pub fn serialize_event(event: &GroupEvent) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes an event from its JSON wire form
pub fn deserialize_event(payload: &str) -> Result<GroupEvent, SerializationError> {
    Ok(serde_json::from_str(payload)?)
}

/// Redis channel carrying events for `group`
pub fn group_channel(group: &str) -> String {
    format!("{}{}", GROUP_CHANNEL_PREFIX, group)
}

/// Recovers the group name from a channel name
pub fn group_from_channel(channel: &str) -> Result<&str, SerializationError> {
    channel
        .strip_prefix(GROUP_CHANNEL_PREFIX)
        .filter(|group| !group.is_empty())
        .ok_or_else(|| SerializationError::InvalidChannel(channel.to_string()))
}
