/// Group broadcast channel
///
/// Connections join named groups; publishing an event to a group delivers it
/// to every member joined at that moment. Each member owns a bounded mpsc
/// queue, so delivery to one connection is FIFO and a slow connection can
/// only lose its own events.
///
/// # Backends
///
/// - [`memory::InMemoryChannel`]: single process
/// - [`redis::RedisChannel`]: several processes sharing one Redis
///
/// # Example
///
/// ```
/// use taskhub_shared::broadcast::{memory::InMemoryChannel, BroadcastChannel, Subscriber};
/// use taskhub_shared::events::{GroupEvent, TASKS_GROUP};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = InMemoryChannel::new();
/// let (subscriber, mut rx) = Subscriber::channel(8);
///
/// channel.join(TASKS_GROUP, subscriber).await;
/// channel.publish(TASKS_GROUP, GroupEvent::TaskUpdate).await?;
///
/// assert_eq!(rx.recv().await, Some(GroupEvent::TaskUpdate));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::GroupEvent;

pub mod memory;
pub mod redis;

/// Default per-connection queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Unique identity of one realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A group member: its identity plus the sending half of its queue
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<GroupEvent>,
}

impl Subscriber {
    /// Creates a subscriber with a fresh ID and a queue of `capacity`
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GroupEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                sender,
            },
            receiver,
        )
    }
}

/// Broadcast errors
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// The shared backend rejected or couldn't take the event
    #[error("Broadcast backend error: {0}")]
    Backend(String),

    /// The event couldn't be encoded for the backend
    #[error("Failed to encode event: {0}")]
    Encode(String),
}

/// Group membership and fan-out
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Adds `subscriber` to `group`
    ///
    /// Joining twice with the same ID replaces the earlier sender.
    async fn join(&self, group: &str, subscriber: Subscriber);

    /// Removes a connection from `group`; a no-op if it isn't a member
    async fn leave(&self, group: &str, id: ConnectionId);

    /// Delivers `event` to the current members of `group`
    ///
    /// Returns how many recipients the event was handed to. For the
    /// in-process channel these are local connections; for Redis they are
    /// subscribed instances, each of which delivers to its own members.
    async fn publish(&self, group: &str, event: GroupEvent) -> Result<usize, BroadcastError>;

    /// Number of local members of `group`
    async fn members(&self, group: &str) -> usize;
}

/// Broadcast channel shared between the notifier and the realtime gateway
pub type SharedChannel = Arc<dyn BroadcastChannel>;
