/// Redis-backed broadcast channel for multi-instance deployments
///
/// Membership stays local: each instance keeps its own sockets in an
/// [`InMemoryChannel`]. Publishing goes out through Redis and comes back in
/// through a pattern subscription that every instance holds, including the
/// publisher, so all instances deliver through the same path.
///
/// ```text
/// publish ──PUBLISH taskhub:group:{g}──> Redis ──PSUBSCRIBE taskhub:group:*──> listener
///                                                                              │
///                                                       local InMemoryChannel <┘
/// ```
///
/// The listener reconnects after a short delay if the subscription drops.
/// Events published while it is down are lost, like any other best-effort
/// push.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::memory::InMemoryChannel;
use super::{BroadcastChannel, BroadcastError, ConnectionId, Subscriber};
use crate::events::serialization::{
    deserialize_event, group_channel, group_from_channel, serialize_event, GROUP_CHANNEL_PATTERN,
};
use crate::events::GroupEvent;
use crate::redis::client::{RedisClient, RedisClientError};

/// Delay before re-subscribing after the listener loses its connection
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broadcast channel that fans out across instances through Redis pub/sub
pub struct RedisChannel {
    client: RedisClient,
    local: Arc<InMemoryChannel>,
    _listener: DropGuard,
}

impl RedisChannel {
    /// Starts the relay listener and returns the channel
    ///
    /// The listener stops when `shutdown` is cancelled or the channel is
    /// dropped, whichever comes first.
    pub fn start(client: RedisClient, shutdown: &CancellationToken) -> Self {
        let local = Arc::new(InMemoryChannel::new());
        let cancel = shutdown.child_token();

        tokio::spawn(run_listener(client.clone(), Arc::clone(&local), cancel.clone()));

        Self {
            client,
            local,
            _listener: cancel.drop_guard(),
        }
    }
}

#[async_trait]
impl BroadcastChannel for RedisChannel {
    async fn join(&self, group: &str, subscriber: Subscriber) {
        self.local.join(group, subscriber).await;
    }

    async fn leave(&self, group: &str, id: ConnectionId) {
        self.local.leave(group, id).await;
    }

    /// Returns the number of instances Redis handed the event to
    ///
    /// Local members get the event when it comes back through the
    /// subscription, so their count isn't known here.
    async fn publish(&self, group: &str, event: GroupEvent) -> Result<usize, BroadcastError> {
        let payload =
            serialize_event(&event).map_err(|e| BroadcastError::Encode(e.to_string()))?;

        let instances = self
            .client
            .publish(&group_channel(group), &payload)
            .await
            .map_err(|e| BroadcastError::Backend(e.to_string()))?;

        debug!(group, ?event, instances, "published event to redis");
        Ok(instances)
    }

    async fn members(&self, group: &str) -> usize {
        self.local.members(group).await
    }
}

async fn run_listener(client: RedisClient, local: Arc<InMemoryChannel>, cancel: CancellationToken) {
    loop {
        match listen(&client, &local, &cancel).await {
            Ok(()) => {
                debug!("redis broadcast listener stopped");
                return;
            }
            Err(e) => {
                warn!(error = %e, "redis broadcast listener disconnected, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }
}

/// Subscribes and relays until cancelled (`Ok`) or the connection fails (`Err`)
async fn listen(
    client: &RedisClient,
    local: &InMemoryChannel,
    cancel: &CancellationToken,
) -> Result<(), RedisClientError> {
    let mut pubsub = client.pubsub().await?;
    pubsub.psubscribe(GROUP_CHANNEL_PATTERN).await?;
    info!(pattern = GROUP_CHANNEL_PATTERN, "redis broadcast listener subscribed");

    let mut messages = pin!(pubsub.on_message());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            msg = messages.next() => {
                let Some(msg) = msg else {
                    return Err(RedisClientError::ConnectionError(
                        "subscription stream ended".to_string(),
                    ));
                };
                relay(local, msg.get_channel_name(), msg.get_payload::<String>()).await;
            }
        }
    }
}

async fn relay(local: &InMemoryChannel, channel: &str, payload: redis::RedisResult<String>) {
    let group = match group_from_channel(channel) {
        Ok(group) => group,
        Err(e) => {
            warn!(error = %e, "ignoring message on unexpected channel");
            return;
        }
    };

    let event = match payload
        .map_err(|e| e.to_string())
        .and_then(|p| deserialize_event(&p).map_err(|e| e.to_string()))
    {
        Ok(event) => event,
        Err(e) => {
            warn!(group, error = %e, "ignoring undecodable group event");
            return;
        }
    };

    // local delivery never fails
    let _ = local.publish(group, event).await;
}
