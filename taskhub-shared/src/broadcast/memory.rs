//! In-process broadcast channel.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc::error::TrySendError, mpsc::Sender, RwLock};
use tracing::{debug, warn};

use super::{BroadcastChannel, BroadcastError, ConnectionId, Subscriber};
use crate::events::GroupEvent;

/// Group membership held in process memory.
///
/// A full queue drops that one event for that one connection. A closed queue
/// means the connection is gone, so it is pruned on the next publish.
#[derive(Default)]
pub struct InMemoryChannel {
    groups: RwLock<HashMap<String, HashMap<ConnectionId, Sender<GroupEvent>>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BroadcastChannel for InMemoryChannel {
    async fn join(&self, group: &str, subscriber: Subscriber) {
        let mut groups = self.groups.write().await;
        let members = groups.entry(group.to_string()).or_default();
        let _ = members.insert(subscriber.id, subscriber.sender);
        debug!(group, conn_id = %subscriber.id, members = members.len(), "joined group");
    }

    async fn leave(&self, group: &str, id: ConnectionId) {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(group) {
            if members.remove(&id).is_some() {
                debug!(group, conn_id = %id, members = members.len(), "left group");
            }
            if members.is_empty() {
                let _ = groups.remove(group);
            }
        }
    }

    async fn publish(&self, group: &str, event: GroupEvent) -> Result<usize, BroadcastError> {
        let mut delivered = 0usize;
        let mut closed = Vec::new();
        {
            let groups = self.groups.read().await;
            let Some(members) = groups.get(group) else {
                debug!(group, ?event, recipients = 0, "broadcast event");
                return Ok(0);
            };

            for (id, sender) in members {
                match sender.try_send(event) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(group, conn_id = %id, "dropping event for slow connection (queue full)");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
            debug!(group, ?event, recipients = delivered, "broadcast event");
        }

        if !closed.is_empty() {
            let mut groups = self.groups.write().await;
            if let Some(members) = groups.get_mut(group) {
                for id in &closed {
                    let _ = members.remove(id);
                }
                if members.is_empty() {
                    let _ = groups.remove(group);
                }
            }
            debug!(group, pruned = closed.len(), "pruned closed connections");
        }

        Ok(delivered)
    }

    async fn members(&self, group: &str) -> usize {
        self.groups
            .read()
            .await
            .get(group)
            .map_or(0, HashMap::len)
    }
}
