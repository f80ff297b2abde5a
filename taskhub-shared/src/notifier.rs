/// Task change notifier
///
/// The write path calls [`ChangeNotifier::task_changed`] after each
/// successful task mutation. The notifier publishes a bare
/// [`GroupEvent::TaskUpdate`] to the `"tasks"` group; connections fetch the
/// data themselves.
///
/// Publishing is best-effort. A backend failure is logged and swallowed so
/// the request that changed the task still succeeds.

use tracing::{debug, warn};

use crate::broadcast::SharedChannel;
use crate::events::{GroupEvent, TASKS_GROUP};

#[derive(Clone)]
pub struct ChangeNotifier {
    channel: SharedChannel,
}

impl ChangeNotifier {
    pub fn new(channel: SharedChannel) -> Self {
        Self { channel }
    }

    /// Announces that the task table changed
    pub async fn task_changed(&self) {
        match self.channel.publish(TASKS_GROUP, GroupEvent::TaskUpdate).await {
            Ok(recipients) => debug!(group = TASKS_GROUP, recipients, "task change announced"),
            Err(e) => warn!(group = TASKS_GROUP, error = %e, "failed to announce task change"),
        }
    }

    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{
        memory::InMemoryChannel, BroadcastChannel, BroadcastError, ConnectionId, Subscriber,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingChannel {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl BroadcastChannel for FailingChannel {
        async fn join(&self, _group: &str, _subscriber: Subscriber) {}

        async fn leave(&self, _group: &str, _id: ConnectionId) {}

        async fn publish(&self, _group: &str, _event: GroupEvent) -> Result<usize, BroadcastError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(BroadcastError::Backend("connection refused".to_string()))
        }

        async fn members(&self, _group: &str) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn task_changed_publishes_one_event() {
        let channel = Arc::new(InMemoryChannel::new());
        let (sub, mut rx) = Subscriber::channel(4);
        channel.join(TASKS_GROUP, sub).await;

        let notifier = ChangeNotifier::new(channel);
        notifier.task_changed().await;

        assert_eq!(rx.try_recv().unwrap(), GroupEvent::TaskUpdate);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn task_changed_swallows_backend_errors() {
        let channel = Arc::new(FailingChannel {
            attempts: AtomicUsize::new(0),
        });
        let notifier = ChangeNotifier::new(channel.clone());

        notifier.task_changed().await;

        assert_eq!(channel.attempts.load(Ordering::SeqCst), 1);
    }
}
