/// One realtime connection
///
/// The connection joins the `tasks` group when it opens and leaves it on
/// every way out of the loop: client close, transport error, malformed
/// frame, server shutdown.
///
/// While connected it does two things:
///
/// - answers each `{"message": ...}` frame with an echo
/// - on every task change event, reads a fresh snapshot and pushes it as
///   `{"type": "task_update", "tasks": [...]}`
///
/// A failed snapshot read is logged and skipped. The connection stays open
/// and the next event tries again.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use std::borrow::Cow;
use taskhub_shared::{
    broadcast::{ConnectionId, Subscriber},
    events::{GroupEvent, TASKS_GROUP},
    store::SnapshotScope,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, EchoReply, ServerPush};
use super::GatewayState;

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// Client sent a close frame
    ClientClosed,

    /// Stream ended without a close frame
    StreamEnded,

    /// Reading or writing the socket failed
    Transport,

    /// Client sent something other than `{"message": "<text>"}`
    MalformedFrame,

    /// The broadcast channel dropped this connection's queue
    ChannelClosed,

    /// The server is shutting down
    Shutdown,
}

/// Runs a connection until it ends
pub async fn run(socket: WebSocket, gateway: GatewayState, scope: SnapshotScope) {
    let (subscriber, mut events) = Subscriber::channel(gateway.queue_capacity);
    let id = subscriber.id;

    gateway.channel.join(TASKS_GROUP, subscriber).await;
    info!(connection_id = %id, scope = ?scope, "Realtime connection opened");

    let reason = serve(socket, &mut events, &gateway, scope, id).await;

    gateway.channel.leave(TASKS_GROUP, id).await;
    info!(connection_id = %id, reason = ?reason, "Realtime connection closed");
}

async fn serve(
    mut socket: WebSocket,
    events: &mut mpsc::Receiver<GroupEvent>,
    gateway: &GatewayState,
    scope: SnapshotScope,
    id: ConnectionId,
) -> Disconnect {
    loop {
        tokio::select! {
            frame = socket.recv() => {
                let message = match frame {
                    None => return Disconnect::StreamEnded,
                    Some(Err(e)) => {
                        debug!(connection_id = %id, error = %e, "Socket read failed");
                        return Disconnect::Transport;
                    }
                    Some(Ok(message)) => message,
                };

                match message {
                    Message::Text(text) => match ClientMessage::parse(&text) {
                        Ok(msg) => {
                            if send_json(&mut socket, &EchoReply::to(&msg)).await.is_err() {
                                return Disconnect::Transport;
                            }
                        }
                        Err(e) => {
                            debug!(connection_id = %id, error = %e, "Malformed frame");
                            close(&mut socket, close_code::INVALID, "malformed message").await;
                            return Disconnect::MalformedFrame;
                        }
                    },
                    Message::Binary(_) => {
                        debug!(connection_id = %id, "Binary frame");
                        close(&mut socket, close_code::UNSUPPORTED, "text frames only").await;
                        return Disconnect::MalformedFrame;
                    }
                    Message::Close(_) => return Disconnect::ClientClosed,
                    // pongs are answered by the socket itself
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }

            event = events.recv() => {
                match event {
                    Some(GroupEvent::TaskUpdate) => {
                        if push_snapshot(&mut socket, gateway, scope, id).await.is_err() {
                            return Disconnect::Transport;
                        }
                    }
                    None => {
                        close(&mut socket, close_code::ERROR, "").await;
                        return Disconnect::ChannelClosed;
                    }
                }
            }

            _ = gateway.shutdown.cancelled() => {
                close(&mut socket, close_code::AWAY, "server shutting down").await;
                return Disconnect::Shutdown;
            }
        }
    }
}

/// Reads a snapshot and sends it
///
/// Only a failed socket write is an error; a failed read is logged.
async fn push_snapshot(
    socket: &mut WebSocket,
    gateway: &GatewayState,
    scope: SnapshotScope,
    id: ConnectionId,
) -> Result<(), axum::Error> {
    let tasks = match gateway.snapshots.snapshot(scope).await {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(connection_id = %id, error = %e, "Snapshot read failed, skipping push");
            return Ok(());
        }
    };

    debug!(connection_id = %id, tasks = tasks.len(), "Pushing task snapshot");
    send_json(socket, &ServerPush::TaskUpdate { tasks: &tasks }).await
}

async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode outgoing frame");
            return Ok(());
        }
    };

    socket.send(Message::Text(text)).await
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    };
    // the peer may already be gone
    let _ = socket.send(Message::Close(Some(frame))).await;
}
