use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::state::AppState;
use crate::ws::gateway::Gateway;
use crate::ws::protocol::ClientEvent;
use crate::ws::session::Session;

const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Deregisters the session when the connection task ends, including when it
/// unwinds from a panic, so no presence entry outlives its connection.
struct SessionGuard {
    gateway: Arc<Gateway>,
    session: Session,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.gateway.on_disconnect(&mut self.session);
    }
}

/// Run the actor-per-connection pattern for one WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Ping task: sends periodic pings and gives up when a pong is overdue
/// - Reader loop: decodes client events and hands them to the gateway, one
///   at a time, so a connection's own events are never reordered
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let gateway = state.gateway.clone();
    let mut guard = SessionGuard {
        session: gateway.on_connect(tx.clone()),
        gateway,
    };
    let connection_id = guard.session.id();

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let mut ping_handle = tokio::spawn(ping_task(
        tx.clone(),
        pong_rx,
        state.realtime.ping_interval(),
        state.realtime.pong_timeout(),
    ));

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&mut guard, text.as_str()).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(
                        connection_id,
                        bytes = data.len(),
                        "Ignoring binary frame (protocol is JSON text)"
                    );
                }
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(());
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(connection_id, reason = ?frame, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(connection_id, error = %e, "WebSocket receive error");
                    break;
                }
                None => {
                    tracing::debug!(connection_id, "WebSocket stream ended");
                    break;
                }
            },
            _ = &mut ping_handle => {
                tracing::warn!(connection_id, "Keepalive expired, dropping connection");
                break;
            }
        }
    }

    ping_handle.abort();

    // Dropping the guard deregisters the session and broadcasts presence
    drop(guard);

    // The writer exits once every sender is gone, after flushing queued frames
    // such as the keepalive close. A stalled socket is abandoned.
    drop(tx);
    if timeout(WRITER_DRAIN, &mut writer_handle).await.is_err() {
        tracing::debug!(connection_id, "Writer did not drain in time");
        writer_handle.abort();
    }
}

/// Decode one text frame and dispatch it. Malformed frames are logged and
/// dropped; the connection stays open.
async fn handle_text(guard: &mut SessionGuard, text: &str) {
    let connection_id = guard.session.id();

    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                connection_id,
                error = %e,
                frame = %text.chars().take(100).collect::<String>(),
                "Dropping malformed event"
            );
            return;
        }
    };

    tracing::trace!(connection_id, event = event.name(), "Client event");

    match event {
        ClientEvent::Handshake(handshake) => {
            guard.gateway.on_handshake(&mut guard.session, handshake);
        }
        ClientEvent::SendMessage(message) => {
            guard.gateway.on_send_message(&guard.session, message).await;
        }
    }
}

/// Sends a ping every `every`; finishes if a pong does not arrive within
/// `pong_timeout` or the writer is gone.
async fn ping_task(
    tx: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    every: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(every);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            // Writer task has died, connection is gone
            break;
        }

        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                let _ = tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong timeout".into(),
                })));
                break;
            }
        }
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed, connection is broken
            break;
        }
    }
}
