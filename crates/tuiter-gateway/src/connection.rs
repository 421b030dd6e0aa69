use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use tuiter_types::events::{GatewayCommand, GatewayEvent};

use crate::presence::{ConnectionHandle, PresenceMap};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// The user id a connection has bound itself to with `addUser`, shared
/// between its receive loop and the cleanup at disconnect.
type BoundUser = Arc<Mutex<Option<String>>>;

/// Drive one WebSocket connection until either side closes it.
///
/// The client binds itself to a user id with `addUser` and may send direct
/// messages with `sendMsg`; messages addressed to the bound user arrive as
/// `receiveMsg` events. On disconnect the binding is removed if this
/// connection still owns it.
pub async fn handle_connection(socket: WebSocket, presence: PresenceMap) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut outbound) = ConnectionHandle::channel();
    let conn_id = handle.conn_id;
    info!("Gateway connection {} opened", conn_id);

    let bound_user: BoundUser = Arc::new(Mutex::new(None));

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward targeted events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbound.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let presence_recv = presence.clone();
    let bound_recv = bound_user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&presence_recv, &handle, &bound_recv, cmd).await,
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("Connection {} bad command: {} -- raw: {}", conn_id, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let user_id = bound_user.lock().ok().and_then(|mut bound| bound.take());
    if let Some(user_id) = user_id {
        if presence.remove_user(&user_id, conn_id).await {
            info!("{} went offline (connection {})", user_id, conn_id);
        }
    }
    info!("Gateway connection {} closed", conn_id);
}

pub(crate) async fn handle_command(
    presence: &PresenceMap,
    handle: &ConnectionHandle,
    bound_user: &BoundUser,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::AddUser { user_id } => {
            let previous = bound_user
                .lock()
                .ok()
                .and_then(|mut bound| bound.replace(user_id.clone()));

            if let Some(previous) = previous.filter(|p| *p != user_id) {
                presence.remove_user(&previous, handle.conn_id).await;
            }

            presence.add_user(user_id.clone(), handle.clone()).await;
            info!(
                "{} is online on connection {} ({} online)",
                user_id,
                handle.conn_id,
                presence.online_count().await
            );
        }

        GatewayCommand::SendMsg { sent_to, message } => {
            let delivered = presence
                .send_to_user(&sent_to, GatewayEvent::ReceiveMsg { message })
                .await;
            debug!(
                "Connection {} -> {}: {}",
                handle.conn_id,
                sent_to,
                if delivered { "delivered" } else { "recipient offline" }
            );
        }
    }
}
