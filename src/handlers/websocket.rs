//! Per-connection WebSocket handling
//!
//! One task per connection: the socket is split, outbound frames flow through
//! an unbounded channel drained by a forwarding task, and this task consumes
//! inbound frames strictly in arrival order, driving the connection's state
//! machine through the router.

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::WebSocket;

use crate::core::connection::{ConnectionHandle, ConnectionState};
use crate::core::gateway::SharedGateway;
use crate::core::router::MessageRouter;

/// Handle one WebSocket connection from upgrade to close
pub async fn handle_ws_client(
    ws: WebSocket,
    gateway: SharedGateway,
    router: Arc<MessageRouter>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<warp::ws::Message>();

    // Forward queued outbound frames to the socket
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = message.is_close();
            if let Err(e) = ws_tx.send(message).await {
                debug!("Outbound socket closed: {}", e);
                break;
            }
            if closing {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    gateway
        .register_connection(ConnectionHandle::new(connection_id, tx))
        .await;
    info!(
        "Connection {} accepted ({} total)",
        connection_id,
        gateway.connection_count().await
    );

    let mut state = ConnectionState::Connected;

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                // Any inbound frame proves liveness, pongs included
                gateway.touch(connection_id).await;

                if let Ok(text) = msg.to_str() {
                    router.dispatch(connection_id, &mut state, text).await;
                }
            }
            Err(e) => {
                error!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Transport gone: run the shared cleanup path. If the liveness sweep got
    // here first this is a no-op.
    gateway.disconnect(connection_id).await;
}
