/*
 * Responsibility
 * - GET /ws: push gateway events (alert_created, firewall_rule_added,
 *   monitoring_changed) as JSON text frames
 * - The stream closes when the server starts draining or the client goes away
 */
use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::v1::extractors::{Authenticated, Ctx};
use crate::lifecycle::Phase;
use crate::state::AppState;

pub async fn upgrade(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Authenticated(principal): Authenticated,
    ws: WebSocketUpgrade,
) -> Response {
    let request_id = ctx.request_id;
    ws.on_upgrade(move |socket| stream_events(socket, state, principal.subject_id, request_id))
}

async fn stream_events(mut socket: WebSocket, state: AppState, subject: Uuid, request_id: String) {
    let mut events = state.events.subscribe();
    let mut phase = state.lifecycle.subscribe();

    state.metrics.ws_opened();
    info!(%request_id, %subject, "websocket opened");

    loop {
        tokio::select! {
            draining = async { phase.wait_for(|p| *p >= Phase::Draining).await.is_ok() } => {
                if draining {
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: Utf8Bytes::from_static("server shutting down"),
                        })))
                        .await;
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(%request_id, error = %e, kind = event.kind(), "failed to encode event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        debug!(%request_id, "websocket send failed; client gone");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%request_id, skipped, "websocket client lagging; events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // Pings are answered by the protocol layer; clients have nothing to say.
                Some(Ok(_)) => {}
            },
        }
    }

    state.metrics.ws_closed();
    info!(%request_id, %subject, "websocket closed");
}
