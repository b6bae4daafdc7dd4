//! Per-client WebSocket session handling.
//!
//! Each accepted client socket becomes one session task that owns a
//! recognition link and a synthesis link to the backend services plus
//! its own reply loop. The session is `Active` from connect until its
//! socket closes, then runs a teardown barrier: leave the broadcast
//! registry, close both service links (each blocks until its driver
//! exits), and await the reply loop, in that order, so nothing can
//! target or touch the session once it is gone.

use crate::replies;
use crate::AppState;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Extension, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use parley_services::{
    ServiceConnection, ServiceEvent, ServicePayload, SERVICE_SYNTHESIZE, SERVICE_TRANSCRIBE,
};
use parley_types::Frame;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outbound frames queued per session before broadcasts get dropped.
const CLIENT_QUEUE_CAPACITY: usize = 256;

/// Inbound service events queued per session.
const SERVICE_EVENT_CAPACITY: usize = 256;

/// `GET /ws` — upgrades the client connection into a session.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    let (mut socket_tx, mut socket_rx) = socket.split();

    // Register for broadcasts before anything can be said, and forward
    // the queue to the client socket from its own task.
    let (frames_tx, mut frames_rx) = mpsc::channel::<Vec<u8>>(CLIENT_QUEUE_CAPACITY);
    state.registry.add(session_id, frames_tx).await;
    info!(%session_id, "client session connected");

    let forward_task = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            if socket_tx.send(WsMessage::Binary(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Both streaming service links feed one event queue, consumed below.
    let (event_tx, mut events) = mpsc::channel::<ServiceEvent>(SERVICE_EVENT_CAPACITY);
    let transcribe = ServiceConnection::open(
        &state.socket_dir,
        SERVICE_TRANSCRIBE,
        "/transcribe/ws",
        event_tx.clone(),
        state.reconnect_delay,
    );
    let synthesize = ServiceConnection::open(
        &state.socket_dir,
        SERVICE_SYNTHESIZE,
        "/synthesize/ws",
        event_tx,
        state.reconnect_delay,
    );

    let reply_cancel = CancellationToken::new();
    let reply_task = tokio::spawn(replies::run(
        state.clone(),
        synthesize.sender(),
        reply_cancel.clone(),
    ));

    loop {
        tokio::select! {
            inbound = socket_rx.next() => {
                match inbound {
                    Some(Ok(WsMessage::Binary(data))) => {
                        handle_client_frame(&transcribe, &data);
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    // Text/ping/pong carry nothing on this protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(%session_id, "client socket error: {e}");
                        break;
                    }
                }
            }
            event = events.recv() => {
                // Both connections hold a sender until closed, which
                // only happens during teardown below.
                let Some(event) = event else { break };
                handle_service_event(&state, event).await;
            }
        }
    }

    // Teardown barrier. Leaving the registry first stops broadcasts
    // from targeting this session's queue; each close() waits for its
    // driver so no event callback outlives the session.
    state.registry.remove(session_id).await;
    transcribe.close().await;
    synthesize.close().await;
    reply_cancel.cancel();
    if let Err(e) = reply_task.await {
        warn!(%session_id, "reply loop task failed: {e}");
    }
    forward_task.abort();
    info!(%session_id, "client session closed");
}

/// A client frame either carries voice for recognition or is noise.
fn handle_client_frame(transcribe: &ServiceConnection, data: &[u8]) {
    match Frame::decode(data) {
        Some(Frame::VoiceInput(audio)) => {
            if !transcribe.sender().send(ServicePayload::Binary(audio)) {
                debug!("voice input dropped, recognition link is down");
            }
        }
        // Gateway-bound kinds from a client are protocol violations;
        // they and undecodable frames are dropped without effect.
        Some(_) | None => {}
    }
}

async fn handle_service_event(state: &Arc<AppState>, event: ServiceEvent) {
    match (event.service.as_str(), event.payload) {
        (SERVICE_TRANSCRIBE, ServicePayload::Text(text)) => {
            debug!(service = %event.service, %text, "recognized speech");
            if let Err(e) = state.history.append_user(&text) {
                error!("failed to persist recognized speech: {e}");
            }
            // The transcript is shared conversation state: everyone
            // connected sees it, not just the speaker.
            state
                .registry
                .broadcast(&Frame::TranscriptionResult(text))
                .await;
        }
        (SERVICE_SYNTHESIZE, ServicePayload::Binary(audio)) => {
            state
                .registry
                .broadcast(&Frame::SynthesisResult(audio))
                .await;
        }
        (service, _) => {
            debug!(service, "ignoring service payload of unexpected shape");
        }
    }
}
