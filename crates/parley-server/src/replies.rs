//! The autonomous reply loop.
//!
//! One loop runs per session for its lifetime, polling the shared
//! transcript on a fixed interval. A pending last turn is handed to the
//! generation service together with the answered turns as context; the
//! returned reply is spoken (sent to the synthesis link), adopted as
//! the new transcript, and broadcast as text. This is what turns
//! pending user speech into a spoken answer without any further client
//! action.
//!
//! Failures are deliberately boring: log, change nothing, try again on
//! the next tick.

use crate::AppState;
use parley_services::{ServicePayload, ServiceSender};
use parley_types::{Frame, GenerateRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub async fn run(state: Arc<AppState>, synthesize: ServiceSender, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(state.reply_interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tick(&state, &synthesize).await;
    }
    debug!("reply loop stopped");
}

async fn tick(state: &AppState, synthesize: &ServiceSender) {
    let turns = state.history.get();
    let Some(last) = turns.last() else {
        return;
    };
    if !last.is_pending() {
        return;
    }

    let request = GenerateRequest {
        input_text: last.user.clone(),
        history: turns[..turns.len() - 1].to_vec(),
        max_new_tokens: state.max_new_tokens,
    };

    match parley_services::generate(&state.socket_dir, &request).await {
        Ok(response) => {
            info!(reply = %response.output_text, "generated reply");
            if !synthesize.send(ServicePayload::Text(response.output_text.clone())) {
                debug!("synthesis request dropped, link is down");
            }
            if let Err(e) = state.history.set(response.history) {
                error!("failed to persist generated transcript: {e}");
            }
            state
                .registry
                .broadcast(&Frame::GenerationResult(response.output_text))
                .await;
        }
        Err(e) => {
            // Transcript untouched; the turn is still pending and the
            // next tick retries.
            warn!("generation call failed, retrying next tick: {e}");
        }
    }
}
