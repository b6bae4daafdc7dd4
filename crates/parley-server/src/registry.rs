//! The set of live client sessions, used to fan events out to all of
//! them.
//!
//! Sessions register their outbound frame queue on connect and remove
//! themselves as the first step of teardown, so a closing session stops
//! being a broadcast target before its socket goes away. Membership is
//! unordered and delivery is fire-and-forget per recipient.

use parley_types::Frame;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, mpsc::Sender<Vec<u8>>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session's outbound frame queue.
    pub async fn add(&self, session_id: Uuid, sender: mpsc::Sender<Vec<u8>>) {
        self.sessions.write().await.insert(session_id, sender);
    }

    /// Removes a session. Idempotent.
    pub async fn remove(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Encodes the frame once and delivers it to every live session.
    ///
    /// A recipient whose queue is full or closed is logged and skipped;
    /// one faulted session never aborts delivery to the others.
    pub async fn broadcast(&self, frame: &Frame) {
        let encoded = frame.encode();
        let sessions = self.sessions.read().await;
        for (session_id, sender) in sessions.iter() {
            if let Err(e) = sender.try_send(encoded.clone()) {
                warn!(
                    session_id = %session_id,
                    "dropping broadcast frame for unreachable session: {e}"
                );
            }
        }
    }
}
