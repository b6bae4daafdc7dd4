//! The auto-reconnecting streaming link to one backend service.
//!
//! Each client session owns one [`ServiceConnection`] per streaming
//! service (recognition and synthesis). The connection runs a driver
//! task that cycles `Connecting → Open → Closed`, re-establishing the
//! link after a fixed delay whenever it drops, until the connection is
//! closed or the session's event receiver goes away. Inbound messages
//! are forwarded to the session's event channel in arrival order.
//!
//! Sends are fire-and-forget: a payload enqueued while the link is down
//! is dropped, and [`ServiceSender::send`] reports the drop as `false`.
//! There is no queuing across reconnects and no delivery guarantee.

use crate::error::ServiceError;
use crate::socket::service_socket_path;
use futures_util::{SinkExt, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Delay before re-establishing a dropped service link. Backend
/// restarts are expected to be fast, so a short fixed delay is used
/// rather than exponential backoff.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Payloads dropped beyond this many queued outbound messages.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// State of the underlying link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

/// One message on a streaming service link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServicePayload {
    Text(String),
    Binary(Vec<u8>),
}

impl From<ServicePayload> for Message {
    fn from(payload: ServicePayload) -> Self {
        match payload {
            ServicePayload::Text(text) => Message::Text(text.into()),
            ServicePayload::Binary(bytes) => Message::Binary(bytes.into()),
        }
    }
}

/// An inbound message from a service, tagged with its origin.
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    pub service: String,
    pub path: String,
    pub payload: ServicePayload,
}

/// Clonable fire-and-forget send handle for a [`ServiceConnection`].
#[derive(Clone)]
pub struct ServiceSender {
    outbound: mpsc::Sender<ServicePayload>,
    state: watch::Receiver<LinkState>,
}

impl ServiceSender {
    /// Enqueues a payload for the service.
    ///
    /// Returns `false` when the payload was dropped: the link is not
    /// open, or the outbound queue is full. Dropped payloads are gone;
    /// callers that care must observe the return value.
    pub fn send(&self, payload: ServicePayload) -> bool {
        if *self.state.borrow() != LinkState::Open {
            return false;
        }
        self.outbound.try_send(payload).is_ok()
    }

    /// Current state of the underlying link.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }
}

/// A managed streaming link to one named backend service.
pub struct ServiceConnection {
    service: String,
    sender: ServiceSender,
    cancel: CancellationToken,
    driver: JoinHandle<()>,
}

impl ServiceConnection {
    /// Spawns the driver task and returns immediately. Connect failures
    /// are not surfaced here; they show up as a link that stays down
    /// (and keeps retrying) and as dropped sends.
    pub fn open(
        socket_dir: impl AsRef<Path>,
        service: impl Into<String>,
        url_path: impl Into<String>,
        events: mpsc::Sender<ServiceEvent>,
        reconnect_delay: Duration,
    ) -> Self {
        let service = service.into();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);
        let cancel = CancellationToken::new();

        let driver = tokio::spawn(drive(Driver {
            service: service.clone(),
            url_path: url_path.into(),
            socket_path: service_socket_path(socket_dir.as_ref(), &service),
            reconnect_delay,
            outbound: outbound_rx,
            events,
            state: state_tx,
            cancel: cancel.clone(),
        }));

        Self {
            service,
            sender: ServiceSender {
                outbound: outbound_tx,
                state: state_rx,
            },
            cancel,
            driver,
        }
    }

    /// Name of the service this connection targets.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns a clonable send handle.
    pub fn sender(&self) -> ServiceSender {
        self.sender.clone()
    }

    /// Current state of the underlying link.
    pub fn state(&self) -> LinkState {
        self.sender.state()
    }

    /// Watch channel over link state transitions.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.sender.state.clone()
    }

    /// Stops the driver, closing the link if open, and waits for it to
    /// fully exit. No event is delivered after `close` returns.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.driver.await {
            warn!(service = %self.service, "service driver task failed: {e}");
        }
    }
}

struct Driver {
    service: String,
    url_path: String,
    socket_path: PathBuf,
    reconnect_delay: Duration,
    outbound: mpsc::Receiver<ServicePayload>,
    events: mpsc::Sender<ServiceEvent>,
    state: watch::Sender<LinkState>,
    cancel: CancellationToken,
}

/// Why a connected link stopped pumping.
enum Stop {
    /// Read or write failure; reconnect.
    LinkDown,
    /// Cancelled or the event receiver is gone; do not reconnect.
    Finished,
}

async fn drive(mut driver: Driver) {
    loop {
        if driver.cancel.is_cancelled() {
            return;
        }
        let _ = driver.state.send(LinkState::Connecting);

        let connected = tokio::select! {
            _ = driver.cancel.cancelled() => return,
            result = connect(&driver.socket_path, &driver.url_path) => result,
        };

        match connected {
            Ok(ws) => {
                debug!(service = %driver.service, "service link open");
                let _ = driver.state.send(LinkState::Open);
                let stop = pump(&mut driver, ws).await;
                let _ = driver.state.send(LinkState::Closed);
                if let Stop::Finished = stop {
                    return;
                }
            }
            Err(e) => {
                warn!(service = %driver.service, "service connect failed: {e}");
                let _ = driver.state.send(LinkState::Closed);
            }
        }

        if driver.cancel.is_cancelled() {
            return;
        }
        warn!(service = %driver.service, "service link closed, reconnecting");
        tokio::select! {
            _ = driver.cancel.cancelled() => return,
            _ = tokio::time::sleep(driver.reconnect_delay) => {}
        }
    }
}

async fn connect(
    socket_path: &Path,
    url_path: &str,
) -> Result<WebSocketStream<UnixStream>, ServiceError> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(ServiceError::Connect)?;
    // The socket, not the authority, selects the peer; any host works.
    let (ws, _response) = client_async(format!("ws://localhost{url_path}"), stream).await?;
    Ok(ws)
}

/// One resolved wait on the link: cancellation, an outbound payload to
/// write, or an inbound message to forward.
enum Step {
    Cancelled,
    Outbound(Option<ServicePayload>),
    Inbound(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

async fn pump(driver: &mut Driver, ws: WebSocketStream<UnixStream>) -> Stop {
    let (mut sink, mut stream) = ws.split();
    loop {
        let step = tokio::select! {
            _ = driver.cancel.cancelled() => Step::Cancelled,
            outbound = driver.outbound.recv() => Step::Outbound(outbound),
            inbound = stream.next() => Step::Inbound(inbound),
        };

        match step {
            Step::Cancelled => {
                let _ = sink.close().await;
                return Stop::Finished;
            }
            Step::Outbound(payload) => {
                // The connection handle owns a sender, so `None` only
                // happens once every handle is gone.
                let Some(payload) = payload else {
                    let _ = sink.close().await;
                    return Stop::Finished;
                };
                if let Err(e) = sink.send(payload.into()).await {
                    warn!(service = %driver.service, "service send failed: {e}");
                    return Stop::LinkDown;
                }
            }
            Step::Inbound(Some(Ok(message))) => {
                let payload = match message {
                    Message::Text(text) => ServicePayload::Text(text.as_str().to_owned()),
                    Message::Binary(bytes) => ServicePayload::Binary(bytes.to_vec()),
                    Message::Close(_) => {
                        debug!(service = %driver.service, "service closed the link");
                        return Stop::LinkDown;
                    }
                    // Ping/pong are handled by the protocol layer.
                    _ => continue,
                };
                let event = ServiceEvent {
                    service: driver.service.clone(),
                    path: driver.url_path.clone(),
                    payload,
                };
                // Forwarding can block when the observer's queue is
                // full; stay cancellable so teardown never hangs on a
                // stalled observer.
                let delivered = tokio::select! {
                    _ = driver.cancel.cancelled() => Err(()),
                    sent = driver.events.send(event) => sent.map_err(|_| ()),
                };
                if delivered.is_err() {
                    // Cancelled, or nobody is observing anymore.
                    let _ = sink.close().await;
                    return Stop::Finished;
                }
            }
            Step::Inbound(Some(Err(e))) => {
                warn!(service = %driver.service, "service receive failed: {e}");
                return Stop::LinkDown;
            }
            Step::Inbound(None) => {
                debug!(service = %driver.service, "service stream ended");
                return Stop::LinkDown;
            }
        }
    }
}
