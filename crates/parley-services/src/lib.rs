//! Managed links from the gateway to its backend inference services.
//!
//! The four backend services (`embeddings`, `generation`, `synthesize`,
//! `transcribe`) run as independent processes, each listening on a unix
//! domain socket at a path derived from its name. They may restart or
//! hang at any time, so nothing here assumes connection permanence.
//!
//! Two calling conventions:
//!
//! - [`ServiceConnection`]: a streaming duplex link (WebSocket over the
//!   unix socket) that reconnects itself with a fixed delay whenever the
//!   link drops, for the recognition and synthesis streams.
//! - [`invoke`]: a one-shot JSON request/response call (HTTP/1 over the
//!   unix socket), with typed wrappers [`generate`] and [`encode`].

mod connection;
mod error;
mod invoke;
mod socket;

pub use connection::{
    LinkState, ServiceConnection, ServiceEvent, ServicePayload, ServiceSender,
    DEFAULT_RECONNECT_DELAY,
};
pub use error::ServiceError;
pub use invoke::{encode, generate, invoke};
pub use socket::{
    service_socket_path, SERVICE_EMBEDDINGS, SERVICE_GENERATION, SERVICE_NAMES,
    SERVICE_SYNTHESIZE, SERVICE_TRANSCRIBE,
};
