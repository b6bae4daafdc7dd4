//! Deterministic addressing for the backend service sockets.

use std::path::{Path, PathBuf};

pub const SERVICE_EMBEDDINGS: &str = "embeddings";
pub const SERVICE_GENERATION: &str = "generation";
pub const SERVICE_SYNTHESIZE: &str = "synthesize";
pub const SERVICE_TRANSCRIBE: &str = "transcribe";

/// Every backend service the gateway knows how to reach.
pub const SERVICE_NAMES: [&str; 4] = [
    SERVICE_EMBEDDINGS,
    SERVICE_GENERATION,
    SERVICE_SYNTHESIZE,
    SERVICE_TRANSCRIBE,
];

/// Unix socket path for a named service: `<dir>/service-<name>.socket`.
pub fn service_socket_path(socket_dir: &Path, name: &str) -> PathBuf {
    socket_dir.join(format!("service-{name}.socket"))
}
