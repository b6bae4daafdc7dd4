//! Shared types for the Parley voice gateway.
//!
//! This crate provides the foundational types used across the workspace:
//! the tagged binary frame protocol spoken on the client WebSocket, the
//! conversation turn that makes up the transcript, and the JSON wire
//! contracts for one-shot backend service calls.
//!
//! No crate in the workspace depends on anything *except* `parley-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

mod frame;
mod rpc;
mod turn;

pub use frame::Frame;
pub use rpc::{EncodeRequest, EncodeResponse, GenerateRequest, GenerateResponse};
pub use turn::Turn;
