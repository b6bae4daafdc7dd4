//! JSON wire contracts for one-shot backend service calls.

use crate::Turn;
use serde::{Deserialize, Serialize};

/// Request body for the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The pending user utterance to answer.
    pub input_text: String,
    /// Preceding answered turns, oldest first.
    pub history: Vec<Turn>,
    /// Output-length hint for the model.
    pub max_new_tokens: u32,
}

/// Response body from the generation service.
///
/// The service returns the full updated transcript alongside the reply,
/// and the gateway adopts it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub output_text: String,
    pub history: Vec<Turn>,
}

/// Request body for the embeddings service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeRequest {
    pub text: String,
}

/// Response body from the embeddings service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeResponse {
    pub vector: Vec<f32>,
}
