//! One-shot JSON request/response calls to backend services.
//!
//! Each call opens a fresh connection to the service socket, speaks
//! HTTP/1 over it, and tears it down when the response is in. The
//! services are local processes, so connection setup is cheap and no
//! pooling is done.

use crate::error::ServiceError;
use crate::socket::{service_socket_path, SERVICE_EMBEDDINGS, SERVICE_GENERATION};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::Request;
use hyper_util::rt::TokioIo;
use parley_types::{EncodeRequest, EncodeResponse, GenerateRequest, GenerateResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// POSTs `request` as JSON to `url_path` on the named service and
/// deserializes the JSON response.
pub async fn invoke<Req, Resp>(
    socket_dir: &Path,
    service: &str,
    url_path: &str,
    request: &Req,
) -> Result<Resp, ServiceError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let socket_path = service_socket_path(socket_dir, service);
    let stream = tokio::net::UnixStream::connect(&socket_path)
        .await
        .map_err(ServiceError::Connect)?;

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    let service_name = service.to_owned();
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(service = %service_name, "service http connection ended: {e}");
        }
    });

    let body = serde_json::to_vec(request)?;
    let http_request = Request::post(url_path)
        .header(HOST, "localhost")
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))?;

    let response = sender.send_request(http_request).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status(status));
    }

    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

/// Asks the generation service to answer a pending user utterance,
/// given the answered turns so far as context.
pub async fn generate(
    socket_dir: &Path,
    request: &GenerateRequest,
) -> Result<GenerateResponse, ServiceError> {
    invoke(
        socket_dir,
        SERVICE_GENERATION,
        "/generation/generate",
        request,
    )
    .await
}

/// Asks the embeddings service for the vector of a text.
pub async fn encode(socket_dir: &Path, text: &str) -> Result<EncodeResponse, ServiceError> {
    invoke(
        socket_dir,
        SERVICE_EMBEDDINGS,
        "/embeddings/encode",
        &EncodeRequest {
            text: text.to_owned(),
        },
    )
    .await
}
