//! Shared helpers for gateway integration tests: in-process fake
//! backend services bound to real unix sockets, and a gateway served
//! on an ephemeral TCP port.
#![allow(dead_code)]

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{any, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parley_history::HistoryLog;
use parley_server::registry::SessionRegistry;
use parley_server::{app, AppState};
use parley_services::service_socket_path;
use parley_types::{Frame, GenerateRequest, GenerateResponse, Turn};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UnixListener};
use tokio_tungstenite::tungstenite::Message as ClientMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Short timings so link healing and reply polling happen within test
/// budgets.
pub const FAST: Duration = Duration::from_millis(50);

/// Generous upper bound for anything asynchronous to happen.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn test_state(dir: &Path) -> Arc<AppState> {
    let history = Arc::new(HistoryLog::open(dir.join("history.json")).unwrap());
    Arc::new(AppState {
        registry: SessionRegistry::new(),
        history,
        socket_dir: dir.to_path_buf(),
        reconnect_delay: FAST,
        reply_interval: FAST,
        max_new_tokens: 16,
    })
}

fn serve_unix(socket_path: &Path, app: Router) {
    let listener = UnixListener::bind(socket_path).expect("bind fake service socket");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake service");
    });
}

/// Fake recognition service: answers each binary audio frame with the
/// text `heard:<len>`.
pub fn spawn_fake_transcribe(dir: &Path) {
    async fn ws(upgrade: WebSocketUpgrade) -> impl IntoResponse {
        upgrade.on_upgrade(|mut socket: WebSocket| async move {
            while let Some(Ok(message)) = socket.recv().await {
                if let WsMessage::Binary(audio) = message {
                    let text = format!("heard:{}", audio.len());
                    if socket.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
        })
    }

    serve_unix(
        &service_socket_path(dir, "transcribe"),
        Router::new().route("/transcribe/ws", any(ws)),
    );
}

/// Fake synthesis service: answers each text frame with the bytes
/// `pcm:<text>`.
pub fn spawn_fake_synthesize(dir: &Path) {
    async fn ws(upgrade: WebSocketUpgrade) -> impl IntoResponse {
        upgrade.on_upgrade(|mut socket: WebSocket| async move {
            while let Some(Ok(message)) = socket.recv().await {
                if let WsMessage::Text(text) = message {
                    let audio = format!("pcm:{}", text.as_str()).into_bytes();
                    if socket.send(WsMessage::Binary(audio.into())).await.is_err() {
                        break;
                    }
                }
            }
        })
    }

    serve_unix(
        &service_socket_path(dir, "synthesize"),
        Router::new().route("/synthesize/ws", any(ws)),
    );
}

/// Fake generation service: always replies `ok` and returns the
/// transcript with the pending turn answered. Returns the call counter.
pub fn spawn_fake_generation(dir: &Path) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let app = Router::new().route(
        "/generation/generate",
        post(move |Json(request): Json<GenerateRequest>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut history = request.history;
                history.push(Turn::new(request.input_text, "ok"));
                Json(GenerateResponse {
                    output_text: "ok".to_string(),
                    history,
                })
            }
        }),
    );

    serve_unix(&service_socket_path(dir, "generation"), app);
    calls
}

/// Serves the gateway on an ephemeral port and returns its address.
pub async fn spawn_gateway(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect_client(addr: SocketAddr) -> ClientSocket {
    let (socket, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("connect to gateway");
    socket
}

/// Gives fresh sessions a beat to finish opening their service links.
/// Voice sent before the recognition link is open is dropped by design,
/// so tests wait this out instead of racing it.
pub async fn settle() {
    tokio::time::sleep(FAST * 4).await;
}

pub async fn send_frame(client: &mut ClientSocket, frame: &Frame) {
    client
        .send(ClientMessage::Binary(frame.encode().into()))
        .await
        .expect("send client frame");
}

/// Reads frames until one decodes, panicking on timeout.
pub async fn next_frame(client: &mut ClientSocket) -> Frame {
    tokio::time::timeout(WAIT, async {
        loop {
            let message = client
                .next()
                .await
                .expect("client socket closed")
                .expect("client socket error");
            if let ClientMessage::Binary(bytes) = message {
                if let Some(frame) = Frame::decode(&bytes) {
                    return frame;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for a gateway frame")
}
