#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cpbot::config::GatewayConfig;
use cpbot::error::HandlerError;
use cpbot::gateway::GatewayConnection;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const TOKEN: &str = "test-token";

/// What the fake gateway should do next on the socket.
pub enum ServerCommand {
    Frame(Value),
    Raw(String),
    Close(u16),
    Drop,
}

/// One REST call as the fake service saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub body: Option<Value>,
}

struct SocketChannels {
    commands: mpsc::UnboundedReceiver<ServerCommand>,
    frames: mpsc::UnboundedSender<Value>,
}

#[derive(Clone)]
struct ServiceState {
    ws_url: Arc<Mutex<String>>,
    socket: Arc<Mutex<Option<SocketChannels>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    ws_query: Arc<Mutex<Option<String>>>,
}

/// A single-connection gateway plus REST API bound to 127.0.0.1:0.
pub struct FakeService {
    pub api_url: String,
    state: ServiceState,
    commands: mpsc::UnboundedSender<ServerCommand>,
    frames: mpsc::UnboundedReceiver<Value>,
}

impl FakeService {
    pub async fn spawn() -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        let state = ServiceState {
            ws_url: Arc::new(Mutex::new(String::new())),
            socket: Arc::new(Mutex::new(Some(SocketChannels {
                commands: commands_rx,
                frames: frames_tx,
            }))),
            requests: Arc::new(Mutex::new(Vec::new())),
            ws_query: Arc::new(Mutex::new(None)),
        };

        let app = Router::new()
            .route("/ws", get(ws_upgrade))
            .route("/api/gateway", get(gateway))
            .route("/api/channels/{id}", get(get_channel))
            .route("/api/channels/{id}/messages", post(create_message))
            .route("/api/channels/{id}/typing", post(typing))
            .route("/api/users/@me/channels", post(create_dm))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        *state.ws_url.lock().unwrap() = format!("ws://127.0.0.1:{}/ws", addr.port());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://127.0.0.1:{}/api", addr.port()),
            state,
            commands: commands_tx,
            frames: frames_rx,
        }
    }

    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::new(TOKEN).with_api_url(&self.api_url)
    }

    pub fn send(&self, frame: Value) {
        let _ = self.commands.send(ServerCommand::Frame(frame));
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.commands.send(ServerCommand::Raw(text.to_string()));
    }

    pub fn hello(&self, heartbeat_interval: u64) {
        self.send(json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_interval } }));
    }

    pub fn dispatch(&self, seq: u64, event_type: &str, data: Value) {
        self.send(json!({ "op": 0, "s": seq, "t": event_type, "d": data }));
    }

    pub fn close(&self, code: u16) {
        let _ = self.commands.send(ServerCommand::Close(code));
    }

    pub fn drop_socket(&self) {
        let _ = self.commands.send(ServerCommand::Drop);
    }

    /// Next frame the client wrote. Panics after five seconds.
    pub async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("socket closed")
    }

    /// Next frame with the given opcode, skipping others.
    pub async fn next_frame_with_op(&mut self, op: u64) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame["op"] == op {
                return frame;
            }
        }
    }

    /// Frames already received, without waiting.
    pub fn drain_frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn ws_query(&self) -> Option<String> {
        self.state.ws_query.lock().unwrap().clone()
    }
}

pub fn user_payload(id: &str, username: &str) -> Value {
    json!({ "id": id, "username": username, "discriminator": "0001", "avatar": null })
}

pub fn message_payload(id: &str, channel_id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "channel_id": channel_id,
        "guild_id": "g1",
        "author": user_payload("500", "alice"),
        "content": content,
        "timestamp": "2019-01-01T00:00:00+00:00",
        "tts": false,
        "mention_everyone": false,
        "mentions": [],
        "attachments": [],
        "embeds": [],
        "pinned": false,
        "type": 0
    })
}

/// A handler that forwards every message to the returned receiver.
pub fn recording_handler() -> (
    impl Fn(GatewayConnection, cpbot::models::Message) -> std::future::Ready<Result<(), HandlerError>>
        + Send
        + Sync
        + 'static,
    mpsc::UnboundedReceiver<cpbot::models::Message>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |_conn: GatewayConnection, msg: cpbot::models::Message| {
        let _ = tx.send(msg);
        std::future::ready(Ok(()))
    };
    (handler, rx)
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn record(state: &ServiceState, method: Method, path: String, headers: &HeaderMap, body: &Bytes) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path,
        authorization: header("authorization"),
        user_agent: header("user-agent"),
        body: if body.is_empty() {
            None
        } else {
            serde_json::from_slice(body).ok()
        },
    });
}

async fn gateway(State(state): State<ServiceState>, headers: HeaderMap) -> Json<Value> {
    record(&state, Method::GET, "/gateway".to_string(), &headers, &Bytes::new());
    let url = state.ws_url.lock().unwrap().clone();
    Json(json!({ "url": url }))
}

async fn get_channel(
    State(state): State<ServiceState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(
        &state,
        Method::GET,
        format!("/channels/{channel_id}"),
        &headers,
        &Bytes::new(),
    );
    if channel_id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Unknown Channel", "code": 10003 })),
        )
            .into_response();
    }
    Json(json!({ "id": channel_id, "type": 0, "guild_id": "g1", "name": "general" }))
        .into_response()
}

async fn create_message(
    State(state): State<ServiceState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(
        &state,
        Method::POST,
        format!("/channels/{channel_id}/messages"),
        &headers,
        &body,
    );
    if channel_id == "limited" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": "You are being rate limited.", "retry_after": 1000 })),
        )
            .into_response();
    }

    let sent: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let mut echoed = message_payload("900", &channel_id, sent["content"].as_str().unwrap_or(""));
    echoed["author"] = user_payload("42", "CPBot");
    if !sent["embed"].is_null() {
        echoed["embeds"] = json!([sent["embed"].clone()]);
    }
    Json(echoed).into_response()
}

async fn typing(
    State(state): State<ServiceState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    record(
        &state,
        Method::POST,
        format!("/channels/{channel_id}/typing"),
        &headers,
        &body,
    );
    StatusCode::NO_CONTENT
}

async fn create_dm(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    record(
        &state,
        Method::POST,
        "/users/@me/channels".to_string(),
        &headers,
        &body,
    );
    let sent: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let recipient = sent["recipient_id"].as_str().unwrap_or("").to_string();
    Json(json!({
        "id": format!("dm-{recipient}"),
        "type": 1,
        "recipients": [user_payload(&recipient, "friend")]
    }))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<ServiceState>,
    RawQuery(query): RawQuery,
) -> Response {
    *state.ws_query.lock().unwrap() = query;
    let channels = state.socket.lock().unwrap().take();
    match channels {
        Some(channels) => ws.on_upgrade(move |socket| handle_socket(socket, channels)),
        None => StatusCode::CONFLICT.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, channels: SocketChannels) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let SocketChannels {
        mut commands,
        frames,
    } = channels;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(ServerCommand::Frame(frame)) => {
                        if ws_sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(ServerCommand::Raw(text)) => {
                        if ws_sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(ServerCommand::Close(code)) => {
                        let frame = CloseFrame {
                            code,
                            reason: "closing".into(),
                        };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    Some(ServerCommand::Drop) | None => break,
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) {
                            let _ = frames.send(frame);
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}
