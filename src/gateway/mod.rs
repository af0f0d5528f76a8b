pub mod dispatcher;
pub mod events;
pub mod heartbeat;
pub mod router;
pub mod session;

use std::convert::Infallible;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::GatewayConfig;
use crate::error::{ConfigError, GatewayError, HandlerError};
use crate::models::{Message, Presence};
use crate::rest::RestClient;
use dispatcher::Dispatcher;
use events::{
    ConnectionProperties, GatewayMessage, IdentifyData, GATEWAY_ENCODING, GATEWAY_VERSION,
};
use heartbeat::Heartbeat;
use router::Action;
use session::SessionState;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// Client side of one gateway connection plus its REST companion.
///
/// Cheap to clone. Handlers receive a clone so they can read the session and
/// make REST calls while the receive loop keeps running.
#[derive(Clone)]
pub struct GatewayConnection {
    inner: Arc<Inner>,
}

struct Inner {
    config: GatewayConfig,
    rest: RestClient,
    session: Arc<SessionState>,
    running: AtomicBool,
}

impl std::fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConnection")
            .field("api_url", &self.inner.config.api_url)
            .field("name", &self.inner.config.name)
            .field("session", &self.inner.session)
            .finish()
    }
}

/// Clears the running flag however `run` exits.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl GatewayConnection {
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let rest = RestClient::new(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                rest,
                session: Arc::new(SessionState::new()),
                running: AtomicBool::new(false),
            }),
        })
    }

    pub fn rest(&self) -> &RestClient {
        &self.inner.rest
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.inner.session
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Connects and services the gateway until the connection fails.
    ///
    /// This never completes successfully: the returned value is the reason
    /// the connection ended. There is no resume and no automatic reconnect;
    /// call `run` again for a fresh connection. Only one `run` may be active
    /// per `GatewayConnection` at a time.
    pub async fn run<F, Fut>(&self, handler: F) -> GatewayError
    where
        F: Fn(GatewayConnection, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return GatewayError::AlreadyRunning;
        }
        let _guard = RunGuard(&self.inner.running);

        let dispatcher = Dispatcher::new(handler, self.inner.config.max_in_flight_handlers);
        match self.connect_and_run(&dispatcher).await {
            Ok(never) => match never {},
            Err(e) => {
                tracing::error!("gateway connection ended: {e}");
                e
            }
        }
    }

    async fn connect_and_run(&self, dispatcher: &Dispatcher) -> Result<Infallible, GatewayError> {
        let gateway_url = self.inner.rest.gateway_url().await?;
        let ws_url = socket_url(&gateway_url);
        tracing::info!("connecting to gateway at {ws_url}");

        let (ws, _) = connect_async(ws_url.as_str()).await?;
        self.inner.session.begin_connection();
        tracing::info!("websocket connected");

        let (mut ws_sink, mut ws_stream) = ws.split();

        // Heartbeat ticks are queued here; the frame is built and written by
        // this loop only.
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut heartbeat: Option<Heartbeat> = None;

        loop {
            tokio::select! {
                Some(()) = rx.recv() => {
                    let frame = heartbeat::frame(&self.inner.session);
                    send_frame(&mut ws_sink, &frame).await?;
                }
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            let frame: GatewayMessage = serde_json::from_str(text.as_str())?;
                            self.handle_frame(frame, &mut ws_sink, &tx, &mut heartbeat, dispatcher)
                                .await?;
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            let reason = match frame {
                                Some(f) => format!("{}: {}", u16::from(f.code), f.reason.as_str()),
                                None => "no close frame".to_string(),
                            };
                            tracing::error!("gateway closed the connection: {reason}");
                            return Err(GatewayError::ConnectionClosed(reason));
                        }
                        Some(Ok(WsMessage::Binary(data))) => {
                            tracing::warn!("unhandled binary frame of {} bytes", data.len());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("websocket error: {e}");
                            return Err(e.into());
                        }
                        None => {
                            return Err(GatewayError::ConnectionClosed("stream ended".to_string()));
                        }
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        frame: GatewayMessage,
        ws_sink: &mut WsSink,
        tx: &mpsc::UnboundedSender<()>,
        heartbeat: &mut Option<Heartbeat>,
        dispatcher: &Dispatcher,
    ) -> Result<(), GatewayError> {
        let session = &self.inner.session;
        if let Some(seq) = frame.s {
            session.observe_sequence(seq);
        }
        tracing::info!("received: {} {:?}", frame.op, frame.t);

        match router::route(frame)? {
            Action::Handshake { heartbeat_interval } => {
                if heartbeat.is_some() {
                    tracing::warn!("ignoring repeated HELLO on an identified connection");
                    return Ok(());
                }
                if heartbeat_interval == 0 {
                    return Err(GatewayError::protocol("HELLO with zero heartbeat interval"));
                }
                tracing::info!("hello received, heartbeat interval {heartbeat_interval}ms");

                let identify = GatewayMessage::identify(&self.identify_data())?;
                send_frame(ws_sink, &identify).await?;

                *heartbeat = Some(Heartbeat::start(
                    Duration::from_millis(heartbeat_interval),
                    tx.clone(),
                ));
            }
            Action::HeartbeatAck => {
                tracing::debug!("heartbeat-ack received");
            }
            Action::Ready(user) => {
                tracing::info!("ready as {} ({})", user.username, user.id);
                session.set_identity(user);
            }
            Action::MessageCreate(message) => {
                tracing::debug!("calling message handler");
                dispatcher.dispatch(self.clone(), message);
            }
            Action::Ignore => {}
        }
        Ok(())
    }

    fn identify_data(&self) -> IdentifyData {
        let config = &self.inner.config;
        IdentifyData {
            token: config.token.clone(),
            properties: ConnectionProperties::current(&config.name),
            compress: false,
            presence: config.activity_name.as_deref().map(Presence::playing),
        }
    }
}

async fn send_frame(ws_sink: &mut WsSink, frame: &GatewayMessage) -> Result<(), GatewayError> {
    let text = serde_json::to_string(frame)?;
    ws_sink.send(WsMessage::Text(text.into())).await?;
    Ok(())
}

/// Appends the protocol version and encoding to a discovered gateway URL.
pub fn socket_url(gateway_url: &str) -> String {
    let sep = if gateway_url.contains('?') { '&' } else { '?' };
    format!("{gateway_url}{sep}v={GATEWAY_VERSION}&encoding={GATEWAY_ENCODING}")
}
