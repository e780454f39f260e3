//! WebSocket connection and event loop.
//!
//! Each [`Connection`] spawns a tokio task that owns the socket and handles:
//!
//! - The client handshake (frames written meanwhile are queued)
//! - Incoming frames, forwarded to the [`EventSink`]
//! - Outgoing commands from the session
//! - Keepalive pings after a period of outbound idleness
//! - The close handshake, bounded by [`CLOSE_HANDSHAKE_TIMEOUT`]
//!
//! Exactly one terminal event (`Closed`, `Failed`, `Cancelled` or
//! `PeerClosed`) is emitted per connection, unless the handle is dropped
//! first, in which case the task exits silently.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, Request as ClientRequest};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::InboundEvent;
use crate::session::ConnectOptions;

use super::{Connector, EventSink, TransportSocket};

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the peer's close frame after sending ours.
pub const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Timer settings handed to the event loop.
#[derive(Debug, Clone, Copy)]
struct EventLoopTimers {
    ping_interval: Option<Duration>,
    close_timeout: Duration,
}

/// Internal commands for the event loop.
#[derive(Debug)]
enum ConnectionCommand {
    /// Write a text frame.
    Text(String),
    /// Write a binary frame.
    Binary(Vec<u8>),
    /// Start the close handshake.
    Close { code: u16, reason: String },
}

// ============================================================================
// TungsteniteConnector
// ============================================================================

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Connection tasks run on the configured runtime handle, or on the runtime
/// current at the time of `open`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    runtime: Option<Handle>,
    close_timeout: Duration,
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self {
            runtime: None,
            close_timeout: CLOSE_HANDSHAKE_TIMEOUT,
        }
    }
}

impl TungsteniteConnector {
    /// Creates a connector that spawns on the caller's runtime.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector that always spawns on `runtime`.
    #[inline]
    #[must_use]
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::default()
        }
    }

    /// Sets how long to wait for the peer's close frame.
    ///
    /// Defaults to [`CLOSE_HANDSHAKE_TIMEOUT`].
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    fn runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|e| {
                Error::transport_failure("RuntimeUnavailable", e.to_string())
            }),
        }
    }
}

impl Connector for TungsteniteConnector {
    fn open(
        &self,
        id: ConnectionId,
        options: &ConnectOptions,
        events: EventSink,
    ) -> Result<Box<dyn TransportSocket>> {
        let request = build_request(options)?;
        let runtime = self.runtime()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();

        runtime.spawn(Connection::run_event_loop(
            id,
            request,
            command_rx,
            events,
            EventLoopTimers {
                ping_interval: options.ping_interval,
                close_timeout: self.close_timeout,
            },
        ));

        debug!(connection_id = %id, url = %options.server_url, "Connection attempt started");

        Ok(Box::new(Connection { id, command_tx }))
    }
}

/// Builds the handshake request with custom headers applied.
fn build_request(options: &ConnectOptions) -> Result<ClientRequest<()>> {
    let mut request = options
        .server_url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::invalid_argument(format!("Invalid handshake request: {e}")))?;

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_argument(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_argument(format!("Invalid value for '{name}': {e}")))?;
        request.headers_mut().insert(header_name, header_value);
    }

    Ok(request)
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to a tokio-tungstenite connection task.
///
/// Dropping the handle closes the socket without emitting further events.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn dispatch(&self, command: ConnectionCommand) -> Result<()> {
        self.command_tx.send(command).map_err(|_| {
            Error::transport_failure("ConnectionClosed", "Connection event loop has terminated")
        })
    }

    /// Event loop that owns the WebSocket.
    async fn run_event_loop(
        id: ConnectionId,
        request: ClientRequest<()>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        events: EventSink,
        timers: EventLoopTimers,
    ) {
        let mut queued = Vec::new();
        let handshake = connect_async(request);
        tokio::pin!(handshake);

        let ws_stream = loop {
            tokio::select! {
                result = &mut handshake => match result {
                    Ok((stream, response)) => {
                        debug!(connection_id = %id, status = %response.status(), "Handshake completed");
                        break stream;
                    }
                    Err(e) => {
                        warn!(connection_id = %id, error = %e, "Handshake failed");
                        events.emit(InboundEvent::from_ws_error(&e));
                        return;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(ConnectionCommand::Close { .. }) => {
                        debug!(connection_id = %id, "Connection attempt cancelled");
                        events.emit(InboundEvent::Cancelled);
                        return;
                    }
                    Some(command) => queued.push(command),
                    None => {
                        debug!(connection_id = %id, "Handle dropped during handshake");
                        return;
                    }
                },
            }
        };

        events.emit(InboundEvent::Opened);

        let (mut ws_write, mut ws_read) = ws_stream.split();

        for command in queued {
            if let Err(e) = Self::write_command(&mut ws_write, command).await {
                warn!(connection_id = %id, error = %e, "Failed to flush queued frame");
                events.emit(InboundEvent::from_ws_error(&e));
                return;
            }
        }

        let mut keepalive = timers.ping_interval.and_then(keepalive_timer);
        let mut closing: Option<(u16, String)> = None;
        let mut close_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        events.emit(InboundEvent::TextFrame(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Binary(data))) => {
                        events.emit(InboundEvent::BinaryFrame(data.to_vec()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let event = match frame {
                            Some(frame) => InboundEvent::Closed {
                                code: u16::from(frame.code),
                                reason: frame.reason.as_str().to_owned(),
                            },
                            None => Self::end_of_stream(&closing),
                        };
                        debug!(connection_id = %id, ?event, "Close frame received");
                        let _ = ws_write.close().await;
                        events.emit(event);
                        break;
                    }

                    // Ping, Pong, raw frames
                    Some(Ok(_)) => {}

                    Some(Err(e)) => {
                        let event = if closing.is_some() {
                            debug!(connection_id = %id, error = %e, "Socket ended during close handshake");
                            Self::end_of_stream(&closing)
                        } else {
                            warn!(connection_id = %id, error = %e, "WebSocket error");
                            InboundEvent::from_ws_error(&e)
                        };
                        events.emit(event);
                        break;
                    }

                    None => {
                        debug!(connection_id = %id, "WebSocket stream ended");
                        events.emit(Self::end_of_stream(&closing));
                        break;
                    }
                },

                // Commands from the session
                command = command_rx.recv(), if closing.is_none() => match command {
                    Some(ConnectionCommand::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.clone().into(),
                        };
                        if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                            debug!(connection_id = %id, error = %e, "Failed to send close frame");
                            events.emit(InboundEvent::Closed { code, reason });
                            break;
                        }
                        trace!(connection_id = %id, code, "Close frame sent");
                        closing = Some((code, reason));
                        let now = Instant::now();
                        close_deadline = now
                            .checked_add(timers.close_timeout)
                            .or_else(|| now.checked_add(CLOSE_HANDSHAKE_TIMEOUT));
                    }

                    Some(command) => {
                        if let Err(e) = Self::write_command(&mut ws_write, command).await {
                            warn!(connection_id = %id, error = %e, "Failed to write frame");
                            events.emit(InboundEvent::from_ws_error(&e));
                            break;
                        }
                        if let Some(ticker) = keepalive.as_mut() {
                            ticker.reset();
                        }
                    }

                    None => {
                        debug!(connection_id = %id, "Handle dropped, closing socket");
                        let _ = ws_write.close().await;
                        break;
                    }
                },

                // Keepalive
                () = next_tick(&mut keepalive) => {
                    if let Err(e) = ws_write.send(Message::Ping(Vec::new().into())).await {
                        warn!(connection_id = %id, error = %e, "Failed to send keepalive ping");
                        events.emit(InboundEvent::from_ws_error(&e));
                        break;
                    }
                    trace!(connection_id = %id, "Keepalive ping sent");
                }

                // Close handshake deadline
                () = wait_until(close_deadline) => {
                    warn!(connection_id = %id, "Close handshake timed out");
                    events.emit(Self::end_of_stream(&closing));
                    break;
                }
            }
        }

        debug!(connection_id = %id, "Event loop terminated");
    }

    /// Writes a data command to the socket.
    async fn write_command(
        ws_write: &mut WsWrite,
        command: ConnectionCommand,
    ) -> std::result::Result<(), WsError> {
        let message = match command {
            ConnectionCommand::Text(text) => Message::Text(text.into()),
            ConnectionCommand::Binary(data) => Message::Binary(data.into()),
            ConnectionCommand::Close { code, reason } => Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            })),
        };
        ws_write.send(message).await
    }

    /// Terminal event when the stream ends without a close frame.
    fn end_of_stream(closing: &Option<(u16, String)>) -> InboundEvent {
        match closing {
            Some((code, reason)) => InboundEvent::Closed {
                code: *code,
                reason: reason.clone(),
            },
            None => InboundEvent::PeerClosed,
        }
    }
}

impl TransportSocket for Connection {
    fn send_text(&self, text: String) -> Result<()> {
        self.dispatch(ConnectionCommand::Text(text))
    }

    fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.dispatch(ConnectionCommand::Binary(data))
    }

    fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.dispatch(ConnectionCommand::Close {
            code,
            reason: reason.to_string(),
        })
    }
}

// ============================================================================
// Timer Helpers
// ============================================================================

/// Builds the keepalive ticker, first firing one period from now.
///
/// Returns `None` for a zero period or one too large to schedule.
fn keepalive_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let Some(start) = Instant::now().checked_add(period) else {
        warn!(?period, "Ping interval out of range, keepalive disabled");
        return None;
    };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    use crate::protocol::event::CANCELLED_REASON;

    /// Spawns an echo server that answers one client.
    async fn spawn_echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws accept");
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(_) | Message::Binary(_) => {
                        if ws.send(message).await.is_err() {
                            break;
                        }
                    }
                    // Keep reading so the close reply gets flushed
                    _ => {}
                }
            }
        });

        addr
    }

    fn collecting_sink() -> (EventSink, mpsc::UnboundedReceiver<InboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(move |event| {
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<InboundEvent>) -> InboundEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("sink open")
    }

    /// Spawns a server that completes the handshake, then never reads.
    async fn spawn_silent_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let _ws = accept_async(stream).await.expect("ws accept");
            pending::<()>().await;
        });

        addr
    }

    /// Spawns a server that reports every ping it receives.
    async fn spawn_ping_recorder() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws accept");
            while let Some(Ok(message)) = ws.next().await {
                if message.is_ping() {
                    let _ = tx.send(());
                }
            }
        });

        (addr, rx)
    }

    #[test]
    fn test_default_close_timeout() {
        let connector = TungsteniteConnector::new();
        assert_eq!(connector.close_timeout, CLOSE_HANDSHAKE_TIMEOUT);
        assert_eq!(CLOSE_HANDSHAKE_TIMEOUT.as_secs(), 5);
    }

    #[tokio::test]
    async fn test_keepalive_timer_skips_unschedulable_periods() {
        assert!(keepalive_timer(Duration::ZERO).is_none());
        assert!(keepalive_timer(Duration::MAX).is_none());
        assert!(keepalive_timer(Duration::from_secs(i64::MAX.unsigned_abs())).is_none());
        assert!(keepalive_timer(Duration::from_secs(30)).is_some());
    }

    #[test]
    fn test_build_request_applies_headers() {
        let options = ConnectOptions::parse("ws://127.0.0.1:9/socket")
            .expect("url")
            .with_header("Authorization", "Bearer token");

        let request = build_request(&options).expect("request");
        assert_eq!(request.headers()["Authorization"], "Bearer token");
        assert!(request.headers().contains_key("Sec-WebSocket-Key"));
    }

    #[test]
    fn test_build_request_rejects_bad_header() {
        let options = ConnectOptions::parse("ws://127.0.0.1:9/")
            .expect("url")
            .with_header("Bad Header", "x");

        let err = build_request(&options).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_open_without_runtime_fails() {
        let connector = TungsteniteConnector::new();
        let options = ConnectOptions::parse("ws://127.0.0.1:9/").expect("url");
        let (sink, _rx) = collecting_sink();

        let result = connector.open(ConnectionId::next(), &options, sink);
        assert!(matches!(result, Err(Error::TransportFailure { .. })));
    }

    #[tokio::test]
    async fn test_loopback_echo_and_close() {
        let addr = spawn_echo_server().await;
        let options = ConnectOptions::parse(&format!("ws://{addr}/")).expect("url");
        let (sink, mut rx) = collecting_sink();

        let socket = TungsteniteConnector::new()
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        // Queued while the handshake is still running
        socket.send_text("hi".into()).expect("send text");

        assert_eq!(next_event(&mut rx).await, InboundEvent::Opened);
        assert_eq!(
            next_event(&mut rx).await,
            InboundEvent::TextFrame("hi".into())
        );

        socket.send_binary(vec![1, 2, 3]).expect("send binary");
        assert_eq!(
            next_event(&mut rx).await,
            InboundEvent::BinaryFrame(vec![1, 2, 3])
        );

        socket.close(1001, "bye").expect("close");
        match next_event(&mut rx).await {
            InboundEvent::Closed { code, .. } => assert_eq!(code, 1001),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_reports_failure() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let options = ConnectOptions::parse(&format!("ws://{addr}/")).expect("url");
        let (sink, mut rx) = collecting_sink();
        let _socket = TungsteniteConnector::new()
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        match next_event(&mut rx).await {
            InboundEvent::Failed { kind, .. } => assert_eq!(kind, "IoError"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_during_handshake_cancels() {
        // Accepts TCP but never completes the WebSocket handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept");
            pending::<()>().await;
        });

        let options = ConnectOptions::parse(&format!("ws://{addr}/")).expect("url");
        let (sink, mut rx) = collecting_sink();
        let socket = TungsteniteConnector::new()
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        socket.close(1000, CANCELLED_REASON).expect("close");
        assert_eq!(next_event(&mut rx).await, InboundEvent::Cancelled);
    }

    #[tokio::test]
    async fn test_idle_connection_sends_ping() {
        let (addr, mut pings) = spawn_ping_recorder().await;
        let options = ConnectOptions::parse(&format!("ws://{addr}/"))
            .expect("url")
            .with_ping_interval(Duration::from_millis(50));
        let (sink, mut rx) = collecting_sink();

        let _socket = TungsteniteConnector::new()
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        assert_eq!(next_event(&mut rx).await, InboundEvent::Opened);
        timeout(Duration::from_secs(5), pings.recv())
            .await
            .expect("ping within timeout")
            .expect("server alive");
    }

    #[tokio::test]
    async fn test_unschedulable_ping_interval_keeps_connection_usable() {
        let addr = spawn_echo_server().await;
        let mut options = ConnectOptions::parse(&format!("ws://{addr}/")).expect("url");
        options.ping_interval = Some(Duration::MAX);
        let (sink, mut rx) = collecting_sink();

        let socket = TungsteniteConnector::new()
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        assert_eq!(next_event(&mut rx).await, InboundEvent::Opened);
        socket.send_text("still here".into()).expect("send text");
        assert_eq!(
            next_event(&mut rx).await,
            InboundEvent::TextFrame("still here".into())
        );

        socket.close(1000, "done").expect("close");
        assert!(matches!(
            next_event(&mut rx).await,
            InboundEvent::Closed { code: 1000, .. }
        ));
    }

    #[tokio::test]
    async fn test_close_without_peer_reply_times_out() {
        let addr = spawn_silent_server().await;
        let options = ConnectOptions::parse(&format!("ws://{addr}/")).expect("url");
        let (sink, mut rx) = collecting_sink();

        let socket = TungsteniteConnector::new()
            .with_close_timeout(Duration::from_millis(200))
            .open(ConnectionId::next(), &options, sink)
            .expect("open");

        assert_eq!(next_event(&mut rx).await, InboundEvent::Opened);
        socket.close(1001, "bye").expect("close");

        assert_eq!(
            next_event(&mut rx).await,
            InboundEvent::Closed {
                code: 1001,
                reason: "bye".into(),
            }
        );
    }
}
