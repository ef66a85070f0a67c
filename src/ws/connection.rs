//! Stream connection management.
//!
//! Owns the single WebSocket connection to the backend event stream: connect,
//! reconnect with capped multiplicative backoff, keepalive, teardown. Exactly
//! one instance exists per mounted real-time layer; every other component
//! only reads status or calls [`StreamConnection::send`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::config::WsConfig;
use super::error::WsError;
use super::messages::{ClientMessage, Envelope, EventKind};
use super::router::EventRouter;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection and none being attempted.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The stream is live.
    Connected,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Owner of the single stream connection.
///
/// Failures are never surfaced to callers: every close or error drives the
/// state machine into `Reconnecting` and the manager retries indefinitely
/// until [`close`](Self::close) is called.
pub struct StreamConnection {
    config: WsConfig,
    router: Arc<EventRouter>,
    sink: Mutex<Option<WsSink>>,
    status: StdRwLock<ConnectionStatus>,
    /// Consecutive failed attempts since the last successful connection.
    attempt: AtomicU32,
    /// Delay before the next reconnection attempt.
    backoff: StdMutex<Duration>,
    /// Connection generation; bumped on every successful open and on close so
    /// reader/keepalive tasks from an earlier generation retire themselves.
    epoch: AtomicU64,
    /// At most one pending reconnect timer.
    reconnect_timer: StdMutex<Option<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("url", &self.config.url)
            .field("status", &self.status())
            .field("attempt", &self.attempt())
            .finish()
    }
}

impl StreamConnection {
    /// Creates a new connection manager. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WsConfig, router: Arc<EventRouter>) -> Result<Arc<Self>, WsError> {
        config.validate()?;
        let floor = config.reconnect_floor;

        Ok(Arc::new(Self {
            config,
            router,
            sink: Mutex::new(None),
            status: StdRwLock::new(ConnectionStatus::Disconnected),
            attempt: AtomicU32::new(0),
            backoff: StdMutex::new(floor),
            epoch: AtomicU64::new(0),
            reconnect_timer: StdMutex::new(None),
            shutdown: AtomicBool::new(false),
        }))
    }

    /// Returns the current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the count of consecutive failed attempts since the last
    /// successful connection.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }

    /// Returns the delay before the next reconnection attempt.
    #[must_use]
    pub fn backoff_delay(&self) -> Duration {
        *self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the connection.
    ///
    /// Idempotent: calling this while already connected, or while an attempt
    /// is in flight, is a no-op. A failed attempt schedules a reconnect and
    /// returns; it never propagates the failure.
    pub async fn connect(self: &Arc<Self>) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }

        {
            let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
            match *status {
                ConnectionStatus::Connected | ConnectionStatus::Connecting => {
                    debug!(status = %*status, "connect() ignored");
                    return;
                }
                _ => *status = ConnectionStatus::Connecting,
            }
        }

        debug!(url = %self.config.url, "opening stream connection");
        match tokio_tungstenite::connect_async(&self.config.url).await {
            Ok((stream, _)) => {
                // close() may have run while the handshake was in flight; the
                // freshly opened socket must not survive it.
                if self.shutdown.load(Ordering::SeqCst) {
                    debug!("discarding connection established after close()");
                    let (mut sink, _) = stream.split();
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }

                let (sink, source) = stream.split();
                *self.sink.lock().await = Some(sink);

                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                *self.status.write().unwrap_or_else(PoisonError::into_inner) =
                    ConnectionStatus::Connected;
                self.attempt.store(0, Ordering::SeqCst);
                *self.backoff.lock().unwrap_or_else(PoisonError::into_inner) =
                    self.config.reconnect_floor;

                // A pending timer from a racing failure path is now obsolete.
                if let Some(timer) = self
                    .reconnect_timer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                {
                    timer.abort();
                }

                info!(url = %self.config.url, "stream connected");
                self.spawn_reader(source, epoch);
                self.spawn_keepalive(epoch);
            }
            Err(e) => {
                warn!(error = %e, "stream connection failed");
                self.handle_disconnect(self.epoch.load(Ordering::SeqCst))
                    .await;
            }
        }
    }

    /// Sends a message if connected.
    ///
    /// At-most-once, fire-and-forget: while not connected the message is
    /// dropped with a logged warning. Never errors, never queues.
    pub async fn send(&self, message: &ClientMessage) {
        if self.status() != ConnectionStatus::Connected {
            warn!("dropping outbound message: not connected");
            return;
        }

        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "dropping outbound message: serialization failed");
                return;
            }
        };

        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => {
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    warn!(error = %e, "outbound send failed");
                }
            }
            None => warn!("dropping outbound message: no active socket"),
        }
    }

    /// Closes the connection and cancels all timers.
    ///
    /// After this the manager makes no further reconnection attempts; the
    /// pending reconnect timer, keepalive, and reader are all retired.
    pub async fn close(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);

        if let Some(timer) = self
            .reconnect_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }

        *self.status.write().unwrap_or_else(PoisonError::into_inner) =
            ConnectionStatus::Disconnected;

        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }

        info!("stream connection closed");
    }

    /// Reads frames until the socket closes or errors, then hands control to
    /// the reconnect path.
    fn spawn_reader(self: &Arc<Self>, mut source: WsSource, epoch: u64) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                if this.epoch.load(Ordering::SeqCst) != epoch {
                    return;
                }
                match item {
                    Ok(Message::Text(text)) => this.handle_text(&text),
                    Ok(Message::Close(_)) => {
                        info!("server closed the stream");
                        break;
                    }
                    // Transport-level ping/pong is answered by tungstenite.
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "stream read error");
                        break;
                    }
                }
            }
            this.handle_disconnect(epoch).await;
        });
    }

    /// Decodes one inbound frame and routes it.
    ///
    /// Control envelopes are consumed here and never reach subscribers;
    /// malformed envelopes are logged and dropped without affecting the
    /// connection.
    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => match envelope.kind() {
                EventKind::Pong => debug!("pong received"),
                EventKind::Ping => debug!("server ping received"),
                _ => self.router.dispatch(&envelope),
            },
            Err(e) => warn!(error = %e, "dropping malformed envelope"),
        }
    }

    /// Emits a ping on a fixed interval while this generation is connected.
    ///
    /// A missing pong is tolerated; liveness failures surface as a normal
    /// read error or close on the reader side.
    fn spawn_keepalive(self: &Arc<Self>, epoch: u64) {
        let this = Arc::clone(self);
        let interval = self.config.keepalive_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if this.epoch.load(Ordering::SeqCst) != epoch
                    || this.status() != ConnectionStatus::Connected
                {
                    return;
                }
                this.send(&ClientMessage::ping_now()).await;
            }
        });
    }

    /// Transitions into `Reconnecting` and schedules exactly one retry timer.
    ///
    /// Called from every failure path. A stale generation (`epoch` mismatch)
    /// returns immediately so a dying reader cannot disturb a connection that
    /// already replaced it.
    async fn handle_disconnect(self: &Arc<Self>, epoch: u64) {
        if self.shutdown.load(Ordering::SeqCst) || self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }

        *self.sink.lock().await = None;
        *self.status.write().unwrap_or_else(PoisonError::into_inner) =
            ConnectionStatus::Reconnecting;
        self.schedule_reconnect();
    }

    /// Schedules the next connection attempt after the current backoff delay.
    ///
    /// Guarded: if a timer is already pending this is a no-op, so a second
    /// close arriving while a reconnect is pending cannot create a duplicate.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut timer = self
            .reconnect_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("reconnect already pending");
            return;
        }

        let delay = self.backoff_delay();
        info!(delay_ms = delay.as_millis() as u64, attempt = self.attempt() + 1, "scheduling reconnect");

        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.shutdown.load(Ordering::SeqCst) {
                return;
            }

            this.attempt.fetch_add(1, Ordering::SeqCst);
            {
                let mut backoff = this.backoff.lock().unwrap_or_else(PoisonError::into_inner);
                *backoff = this.config.grow_backoff(*backoff);
            }

            // Clear the guard before reconnecting so a failed attempt can
            // schedule the next timer.
            this.reconnect_timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            this.connect().await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> WsConfig {
        WsConfig::new(url)
            .with_reconnect_floor(Duration::from_millis(50))
            .with_reconnect_ceiling(Duration::from_millis(400))
            .with_keepalive_interval(Duration::from_secs(60))
    }

    fn new_connection(url: &str) -> Arc<StreamConnection> {
        StreamConnection::new(test_config(url), Arc::new(EventRouter::new())).expect("connection")
    }

    #[test]
    fn test_new_validates_config() {
        let result = StreamConnection::new(WsConfig::new(""), Arc::new(EventRouter::new()));
        assert!(result.is_err());

        let result = StreamConnection::new(
            WsConfig::new("http://example.com"),
            Arc::new(EventRouter::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_initial_state() {
        let connection = new_connection("ws://127.0.0.1:1/ws");

        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert_eq!(connection.attempt(), 0);
        assert_eq!(connection.backoff_delay(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_failed_connect_enters_reconnecting() {
        // Port 1 is essentially never listening; connect fails fast.
        let connection = new_connection("ws://127.0.0.1:1/ws");

        connection.connect().await;

        assert_eq!(connection.status(), ConnectionStatus::Reconnecting);
        connection.close().await;
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_a_noop() {
        let connection = new_connection("ws://127.0.0.1:1/ws");
        // Must not panic or error.
        connection.send(&ClientMessage::ping_now()).await;
    }

    #[tokio::test]
    async fn test_duplicate_disconnects_schedule_one_timer() {
        let connection = new_connection("ws://127.0.0.1:1/ws");
        *connection
            .status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = ConnectionStatus::Reconnecting;

        connection.schedule_reconnect();
        connection.schedule_reconnect();
        connection.schedule_reconnect();

        // One timer fired exactly once: a single attempt increment. A second
        // cycle (scheduled by the failed retry) waits out a grown delay that
        // ends beyond our observation window.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(connection.attempt(), 1);
        connection.close().await;
    }

    #[tokio::test]
    async fn test_backoff_grows_per_failed_attempt() {
        let connection = new_connection("ws://127.0.0.1:1/ws");

        connection.connect().await;
        assert_eq!(connection.backoff_delay(), Duration::from_millis(50));

        // First timer fires at ~50ms and grows the delay before retrying.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(connection.attempt() >= 1);
        assert!(connection.backoff_delay() >= Duration::from_millis(75));
        connection.close().await;
    }

    #[tokio::test]
    async fn test_close_cancels_pending_reconnect() {
        let connection = new_connection("ws://127.0.0.1:1/ws");
        connection.connect().await;
        assert_eq!(connection.status(), ConnectionStatus::Reconnecting);

        connection.close().await;
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);

        // Were the timer still alive it would fire within this window and
        // move the state machine again.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert_eq!(connection.attempt(), 0);
    }

    #[tokio::test]
    async fn test_close_during_inflight_connect() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            // Stall before completing the WebSocket handshake so close() can
            // land while connect() is still awaiting it.
            tokio::time::sleep(Duration::from_millis(300)).await;
            if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                while let Some(Ok(_)) = ws.next().await {}
            }
        });

        let connection = new_connection(&format!("ws://{addr}"));
        let connecting = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.connect().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        connection.close().await;
        connecting.await.expect("connect task");

        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert!(connection.sink.lock().await.is_none());

        // The discarded socket spawned no reader or keepalive; nothing moves
        // the state machine afterwards.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_while_connected() {
        let connection = new_connection("ws://127.0.0.1:1/ws");
        *connection
            .status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = ConnectionStatus::Connected;
        let epoch_before = connection.epoch.load(Ordering::SeqCst);

        connection.connect().await;

        assert_eq!(connection.status(), ConnectionStatus::Connected);
        assert_eq!(connection.epoch.load(Ordering::SeqCst), epoch_before);
    }
}
