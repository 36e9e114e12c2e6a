//! The root endpoint: owns the transport, the reader loop, and the
//! session registry.

use std::sync::{Arc, OnceLock};

use cdp::target::{SessionId, TargetId};
use cdp::{target, BrowserError, Command, EventKind, Message, PARSE_ERROR};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::channel::{Channel, Link, EVENT_BUFFER};
use crate::error::{CloseReason, Result};
use crate::events::{EventStream, EventWaiter};
use crate::session::Session;
use crate::transport::{self, TransportConfig, TransportRx, TransportTx};

/// JSON-RPC invalid-request code, reported when the browser addresses a
/// session this connection does not know.
const UNKNOWN_SESSION: i64 = -32600;

/// A connection to a DevTools endpoint.
///
/// One WebSocket carries the root control channel plus any number of flat
/// sessions. The connection owns both transport halves and the single
/// background reader task; all endpoints send through it concurrently.
pub struct Connection {
    channel: Channel,
    sessions: DashMap<SessionId, Arc<Session>>,
    reader: OnceLock<JoinHandle<()>>,
}

impl Connection {
    /// Connect to a DevTools WebSocket endpoint with default transport
    /// settings.
    pub async fn connect(url: &str) -> Result<Arc<Self>> {
        Self::connect_with(url, TransportConfig::default()).await
    }

    pub async fn connect_with(url: &str, config: TransportConfig) -> Result<Arc<Self>> {
        let (tx, rx) = transport::connect(url, &config).await?;
        Ok(Self::open(Box::new(tx), Box::new(rx)))
    }

    /// Wrap an already-established transport. The spawned reader loop is
    /// the sole reader; it runs until the transport closes or the stream
    /// desyncs, then tears the whole connection down.
    pub fn open(tx: Box<dyn TransportTx>, rx: Box<dyn TransportRx>) -> Arc<Self> {
        let link = Arc::new(Link::new(tx));
        let connection = Arc::new(Self {
            channel: Channel::root(link),
            sessions: DashMap::new(),
            reader: OnceLock::new(),
        });
        let handle = tokio::spawn(Self::read_loop(Arc::clone(&connection), rx));
        // The cell is freshly created; this cannot fail.
        let _ = connection.reader.set(handle);
        connection
    }

    /// Send a command on the root channel and wait for its result.
    pub async fn execute<C: Command>(&self, command: C) -> Result<C::Response> {
        self.channel.execute(command).await
    }

    /// Subscribe to events by wire method name.
    pub fn listen(&self, methods: &[&str]) -> EventStream {
        self.channel.listen(methods, EVENT_BUFFER)
    }

    pub fn listen_with(&self, methods: &[&str], capacity: usize) -> EventStream {
        self.channel.listen(methods, capacity)
    }

    /// Register for a single event of type `E`; the returned waiter is
    /// subscribed before this call returns.
    pub fn wait_for<E: EventKind>(&self) -> EventWaiter<E> {
        self.channel.wait_for::<E>()
    }

    /// Attach to a target and register the resulting session.
    ///
    /// Flat session mode: the session's traffic shares this connection's
    /// transport, tagged with the session id the browser assigns.
    pub async fn open_session(&self, target_id: TargetId) -> Result<Arc<Session>> {
        let attached = self
            .execute(target::attach_to_target(target_id.clone(), true))
            .await?;
        let session = Arc::new(Session::new(
            attached.session_id.clone(),
            target_id,
            Arc::clone(self.channel.link()),
        ));
        self.sessions
            .insert(attached.session_id, Arc::clone(&session));
        Ok(session)
    }

    /// Look up an attached session by id.
    pub fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Why the connection stopped, if it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.channel.link().close_reason()
    }

    /// Tear the connection down. Idempotent. Every pending call on every
    /// endpoint fails with the close reason, and event streams end.
    pub async fn close(&self) {
        self.shutdown(CloseReason::Clean, true).await;
    }

    async fn shutdown(&self, reason: CloseReason, stop_reader: bool) {
        if !self.channel.link().shut(reason.clone()) {
            return;
        }
        if stop_reader {
            if let Some(handle) = self.reader.get() {
                handle.abort();
            }
        }
        self.channel.link().close_sink().await;
        self.channel.fail_pending(&reason);
        self.channel.close_events();
        for entry in self.sessions.iter() {
            entry.value().fail_pending(&reason);
            entry.value().close_events();
        }
    }

    /// Sole reader of the transport. Demultiplexes every inbound message to
    /// the root channel or to the addressed session; a message that cannot
    /// be parsed, or that addresses an unknown session, is fatal for the
    /// whole connection.
    async fn read_loop(connection: Arc<Connection>, mut rx: Box<dyn TransportRx>) {
        let reason = loop {
            let text = match rx.receive().await {
                Ok(Some(text)) => text,
                Ok(None) => break CloseReason::Clean,
                Err(error) => break CloseReason::Transport(error.to_string()),
            };
            let message: Message = match serde_json::from_str(&text) {
                Ok(message) => message,
                Err(error) => {
                    tracing::error!("invalid JSON from browser: {}", error);
                    break CloseReason::Desync(BrowserError {
                        code: PARSE_ERROR,
                        message: "client received invalid JSON".into(),
                        data: Some(text.into()),
                    });
                }
            };
            match message.session_id().map(str::to_owned) {
                Some(session_id) => {
                    let session = connection
                        .sessions
                        .get(&session_id)
                        .map(|entry| Arc::clone(entry.value()));
                    match session {
                        Some(session) => session.handle_message(message),
                        None => {
                            tracing::error!(%session_id, "message for unknown session");
                            break CloseReason::Desync(BrowserError {
                                code: UNKNOWN_SESSION,
                                message: format!("message for unknown session {session_id}"),
                                data: None,
                            });
                        }
                    }
                }
                None => connection.channel.handle_message(message),
            }
        };
        connection.shutdown(reason, false).await;
    }
}
