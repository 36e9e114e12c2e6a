//! Per-endpoint channel state, shared by the root connection and every
//! session.
//!
//! Commands are correlated to responses by a per-endpoint monotonic call
//! id. The completion handoff rides a oneshot channel, so the result is
//! stored and the waiter signalled in one step and a waiter can never
//! observe a signal without its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use cdp::target::SessionId;
use cdp::{CallId, Command, EventKind, EventMessage, Message, Request, Response};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::error::{CloseReason, Error, Result};
use crate::events::{EventRegistry, EventStream, EventWaiter};
use crate::transport::TransportTx;

/// Default per-sink event buffer capacity.
pub const EVENT_BUFFER: usize = 10;

/// The shared write side of the connection. Sessions do not own a socket;
/// they send through this link, and the link remembers why the connection
/// stopped once it has.
pub(crate) struct Link {
    sink: Mutex<Box<dyn TransportTx>>,
    closed: OnceLock<CloseReason>,
}

impl Link {
    pub(crate) fn new(sink: Box<dyn TransportTx>) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: OnceLock::new(),
        }
    }

    pub(crate) async fn send(&self, message: String) -> Result<()> {
        if let Some(reason) = self.closed.get() {
            return Err(Error::Closed(reason.clone()));
        }
        let mut sink = self.sink.lock().await;
        sink.send(message).await.map_err(Error::from)
    }

    /// Record the terminal close reason. Returns false if one was already
    /// recorded.
    pub(crate) fn shut(&self, reason: CloseReason) -> bool {
        self.closed.set(reason).is_ok()
    }

    pub(crate) fn close_reason(&self) -> Option<CloseReason> {
        self.closed.get().cloned()
    }

    pub(crate) async fn close_sink(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(error) = sink.close().await {
            tracing::debug!("error closing transport: {}", error);
        }
    }
}

type CallSlot = oneshot::Sender<Result<Value>>;

/// One endpoint's view of the multiplexed connection.
pub(crate) struct Channel {
    session_id: Option<SessionId>,
    next_id: AtomicU64,
    pending: DashMap<CallId, CallSlot>,
    events: EventRegistry,
    link: Arc<Link>,
}

impl Channel {
    pub(crate) fn root(link: Arc<Link>) -> Self {
        Self::new(None, link)
    }

    pub(crate) fn for_session(session_id: SessionId, link: Arc<Link>) -> Self {
        Self::new(Some(session_id), link)
    }

    fn new(session_id: Option<SessionId>, link: Arc<Link>) -> Self {
        Self {
            session_id,
            next_id: AtomicU64::new(0),
            pending: DashMap::new(),
            events: EventRegistry::new(Arc::clone(&link)),
            link,
        }
    }

    pub(crate) fn link(&self) -> &Arc<Link> {
        &self.link
    }

    /// Send a command and wait for the matching response.
    pub(crate) async fn execute<C: Command>(&self, command: C) -> Result<C::Response> {
        if let Some(reason) = self.link.close_reason() {
            return Err(Error::Closed(reason));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        // Removes the entry again if this call errors out or is cancelled
        // before the response arrives; a late response for this id then
        // takes the unknown-id path instead of hitting a stale slot.
        let guard = PendingGuard {
            pending: &self.pending,
            id,
            armed: true,
        };

        let params = serde_json::to_value(&command).map_err(Error::Encode)?;
        let request = Request {
            id,
            method: C::METHOD,
            params,
            session_id: self.session_id.clone(),
        };
        let message = serde_json::to_string(&request).map_err(Error::Encode)?;
        tracing::debug!(id, method = C::METHOD, "sending command");
        self.link.send(message).await?;

        let value = match rx.await {
            Ok(outcome) => {
                guard.disarm();
                outcome?
            }
            Err(_) => {
                guard.disarm();
                let reason = self.link.close_reason().unwrap_or(CloseReason::Clean);
                return Err(Error::Closed(reason));
            }
        };
        serde_json::from_value(value).map_err(|source| Error::Decode {
            method: C::METHOD,
            source,
        })
    }

    pub(crate) fn listen(&self, methods: &[&str], capacity: usize) -> EventStream {
        self.events.subscribe(methods, capacity)
    }

    pub(crate) fn wait_for<E: EventKind>(&self) -> EventWaiter<E> {
        EventWaiter::new(self.events.subscribe(&[E::METHOD], EVENT_BUFFER))
    }

    /// Entry point for the reader loop.
    pub(crate) fn handle_message(&self, message: Message) {
        match message {
            Message::Response(response) => self.handle_response(response),
            Message::Event(event) => self.handle_event(event),
        }
    }

    fn handle_response(&self, response: Response) {
        let Some((_, slot)) = self.pending.remove(&response.id) else {
            tracing::warn!(id = response.id, "response for unknown call id");
            return;
        };
        let outcome = match response.error {
            Some(error) => Err(Error::Browser(error)),
            None => Ok(response
                .result
                .unwrap_or_else(|| Value::Object(Default::default()))),
        };
        // The waiter may have been cancelled in the meantime.
        let _ = slot.send(outcome);
    }

    fn handle_event(&self, message: EventMessage) {
        match cdp::parse_event(&message) {
            Ok(event) => self.events.dispatch(event),
            Err(error) => {
                tracing::debug!(method = %message.method, "ignoring event: {}", error)
            }
        }
    }

    /// Fail every in-flight call with the terminal close reason.
    pub(crate) fn fail_pending(&self, reason: &CloseReason) {
        let ids: Vec<CallId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, slot)) = self.pending.remove(&id) {
                let _ = slot.send(Err(Error::Closed(reason.clone())));
            }
        }
    }

    pub(crate) fn close_events(&self) {
        self.events.close_all();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

struct PendingGuard<'a> {
    pending: &'a DashMap<CallId, CallSlot>,
    id: CallId,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cdp::target;

    use crate::transport::TransportError;

    struct SilentTx;

    #[async_trait]
    impl TransportTx for SilentTx {
        async fn send(&mut self, _message: String) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn close(&mut self) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancelled_call_removes_its_pending_entry() {
        let channel = Arc::new(Channel::root(Arc::new(Link::new(Box::new(SilentTx)))));

        let worker = Arc::clone(&channel);
        let call = tokio::spawn(async move { worker.execute(target::get_targets()).await });
        // Let the call reach its suspension point.
        tokio::task::yield_now().await;
        assert_eq!(channel.pending_len(), 1);

        call.abort();
        let joined = call.await;
        assert!(joined.is_err());
        assert_eq!(channel.pending_len(), 0);
    }

    #[tokio::test]
    async fn call_ids_are_monotonic_per_endpoint() {
        let link = Arc::new(Link::new(Box::new(SilentTx)));
        let root = Channel::root(Arc::clone(&link));
        let session = Channel::for_session("session1".into(), link);
        assert_eq!(root.next_id.fetch_add(1, Ordering::Relaxed), 0);
        assert_eq!(root.next_id.fetch_add(1, Ordering::Relaxed), 1);
        // Sessions run their own sequence.
        assert_eq!(session.next_id.fetch_add(1, Ordering::Relaxed), 0);
    }
}
