//! Event fan-out: wire method name to a set of bounded subscriber sinks.
//!
//! Delivery never blocks the dispatch path: a full sink loses the event and
//! the loss is logged, a closed sink is dropped from the registry. Sinks
//! are independent of each other.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use cdp::{Event, EventKind};
use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::channel::Link;
use crate::error::{CloseReason, Error, Result};

pub(crate) struct EventRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    link: Arc<Link>,
    next_sink: AtomicU64,
    sinks: DashMap<String, Vec<Sink>>,
}

struct Sink {
    id: u64,
    tx: mpsc::Sender<Event>,
}

impl EventRegistry {
    pub(crate) fn new(link: Arc<Link>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                link,
                next_sink: AtomicU64::new(0),
                sinks: DashMap::new(),
            }),
        }
    }

    /// Register one sink under every requested method name.
    pub(crate) fn subscribe(&self, methods: &[&str], capacity: usize) -> EventStream {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.inner.next_sink.fetch_add(1, Ordering::Relaxed);
        for method in methods {
            self.inner
                .sinks
                .entry((*method).to_owned())
                .or_default()
                .push(Sink { id, tx: tx.clone() });
        }
        EventStream {
            rx,
            guard: SinkGuard {
                inner: Arc::clone(&self.inner),
                id,
                methods: methods.iter().map(|method| (*method).to_owned()).collect(),
            },
        }
    }

    /// Deliver one decoded event to every sink subscribed to its method.
    pub(crate) fn dispatch(&self, event: Event) {
        let Some(mut sinks) = self.inner.sinks.get_mut(event.method()) else {
            return;
        };
        sinks.retain(|sink| match sink.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::error!(
                    method = event.method(),
                    "dropping event for slow subscriber"
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Drop every sink so subscription streams end instead of hanging.
    pub(crate) fn close_all(&self) {
        self.inner.sinks.clear();
    }
}

struct SinkGuard {
    inner: Arc<RegistryInner>,
    id: u64,
    methods: Vec<String>,
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        for method in &self.methods {
            if let Some(mut sinks) = self.inner.sinks.get_mut(method) {
                sinks.retain(|sink| sink.id != self.id);
            }
            self.inner.sinks.remove_if(method, |_, sinks| sinks.is_empty());
        }
    }
}

/// A lazy stream of decoded events, produced by `listen`.
///
/// The stream only ends when the connection is torn down; drop it to
/// unsubscribe from every requested event type.
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
    guard: SinkGuard,
}

impl EventStream {
    /// Receive the next event in arrival order.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    fn close_reason(&self) -> Option<CloseReason> {
        self.guard.inner.link.close_reason()
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

/// Single-event wait created by `wait_for`.
///
/// The subscription is registered before control returns to the caller, so
/// an event raced by the triggering action is not lost:
///
/// ```no_run
/// # use tokio_cdp::{Session, Result};
/// # use tokio_cdp::cdp::page;
/// # async fn demo(session: &Session) -> Result<()> {
/// let loaded = session.wait_for::<page::LoadEventFired>();
/// session.execute(page::navigate("https://example.com")).await?;
/// let event = loaded.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct EventWaiter<E: EventKind> {
    stream: EventStream,
    _kind: PhantomData<E>,
}

impl<E: EventKind> EventWaiter<E> {
    pub(crate) fn new(stream: EventStream) -> Self {
        Self {
            stream,
            _kind: PhantomData,
        }
    }

    /// Wait for exactly one matching event, then unsubscribe.
    pub async fn wait(mut self) -> Result<E> {
        while let Some(event) = self.stream.next_event().await {
            if let Some(event) = E::from_event(event) {
                return Ok(event);
            }
        }
        let reason = self.stream.close_reason().unwrap_or(CloseReason::Clean);
        Err(Error::Closed(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cdp::page;
    use serde_json::json;

    use crate::transport::{TransportError, TransportTx};

    struct NullTx;

    #[async_trait]
    impl TransportTx for NullTx {
        async fn send(&mut self, _message: String) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn close(&mut self) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    fn registry() -> EventRegistry {
        EventRegistry::new(Arc::new(Link::new(Box::new(NullTx))))
    }

    fn load_event(timestamp: f64) -> Event {
        cdp::parse_event(&cdp::EventMessage {
            method: page::LoadEventFired::METHOD.to_owned(),
            params: json!({ "timestamp": timestamp }),
            session_id: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let registry = registry();
        let mut first = registry.subscribe(&[page::LoadEventFired::METHOD], 10);
        let mut second = registry.subscribe(&[page::LoadEventFired::METHOD], 10);

        registry.dispatch(load_event(1.0));

        for stream in [&mut first, &mut second] {
            let event = stream.next_event().await.unwrap();
            assert!(matches!(event, Event::PageLoadEventFired(_)));
        }
    }

    #[tokio::test]
    async fn dropping_a_stream_unsubscribes_it() {
        let registry = registry();
        let first = registry.subscribe(&[page::LoadEventFired::METHOD], 10);
        let mut second = registry.subscribe(&[page::LoadEventFired::METHOD], 10);

        drop(first);
        assert_eq!(
            registry
                .inner
                .sinks
                .get(page::LoadEventFired::METHOD)
                .unwrap()
                .len(),
            1
        );

        registry.dispatch(load_event(2.0));
        assert!(second.next_event().await.is_some());
    }

    #[tokio::test]
    async fn full_sink_loses_the_event_without_blocking() {
        let registry = registry();
        let mut stream = registry.subscribe(&[page::LoadEventFired::METHOD], 1);

        registry.dispatch(load_event(1.0));
        registry.dispatch(load_event(2.0));

        let Some(Event::PageLoadEventFired(first)) = stream.next_event().await else {
            panic!("expected a load event");
        };
        assert_eq!(first.timestamp, 1.0);

        let mut pending = tokio_test::task::spawn(stream.next_event());
        tokio_test::assert_pending!(pending.poll());
    }

    #[tokio::test]
    async fn close_all_ends_streams() {
        let registry = registry();
        let mut stream = registry.subscribe(&[page::LoadEventFired::METHOD], 10);
        registry.close_all();
        assert!(stream.next_event().await.is_none());
    }
}
