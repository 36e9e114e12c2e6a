//! A channel endpoint attached to one target.

use std::sync::Arc;

use cdp::target::{SessionId, TargetId};
use cdp::{dom, page, Command, EventKind, Message};
use tokio::sync::Mutex;

use crate::channel::{Channel, Link, EVENT_BUFFER};
use crate::error::{CloseReason, Result};
use crate::events::{EventStream, EventWaiter};

/// A protocol session bound to an attached target.
///
/// Sessions own no transport; every command is tagged with the session id
/// and sent over the parent connection's socket. Created by
/// [`Connection::open_session`](crate::Connection::open_session).
pub struct Session {
    session_id: SessionId,
    target_id: TargetId,
    channel: Channel,
    page_enabled: FeatureCount,
    dom_enabled: FeatureCount,
}

impl Session {
    pub(crate) fn new(session_id: SessionId, target_id: TargetId, link: Arc<Link>) -> Self {
        Self {
            channel: Channel::for_session(session_id.clone(), link),
            session_id,
            target_id,
            page_enabled: FeatureCount::new(),
            dom_enabled: FeatureCount::new(),
        }
    }

    /// The session id the browser assigned on attach.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The target this session is attached to.
    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    /// Send a command in this session's context and wait for its result.
    pub async fn execute<C: Command>(&self, command: C) -> Result<C::Response> {
        self.channel.execute(command).await
    }

    /// Subscribe to this session's events by wire method name.
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

    /// Enable page events for as long as the returned guard is held.
    ///
    /// Concurrent holders share one underlying `Page.enable`; the matching
    /// `Page.disable` goes out when the last holder releases.
    pub async fn page_enable(&self) -> Result<FeatureGuard<'_>> {
        FeatureGuard::acquire(self, Feature::Page).await
    }

    /// Enable DOM events for as long as the returned guard is held.
    pub async fn dom_enable(&self) -> Result<FeatureGuard<'_>> {
        FeatureGuard::acquire(self, Feature::Dom).await
    }

    fn feature_count(&self, feature: Feature) -> &FeatureCount {
        match feature {
            Feature::Page => &self.page_enabled,
            Feature::Dom => &self.dom_enabled,
        }
    }

    async fn enable_feature(&self, feature: Feature) -> Result<()> {
        match feature {
            Feature::Page => self.execute(page::enable()).await.map(drop),
            Feature::Dom => self.execute(dom::enable()).await.map(drop),
        }
    }

    async fn disable_feature(&self, feature: Feature) -> Result<()> {
        match feature {
            Feature::Page => self.execute(page::disable()).await.map(drop),
            Feature::Dom => self.execute(dom::disable()).await.map(drop),
        }
    }

    pub(crate) fn handle_message(&self, message: Message) {
        self.channel.handle_message(message)
    }

    pub(crate) fn fail_pending(&self, reason: &CloseReason) {
        self.channel.fail_pending(reason)
    }

    pub(crate) fn close_events(&self) {
        self.channel.close_events()
    }
}

#[derive(Clone, Copy, Debug)]
enum Feature {
    Page,
    Dom,
}

impl Feature {
    fn name(self) -> &'static str {
        match self {
            Feature::Page => "page",
            Feature::Dom => "dom",
        }
    }
}

struct FeatureCount {
    count: Mutex<u32>,
}

impl FeatureCount {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
        }
    }
}

/// Reference-counted enable scope returned by
/// [`Session::page_enable`]/[`Session::dom_enable`].
///
/// Call [`release`](FeatureGuard::release) when done. There is no async
/// drop; a guard dropped without release keeps its count, so the feature
/// stays enabled.
pub struct FeatureGuard<'s> {
    session: &'s Session,
    feature: Feature,
    released: bool,
}

impl<'s> FeatureGuard<'s> {
    async fn acquire(session: &'s Session, feature: Feature) -> Result<FeatureGuard<'s>> {
        let counter = session.feature_count(feature);
        // The lock is held across the enable command so a second holder
        // cannot proceed before the browser actually has the feature on.
        let mut count = counter.count.lock().await;
        *count += 1;
        if *count == 1 {
            if let Err(error) = session.enable_feature(feature).await {
                *count -= 1;
                return Err(error);
            }
        }
        drop(count);
        Ok(Self {
            session,
            feature,
            released: false,
        })
    }

    /// Drop this holder's reference; issues the disable command when it was
    /// the last one.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let counter = self.session.feature_count(self.feature);
        let mut count = counter.count.lock().await;
        *count -= 1;
        if *count == 0 {
            self.session.disable_feature(self.feature).await?;
        }
        Ok(())
    }
}

impl Drop for FeatureGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                feature = self.feature.name(),
                session_id = %self.session.session_id,
                "feature guard dropped without release; feature stays enabled"
            );
        }
    }
}
