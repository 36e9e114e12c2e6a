//! Chrome DevTools Protocol types.
//!
//! Wire envelopes plus a hand-maintained slice of the protocol catalog.
//! A command is a plain two-phase value: a serializable parameter struct
//! naming its wire method, paired with a deserializable response type.
//! Events decode out of the inbound envelope into one closed enum,
//! classified by method name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub mod browser;
pub mod dom;
pub mod page;
pub mod runtime;
pub mod target;

use target::SessionId;

/// Request id, monotonically increasing per endpoint.
pub type CallId = u64;

/// JSON-RPC reserved code for an unparseable payload.
pub const PARSE_ERROR: i64 = -32700;

/// A protocol command: parameters on the way out, `Response` on the way
/// back.
pub trait Command: Serialize {
    const METHOD: &'static str;
    type Response: DeserializeOwned;
}

/// A decoded protocol event type; `METHOD` is the wire name it is
/// classified by.
pub trait EventKind: Sized {
    const METHOD: &'static str;

    /// Extract this concrete type from the closed event enum.
    fn from_event(event: Event) -> Option<Self>;
}

/// Outbound request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: CallId,
    pub method: &'static str,
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Inbound response envelope; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: CallId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<BrowserError>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Inbound event envelope (carries no id).
#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Any well-formed inbound message.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(EventMessage),
}

impl Message {
    /// Top-level session tag; present when the message belongs to an
    /// attached session rather than the root connection.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::Response(response) => response.session_id.as_deref(),
            Message::Event(event) => event.session_id.as_deref(),
        }
    }
}

/// Error object reported by the browser for a specific request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "browser error {}: {}", self.code, self.message)?;
        if let Some(data) = &self.data {
            write!(f, " ({data})")?;
        }
        Ok(())
    }
}

impl std::error::Error for BrowserError {}

/// Event decode failure.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unrecognized event method {0:?}")]
    UnknownMethod(String),
    #[error("invalid {method} params: {source}")]
    InvalidParams {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded protocol event.
#[derive(Debug, Clone)]
pub enum Event {
    DomAttributeModified(dom::AttributeModified),
    DomDocumentUpdated(dom::DocumentUpdated),
    PageDomContentEventFired(page::DomContentEventFired),
    PageFrameNavigated(page::FrameNavigated),
    PageLoadEventFired(page::LoadEventFired),
    RuntimeConsoleApiCalled(runtime::ConsoleApiCalled),
    RuntimeExecutionContextCreated(runtime::ExecutionContextCreated),
    TargetAttachedToTarget(target::AttachedToTarget),
    TargetDetachedFromTarget(target::DetachedFromTarget),
    TargetCreated(target::TargetCreated),
    TargetDestroyed(target::TargetDestroyed),
}

impl Event {
    /// The wire method name this event arrived under.
    pub fn method(&self) -> &'static str {
        match self {
            Event::DomAttributeModified(_) => "DOM.attributeModified",
            Event::DomDocumentUpdated(_) => "DOM.documentUpdated",
            Event::PageDomContentEventFired(_) => "Page.domContentEventFired",
            Event::PageFrameNavigated(_) => "Page.frameNavigated",
            Event::PageLoadEventFired(_) => "Page.loadEventFired",
            Event::RuntimeConsoleApiCalled(_) => "Runtime.consoleAPICalled",
            Event::RuntimeExecutionContextCreated(_) => "Runtime.executionContextCreated",
            Event::TargetAttachedToTarget(_) => "Target.attachedToTarget",
            Event::TargetDetachedFromTarget(_) => "Target.detachedFromTarget",
            Event::TargetCreated(_) => "Target.targetCreated",
            Event::TargetDestroyed(_) => "Target.targetDestroyed",
        }
    }
}

fn event_params<E: DeserializeOwned>(message: &EventMessage) -> Result<E, EventError> {
    // Some events arrive with no params member at all.
    let params = match &message.params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(params).map_err(|source| EventError::InvalidParams {
        method: message.method.clone(),
        source,
    })
}

/// Decode an event envelope into a typed event, classified by method.
pub fn parse_event(message: &EventMessage) -> Result<Event, EventError> {
    let event = match message.method.as_str() {
        "DOM.attributeModified" => Event::DomAttributeModified(event_params(message)?),
        "DOM.documentUpdated" => Event::DomDocumentUpdated(event_params(message)?),
        "Page.domContentEventFired" => Event::PageDomContentEventFired(event_params(message)?),
        "Page.frameNavigated" => Event::PageFrameNavigated(event_params(message)?),
        "Page.loadEventFired" => Event::PageLoadEventFired(event_params(message)?),
        "Runtime.consoleAPICalled" => Event::RuntimeConsoleApiCalled(event_params(message)?),
        "Runtime.executionContextCreated" => {
            Event::RuntimeExecutionContextCreated(event_params(message)?)
        }
        "Target.attachedToTarget" => Event::TargetAttachedToTarget(event_params(message)?),
        "Target.detachedFromTarget" => Event::TargetDetachedFromTarget(event_params(message)?),
        "Target.targetCreated" => Event::TargetCreated(event_params(message)?),
        "Target.targetDestroyed" => Event::TargetDestroyed(event_params(message)?),
        _ => return Err(EventError::UnknownMethod(message.method.clone())),
    };
    Ok(event)
}
