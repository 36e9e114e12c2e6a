//! Target domain: discovery of attachable targets and session attachment.

use serde::{Deserialize, Serialize};

use crate::{Command, Event, EventKind};

/// Opaque identifier of an attachable target, assigned by the browser.
pub type TargetId = String;

/// Opaque identifier of an attached session, assigned by the browser.
pub type SessionId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TargetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

/// Retrieves a list of available targets.
#[derive(Debug, Clone, Serialize)]
pub struct GetTargets {}

pub fn get_targets() -> GetTargets {
    GetTargets {}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsReturns {
    pub target_infos: Vec<TargetInfo>,
}

impl Command for GetTargets {
    const METHOD: &'static str = "Target.getTargets";
    type Response = GetTargetsReturns;
}

/// Attaches to the target with the given id.
///
/// With `flatten` set the resulting session shares the root connection's
/// socket, tagging its traffic with the assigned session id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTarget {
    pub target_id: TargetId,
    pub flatten: bool,
}

pub fn attach_to_target(target_id: TargetId, flatten: bool) -> AttachToTarget {
    AttachToTarget { target_id, flatten }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetReturns {
    pub session_id: SessionId,
}

impl Command for AttachToTarget {
    const METHOD: &'static str = "Target.attachToTarget";
    type Response = AttachToTargetReturns;
}

/// Detaches the session with the given id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachFromTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

pub fn detach_from_target(session_id: SessionId) -> DetachFromTarget {
    DetachFromTarget {
        session_id: Some(session_id),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetachFromTargetReturns {}

impl Command for DetachFromTarget {
    const METHOD: &'static str = "Target.detachFromTarget";
    type Response = DetachFromTargetReturns;
}

/// Creates a new page target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTarget {
    pub url: String,
}

pub fn create_target(url: impl Into<String>) -> CreateTarget {
    CreateTarget { url: url.into() }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetReturns {
    pub target_id: TargetId,
}

impl Command for CreateTarget {
    const METHOD: &'static str = "Target.createTarget";
    type Response = CreateTargetReturns;
}

/// Controls whether available targets are discovered and announced via
/// `targetCreated`/`targetDestroyed` events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargets {
    pub discover: bool,
}

pub fn set_discover_targets(discover: bool) -> SetDiscoverTargets {
    SetDiscoverTargets { discover }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetDiscoverTargetsReturns {}

impl Command for SetDiscoverTargets {
    const METHOD: &'static str = "Target.setDiscoverTargets";
    type Response = SetDiscoverTargetsReturns;
}

/// Issued when a possible inspection target is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreated {
    pub target_info: TargetInfo,
}

impl EventKind for TargetCreated {
    const METHOD: &'static str = "Target.targetCreated";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::TargetCreated(event) => Some(event),
            _ => None,
        }
    }
}

/// Issued when a target is destroyed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyed {
    pub target_id: TargetId,
}

impl EventKind for TargetDestroyed {
    const METHOD: &'static str = "Target.targetDestroyed";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::TargetDestroyed(event) => Some(event),
            _ => None,
        }
    }
}

/// Issued when a session is attached, either through `attachToTarget` or
/// through auto-attach.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedToTarget {
    pub session_id: SessionId,
    pub target_info: TargetInfo,
    pub waiting_for_debugger: bool,
}

impl EventKind for AttachedToTarget {
    const METHOD: &'static str = "Target.attachedToTarget";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::TargetAttachedToTarget(event) => Some(event),
            _ => None,
        }
    }
}

/// Issued when a session is detached.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedFromTarget {
    pub session_id: SessionId,
    #[serde(default)]
    pub target_id: Option<TargetId>,
}

impl EventKind for DetachedFromTarget {
    const METHOD: &'static str = "Target.detachedFromTarget";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::TargetDetachedFromTarget(event) => Some(event),
            _ => None,
        }
    }
}
