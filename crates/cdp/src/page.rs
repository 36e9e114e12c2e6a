//! Page domain: navigation, screenshots, and page lifecycle events.

use serde::{Deserialize, Serialize};

use crate::{Command, Event, EventKind};

pub type FrameId = String;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    #[serde(default)]
    pub parent_id: Option<FrameId>,
    pub url: String,
    #[serde(default)]
    pub security_origin: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Enables page domain notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Enable {}

pub fn enable() -> Enable {
    Enable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnableReturns {}

impl Command for Enable {
    const METHOD: &'static str = "Page.enable";
    type Response = EnableReturns;
}

/// Disables page domain notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Disable {}

pub fn disable() -> Disable {
    Disable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisableReturns {}

impl Command for Disable {
    const METHOD: &'static str = "Page.disable";
    type Response = DisableReturns;
}

/// Navigates the current page to the given URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

pub fn navigate(url: impl Into<String>) -> Navigate {
    Navigate {
        url: url.into(),
        referrer: None,
        transition_type: None,
        frame_id: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    pub frame_id: FrameId,
    #[serde(default)]
    pub loader_id: Option<String>,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl Command for Navigate {
    const METHOD: &'static str = "Page.navigate";
    type Response = NavigateReturns;
}

/// Reloads the current page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
}

pub fn reload() -> Reload {
    Reload { ignore_cache: None }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReloadReturns {}

impl Command for Reload {
    const METHOD: &'static str = "Page.reload";
    type Response = ReloadReturns;
}

/// Captures a screenshot of the viewport; the result is a base64 blob, so
/// transports need a generous maximum message size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_surface: Option<bool>,
}

pub fn capture_screenshot(format: impl Into<String>) -> CaptureScreenshot {
    CaptureScreenshot {
        format: Some(format.into()),
        quality: None,
        from_surface: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureScreenshotReturns {
    pub data: String,
}

impl Command for CaptureScreenshot {
    const METHOD: &'static str = "Page.captureScreenshot";
    type Response = CaptureScreenshotReturns;
}

/// Fired when the page's load event has been dispatched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadEventFired {
    pub timestamp: f64,
}

impl EventKind for LoadEventFired {
    const METHOD: &'static str = "Page.loadEventFired";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::PageLoadEventFired(event) => Some(event),
            _ => None,
        }
    }
}

/// Fired when the DOMContentLoaded event has been dispatched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomContentEventFired {
    pub timestamp: f64,
}

impl EventKind for DomContentEventFired {
    const METHOD: &'static str = "Page.domContentEventFired";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::PageDomContentEventFired(event) => Some(event),
            _ => None,
        }
    }
}

/// Fired once navigation of the frame has completed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigated {
    pub frame: Frame,
}

impl EventKind for FrameNavigated {
    const METHOD: &'static str = "Page.frameNavigated";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::PageFrameNavigated(event) => Some(event),
            _ => None,
        }
    }
}
