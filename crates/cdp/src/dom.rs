//! DOM domain: document queries over node ids.

use serde::{Deserialize, Serialize};

use crate::{Command, Event, EventKind};

pub type NodeId = i64;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub backend_node_id: i64,
    pub node_type: i64,
    pub node_name: String,
    pub local_name: String,
    pub node_value: String,
    #[serde(default)]
    pub child_node_count: Option<i64>,
    #[serde(default)]
    pub children: Option<Vec<Node>>,
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
}

/// Enables DOM agent notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Enable {}

pub fn enable() -> Enable {
    Enable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnableReturns {}

impl Command for Enable {
    const METHOD: &'static str = "DOM.enable";
    type Response = EnableReturns;
}

/// Disables DOM agent notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Disable {}

pub fn disable() -> Disable {
    Disable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisableReturns {}

impl Command for Disable {
    const METHOD: &'static str = "DOM.disable";
    type Response = DisableReturns;
}

/// Returns the root DOM node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pierce: Option<bool>,
}

pub fn get_document() -> GetDocument {
    GetDocument {
        depth: None,
        pierce: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetDocumentReturns {
    pub root: Node,
}

impl Command for GetDocument {
    const METHOD: &'static str = "DOM.getDocument";
    type Response = GetDocumentReturns;
}

/// Executes `querySelector` on the given node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelector {
    pub node_id: NodeId,
    pub selector: String,
}

pub fn query_selector(node_id: NodeId, selector: impl Into<String>) -> QuerySelector {
    QuerySelector {
        node_id,
        selector: selector.into(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorReturns {
    pub node_id: NodeId,
}

impl Command for QuerySelector {
    const METHOD: &'static str = "DOM.querySelector";
    type Response = QuerySelectorReturns;
}

/// Returns the node's HTML markup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtml {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

pub fn get_outer_html(node_id: NodeId) -> GetOuterHtml {
    GetOuterHtml {
        node_id: Some(node_id),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetOuterHtmlReturns {
    #[serde(rename = "outerHTML")]
    pub outer_html: String,
}

impl Command for GetOuterHtml {
    const METHOD: &'static str = "DOM.getOuterHTML";
    type Response = GetOuterHtmlReturns;
}

/// Fired when the document has been totally updated; previously retrieved
/// node ids are no longer valid.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpdated {}

impl EventKind for DocumentUpdated {
    const METHOD: &'static str = "DOM.documentUpdated";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::DomDocumentUpdated(event) => Some(event),
            _ => None,
        }
    }
}

/// Fired when an element's attribute is modified.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeModified {
    pub node_id: NodeId,
    pub name: String,
    pub value: String,
}

impl EventKind for AttributeModified {
    const METHOD: &'static str = "DOM.attributeModified";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::DomAttributeModified(event) => Some(event),
            _ => None,
        }
    }
}
