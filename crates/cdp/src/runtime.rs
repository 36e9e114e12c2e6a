//! Runtime domain: JavaScript evaluation and console events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Command, Event, EventKind};

/// Mirror object referencing an original JavaScript object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub exception_id: i64,
    pub text: String,
    pub line_number: i64,
    pub column_number: i64,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
    pub id: i64,
    pub origin: String,
    pub name: String,
}

/// Enables reporting of execution context creation and console events.
#[derive(Debug, Clone, Serialize)]
pub struct Enable {}

pub fn enable() -> Enable {
    Enable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnableReturns {}

impl Command for Enable {
    const METHOD: &'static str = "Runtime.enable";
    type Response = EnableReturns;
}

#[derive(Debug, Clone, Serialize)]
pub struct Disable {}

pub fn disable() -> Disable {
    Disable {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisableReturns {}

impl Command for Disable {
    const METHOD: &'static str = "Runtime.disable";
    type Response = DisableReturns;
}

/// Evaluates an expression on the global object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluate {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
}

pub fn evaluate(expression: impl Into<String>) -> Evaluate {
    Evaluate {
        expression: expression.into(),
        return_by_value: None,
        await_promise: None,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateReturns {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

impl Command for Evaluate {
    const METHOD: &'static str = "Runtime.evaluate";
    type Response = EvaluateReturns;
}

/// Issued when the console API is called.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleApiCalled {
    #[serde(rename = "type")]
    pub call_type: String,
    pub args: Vec<RemoteObject>,
    pub execution_context_id: i64,
    pub timestamp: f64,
}

impl EventKind for ConsoleApiCalled {
    const METHOD: &'static str = "Runtime.consoleAPICalled";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::RuntimeConsoleApiCalled(event) => Some(event),
            _ => None,
        }
    }
}

/// Issued when a new execution context is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextCreated {
    pub context: ExecutionContextDescription,
}

impl EventKind for ExecutionContextCreated {
    const METHOD: &'static str = "Runtime.executionContextCreated";

    fn from_event(event: Event) -> Option<Self> {
        match event {
            Event::RuntimeExecutionContextCreated(event) => Some(event),
            _ => None,
        }
    }
}
