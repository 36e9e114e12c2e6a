//! Browser domain: version info and browser lifecycle.

use serde::{Deserialize, Serialize};

use crate::Command;

/// Returns version information.
#[derive(Debug, Clone, Serialize)]
pub struct GetVersion {}

pub fn get_version() -> GetVersion {
    GetVersion {}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionReturns {
    pub protocol_version: String,
    pub product: String,
    pub revision: String,
    pub user_agent: String,
    pub js_version: String,
}

impl Command for GetVersion {
    const METHOD: &'static str = "Browser.getVersion";
    type Response = GetVersionReturns;
}

/// Closes the browser gracefully.
#[derive(Debug, Clone, Serialize)]
pub struct Close {}

pub fn close() -> Close {
    Close {}
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseReturns {}

impl Command for Close {
    const METHOD: &'static str = "Browser.close";
    type Response = CloseReturns;
}
