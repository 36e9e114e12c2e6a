//! Ambient connection/session lookup.
//!
//! Call sites that do not want to thread handles through every function can
//! install a current connection or session for the duration of a future,
//! scoped to the task tree. Single-context programs (REPL-style hosts) may
//! additionally install a process-wide fallback, settable exactly once at
//! startup; there is no mutable global.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::task_local;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::session::Session;

task_local! {
    static CURRENT_CONNECTION: Arc<Connection>;
    static CURRENT_SESSION: Arc<Session>;
}

static GLOBAL_CONNECTION: OnceLock<Arc<Connection>> = OnceLock::new();
static GLOBAL_SESSION: OnceLock<Arc<Session>> = OnceLock::new();

/// Run `future` with `connection` installed as the task's current
/// connection.
pub async fn with_connection<F>(connection: Arc<Connection>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_CONNECTION.scope(connection, future).await
}

/// Run `future` with `session` installed as the task's current session.
pub async fn with_session<F>(session: Arc<Session>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_SESSION.scope(session, future).await
}

/// The connection installed for this task, or the process-wide fallback.
pub fn current_connection() -> Result<Arc<Connection>> {
    if let Ok(connection) = CURRENT_CONNECTION.try_with(Arc::clone) {
        return Ok(connection);
    }
    GLOBAL_CONNECTION.get().cloned().ok_or_else(|| {
        Error::Context("no current connection is installed for this task".into())
    })
}

/// The session installed for this task, or the process-wide fallback.
pub fn current_session() -> Result<Arc<Session>> {
    if let Ok(session) = CURRENT_SESSION.try_with(Arc::clone) {
        return Ok(session);
    }
    GLOBAL_SESSION
        .get()
        .cloned()
        .ok_or_else(|| Error::Context("no current session is installed for this task".into()))
}

/// Install a process-wide fallback connection. Intended for single-context
/// programs; can only be set once.
pub fn set_global_connection(connection: Arc<Connection>) -> Result<()> {
    GLOBAL_CONNECTION
        .set(connection)
        .map_err(|_| Error::Context("global connection is already set".into()))
}

/// Install a process-wide fallback session. Intended for single-context
/// programs; can only be set once.
pub fn set_global_session(session: Arc<Session>) -> Result<()> {
    GLOBAL_SESSION
        .set(session)
        .map_err(|_| Error::Context("global session is already set".into()))
}
