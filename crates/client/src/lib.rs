//! An async Chrome DevTools Protocol driver.
//!
//! One WebSocket carries a root control channel plus any number of flat
//! sessions, each attached to a browser target. The [`Connection`] owns the
//! socket and its single reader task; [`Session`]s share the socket,
//! tagging their traffic with the session id. Commands are correlated to
//! responses by per-endpoint call ids, and unsolicited events fan out to
//! bounded subscriber streams.
//!
//! ```no_run
//! use tokio_cdp::cdp::{dom, page, target};
//! use tokio_cdp::Connection;
//!
//! # async fn demo() -> tokio_cdp::Result<()> {
//! let conn = Connection::connect("ws://localhost:9222/devtools/browser/abc").await?;
//! let targets = conn.execute(target::get_targets()).await?;
//! let session = conn
//!     .open_session(targets.target_infos[0].target_id.clone())
//!     .await?;
//!
//! let page_events = session.page_enable().await?;
//! let loaded = session.wait_for::<page::LoadEventFired>();
//! session.execute(page::navigate("https://example.com")).await?;
//! loaded.wait().await?;
//! page_events.release().await?;
//!
//! let document = session.execute(dom::get_document()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! There are no built-in timeouts: every suspending operation waits until
//! the matching message arrives or the connection is torn down. Wrap calls
//! in `tokio::time::timeout` where a deadline is needed.

pub mod context;
pub mod transport;

mod channel;
mod connection;
mod error;
mod events;
mod session;

pub use cdp;

pub use channel::EVENT_BUFFER;
pub use connection::Connection;
pub use error::{CloseReason, Error, Result};
pub use events::{EventStream, EventWaiter};
pub use session::{FeatureGuard, Session};
