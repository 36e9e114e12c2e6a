//! Stream target lifecycle events from the browser until interrupted.
//!
//! cargo run --example watch_targets -- ws://localhost:9222/devtools/browser/<uuid>

use futures_util::StreamExt;
use tokio_cdp::cdp::{target, Event, EventKind};
use tokio_cdp::Connection;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let browser_url = std::env::args()
        .nth(1)
        .ok_or("usage: watch_targets <browser ws url>")?;
    let conn = Connection::connect(&browser_url).await?;

    // Ask the browser to announce target lifecycle changes.
    conn.execute(target::set_discover_targets(true)).await?;

    let mut events = conn.listen(&[
        target::TargetCreated::METHOD,
        target::TargetDestroyed::METHOD,
    ]);
    while let Some(event) = events.next().await {
        match event {
            Event::TargetCreated(created) => {
                println!(
                    "+ {} {}",
                    created.target_info.target_id, created.target_info.url
                );
            }
            Event::TargetDestroyed(destroyed) => println!("- {}", destroyed.target_id),
            _ => {}
        }
    }

    conn.close().await;
    Ok(())
}
