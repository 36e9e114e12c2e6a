//! Print the title of a web page.
//!
//! Start a browser with `--remote-debugging-port=9222`, then run with the
//! browser's WebSocket URL and the page URL:
//!
//! cargo run --example get_title -- ws://localhost:9222/devtools/browser/<uuid> https://example.com

use std::env;

use tokio_cdp::cdp::{dom, page, target};
use tokio_cdp::Connection;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let (Some(browser_url), Some(target_url)) = (args.next(), args.next()) else {
        eprintln!("usage: get_title <browser ws url> <target url>");
        std::process::exit(1);
    };

    println!("Connecting to browser at {browser_url}");
    let conn = Connection::connect(&browser_url).await?;

    let targets = conn.execute(target::get_targets()).await?;
    let target_id = targets
        .target_infos
        .into_iter()
        .find(|info| {
            info.target_type == "page" && !info.attached && !info.url.starts_with("devtools://")
        })
        .map(|info| info.target_id)
        .ok_or("no attachable page target")?;

    println!("Attaching to target {target_id}");
    let session = conn.open_session(target_id).await?;

    let page_events = session.page_enable().await?;
    let loaded = session.wait_for::<page::LoadEventFired>();
    println!("Navigating to {target_url}");
    session.execute(page::navigate(target_url)).await?;
    loaded.wait().await?;
    page_events.release().await?;

    let document = session.execute(dom::get_document()).await?;
    let title = session
        .execute(dom::query_selector(document.root.node_id, "title"))
        .await?;
    let html = session.execute(dom::get_outer_html(title.node_id)).await?;
    println!("{}", html.outer_html);

    conn.close().await;
    Ok(())
}
