/// Smoke-test for `ChromiumSession`.
///
/// Launches a headless Chromium, opens <https://example.com>, and checks the
/// session primitives the inspectors rely on: element queries, computed
/// styles, text, console capture and screenshots.
///
/// Run with:
///   cargo run --example browser_smoke --features browser
use argus_client::{ChromiumSession, LaunchOptions};
use argus_core::traits::BrowserSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let session = ChromiumSession::launch(&LaunchOptions::default()).await?;

    let result = exercise(&session).await;
    session.close().await?;
    result
}

async fn exercise(session: &ChromiumSession) -> anyhow::Result<()> {
    let url = "https://example.com";
    println!("Navigating to {url} …");
    session.navigate(url).await?;

    let heading = session
        .query_selector("h1")
        .await?
        .ok_or_else(|| anyhow::anyhow!("Expected <h1> not found"))?;
    let text = session.text(&heading).await?;
    assert_eq!(text.trim(), "Example Domain");

    let font_size = session.computed_style(&heading, "font-size").await?;
    assert!(font_size.ends_with("px"), "unexpected font-size {font_size}");

    let links = session.query_selector_all("a").await?;
    assert!(!links.is_empty(), "Expected at least one link");
    let href = session.attribute(&links[0], "href").await?;
    println!("First link: {href:?}");

    let html = session.page_source().await?;
    assert!(html.len() > 500, "HTML suspiciously short ({} bytes)", html.len());

    let console = session.console_log().await?;
    println!("Console entries: {}", console.len());

    let shot = std::env::temp_dir().join("argus-browser-smoke.png");
    session.screenshot(&shot).await?;
    assert!(std::fs::metadata(&shot)?.len() > 0);

    println!("OK: h1 font-size {font_size}, screenshot at {}", shot.display());
    Ok(())
}
