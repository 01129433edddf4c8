pub mod extractor;
pub mod normalize;

use anyhow::Context;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::ScrapeConfig;

use self::extractor::{Extractor, ScrapeSummary};

async fn connect(config: &ScrapeConfig) -> anyhow::Result<Client> {
    let mut caps = serde_json::Map::new();
    if config.headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--window-size=1400,1000"] }),
        );
    }
    ClientBuilder::native()
        .capabilities(caps)
        .connect(&config.webdriver_url)
        .await
        .context("webdriver session")
}

/// Runs one full scrape batch. The browser session is torn down on every
/// exit path before the traversal outcome propagates.
pub async fn run(db: &PgPool, config: &ScrapeConfig) -> anyhow::Result<ScrapeSummary> {
    let client = connect(config).await?;

    let outcome = Extractor::new(client.clone(), db).run(&config.menu_url).await;

    if let Err(e) = client.close().await {
        warn!(error = %e, "webdriver session close failed");
    }

    let summary = outcome?;
    info!(
        halls = summary.halls,
        rows = summary.rows_seen,
        inserted = summary.items_inserted,
        skipped = summary.rows_skipped,
        "scrape complete"
    );
    Ok(summary)
}
