use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use dinehall::config::{AppConfig, ScrapeConfig};
use dinehall::scrape;

/// Daily batch entrypoint. Exits non-zero only on fatal extraction errors;
/// skipped halls, periods, tables and rows are logged and absorbed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "dinehall=info,scrape=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let app = AppConfig::from_env()?;
    let config = ScrapeConfig::from_env();

    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&app.database_url)
        .await
        .context("connect to database")?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing with existing schema");
    }

    info!(url = %config.menu_url, "starting menu scrape");
    scrape::run(&db, &config).await?;
    Ok(())
}
