use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        Ok(Self { database_url })
    }
}

/// Settings for the daily batch scrape. Everything except the database URL
/// has a default so the binary runs against a local chromedriver as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    pub webdriver_url: String,
    pub menu_url: String,
    pub headless: bool,
}

impl ScrapeConfig {
    pub fn from_env() -> Self {
        Self {
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".into()),
            menu_url: std::env::var("MENU_URL")
                .unwrap_or_else(|_| "https://nudining.com/public/whats-on-the-menu".into()),
            headless: std::env::var("SCRAPE_HEADLESS")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}
