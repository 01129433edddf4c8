//! Walks the menu portal's UI as an explicit state machine:
//! SelectHall -> SelectPeriod -> ReadTable -> ReadRow -> ReadModal.
//! Every transition is a bounded wait, and a failure at any level skips to
//! the next sibling instead of aborting the run.

use std::collections::BTreeMap;
use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, Locator};
use sqlx::PgPool;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::menu::repo::{self, MenuItemDraft};

use super::normalize;

/// Dining halls the portal is scraped for. Entries must match the dropdown
/// text exactly.
pub const DINING_HALLS: &[&str] = &[
    "United Table at International Village",
    "The Eatery at Stetson East",
];

/// Meal-period tab labels, matched against nav links verbatim. Not every
/// hall serves every period.
pub const MEAL_PERIODS: &[&str] = &["Breakfast", "Lunch", "Dinner", "Everyday"];

const WAIT_LONG: Duration = Duration::from_secs(20);
const WAIT_SHORT: Duration = Duration::from_secs(10);
const SETTLE: Duration = Duration::from_secs(2);
const SETTLE_SHORT: Duration = Duration::from_secs(1);

const HALL_DROPDOWN: &str = ".dropdown-button-content";
const HALL_OPTION: &str = ".dropdown-item";
const NAV_LINK: &str = "a.nav-link";
const MENU_TABLE: &str = "//table[@role='table']";
const MENU_ITEM_CELL: &str = r#".//td[@data-label="Menu item"]"#;
const PORTION_CELL: &str = r#".//td[@data-label="Portion"]"#;
const NUTRITION_MODAL: &str = "//div[starts-with(@id, 'nutritional-modal')]";
const MODAL_CLOSE: &str = ".//button[contains(@class, 'close')]";

/// A failure confined to one sibling of the UI walk. Logged and skipped by
/// the caller; never crosses its row/table/period/hall boundary.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("webdriver: {0}")]
    Webdriver(#[from] CmdError),

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Missing(&'static str),
}

#[derive(Debug, Default)]
pub struct ScrapeSummary {
    pub halls: usize,
    pub rows_seen: usize,
    pub items_inserted: usize,
    pub rows_skipped: usize,
}

pub struct Extractor<'a> {
    client: Client,
    db: &'a PgPool,
    summary: ScrapeSummary,
}

impl<'a> Extractor<'a> {
    pub fn new(client: Client, db: &'a PgPool) -> Self {
        Self {
            client,
            db,
            summary: ScrapeSummary::default(),
        }
    }

    /// One full batch: reset the daily index, then walk every configured
    /// hall. Errors escaping this function are fatal to the run; everything
    /// below the hall level is contained by the skip-sibling rule.
    pub async fn run(mut self, menu_url: &str) -> anyhow::Result<ScrapeSummary> {
        let cleared = repo::reset_daily_index(self.db).await?;
        info!(cleared, "daily index reset");

        self.client.goto(menu_url).await?;
        info!(url = menu_url, "navigated to menu page");

        // The hall dropdown is the page's entry point; if it never renders,
        // nothing below it can be reached.
        self.client
            .wait()
            .at_most(WAIT_LONG)
            .for_element(Locator::Css(HALL_DROPDOWN))
            .await?;

        for hall in DINING_HALLS {
            match self.scrape_hall(hall).await {
                Ok(()) => self.summary.halls += 1,
                Err(e) => warn!(hall, error = %e, "dining hall skipped"),
            }
        }
        Ok(self.summary)
    }

    /// SelectHall: reopen the dropdown and click the entry matching `hall`.
    async fn scrape_hall(&mut self, hall: &str) -> Result<(), StepError> {
        let dropdown = self.client.find(Locator::Css(HALL_DROPDOWN)).await?;
        dropdown.click().await?;
        sleep(SETTLE_SHORT).await;

        self.client
            .wait()
            .at_most(WAIT_LONG)
            .for_element(Locator::Css(HALL_OPTION))
            .await?;

        let option = self
            .find_by_text(HALL_OPTION, hall)
            .await?
            .ok_or(StepError::Missing("dining hall not in dropdown"))?;
        self.scroll_to(&option).await?;
        option.click().await?;
        sleep(SETTLE).await;

        info!(hall, "dining hall selected");

        for period in MEAL_PERIODS {
            if let Err(e) = self.scrape_period(hall, period).await {
                warn!(hall, period, error = %e, "meal period skipped");
            }
        }
        Ok(())
    }

    /// SelectPeriod: nav links are matched by exact label; a missing label
    /// is a normal condition, not an error.
    async fn scrape_period(&mut self, hall: &str, period: &str) -> Result<(), StepError> {
        self.client
            .wait()
            .at_most(WAIT_LONG)
            .for_element(Locator::Css(NAV_LINK))
            .await?;

        let xpath = format!(
            "//a[contains(@class, 'nav-link') and normalize-space(text())='{period}']"
        );
        let Some(link) = self
            .client
            .find_all(Locator::XPath(&xpath))
            .await?
            .into_iter()
            .next()
        else {
            debug!(hall, period, "no nav link for period");
            return Ok(());
        };
        self.scroll_to(&link).await?;
        link.click().await?;
        sleep(SETTLE).await;

        self.client
            .wait()
            .at_most(WAIT_SHORT)
            .for_element(Locator::XPath(MENU_TABLE))
            .await?;
        let tables = self.client.find_all(Locator::XPath(MENU_TABLE)).await?;
        info!(hall, period, tables = tables.len(), "reading menu tables");

        for (index, table) in tables.iter().enumerate() {
            if let Err(e) = self.scrape_table(hall, period, table).await {
                warn!(hall, period, index, error = %e, "table skipped");
            }
        }
        Ok(())
    }

    /// ReadTable: caption plus the tbody row collection.
    async fn scrape_table(
        &mut self,
        hall: &str,
        period: &str,
        table: &Element,
    ) -> Result<(), StepError> {
        let caption = table
            .find(Locator::Css("caption"))
            .await?
            .text()
            .await?
            .trim()
            .to_string();
        let body = table.find(Locator::Css("tbody")).await?;
        let rows = body.find_all(Locator::Css("tr")).await?;
        debug!(hall, period, caption = %caption, rows = rows.len(), "table opened");

        for (index, row) in rows.iter().enumerate() {
            self.summary.rows_seen += 1;
            if let Err(e) = self.scrape_row(hall, period, &caption, row).await {
                self.summary.rows_skipped += 1;
                warn!(hall, period, index, error = %e, "row skipped");
            }
        }
        Ok(())
    }

    /// ReadRow: the title lands in the daily index before the catalog
    /// check, so "on the menu today" holds even when the dish is already
    /// catalogued and the rest of the row is skipped.
    async fn scrape_row(
        &mut self,
        hall: &str,
        period: &str,
        caption: &str,
        row: &Element,
    ) -> Result<(), StepError> {
        let item_cell = row.find(Locator::XPath(MENU_ITEM_CELL)).await?;
        let title = item_cell
            .find(Locator::XPath(".//strong"))
            .await?
            .text()
            .await?
            .trim()
            .to_string();
        if title.is_empty() {
            return Err(StepError::Missing("row has no title"));
        }

        repo::add_daily_title(self.db, &title).await?;
        if repo::exists(self.db, &title).await? {
            debug!(%title, "already catalogued, details skipped");
            return Ok(());
        }

        let portion_size = row
            .find(Locator::XPath(PORTION_CELL))
            .await?
            .find(Locator::Css("div"))
            .await?
            .text()
            .await?
            .trim()
            .to_string();

        // Labels are collected strictly per row.
        let mut labels: Vec<String> = Vec::new();
        for img in row.find_all(Locator::Css("img")).await? {
            if let Some(src) = img.attr("src").await? {
                if let Some(label) = normalize::label_for_icon(&src) {
                    if !labels.iter().any(|l| l == label) {
                        labels.push(label.to_string());
                    }
                }
            }
        }

        let nutritional_info =
            nutrition_or_empty(self.read_modal(&item_cell).await, &title);

        let draft = MenuItemDraft {
            title: title.clone(),
            dining_hall: hall.to_string(),
            meal_period: period.to_string(),
            table_caption: caption.to_string(),
            portion_size,
            nutritional_info,
            labels,
        };
        if repo::upsert_if_absent(self.db, &draft).await? {
            self.summary.items_inserted += 1;
            info!(%title, hall, period, "menu item catalogued");
        }
        Ok(())
    }

    /// ReadModal: opens the row's nutrition overlay and reads its key-value
    /// list line by line. Once the overlay is on screen a close is always
    /// attempted; a failed close discards the facts, since a lingering
    /// overlay would swallow every later click on the page.
    async fn read_modal(
        &self,
        item_cell: &Element,
    ) -> Result<BTreeMap<String, String>, StepError> {
        let button = item_cell.find(Locator::XPath(".//button")).await?;
        self.scroll_to(&button).await?;
        sleep(SETTLE_SHORT).await;
        button.click().await?;

        let modal = self
            .client
            .wait()
            .at_most(WAIT_SHORT)
            .for_element(Locator::XPath(NUTRITION_MODAL))
            .await?;
        sleep(SETTLE_SHORT).await;

        let lines = self.modal_lines(&modal).await;
        let closed = Self::close_modal(&modal).await;

        let mut info = BTreeMap::new();
        for line in lines? {
            match normalize::parse_nutrition_line(&line) {
                Some((name, amount)) => {
                    info.insert(name, amount);
                }
                None => debug!(line = %line, "unparsable nutrition line dropped"),
            }
        }
        closed?;
        sleep(SETTLE_SHORT).await;
        Ok(info)
    }

    async fn modal_lines(&self, modal: &Element) -> Result<Vec<String>, StepError> {
        let list = modal.find(Locator::Css("ul")).await?;
        let mut lines = Vec::new();
        for entry in list.find_all(Locator::Css("li")).await? {
            lines.push(entry.text().await?);
        }
        Ok(lines)
    }

    async fn close_modal(modal: &Element) -> Result<(), StepError> {
        modal.find(Locator::XPath(MODAL_CLOSE)).await?.click().await?;
        Ok(())
    }

    /// The portal only reacts to clicks on elements inside the viewport.
    async fn scroll_to(&self, element: &Element) -> Result<(), StepError> {
        self.client
            .execute(
                "arguments[0].scrollIntoView(true);",
                vec![serde_json::to_value(element)?],
            )
            .await?;
        Ok(())
    }
}

/// A modal failure still yields a servable row: title and portion are kept,
/// nutrition stays absent.
fn nutrition_or_empty(
    result: Result<BTreeMap<String, String>, StepError>,
    title: &str,
) -> BTreeMap<String, String> {
    match result {
        Ok(info) => info,
        Err(e) => {
            warn!(%title, error = %e, "nutrition modal failed, recording row without facts");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_failure_leaves_nutrition_empty() {
        let failed: Result<BTreeMap<String, String>, StepError> =
            Err(StepError::Missing("modal never appeared"));
        assert!(nutrition_or_empty(failed, "Grilled Chicken").is_empty());
    }

    #[test]
    fn modal_success_keeps_parsed_facts() {
        let mut info = BTreeMap::new();
        info.insert("Calories".to_string(), "150 calories".to_string());
        let ok: Result<BTreeMap<String, String>, StepError> = Ok(info.clone());
        assert_eq!(nutrition_or_empty(ok, "Grilled Chicken"), info);
    }
}
