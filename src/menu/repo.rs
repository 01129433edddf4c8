use std::collections::BTreeMap;

use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;

/// One dish as stored in the catalog. `rating` is the running sum of every
/// submitted value; `rating / rating_count` is the displayed average.
#[derive(Debug, Clone, FromRow)]
pub struct MenuItem {
    pub title: String,
    pub dining_hall: String,
    pub meal_period: String,
    pub table_caption: String,
    pub portion_size: String,
    pub nutritional_info: Json<BTreeMap<String, String>>,
    pub labels: Vec<String>,
    pub rating: f64,
    pub rating_count: i64,
    pub first_seen: OffsetDateTime,
}

/// A fully-normalized dish produced by the extractor, before it has a
/// catalog row. Nutrition amounts stay verbatim (unit tokens included).
#[derive(Debug, Clone)]
pub struct MenuItemDraft {
    pub title: String,
    pub dining_hall: String,
    pub meal_period: String,
    pub table_caption: String,
    pub portion_size: String,
    pub nutritional_info: BTreeMap<String, String>,
    pub labels: Vec<String>,
}

const ITEM_COLUMNS: &str = "title, dining_hall, meal_period, table_caption, portion_size, \
     nutritional_info, labels, rating, rating_count, first_seen";

/// Inserts a draft only if no row with this title exists. A re-scrape never
/// overwrites an existing dish: its ratings must survive. Returns whether a
/// row was inserted.
pub async fn upsert_if_absent(db: &PgPool, draft: &MenuItemDraft) -> sqlx::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO menu_items
            (title, dining_hall, meal_period, table_caption, portion_size, nutritional_info, labels)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (title) DO NOTHING
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.dining_hall)
    .bind(&draft.meal_period)
    .bind(&draft.table_caption)
    .bind(&draft.portion_size)
    .bind(Json(&draft.nutritional_info))
    .bind(&draft.labels)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn exists(db: &PgPool, title: &str) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM menu_items WHERE title = $1)")
        .bind(title)
        .fetch_one(db)
        .await
}

pub async fn find(db: &PgPool, title: &str) -> sqlx::Result<Option<MenuItem>> {
    sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items WHERE title = $1"
    ))
    .bind(title)
    .fetch_optional(db)
    .await
}

/// Wipes the Daily Index. Runs unconditionally at the start of every scrape;
/// a failure mid-run leaves a partial index, which clients read as "nothing
/// on the menu" rather than stale history.
pub async fn reset_daily_index(db: &PgPool) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM daily_menu").execute(db).await?;
    Ok(res.rows_affected())
}

pub async fn add_daily_title(db: &PgPool, title: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO daily_menu (title) VALUES ($1) ON CONFLICT (title) DO NOTHING")
        .bind(title)
        .execute(db)
        .await?;
    Ok(())
}

/// Today's servable items: the Daily Index joined onto the catalog. Titles
/// indexed without a catalog row are not served.
pub async fn todays_items(db: &PgPool) -> sqlx::Result<Vec<MenuItem>> {
    sqlx::query_as::<_, MenuItem>(
        r#"
        SELECT m.title, m.dining_hall, m.meal_period, m.table_caption, m.portion_size,
               m.nutritional_info, m.labels, m.rating, m.rating_count, m.first_seen
        FROM menu_items m
        JOIN daily_menu d ON d.title = m.title
        ORDER BY m.title
        "#,
    )
    .fetch_all(db)
    .await
}

/// First-time rating: both aggregate fields move in one atomic statement so
/// concurrent raters of the same dish cannot lose updates.
pub async fn apply_first_rating(
    db: &PgPool,
    title: &str,
    value: f64,
) -> sqlx::Result<Option<MenuItem>> {
    sqlx::query_as::<_, MenuItem>(&format!(
        r#"
        UPDATE menu_items
        SET rating = rating + $2, rating_count = rating_count + 1
        WHERE title = $1
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(title)
    .bind(value)
    .fetch_optional(db)
    .await
}

pub async fn rating_state(db: &PgPool, title: &str) -> sqlx::Result<Option<(f64, i64)>> {
    sqlx::query_as::<_, (f64, i64)>("SELECT rating, rating_count FROM menu_items WHERE title = $1")
        .bind(title)
        .fetch_optional(db)
        .await
}

/// Conditional write for the correction path: the new sum lands only if the
/// aggregate is still exactly as observed. `None` means another writer got
/// there first and the caller should re-read.
pub async fn swap_rating(
    db: &PgPool,
    title: &str,
    seen_rating: f64,
    seen_count: i64,
    new_rating: f64,
) -> sqlx::Result<Option<MenuItem>> {
    sqlx::query_as::<_, MenuItem>(&format!(
        r#"
        UPDATE menu_items
        SET rating = $4
        WHERE title = $1 AND rating = $2 AND rating_count = $3
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(title)
    .bind(seen_rating)
    .bind(seen_count)
    .bind(new_rating)
    .fetch_optional(db)
    .await
}
