use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Ledger row for one user: which titles they have rated (at most once
/// each) and their running macro accumulators.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub uid: String,
    pub rated_food: Vec<String>,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
    pub created_at: OffsetDateTime,
}

/// The four tracked nutrient totals. Also reused as a delta when applying a
/// macro log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct Macros {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

/// Idempotent create. Returns true when a row was inserted, false when the
/// uid already existed.
pub async fn create_if_absent(db: &PgPool, uid: &str) -> sqlx::Result<bool> {
    let res = sqlx::query("INSERT INTO users (uid) VALUES ($1) ON CONFLICT (uid) DO NOTHING")
        .bind(uid)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn find(db: &PgPool, uid: &str) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(
        "SELECT uid, rated_food, calories, protein, carbs, fat, created_at \
         FROM users WHERE uid = $1",
    )
    .bind(uid)
    .fetch_optional(db)
    .await
}

/// Appends a title to the rated log. The predicate keeps the append
/// at-most-once even when two first-time ratings race.
pub async fn mark_rated(db: &PgPool, uid: &str, title: &str) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE users SET rated_food = array_append(rated_food, $2) \
         WHERE uid = $1 AND NOT ($2 = ANY(rated_food))",
    )
    .bind(uid)
    .bind(title)
    .execute(db)
    .await?;
    Ok(())
}

/// Applies a macro delta in one atomic statement, clamping every
/// accumulator at zero. Returns the new totals, or None for an unknown uid.
pub async fn add_macros(db: &PgPool, uid: &str, delta: &Macros) -> sqlx::Result<Option<Macros>> {
    sqlx::query_as::<_, Macros>(
        r#"
        UPDATE users
        SET calories = GREATEST(0, calories + $2),
            protein  = GREATEST(0, protein + $3),
            carbs    = GREATEST(0, carbs + $4),
            fat      = GREATEST(0, fat + $5)
        WHERE uid = $1
        RETURNING calories, protein, carbs, fat
        "#,
    )
    .bind(uid)
    .bind(delta.calories)
    .bind(delta.protein)
    .bind(delta.carbs)
    .bind(delta.fat)
    .fetch_optional(db)
    .await
}

/// Zeroes all four accumulators. Returns false for an unknown uid.
pub async fn reset_macros(db: &PgPool, uid: &str) -> sqlx::Result<bool> {
    let res = sqlx::query("UPDATE users SET calories = 0, protein = 0, carbs = 0, fat = 0 WHERE uid = $1")
        .bind(uid)
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}
