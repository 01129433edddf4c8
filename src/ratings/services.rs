//! The reconciler: applies rating submissions and macro logs against the
//! catalog and the per-user ledger, keeping the aggregate invariants
//! without cross-collection transactions.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::menu::repo::{self as menu_repo, MenuItem};
use crate::users::repo::{self as users_repo, Macros};

/// Score scale accepted from clients.
pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

/// Bounded retries for the correction path's conditional write.
const SWAP_ATTEMPTS: usize = 5;

pub fn validate_rating(value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(RATING_MIN..=RATING_MAX).contains(&value) {
        return Err(AppError::Validation(format!(
            "value must be a number between {RATING_MIN} and {RATING_MAX}"
        )));
    }
    Ok(())
}

/// New running sum for a re-rate. The user's previous contribution is
/// approximated by the current population average: exact only while every
/// rater has contributed once, and drifts under repeated corrections.
/// Replacing the approximation with a per-(user, item) value ledger needs
/// product sign-off.
pub fn corrected_sum(rating: f64, rating_count: i64, value: f64) -> f64 {
    rating + value - rating / rating_count as f64
}

/// Applies one rating submission. First-time ratings increment the item
/// aggregate and append to the user's ledger; a re-rate replaces the user's
/// approximated prior contribution without touching `rating_count`.
pub async fn submit_rating(
    db: &PgPool,
    title: &str,
    uid: &str,
    value: f64,
) -> Result<MenuItem, AppError> {
    if title.is_empty() || uid.is_empty() {
        return Err(AppError::Validation("title and uid are required".into()));
    }
    validate_rating(value)?;

    let user = users_repo::find(db, uid)
        .await?
        .ok_or(AppError::NotFound("unknown user"))?;

    if user.rated_food.iter().any(|t| t == title) {
        correct_rating(db, title, value).await
    } else {
        let item = menu_repo::apply_first_rating(db, title, value)
            .await?
            .ok_or(AppError::NotFound("unknown item"))?;
        users_repo::mark_rated(db, uid, title).await?;
        debug!(%title, %uid, value, "first-time rating applied");
        Ok(item)
    }
}

/// Correction path as a compare-and-swap loop: re-read the aggregate and
/// retry when a concurrent writer moved it between our read and write.
async fn correct_rating(db: &PgPool, title: &str, value: f64) -> Result<MenuItem, AppError> {
    for attempt in 0..SWAP_ATTEMPTS {
        let (rating, rating_count) = menu_repo::rating_state(db, title)
            .await?
            .ok_or(AppError::NotFound("unknown item"))?;
        if rating_count == 0 {
            return Err(AppError::NotFound("item has no rating to correct"));
        }

        let next = corrected_sum(rating, rating_count, value);
        if let Some(item) = menu_repo::swap_rating(db, title, rating, rating_count, next).await? {
            debug!(%title, value, attempt, "rating corrected");
            return Ok(item);
        }
        warn!(%title, attempt, "correction lost a swap race, retrying");
    }
    Err(AppError::Contention)
}

lazy_static! {
    static ref LEADING_NUMBER: Regex = Regex::new(r"^\s*(\d+(?:\.\d+)?)").unwrap();
}

/// Leading numeric token of a raw amount string. Amounts are stored exactly
/// as scraped ("150 calories", "12g"), so parsing happens here, at
/// consumption time. Textual qualifiers with no leading digits ("less than
/// 1 gram") floor to zero rather than failing.
pub fn leading_number(amount: &str) -> f64 {
    LEADING_NUMBER
        .captures(amount)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

const CALORIE_KEYS: &[&str] = &["Calories"];
const PROTEIN_KEYS: &[&str] = &["Protein"];
const CARB_KEYS: &[&str] = &["Total Carbohydrate", "Carbohydrate", "Carbs"];
const FAT_KEYS: &[&str] = &["Total Fat", "Fat"];

/// Scraped nutrient names vary ("Protein (g)", "Total Fat (g)"), so each
/// tracked nutrient is located by ordered candidates: exact key first, then
/// key prefix.
fn amount_for<'a>(info: &'a BTreeMap<String, String>, candidates: &[&str]) -> Option<&'a str> {
    for cand in candidates {
        if let Some(v) = info.get(*cand) {
            return Some(v);
        }
    }
    for cand in candidates {
        if let Some((_, v)) = info.iter().find(|(k, _)| k.starts_with(cand)) {
            return Some(v);
        }
    }
    None
}

/// Per-nutrient deltas for one logged serving: leading numeric token, scaled
/// by the serving size, rounded to the nearest integer. Missing nutrients
/// contribute zero.
pub fn macro_deltas(serving_size: f64, info: &BTreeMap<String, String>) -> Macros {
    let delta = |candidates: &[&str]| -> i64 {
        amount_for(info, candidates)
            .map(|amount| (leading_number(amount) * serving_size).round() as i64)
            .unwrap_or(0)
    };
    Macros {
        calories: delta(CALORIE_KEYS),
        protein: delta(PROTEIN_KEYS),
        carbs: delta(CARB_KEYS),
        fat: delta(FAT_KEYS),
    }
}

pub async fn log_macros(
    db: &PgPool,
    uid: &str,
    serving_size: f64,
    info: &BTreeMap<String, String>,
) -> Result<Macros, AppError> {
    if uid.is_empty() {
        return Err(AppError::Validation("uid is required".into()));
    }
    if !serving_size.is_finite() || serving_size < 0.0 {
        return Err(AppError::Validation(
            "servingSize must be a non-negative number".into(),
        ));
    }

    let deltas = macro_deltas(serving_size, info);
    users_repo::add_macros(db, uid, &deltas)
        .await?
        .ok_or(AppError::NotFound("unknown user"))
}

pub async fn reset_macros(db: &PgPool, uid: &str) -> Result<(), AppError> {
    if uid.is_empty() {
        return Err(AppError::Validation("uid is required".into()));
    }
    if users_repo::reset_macros(db, uid).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("unknown user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrected_sum_replaces_the_population_average() {
        // item at sum 16 over 2 ratings (avg 8); re-rate with 10
        assert_eq!(corrected_sum(16.0, 2, 10.0), 18.0);
        // single rater correcting their own 3 to a 5
        assert_eq!(corrected_sum(3.0, 1, 5.0), 5.0);
    }

    #[test]
    fn rating_values_outside_the_scale_are_rejected() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(4.5).is_ok());
        assert!(validate_rating(10.0).is_ok());
        assert!(validate_rating(-0.5).is_err());
        assert!(validate_rating(10.5).is_err());
        assert!(validate_rating(f64::NAN).is_err());
        assert!(validate_rating(f64::INFINITY).is_err());
    }

    #[test]
    fn leading_number_floors_textual_qualifiers() {
        assert_eq!(leading_number("150 calories"), 150.0);
        assert_eq!(leading_number("12g"), 12.0);
        assert_eq!(leading_number(" 0.5 g"), 0.5);
        assert_eq!(leading_number("less than 1 gram"), 0.0);
        assert_eq!(leading_number(""), 0.0);
    }

    #[test]
    fn macro_deltas_scale_and_round_per_serving() {
        let mut info = BTreeMap::new();
        info.insert("Calories".to_string(), "150 calories".to_string());
        info.insert("Protein (g)".to_string(), "less than 1 gram".to_string());

        let deltas = macro_deltas(2.0, &info);
        assert_eq!(deltas.calories, 300);
        assert_eq!(deltas.protein, 0);
        assert_eq!(deltas.carbs, 0);
        assert_eq!(deltas.fat, 0);
    }

    #[test]
    fn nutrient_lookup_prefers_exact_then_listed_prefixes() {
        let mut info = BTreeMap::new();
        info.insert("Calories from Fat".to_string(), "90".to_string());
        info.insert("Calories".to_string(), "200 calories".to_string());
        info.insert("Saturated Fat (g)".to_string(), "3g".to_string());
        info.insert("Total Fat (g)".to_string(), "8g".to_string());

        let deltas = macro_deltas(1.0, &info);
        assert_eq!(deltas.calories, 200);
        assert_eq!(deltas.fat, 8);
    }
}
