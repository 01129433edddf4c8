use std::collections::BTreeMap;

use sqlx::PgPool;

use dinehall::error::AppError;
use dinehall::menu::repo::{self as menu_repo, MenuItemDraft};
use dinehall::ratings::services;
use dinehall::users::repo::{self as users_repo, Macros};

fn draft(title: &str) -> MenuItemDraft {
    MenuItemDraft {
        title: title.to_string(),
        dining_hall: "United Table at International Village".to_string(),
        meal_period: "Dinner".to_string(),
        table_caption: "CUCINA".to_string(),
        portion_size: "1 serving".to_string(),
        nutritional_info: BTreeMap::new(),
        labels: Vec::new(),
    }
}

async fn seed_item(db: &PgPool, title: &str, rating: f64, count: i64) {
    menu_repo::upsert_if_absent(db, &draft(title)).await.unwrap();
    sqlx::query("UPDATE menu_items SET rating = $2, rating_count = $3 WHERE title = $1")
        .bind(title)
        .bind(rating)
        .bind(count)
        .execute(db)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn first_time_rating_increments_aggregate_and_ledger(db: PgPool) {
    seed_item(&db, "I", 10.0, 2).await;
    users_repo::create_if_absent(&db, "u1").await.unwrap();

    let item = services::submit_rating(&db, "I", "u1", 6.0).await.unwrap();
    assert_eq!(item.rating, 16.0);
    assert_eq!(item.rating_count, 3);

    let user = users_repo::find(&db, "u1").await.unwrap().unwrap();
    assert_eq!(user.rated_food, vec!["I"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn correction_replaces_average_without_touching_count(db: PgPool) {
    seed_item(&db, "I", 16.0, 2).await;
    users_repo::create_if_absent(&db, "u1").await.unwrap();
    users_repo::mark_rated(&db, "u1", "I").await.unwrap();

    // 16 + 10 - 16/2
    let item = services::submit_rating(&db, "I", "u1", 10.0).await.unwrap();
    assert_eq!(item.rating, 18.0);
    assert_eq!(item.rating_count, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn correcting_a_never_rated_item_is_not_found(db: PgPool) {
    seed_item(&db, "I", 0.0, 0).await;
    users_repo::create_if_absent(&db, "u1").await.unwrap();
    users_repo::mark_rated(&db, "u1", "I").await.unwrap();

    let err = services::submit_rating(&db, "I", "u1", 4.0).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // the never-rated invariant survives the attempt
    let item = menu_repo::find(&db, "I").await.unwrap().unwrap();
    assert_eq!(item.rating, 0.0);
    assert_eq!(item.rating_count, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn rating_requires_an_existing_user_and_item(db: PgPool) {
    seed_item(&db, "I", 0.0, 0).await;

    let err = services::submit_rating(&db, "I", "ghost", 4.0).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    users_repo::create_if_absent(&db, "u1").await.unwrap();
    let err = services::submit_rating(&db, "missing", "u1", 4.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_submissions_do_not_mutate(db: PgPool) {
    seed_item(&db, "I", 10.0, 2).await;
    users_repo::create_if_absent(&db, "u1").await.unwrap();

    let err = services::submit_rating(&db, "", "u1", 4.0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = services::submit_rating(&db, "I", "u1", 42.0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let item = menu_repo::find(&db, "I").await.unwrap().unwrap();
    assert_eq!(item.rating, 10.0);
    assert_eq!(item.rating_count, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn ledger_append_is_at_most_once(db: PgPool) {
    users_repo::create_if_absent(&db, "u1").await.unwrap();
    users_repo::mark_rated(&db, "u1", "I").await.unwrap();
    users_repo::mark_rated(&db, "u1", "I").await.unwrap();

    let user = users_repo::find(&db, "u1").await.unwrap().unwrap();
    assert_eq!(user.rated_food, vec!["I"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn macro_log_accumulates_scaled_amounts(db: PgPool) {
    users_repo::create_if_absent(&db, "u1").await.unwrap();

    let mut info = BTreeMap::new();
    info.insert("Calories".to_string(), "150 calories".to_string());
    info.insert("Protein (g)".to_string(), "less than 1 gram".to_string());

    let macros = services::log_macros(&db, "u1", 2.0, &info).await.unwrap();
    assert_eq!(macros.calories, 300);
    assert_eq!(macros.protein, 0);
    assert_eq!(macros.carbs, 0);
    assert_eq!(macros.fat, 0);

    // a second log keeps accumulating
    let macros = services::log_macros(&db, "u1", 1.0, &info).await.unwrap();
    assert_eq!(macros.calories, 450);
}

#[sqlx::test(migrations = "./migrations")]
async fn macro_accumulators_clamp_at_zero(db: PgPool) {
    users_repo::create_if_absent(&db, "u1").await.unwrap();

    let delta = Macros {
        calories: -1000,
        protein: -5,
        carbs: -1,
        fat: -1,
    };
    let totals = users_repo::add_macros(&db, "u1", &delta).await.unwrap().unwrap();
    assert_eq!(
        totals,
        Macros {
            calories: 0,
            protein: 0,
            carbs: 0,
            fat: 0
        }
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn macro_log_and_reset_require_a_user(db: PgPool) {
    let info = BTreeMap::new();
    let err = services::log_macros(&db, "ghost", 1.0, &info).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services::reset_macros(&db, "ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn macros_reset_to_zero(db: PgPool) {
    users_repo::create_if_absent(&db, "u1").await.unwrap();

    let mut info = BTreeMap::new();
    info.insert("Calories".to_string(), "200 calories".to_string());
    services::log_macros(&db, "u1", 1.0, &info).await.unwrap();

    services::reset_macros(&db, "u1").await.unwrap();
    let user = users_repo::find(&db, "u1").await.unwrap().unwrap();
    assert_eq!(user.calories, 0);
    assert_eq!(user.protein, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn user_creation_is_idempotent(db: PgPool) {
    assert!(users_repo::create_if_absent(&db, "u1").await.unwrap());
    assert!(!users_repo::create_if_absent(&db, "u1").await.unwrap());
}
