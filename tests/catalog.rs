use std::collections::BTreeMap;

use sqlx::PgPool;

use dinehall::menu::repo::{self, MenuItemDraft};

fn draft(title: &str) -> MenuItemDraft {
    let mut nutritional_info = BTreeMap::new();
    nutritional_info.insert("Calories".to_string(), "150 calories".to_string());
    MenuItemDraft {
        title: title.to_string(),
        dining_hall: "The Eatery at Stetson East".to_string(),
        meal_period: "Lunch".to_string(),
        table_caption: "HOMESTYLE".to_string(),
        portion_size: "1 cup".to_string(),
        nutritional_info,
        labels: vec!["vegan".to_string()],
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn new_items_start_unrated(db: PgPool) {
    assert!(repo::upsert_if_absent(&db, &draft("Tomato Soup")).await.unwrap());

    let item = repo::find(&db, "Tomato Soup").await.unwrap().unwrap();
    assert_eq!(item.rating, 0.0);
    assert_eq!(item.rating_count, 0);
    assert_eq!(item.labels, vec!["vegan"]);
    assert_eq!(
        item.nutritional_info.0.get("Calories").unwrap(),
        "150 calories"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn upsert_never_overwrites_an_existing_item(db: PgPool) {
    repo::upsert_if_absent(&db, &draft("Tomato Soup")).await.unwrap();
    repo::apply_first_rating(&db, "Tomato Soup", 4.0)
        .await
        .unwrap()
        .unwrap();

    // re-scrape the same dish with different details
    let mut rescraped = draft("Tomato Soup");
    rescraped.portion_size = "2 cups".to_string();
    assert!(!repo::upsert_if_absent(&db, &rescraped).await.unwrap());

    let item = repo::find(&db, "Tomato Soup").await.unwrap().unwrap();
    assert_eq!(item.portion_size, "1 cup");
    assert_eq!(item.rating, 4.0);
    assert_eq!(item.rating_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn todays_items_joins_index_against_catalog(db: PgPool) {
    repo::upsert_if_absent(&db, &draft("A")).await.unwrap();
    repo::add_daily_title(&db, "A").await.unwrap();
    // indexed but never catalogued: must not be served
    repo::add_daily_title(&db, "B").await.unwrap();

    let today = repo::todays_items(&db).await.unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].title, "A");
}

#[sqlx::test(migrations = "./migrations")]
async fn daily_index_resets_wholesale(db: PgPool) {
    repo::upsert_if_absent(&db, &draft("A")).await.unwrap();
    repo::add_daily_title(&db, "A").await.unwrap();
    repo::add_daily_title(&db, "A").await.unwrap(); // presence only

    assert_eq!(repo::reset_daily_index(&db).await.unwrap(), 1);
    assert!(repo::todays_items(&db).await.unwrap().is_empty());

    // the catalog itself is untouched by the reset
    assert!(repo::exists(&db, "A").await.unwrap());
}
