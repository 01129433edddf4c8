use std::collections::BTreeMap;

use serde::Serialize;

use super::repo::MenuItem;

/// Item record as served to clients. Ledger-facing fields are camelCase at
/// the edges; item fields stay snake_case per the client contract.
#[derive(Debug, Serialize)]
pub struct TodayItem {
    pub title: String,
    pub dining_hall: String,
    pub meal_period: String,
    pub portion_size: String,
    pub nutritional_info: BTreeMap<String, String>,
    pub table_caption: String,
    pub rating: f64,
    pub rating_count: i64,
    pub labels: Vec<String>,
}

impl From<MenuItem> for TodayItem {
    fn from(item: MenuItem) -> Self {
        Self {
            title: item.title,
            dining_hall: item.dining_hall,
            meal_period: item.meal_period,
            portion_size: item.portion_size,
            nutritional_info: item.nutritional_info.0,
            table_caption: item.table_caption,
            rating: item.rating,
            rating_count: item.rating_count,
            labels: item.labels,
        }
    }
}
