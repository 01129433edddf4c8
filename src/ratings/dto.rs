use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::menu::dto::TodayItem;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub title: String,
    pub uid: String,
    pub value: f64,
}

/// Post-update item state, with the derived average the client displays.
#[derive(Debug, Serialize)]
pub struct RatedItemResponse {
    #[serde(flatten)]
    pub item: TodayItem,
    pub average_rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMacrosRequest {
    pub uid: String,
    pub serving_size: f64,
    pub food_item: FoodItemBody,
}

/// The client sends back the whole item it was served; only the raw
/// nutrition mapping matters here. Item fields are snake_case on the wire.
#[derive(Debug, Deserialize)]
pub struct FoodItemBody {
    #[serde(default, alias = "nutritionalInfo")]
    pub nutritional_info: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetMacrosRequest {
    pub uid: String,
}
