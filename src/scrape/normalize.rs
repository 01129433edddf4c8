//! Pure conversions between the portal's raw strings and typed fields.

const VEGAN_ICON: &str = "https://www.nudining.com/img/icon_vegetarian.png";
const GLUTEN_ICON: &str = "https://nudining.com/img/icon_avoiding_gluten.png";
const PROTEIN_ICON: &str = "https://nudining.com/img/icon_protein.png";

/// Splits one modal line into a nutrient name and its verbatim amount.
/// Split happens on the first separator; the amount keeps its unit token,
/// numeric parsing is deferred to consumers. Lines without a separator, or
/// with an empty side, are dropped by returning None.
pub fn parse_nutrition_line(line: &str) -> Option<(String, String)> {
    let (name, amount) = line.split_once(':')?;
    let name = name.trim();
    let amount = amount.trim();
    if name.is_empty() || amount.is_empty() {
        return None;
    }
    Some((name.to_string(), amount.to_string()))
}

/// Maps a label icon URL onto the fixed label vocabulary. Matching is exact
/// string equality against the three icons the portal uses.
pub fn label_for_icon(src: &str) -> Option<&'static str> {
    match src {
        VEGAN_ICON => Some("vegan"),
        GLUTEN_ICON => Some("gluten"),
        PROTEIN_ICON => Some("protein"),
        _ => None,
    }
}
