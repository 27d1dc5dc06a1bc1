//! Spending categories from the category tree service.

use serde::{Deserialize, Serialize};

/// A spending category. Names are unique only within a parent, so lookups
/// by name may need the parent to disambiguate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent: Option<CategoryRef>,
    #[serde(rename = "categoryType", default)]
    pub category_type: Option<String>,
}

/// Parent reference embedded in a category node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}
