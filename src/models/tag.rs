//! User-defined transaction tags.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    /// How often the tag has been applied; the tag service sorts by this.
    #[serde(default)]
    pub frequency: Option<i64>,
}
