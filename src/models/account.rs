//! Linked financial accounts as reported by the account service.

use serde::{Deserialize, Serialize};

/// A linked account (bank, card, loan, investment, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "accountId", alias = "id")]
    pub id: i64,
    #[serde(rename = "accountName")]
    pub name: String,
    #[serde(rename = "accountType", default)]
    pub account_type: Option<String>,
    /// Institution the account is linked through.
    #[serde(rename = "fiName", default)]
    pub fi_name: Option<String>,
    #[serde(rename = "currentBalance", alias = "value", default)]
    pub current_balance: Option<f64>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    /// Epoch milliseconds of the last successful sync.
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<i64>,
    #[serde(rename = "lastUpdatedInString", default)]
    pub last_updated_display: Option<String>,
}
