//! Transactions: the paginated listing shape, query options, and the
//! mutation payloads.
//!
//! The backend renders transactions for a browser, so amounts arrive as
//! display strings ("$1,234.56") and dates in the current year arrive
//! without one ("Feb 23"). The listing keeps those fields raw and offers
//! the same mechanical cleanup the transaction page itself performs.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One transaction row from the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Display date, either "m/d/yy" or "Feb 23" for the current year.
    pub date: String,
    /// Original (pre-edit) date in the same display format.
    #[serde(default)]
    pub odate: Option<String>,
    #[serde(default)]
    pub merchant: String,
    /// Display amount, e.g. "$1,234.56"; sign comes from `isDebit`.
    pub amount: String,
    #[serde(rename = "isDebit", default)]
    pub is_debit: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "categoryId", default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(rename = "isPending", default)]
    pub is_pending: bool,
}

impl Transaction {
    /// Amount as a signed number: debits negative, credits positive.
    pub fn signed_amount(&self) -> Option<f64> {
        let digits: String = self
            .amount
            .trim()
            .trim_start_matches('$')
            .replace(',', "");
        let value: f64 = digits.parse().ok()?;
        Some(if self.is_debit { -value } else { value })
    }

    /// Rewrite current-year dates ("Feb 23") as "m/d/yy" in place, using
    /// `today` for the implied year. Dates already carrying a year pass
    /// through untouched.
    pub fn normalize_dates(&mut self, today: NaiveDate) {
        self.date = normalize_display_date(&self.date, today);
        if let Some(odate) = &self.odate {
            self.odate = Some(normalize_display_date(odate, today));
        }
    }
}

/// "Feb 23" -> "02/23/26" (for a `today` in 2026); anything containing a
/// slash is assumed already normalized. Unparseable input passes through.
fn normalize_display_date(raw: &str, today: NaiveDate) -> String {
    if raw.contains('/') {
        return raw.to_string();
    }
    let with_year = format!("{} {}", raw.trim(), today.format("%Y"));
    match NaiveDate::parse_from_str(&with_year, "%b %d %Y") {
        Ok(date) => date.format("%m/%d/%y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Sort orders supported by the listing endpoint, with the backend's
/// comparator codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionSort {
    MerchantAscending,
    CategoryAscending,
    AmountDescending,
    DateAscending,
    MerchantDescending,
    CategoryDescending,
    AmountAscending,
    #[default]
    DateDescending,
}

impl TransactionSort {
    pub(crate) fn comparable_type(self) -> u8 {
        match self {
            TransactionSort::MerchantAscending => 1,
            TransactionSort::CategoryAscending => 2,
            TransactionSort::AmountDescending => 3,
            TransactionSort::DateAscending => 4,
            TransactionSort::MerchantDescending => 5,
            TransactionSort::CategoryDescending => 6,
            TransactionSort::AmountAscending => 7,
            TransactionSort::DateDescending => 8,
        }
    }
}

/// Options for [`crate::MintClient::get_transactions`].
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    /// Include investment accounts; when false the listing is restricted
    /// to cash transactions.
    pub include_investment: bool,
    pub sort: TransactionSort,
    pub offset: usize,
    /// Stop after this many rows; `None` fetches every page. Fetching all
    /// transactions is slow on large accounts.
    pub limit: Option<usize>,
    /// Apply date/amount display cleanup to the returned rows.
    pub clean: bool,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            include_investment: true,
            sort: TransactionSort::default(),
            offset: 0,
            limit: None,
            clean: true,
        }
    }
}

/// Edit payload for an existing transaction. Unset fields stay unchanged;
/// tags map to explicit on/off toggles, and tags absent from the map are
/// left alone.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub note: Option<String>,
    pub date: Option<NaiveDate>,
    pub tags: HashMap<String, bool>,
}

/// A new cash transaction. A negative amount creates an expense, a
/// positive one an income.
#[derive(Debug, Clone)]
pub struct CashTransaction {
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub note: Option<String>,
    pub date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl CashTransaction {
    pub fn new(description: impl Into<String>, amount: f64) -> Self {
        Self {
            description: description.into(),
            amount,
            category_id: None,
            category_name: None,
            note: None,
            date: None,
            tags: Vec::new(),
        }
    }
}
