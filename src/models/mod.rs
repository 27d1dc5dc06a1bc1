//! Data models for backend entities.
//!
//! This module contains the structures used to represent backend data:
//!
//! - `Account`: linked financial accounts
//! - `Category`, `CategoryRef`: the spending category tree
//! - `Tag`: user-defined transaction tags
//! - `Transaction` plus `TransactionQuery`/`TransactionEdit`/
//!   `CashTransaction`: the listing shape and its query/mutation options

pub mod account;
pub mod category;
pub mod tag;
pub mod transaction;

pub use account::Account;
pub use category::{Category, CategoryRef};
pub use tag::Tag;
pub use transaction::{
    CashTransaction, Transaction, TransactionEdit, TransactionQuery, TransactionSort,
};
