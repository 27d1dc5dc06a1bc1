//! Session-scoped reference-data cache.
//!
//! Account, category and tag listings change rarely; the client memoizes
//! them for the lifetime of one authenticated session and drops everything
//! the moment a new session takes over.

pub mod reference;

pub use reference::ReferenceDataCache;
