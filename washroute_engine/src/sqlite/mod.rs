//! SQLite backend for the WashRoute ledger.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
