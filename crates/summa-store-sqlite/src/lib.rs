//! SQLite backend for the Summa summary store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Writes run in `BEGIN IMMEDIATE`
//! transactions and are retried a bounded number of times when another
//! connection holds the write lock.

mod encode;
mod options;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use options::SqliteOptions;
pub use store::SqliteStore;
