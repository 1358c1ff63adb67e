//! SQLite backend for the Fledge registration store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The payment-reference uniqueness
//! invariant lives here, as a UNIQUE constraint on the `registrations` table.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
