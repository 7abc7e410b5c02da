//! rollcall-db - Database layer for rollcall
//!
//! This crate provides the `Database` trait that forward actions run against,
//! the `RecordStore` trait holding applied records and the run lock, and a
//! DuckDB implementation of both.

pub mod connector;
pub mod duckdb;
pub mod error;
pub mod record;
pub mod traits;

pub use connector::{Connector, DuckDbConnector, StoreHandle};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use record::{AppliedRecord, LockAttempt, LockInfo};
pub use traits::{Database, RecordStore};
