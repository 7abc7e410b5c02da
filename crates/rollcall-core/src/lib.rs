//! rollcall-core - Core library for rollcall
//!
//! This crate provides the shared types used across all rollcall components:
//! project configuration, the strongly-typed [`UnitName`], connection-target
//! resolution, checksums, and SQL identifier quoting.

pub mod checksum;
pub mod config;
pub mod error;
pub mod sql_utils;
pub mod unit_name;

pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, TargetConfig};
pub use error::{CoreError, CoreResult};
pub use unit_name::UnitName;
