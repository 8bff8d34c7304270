//! ShowDB - introspective statements over a live SQL catalog
//!
//! This library answers the descriptive statements of a SQL database:
//! - SHOW for session variables, columns, tables, databases, grants,
//!   indexes, constraints and users
//! - SHOW CREATE TABLE / VIEW, reconstructing DDL from descriptors
//! - HELP for builtin functions
//!
//! Results are produced through a two-phase plan whose columns are fixed
//! before any catalog read happens. A small DDL surface and an in-memory
//! catalog populate what the statements describe.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod transaction;

pub use config::Config;
pub use error::{Error, Result};
