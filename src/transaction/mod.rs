//! Transaction module
//!
//! Transaction lifecycle and snapshot reads of the catalog.

pub mod transaction;

pub use transaction::{
    IsolationLevel, Transaction, TransactionManager, TransactionState, UserPriority,
};
