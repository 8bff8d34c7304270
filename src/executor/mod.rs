//! Statement execution module
//!
//! This module contains the session, the two-phase plan nodes, the planner
//! with its SHOW builders and the engine that drives them.

pub mod access;
pub mod builtins;
pub mod catalog_reader;
pub mod ddl;
pub mod engine;
pub mod plan;
pub mod planner;
pub mod rows;
pub mod session;
pub mod show;
pub mod show_create;
pub mod vars;

pub use engine::{ExecutionEngine, QueryResult};
pub use plan::PlanNode;
pub use planner::Planner;
pub use rows::{Datum, MemoryMonitor, ResultColumn, RowContainer};
pub use session::{EvalContext, Session, Syntax};
