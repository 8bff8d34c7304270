//! Session variables
//!
//! The registry maps upper-case variable names to accessors over the
//! planner's session and transaction. It is built once and never changes;
//! `SHOW ALL` lists it in name order.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::planner::Planner;
use super::session::{Session, Syntax};
use crate::catalog::CatalogState;
use crate::error::{Error, Result};
use crate::sql::ast::{Expr, Literal, SetStatement};
use crate::transaction::IsolationLevel;

/// Largest number of columns an index key may have
pub const MAX_INDEX_KEYS: usize = 32;

type VarAccessor = fn(&Planner) -> String;

fn registry() -> &'static BTreeMap<&'static str, VarAccessor> {
    static VARIABLES: OnceLock<BTreeMap<&'static str, VarAccessor>> = OnceLock::new();
    VARIABLES.get_or_init(|| {
        let entries: [(&'static str, VarAccessor); 8] = [
            ("DATABASE", |p| p.session().database.clone()),
            ("DEFAULT_TRANSACTION_ISOLATION", |p| {
                p.session().default_isolation.to_string()
            }),
            ("MAX_INDEX_KEYS", |_| MAX_INDEX_KEYS.to_string()),
            ("SEARCH_PATH", |p| p.session().search_path.join(", ")),
            ("SYNTAX", |p| p.session().syntax.to_string()),
            ("TIME ZONE", |p| p.session().time_zone.clone()),
            ("TRANSACTION ISOLATION LEVEL", |p| {
                p.txn().isolation().to_string()
            }),
            ("TRANSACTION PRIORITY", |p| p.txn().priority().to_string()),
        ];
        entries.into_iter().collect()
    })
}

/// Accessor for `name`, matched case-insensitively
pub fn lookup(name: &str) -> Option<VarAccessor> {
    registry().get(name.to_uppercase().as_str()).copied()
}

/// Every variable name with its accessor, ascending
pub fn all() -> impl Iterator<Item = (&'static str, VarAccessor)> {
    registry().iter().map(|(name, accessor)| (*name, *accessor))
}

// ========== SET ==========

fn expr_to_word(name: &str, expr: &Expr) -> Result<String> {
    match expr {
        Expr::Column(c) if c.table.is_none() => Ok(c.column.clone()),
        Expr::Literal(Literal::String(s)) => Ok(s.clone()),
        other => Err(Error::Unsupported(format!("value {} for {}", other, name))),
    }
}

fn single_value(name: &str, set: &SetStatement) -> Result<String> {
    match set.values.as_slice() {
        [value] => expr_to_word(name, value),
        _ => Err(Error::Unsupported(format!(
            "{} with {} values",
            name,
            set.values.len()
        ))),
    }
}

/// Apply `SET <name> = <values>` to `session`
pub fn apply_set(session: &mut Session, state: &CatalogState, set: &SetStatement) -> Result<()> {
    let name = set.name.to_uppercase();
    match name.as_str() {
        "DATABASE" => {
            let database = single_value(&name, set)?;
            if !database.is_empty() && state.database(&database).is_none() {
                return Err(Error::UndefinedDatabase(database));
            }
            session.database = database;
        }
        "SYNTAX" => {
            let value = single_value(&name, set)?;
            session.syntax = Syntax::parse(&value)
                .ok_or_else(|| Error::Unsupported(format!("syntax {}", value)))?;
        }
        "TIME ZONE" => session.time_zone = single_value(&name, set)?,
        "SEARCH_PATH" => {
            session.search_path = set
                .values
                .iter()
                .map(|v| expr_to_word(&name, v))
                .collect::<Result<_>>()?;
        }
        "DEFAULT_TRANSACTION_ISOLATION" => {
            let value = single_value(&name, set)?;
            session.default_isolation = IsolationLevel::parse(&value)
                .ok_or_else(|| Error::Unsupported(format!("isolation level {}", value)))?;
        }
        _ if lookup(&name).is_some() => {
            return Err(Error::Unsupported(format!("SET {}", name)));
        }
        _ => return Err(Error::UnknownVariable(name)),
    }
    Ok(())
}
