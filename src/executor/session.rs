//! Session state and the per-statement evaluation context
//!
//! [`Session`] is owned by the engine and changed only by SET statements.
//! [`EvalContext`] is the copy a single statement works against; its
//! current database and privilege checking can be overridden for a scope
//! through RAII guards that restore the previous value when dropped.

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::trace;

use crate::catalog::ROOT_USER;
use crate::transaction::IsolationLevel;

/// SQL syntax mode reported by `SHOW SYNTAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Traditional,
    Modern,
}

impl Syntax {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "traditional" => Some(Syntax::Traditional),
            "modern" => Some(Syntax::Modern),
            _ => None,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Traditional => write!(f, "Traditional"),
            Syntax::Modern => write!(f, "Modern"),
        }
    }
}

/// Per-connection session settings
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Current database; empty when none is selected
    pub database: String,
    /// Authenticated principal
    pub user: String,
    /// Isolation level for transactions opened by this session
    pub default_isolation: IsolationLevel,
    pub syntax: Syntax,
    pub time_zone: String,
    pub search_path: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            database: String::new(),
            user: ROOT_USER.to_string(),
            default_isolation: IsolationLevel::default(),
            syntax: Syntax::default(),
            time_zone: "UTC".to_string(),
            search_path: vec!["pg_catalog".to_string()],
        }
    }
}

impl Session {
    pub fn new(user: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.user == ROOT_USER
    }
}

/// Mutable context of one statement
#[derive(Debug)]
pub struct EvalContext {
    database: RefCell<String>,
    skip_privilege_checks: Cell<bool>,
}

impl EvalContext {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: RefCell::new(database.into()),
            skip_privilege_checks: Cell::new(false),
        }
    }

    /// Database used to decide catalog visibility
    pub fn database(&self) -> String {
        self.database.borrow().clone()
    }

    pub fn privilege_checks_suppressed(&self) -> bool {
        self.skip_privilege_checks.get()
    }

    /// Treat `database` as current until the guard is dropped
    pub fn override_database(&self, database: &str) -> DatabaseOverride<'_> {
        let saved = self.database.replace(database.to_string());
        trace!(from = %saved, to = %database, "database override");
        DatabaseOverride { ctx: self, saved }
    }

    /// Skip privilege checks until the guard is dropped
    pub fn suppress_privilege_checks(&self) -> PrivilegeCheckSuppression<'_> {
        let saved = self.skip_privilege_checks.replace(true);
        trace!("privilege checks suppressed");
        PrivilegeCheckSuppression { ctx: self, saved }
    }
}

/// Restores the current database on drop
#[must_use = "the override ends when the guard is dropped"]
pub struct DatabaseOverride<'a> {
    ctx: &'a EvalContext,
    saved: String,
}

impl Drop for DatabaseOverride<'_> {
    fn drop(&mut self) {
        let restored = std::mem::take(&mut self.saved);
        trace!(to = %restored, "database override restored");
        *self.ctx.database.borrow_mut() = restored;
    }
}

/// Re-enables privilege checks on drop
#[must_use = "checks resume when the guard is dropped"]
pub struct PrivilegeCheckSuppression<'a> {
    ctx: &'a EvalContext,
    saved: bool,
}

impl Drop for PrivilegeCheckSuppression<'_> {
    fn drop(&mut self) {
        self.ctx.skip_privilege_checks.set(self.saved);
        trace!("privilege checks restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_override_restores() {
        let ctx = EvalContext::new("home");
        {
            let _guard = ctx.override_database("other");
            assert_eq!(ctx.database(), "other");
            {
                let _inner = ctx.override_database("third");
                assert_eq!(ctx.database(), "third");
            }
            assert_eq!(ctx.database(), "other");
        }
        assert_eq!(ctx.database(), "home");
    }

    #[test]
    fn test_override_restored_on_error_path() {
        fn failing(ctx: &EvalContext) -> Result<(), String> {
            let _guard = ctx.override_database("elsewhere");
            Err("boom".to_string())
        }
        let ctx = EvalContext::new("home");
        assert!(failing(&ctx).is_err());
        assert_eq!(ctx.database(), "home");
    }

    #[test]
    fn test_privilege_suppression_nests() {
        let ctx = EvalContext::new("");
        assert!(!ctx.privilege_checks_suppressed());
        {
            let _outer = ctx.suppress_privilege_checks();
            {
                let _inner = ctx.suppress_privilege_checks();
            }
            assert!(ctx.privilege_checks_suppressed());
        }
        assert!(!ctx.privilege_checks_suppressed());
    }

    #[test]
    fn test_session_defaults() {
        let session = Session::default();
        assert!(session.is_root());
        assert_eq!(session.time_zone, "UTC");
        assert_eq!(session.syntax.to_string(), "Traditional");
        assert_eq!(Syntax::parse("MODERN"), Some(Syntax::Modern));
    }
}
