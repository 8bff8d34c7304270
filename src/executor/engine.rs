//! Execution engine for ShowDB
//!
//! The engine owns a session and, between BEGIN and COMMIT/ROLLBACK, an
//! explicit transaction. Statements outside an explicit transaction run in
//! an implicit one that is committed on success and rolled back on error.

use serde::Serialize;
use std::sync::Arc;

use tracing::{debug, info};

use super::planner::Planner;
use super::rows::{Datum, MemoryMonitor, ResultColumn};
use super::session::Session;
use super::vars;
use crate::catalog::Catalog;
use crate::config::{Config, DEFAULT_MAX_RESULT_MEMORY};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Parser;
use crate::transaction::{IsolationLevel, Transaction, TransactionManager, UserPriority};

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Result columns, fixed when the statement is planned
    pub columns: Vec<ResultColumn>,
    /// Result rows
    pub rows: Vec<Vec<Datum>>,
    /// Command tag for statements that return no rows
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result carrying rows
    pub fn with_rows(columns: Vec<ResultColumn>, rows: Vec<Vec<Datum>>) -> Self {
        Self {
            columns,
            rows,
            message: None,
        }
    }

    /// Values of the column named `name`, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Datum>> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

/// Execution Engine
pub struct ExecutionEngine {
    /// System catalog
    catalog: Arc<Catalog>,
    /// Transaction Manager
    transaction_manager: Arc<TransactionManager>,
    session: Session,
    /// Explicit transaction opened by BEGIN
    current_txn: Option<Arc<Transaction>>,
    /// Budget shared by every result container of this engine
    monitor: Arc<MemoryMonitor>,
}

impl ExecutionEngine {
    /// Create a new execution engine with a root session and no database
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let transaction_manager = Arc::new(TransactionManager::new(catalog.clone()));
        Self {
            catalog,
            transaction_manager,
            session: Session::default(),
            current_txn: None,
            monitor: Arc::new(MemoryMonitor::new(DEFAULT_MAX_RESULT_MEMORY)),
        }
    }

    /// Create an engine whose session starts from `config`
    pub fn with_config(catalog: Arc<Catalog>, config: &Config) -> Result<Self> {
        let default_isolation = IsolationLevel::parse(&config.default_isolation)
            .ok_or_else(|| {
                Error::Unsupported(format!(
                    "unknown isolation level {:?}",
                    config.default_isolation
                ))
            })?;

        let mut engine = Self::new(catalog);
        engine.session = Session {
            database: config.default_database.clone(),
            user: config.user.clone(),
            default_isolation,
            time_zone: config.time_zone.clone(),
            search_path: config.search_path.clone(),
            ..Session::default()
        };
        engine.monitor = Arc::new(MemoryMonitor::new(config.max_result_memory));
        Ok(engine)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.transaction_manager
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Switch the session to another principal
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.session.user = user.into();
        debug!(user = %self.session.user, "session user changed");
    }

    /// The transaction opened by BEGIN, if any
    pub fn current_transaction(&self) -> Option<&Arc<Transaction>> {
        self.current_txn.as_ref()
    }

    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    /// Execute every statement in `sql`, returning the last result
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let statements = Parser::new(sql)?.parse_all()?;
        let mut result = QueryResult::empty();
        for stmt in &statements {
            result = self.execute_statement(stmt)?;
        }
        Ok(result)
    }

    /// Execute a single parsed statement
    pub fn execute_statement(&mut self, stmt: &Statement) -> Result<QueryResult> {
        match stmt {
            Statement::BeginTransaction => self.execute_begin(),
            Statement::Commit => self.execute_commit(),
            Statement::Rollback => self.execute_rollback(),
            Statement::SetTransaction(modes) => self.execute_set_transaction(modes),
            Statement::Set(set) => {
                let state = self.catalog.snapshot();
                vars::apply_set(&mut self.session, &state, set)?;
                Ok(QueryResult::with_message(stmt.tag()))
            }
            Statement::Select(_) => Err(Error::Unsupported(
                "SELECT is only supported inside view definitions".to_string(),
            )),
            stmt if stmt.is_introspection() => self.run(|planner| {
                let plan = planner.plan(stmt)?;
                let columns = plan.columns().to_vec();
                let rows = plan.collect(planner)?;
                Ok(QueryResult::with_rows(columns, rows))
            }),
            stmt => {
                if self.current_txn.is_some() {
                    return Err(Error::Unsupported(format!(
                        "{} inside an explicit transaction",
                        stmt.tag()
                    )));
                }
                let catalog = self.catalog.clone();
                self.run(|planner| planner.apply_ddl(&catalog, stmt))?;
                Ok(QueryResult::with_message(stmt.tag()))
            }
        }
    }

    /// Result columns of `sql` without executing it
    pub fn prepare(&mut self, sql: &str) -> Result<Vec<ResultColumn>> {
        let stmt = Parser::parse_one(sql)?;
        match &stmt {
            Statement::Select(select) => self.run(|planner| planner.plan_select_columns(select)),
            stmt if stmt.is_introspection() => {
                self.run(|planner| Ok(planner.plan(stmt)?.columns().to_vec()))
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Run `f` against a planner bound to the current transaction, or to
    /// an implicit one when none is open
    fn run<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Planner) -> Result<T>,
    {
        let (txn, implicit) = match &self.current_txn {
            Some(txn) => (txn.clone(), false),
            None => (
                self.transaction_manager
                    .begin(true, self.session.default_isolation),
                true,
            ),
        };

        let planner = Planner::new(self.session.clone(), txn.clone(), self.monitor.clone());
        let result = f(&planner);

        if implicit {
            match &result {
                Ok(_) => self.transaction_manager.commit(&txn)?,
                Err(e) => {
                    debug!(txn = txn.id(), error = %e, "implicit transaction failed");
                    self.transaction_manager.rollback(&txn)?;
                }
            }
        }
        result
    }

    fn execute_begin(&mut self) -> Result<QueryResult> {
        if self.current_txn.is_some() {
            return Err(Error::TransactionInProgress);
        }
        let txn = self
            .transaction_manager
            .begin(false, self.session.default_isolation);
        info!(txn = txn.id(), "explicit transaction started");
        self.current_txn = Some(txn);
        Ok(QueryResult::with_message("BEGIN"))
    }

    fn execute_commit(&mut self) -> Result<QueryResult> {
        let txn = self.current_txn.take().ok_or(Error::NoTransaction)?;
        self.transaction_manager.commit(&txn)?;
        Ok(QueryResult::with_message("COMMIT"))
    }

    fn execute_rollback(&mut self) -> Result<QueryResult> {
        let txn = self.current_txn.take().ok_or(Error::NoTransaction)?;
        self.transaction_manager.rollback(&txn)?;
        Ok(QueryResult::with_message("ROLLBACK"))
    }

    fn execute_set_transaction(&mut self, modes: &SetTransactionStatement) -> Result<QueryResult> {
        let txn = self.current_txn.as_ref().ok_or(Error::NoTransaction)?;
        if let Some(level) = &modes.isolation {
            let level = IsolationLevel::parse(level)
                .ok_or_else(|| Error::Unsupported(format!("isolation level {level}")))?;
            txn.set_isolation(level);
        }
        if let Some(priority) = &modes.priority {
            let priority = UserPriority::parse(priority)
                .ok_or_else(|| Error::Unsupported(format!("transaction priority {priority}")))?;
            txn.set_priority(priority);
        }
        Ok(QueryResult::with_message("SET TRANSACTION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(Arc::new(Catalog::new()));
        engine
            .execute("CREATE DATABASE db; SET DATABASE = db; CREATE TABLE t (a INT, b TEXT)")
            .unwrap();
        engine
    }

    #[test]
    fn test_transaction_statements() {
        let mut engine = engine();
        assert!(matches!(engine.execute("COMMIT"), Err(Error::NoTransaction)));

        let result = engine.execute("BEGIN").unwrap();
        assert_eq!(result.message.as_deref(), Some("BEGIN"));
        let id = engine.current_transaction().unwrap().id();
        assert!(engine.transaction_manager().is_active(id));
        assert!(matches!(
            engine.execute("BEGIN"),
            Err(Error::TransactionInProgress)
        ));

        engine
            .execute("SET TRANSACTION ISOLATION LEVEL SNAPSHOT, PRIORITY HIGH")
            .unwrap();
        let result = engine.execute("SHOW TRANSACTION ISOLATION LEVEL").unwrap();
        assert_eq!(result.rows, vec![vec![Datum::string("SNAPSHOT")]]);
        let result = engine.execute("SHOW TRANSACTION PRIORITY").unwrap();
        assert_eq!(result.rows, vec![vec![Datum::string("HIGH")]]);

        engine.execute("COMMIT").unwrap();
        assert!(engine.current_transaction().is_none());
        assert!(!engine.transaction_manager().is_active(id));

        let result = engine.execute("SHOW TRANSACTION ISOLATION LEVEL").unwrap();
        assert_eq!(result.rows, vec![vec![Datum::string("SERIALIZABLE")]]);
    }

    #[test]
    fn test_set_transaction_requires_transaction() {
        let mut engine = engine();
        assert!(matches!(
            engine.execute("SET TRANSACTION PRIORITY LOW"),
            Err(Error::NoTransaction)
        ));
        engine.execute("BEGIN").unwrap();
        assert!(matches!(
            engine.execute("SET TRANSACTION PRIORITY URGENT"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_implicit_transactions_are_finished() {
        let mut engine = engine();
        engine.execute("SHOW TABLES").unwrap();
        assert!(engine.execute("SHOW COLUMNS FROM missing").is_err());
        assert_eq!(engine.transaction_manager().active_count(), 0);
        assert_eq!(engine.monitor().used(), 0);
    }

    #[test]
    fn test_explicit_transaction_pins_snapshot() {
        let mut engine = engine();
        engine.execute("BEGIN").unwrap();
        engine
            .catalog()
            .create_database("other")
            .unwrap();

        let names = |result: &QueryResult| -> Vec<String> {
            result.rows.iter().map(|r| r[0].to_string()).collect()
        };
        let inside = engine.execute("SHOW DATABASES").unwrap();
        assert!(!names(&inside).contains(&"other".to_string()));

        engine.execute("ROLLBACK").unwrap();
        let after = engine.execute("SHOW DATABASES").unwrap();
        assert!(names(&after).contains(&"other".to_string()));
    }

    #[test]
    fn test_ambiguous_read_propagates() {
        let mut engine = engine();
        engine.execute("BEGIN").unwrap();
        engine
            .current_transaction()
            .unwrap()
            .inject_read_failure(1, "commit acknowledgement lost");

        let err = engine.execute("SHOW COLUMNS FROM t").unwrap_err();
        assert!(err.is_ambiguous());
        assert_eq!(
            err.to_string(),
            "result is ambiguous: commit acknowledgement lost"
        );
        assert_eq!(engine.monitor().used(), 0);

        let err = engine.execute("SHOW DATABASES").unwrap_err();
        assert!(matches!(err, Error::AmbiguousResult(_)));

        engine.execute("ROLLBACK").unwrap();
        assert!(engine.execute("SHOW DATABASES").is_ok());
    }

    #[test]
    fn test_ddl_inside_explicit_transaction() {
        let mut engine = engine();
        engine.execute("BEGIN").unwrap();
        assert!(matches!(
            engine.execute("CREATE TABLE u (x INT)"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_prepare() {
        let mut engine = engine();
        let cols = engine.prepare("SHOW INDEX FROM t").unwrap();
        assert_eq!(cols.len(), 7);
        assert_eq!(cols[0].name, "Table");

        let cols = engine.prepare("SELECT b, a FROM t").unwrap();
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        assert!(engine.prepare("CREATE USER bob").unwrap().is_empty());
        assert_eq!(engine.monitor().used(), 0);
        assert_eq!(engine.transaction_manager().active_count(), 0);
    }

    #[test]
    fn test_select_is_not_executed() {
        let mut engine = engine();
        assert!(matches!(
            engine.execute("SELECT a FROM t"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_with_config() {
        let catalog = Arc::new(Catalog::new());
        catalog.create_database("shop").unwrap();
        let config = Config::new()
            .default_database("shop")
            .time_zone("Europe/Berlin")
            .default_isolation("snapshot")
            .max_result_memory(1024);
        let mut engine = ExecutionEngine::with_config(catalog.clone(), &config).unwrap();

        assert_eq!(engine.session().database, "shop");
        assert_eq!(engine.monitor().limit(), 1024);
        let result = engine.execute("SHOW TIME ZONE").unwrap();
        assert_eq!(result.rows, vec![vec![Datum::string("Europe/Berlin")]]);
        let result = engine.execute("SHOW DEFAULT_TRANSACTION_ISOLATION").unwrap();
        assert_eq!(result.rows, vec![vec![Datum::string("SNAPSHOT")]]);

        let bad = Config::new().default_isolation("chaotic");
        assert!(ExecutionEngine::with_config(catalog, &bad).is_err());
    }
}
