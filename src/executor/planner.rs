//! Statement planner for ShowDB
//!
//! This module turns parsed introspection statements into plan nodes. The
//! planner owns the per-statement context: a copy of the session, the
//! transaction whose snapshot every catalog read goes through, the
//! evaluation context carrying scoped overrides, and the memory monitor
//! result rows are charged against.

use std::sync::Arc;

use tracing::debug;

use super::plan::{PlanNode, ValuesNode};
use super::rows::{MemoryMonitor, ResultColumn, RowContainer};
use super::session::{EvalContext, Session};
use crate::catalog::{DataType, Privilege, TableDescriptor};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::transaction::Transaction;

/// Statement planner
pub struct Planner {
    session: Session,
    txn: Arc<Transaction>,
    eval: EvalContext,
    monitor: Arc<MemoryMonitor>,
}

impl Planner {
    /// Create a planner for one statement
    pub fn new(session: Session, txn: Arc<Transaction>, monitor: Arc<MemoryMonitor>) -> Self {
        let eval = EvalContext::new(session.database.as_str());
        Self {
            session,
            txn,
            eval,
            monitor,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The principal privileges are checked for
    pub fn user(&self) -> &str {
        &self.session.user
    }

    pub fn txn(&self) -> &Transaction {
        &self.txn
    }

    pub fn eval(&self) -> &EvalContext {
        &self.eval
    }

    pub fn monitor(&self) -> Arc<MemoryMonitor> {
        self.monitor.clone()
    }

    /// Build the plan for `stmt`. Only the column shape is computed here;
    /// catalog reads happen when the plan is started.
    pub fn plan(&self, stmt: &Statement) -> Result<PlanNode> {
        debug!(?stmt, user = self.user(), "planning statement");
        match stmt {
            Statement::ShowVariable(name) => self.show_variable(name),
            Statement::ShowColumns(name) => self.show_columns(name),
            Statement::ShowTables(database) => self.show_tables(database.as_deref()),
            Statement::ShowDatabases => self.show_databases(),
            Statement::ShowGrants(show) => self.show_grants(show),
            Statement::ShowIndex(name) => self.show_index(name),
            Statement::ShowConstraints(name) => self.show_constraints(name),
            Statement::ShowCreateTable(name) => self.show_create_table(name),
            Statement::ShowCreateView(name) => self.show_create_view(name),
            Statement::ShowUsers => self.show_users(),
            Statement::Help(name) => self.help(name),
            other => Err(Error::Unsupported(format!(
                "{} is not an introspection statement",
                other.tag()
            ))),
        }
    }

    /// Materialize rows produced by `fill`; the container is closed if
    /// `fill` fails.
    pub fn values<F>(&self, columns: Vec<ResultColumn>, fill: F) -> Result<PlanNode>
    where
        F: FnOnce(&mut RowContainer) -> Result<()>,
    {
        let mut rows = RowContainer::new(columns, self.monitor());
        if let Err(e) = fill(&mut rows) {
            rows.close();
            return Err(e);
        }
        Ok(PlanNode::Values(ValuesNode::new(rows)))
    }

    // ========== SELECT output columns ==========

    /// Output columns of `select`, resolving every table it reads from
    pub fn plan_select_columns(&self, select: &SelectStatement) -> Result<Vec<ResultColumn>> {
        let sources = self.resolve_sources(select)?;
        let mut out = Vec::new();

        for item in &select.columns {
            match item {
                SelectItem::Wildcard => {
                    if sources.is_empty() {
                        return Err(Error::ParseError(
                            "SELECT * with no tables specified".to_string(),
                        ));
                    }
                    for (_, desc) in &sources {
                        out.extend(visible_result_columns(desc));
                    }
                }
                SelectItem::QualifiedWildcard(table) => {
                    let (_, desc) = sources
                        .iter()
                        .find(|(reference, _)| reference == table)
                        .ok_or_else(|| Error::UndefinedTable(table.clone()))?;
                    out.extend(visible_result_columns(desc));
                }
                SelectItem::Expr { expr, alias } => {
                    let typ = expr_type(expr, &sources)?;
                    let name = match (alias, expr) {
                        (Some(alias), _) => alias.clone(),
                        (None, Expr::Column(c)) => c.column.clone(),
                        (None, other) => other.to_string(),
                    };
                    out.push(ResultColumn::new(name, typ));
                }
            }
        }
        Ok(out)
    }

    /// (reference name, descriptor) for each table in the FROM clause
    fn resolve_sources(&self, select: &SelectStatement) -> Result<Vec<(String, Arc<TableDescriptor>)>> {
        let Some(from) = &select.from else {
            return Ok(Vec::new());
        };
        std::iter::once(&from.table)
            .chain(from.joins.iter().map(|j| &j.table))
            .map(|table| {
                let name = self.normalize(&table.name)?;
                let desc = self.get_table_or_view_desc(&name)?;
                self.check_privilege(&desc, Privilege::Select)?;
                Ok((table.reference_name().to_string(), desc))
            })
            .collect()
    }
}

fn visible_result_columns(desc: &TableDescriptor) -> impl Iterator<Item = ResultColumn> + '_ {
    desc.visible_columns()
        .map(|c| ResultColumn::new(c.name.as_str(), c.data_type.clone()))
}

fn expr_type(expr: &Expr, sources: &[(String, Arc<TableDescriptor>)]) -> Result<DataType> {
    match expr {
        Expr::Column(c) => {
            let candidates = sources
                .iter()
                .filter(|(reference, _)| c.table.as_ref().map_or(true, |t| t == reference));
            for (_, desc) in candidates {
                if let Some(column) = desc.visible_columns().find(|col| col.name == c.column) {
                    return Ok(column.data_type.clone());
                }
            }
            Err(Error::ColumnNotFound(
                c.column.clone(),
                c.table.clone().unwrap_or_else(|| {
                    sources
                        .iter()
                        .map(|(reference, _)| reference.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                }),
            ))
        }
        Expr::Literal(Literal::Boolean(_)) => Ok(DataType::Boolean),
        Expr::Literal(Literal::Integer(_)) => Ok(DataType::BigInt),
        Expr::Literal(Literal::Float(_)) => Ok(DataType::Double),
        Expr::Literal(_) => Ok(DataType::Text),
        Expr::BinaryOp { op, .. } if op.is_predicate() => Ok(DataType::Boolean),
        Expr::IsNull(_)
        | Expr::IsNotNull(_)
        | Expr::Between { .. }
        | Expr::InList { .. }
        | Expr::Like { .. }
        | Expr::Exists(_) => Ok(DataType::Boolean),
        Expr::Nested(inner) => expr_type(inner, sources),
        other => {
            // Columns referenced anywhere in the expression must still exist
            for name in other.column_names() {
                expr_type(&Expr::Column(ColumnRef::from(name)), sources)?;
            }
            Ok(DataType::Text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ColumnDescriptor, GrantTarget, QualifiedName, TableBuilder};
    use crate::executor::session::Session;
    use crate::sql::Parser;
    use crate::transaction::{IsolationLevel, TransactionManager};

    fn setup() -> Arc<Catalog> {
        let catalog = Arc::new(Catalog::new());
        catalog.create_database("db").unwrap();
        catalog.create_user("alice").unwrap();
        TableBuilder::new("t")
            .column(ColumnDescriptor::new("a", DataType::Integer).nullable(false))
            .simple_column("b", DataType::Text)
            .build(&catalog, "db")
            .unwrap();
        catalog
    }

    fn planner(catalog: &Arc<Catalog>, user: &str) -> Planner {
        let manager = TransactionManager::new(catalog.clone());
        let txn = manager.begin(true, IsolationLevel::default());
        Planner::new(
            Session::new(user, "db"),
            txn,
            Arc::new(MemoryMonitor::new(1 << 20)),
        )
    }

    fn select(sql: &str) -> SelectStatement {
        match Parser::parse_one(sql).unwrap() {
            Statement::Select(s) => s,
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_select_columns() {
        let catalog = setup();
        let p = planner(&catalog, "root");

        let cols = p.plan_select_columns(&select("SELECT * FROM t")).unwrap();
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let cols = p
            .plan_select_columns(&select("SELECT b AS label, a > 1, length(b) FROM db.t"))
            .unwrap();
        assert_eq!(cols[0], ResultColumn::new("label", DataType::Text));
        assert_eq!(cols[1], ResultColumn::new("a > 1", DataType::Boolean));
        assert_eq!(cols[2].name, "length(b)");

        let err = p.plan_select_columns(&select("SELECT c FROM t")).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c, _) if c == "c"));
    }

    #[test]
    fn test_select_requires_privilege_unless_suppressed() {
        let catalog = setup();
        let p = planner(&catalog, "alice");
        let query = select("SELECT a FROM t");

        assert!(matches!(
            p.plan_select_columns(&query),
            Err(Error::PermissionDenied(_))
        ));
        {
            let _guard = p.eval().suppress_privilege_checks();
            assert!(p.plan_select_columns(&query).is_ok());
        }
        assert!(p.plan_select_columns(&query).is_err());

        catalog
            .grant(
                &GrantTarget::Table(QualifiedName::new("db", "t")),
                &[Privilege::Select],
                &["alice".to_string()],
            )
            .unwrap();
        let p = planner(&catalog, "alice");
        assert!(p.plan_select_columns(&query).is_ok());
    }

    #[test]
    fn test_columns_are_fixed_before_start() {
        let catalog = setup();
        let p = planner(&catalog, "root");
        let plan = p
            .plan(&Parser::parse_one("SHOW COLUMNS FROM nosuchtable").unwrap())
            .unwrap();
        let names: Vec<_> = plan.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Field", "Type", "Null", "Default"]);

        let err = plan.collect(&p).unwrap_err();
        assert!(matches!(err, Error::UndefinedTable(name) if name == "db.nosuchtable"));
        assert_eq!(p.monitor().used(), 0);
        assert_eq!(p.eval().database(), "db");
    }

    #[test]
    fn test_unplannable_statement() {
        let catalog = setup();
        let p = planner(&catalog, "root");
        let stmt = Parser::parse_one("SELECT 1").unwrap();
        assert!(matches!(p.plan(&stmt), Err(Error::Unsupported(_))));
    }
}
