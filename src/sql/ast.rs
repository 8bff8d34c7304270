//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for SQL statements. Expressions and
//! SELECT statements format back to SQL text that parses to the same tree;
//! view definitions and DEFAULT / CHECK expressions are stored in that form.

use super::quote::{quote_name, quote_qualified};
use crate::catalog::{DataType, Direction, Privilege};
use std::fmt;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select(SelectStatement),
    /// CREATE DATABASE
    CreateDatabase(CreateDatabaseStatement),
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// CREATE INDEX statement
    CreateIndex(CreateIndexStatement),
    /// CREATE VIEW statement
    CreateView(CreateViewStatement),
    /// CREATE USER
    CreateUser(String),
    /// DROP TABLE statement
    DropTable(DropTableStatement),
    /// GRANT
    Grant(GrantStatement),
    /// REVOKE
    Revoke(GrantStatement),
    /// SET <variable> = <values>
    Set(SetStatement),
    /// SET TRANSACTION ...
    SetTransaction(SetTransactionStatement),
    /// SHOW ALL / SHOW <variable>
    ShowVariable(String),
    /// SHOW COLUMNS FROM
    ShowColumns(TableName),
    /// SHOW TABLES [FROM db]
    ShowTables(Option<String>),
    /// SHOW DATABASES
    ShowDatabases,
    /// SHOW GRANTS
    ShowGrants(ShowGrantsStatement),
    /// SHOW INDEX FROM
    ShowIndex(TableName),
    /// SHOW CONSTRAINTS FROM
    ShowConstraints(TableName),
    /// SHOW CREATE TABLE
    ShowCreateTable(TableName),
    /// SHOW CREATE VIEW
    ShowCreateView(TableName),
    /// SHOW USERS
    ShowUsers,
    /// HELP <function>
    Help(String),
    /// BEGIN TRANSACTION
    BeginTransaction,
    /// COMMIT
    Commit,
    /// ROLLBACK
    Rollback,
}

impl Statement {
    /// Command tag reported for this statement
    pub fn tag(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::CreateDatabase(_) => "CREATE DATABASE",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::CreateIndex(_) => "CREATE INDEX",
            Statement::CreateView(_) => "CREATE VIEW",
            Statement::CreateUser(_) => "CREATE USER",
            Statement::DropTable(_) => "DROP TABLE",
            Statement::Grant(_) => "GRANT",
            Statement::Revoke(_) => "REVOKE",
            Statement::Set(_) => "SET",
            Statement::SetTransaction(_) => "SET TRANSACTION",
            Statement::BeginTransaction => "BEGIN",
            Statement::Commit => "COMMIT",
            Statement::Rollback => "ROLLBACK",
            Statement::Help(_) => "HELP",
            _ => "SHOW",
        }
    }

    /// Does this statement only read the catalog?
    pub fn is_introspection(&self) -> bool {
        matches!(
            self,
            Statement::ShowVariable(_)
                | Statement::ShowColumns(_)
                | Statement::ShowTables(_)
                | Statement::ShowDatabases
                | Statement::ShowGrants(_)
                | Statement::ShowIndex(_)
                | Statement::ShowConstraints(_)
                | Statement::ShowCreateTable(_)
                | Statement::ShowCreateView(_)
                | Statement::ShowUsers
                | Statement::Help(_)
        )
    }
}

// ========== Names ==========

/// A possibly database-qualified table name, as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub database: Option<String>,
    pub table: String,
}

impl TableName {
    pub fn new(database: Option<&str>, table: &str) -> Self {
        Self {
            database: database.map(str::to_string),
            table: table.to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_qualified(self.database.as_deref(), &self.table))
    }
}

/// `t`, `db.t`, `db.*` or `*` in a GRANT / SHOW GRANTS target list
#[derive(Debug, Clone, PartialEq)]
pub enum TablePattern {
    Table(TableName),
    AllTables(Option<String>),
}

/// Objects named by GRANT, REVOKE and SHOW GRANTS
#[derive(Debug, Clone, PartialEq)]
pub enum TargetList {
    Databases(Vec<String>),
    Tables(Vec<TablePattern>),
}

// ========== SELECT ==========

/// SELECT statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStatement {
    /// DISTINCT flag
    pub distinct: bool,
    /// Select list (columns or expressions)
    pub columns: Vec<SelectItem>,
    /// FROM clause
    pub from: Option<FromClause>,
    /// WHERE clause
    pub where_clause: Option<Expr>,
    /// GROUP BY clause
    pub group_by: Vec<Expr>,
    /// HAVING clause
    pub having: Option<Expr>,
    /// ORDER BY clause
    pub order_by: Vec<OrderByItem>,
    /// LIMIT clause
    pub limit: Option<Expr>,
    /// OFFSET clause
    pub offset: Option<Expr>,
}

/// A single item in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// All columns (*)
    Wildcard,
    /// A table's all columns (table.*)
    QualifiedWildcard(String),
    /// An expression with optional alias
    Expr { expr: Expr, alias: Option<String> },
}

/// FROM clause
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    /// Base table
    pub table: TableRef,
    /// JOIN clauses
    pub joins: Vec<Join>,
}

/// Table reference
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Table name
    pub name: TableName,
    /// Optional alias
    pub alias: Option<String>,
}

impl TableRef {
    /// Name columns of this table are qualified with
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name.table)
    }
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type
    pub join_type: JoinType,
    /// Table to join
    pub table: TableRef,
    /// Join condition
    pub condition: Option<Expr>,
}

/// Type of JOIN
#[derive(Debug, Clone, PartialEq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    /// Expression to order by
    pub expr: Expr,
    /// Ascending (true) or descending (false)
    pub ascending: bool,
}

// ========== DDL ==========

/// CREATE DATABASE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabaseStatement {
    pub name: String,
    pub if_not_exists: bool,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub name: TableName,
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Table constraints
    pub constraints: Vec<TableConstraint>,
    /// INDEX clauses
    pub indexes: Vec<IndexDef>,
    /// FAMILY clauses
    pub families: Vec<FamilyDef>,
    /// Trailing INTERLEAVE IN PARENT
    pub interleave: Option<InterleaveDef>,
    /// IF NOT EXISTS flag
    pub if_not_exists: bool,
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value
    pub default: Option<Expr>,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// Column-level CHECK
    pub check: Option<Expr>,
    /// Column-level REFERENCES
    pub references: Option<(TableName, Option<String>)>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            default: None,
            primary_key: false,
            unique: false,
            check: None,
            references: None,
        }
    }
}

/// Key column of an index with its direction
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    pub name: String,
    pub direction: Direction,
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// PRIMARY KEY constraint
    PrimaryKey {
        name: Option<String>,
        columns: Vec<IndexColumn>,
    },
    /// UNIQUE constraint
    Unique {
        name: Option<String>,
        columns: Vec<IndexColumn>,
    },
    /// FOREIGN KEY constraint
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        ref_table: TableName,
        ref_columns: Option<Vec<String>>,
    },
    /// CHECK constraint
    Check { name: Option<String>, expr: Expr },
}

/// `[UNIQUE] INDEX [name] (cols) [STORING (cols)] [INTERLEAVE ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: Option<String>,
    pub unique: bool,
    pub columns: Vec<IndexColumn>,
    pub storing: Vec<String>,
    pub interleave: Option<InterleaveDef>,
}

/// `FAMILY [name] (cols)`
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// `INTERLEAVE IN PARENT <table> (cols)`
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveDef {
    pub parent: TableName,
    pub columns: Vec<String>,
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// Table name
    pub name: TableName,
    /// IF EXISTS flag
    pub if_exists: bool,
}

/// CREATE INDEX statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Index definition
    pub index: IndexDef,
    /// Table name
    pub table: TableName,
    /// IF NOT EXISTS flag
    pub if_not_exists: bool,
}

/// CREATE VIEW statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateViewStatement {
    pub name: TableName,
    /// Explicit output column names
    pub columns: Option<Vec<String>>,
    pub query: SelectStatement,
}

// ========== Access control & session ==========

/// GRANT / REVOKE
#[derive(Debug, Clone, PartialEq)]
pub struct GrantStatement {
    pub privileges: Vec<Privilege>,
    pub targets: TargetList,
    pub grantees: Vec<String>,
}

/// SHOW GRANTS [ON targets] [FOR users]
#[derive(Debug, Clone, PartialEq)]
pub struct ShowGrantsStatement {
    pub targets: Option<TargetList>,
    pub grantees: Option<Vec<String>>,
}

/// SET <variable> = <values>
#[derive(Debug, Clone, PartialEq)]
pub struct SetStatement {
    pub name: String,
    pub values: Vec<Expr>,
}

/// SET TRANSACTION ISOLATION LEVEL ... / PRIORITY ...
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetTransactionStatement {
    pub isolation: Option<String>,
    pub priority: Option<String>,
}

// ========== Expressions ==========

/// SQL Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(ColumnRef),
    /// Literal value
    Literal(Literal),
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
    /// Function call
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
    /// BETWEEN
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// IN
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// LIKE
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// CASE expression
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },
    /// Subquery
    Subquery(Box<SelectStatement>),
    /// EXISTS
    Exists(Box<SelectStatement>),
    /// Nested expression (in parentheses)
    Nested(Box<Expr>),
}

impl Expr {
    /// Column names referenced by this expression, in order of appearance
    pub fn column_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column(c) => {
                if c.column != "*" {
                    out.push(c.column.clone());
                }
            }
            Expr::Literal(_) | Expr::Subquery(_) | Expr::Exists(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::Nested(expr) => expr.collect_columns(out),
            Expr::Function { args, .. } => args.iter().for_each(|a| a.collect_columns(out)),
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                list.iter().for_each(|e| e.collect_columns(out));
            }
            Expr::Like { expr, pattern, .. } => {
                expr.collect_columns(out);
                pattern.collect_columns(out);
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    operand.collect_columns(out);
                }
                for (when, then) in when_clauses {
                    when.collect_columns(out);
                    then.collect_columns(out);
                }
                if let Some(e) = else_clause {
                    e.collect_columns(out);
                }
            }
        }
    }
}

/// Column reference
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name (optional)
    pub table: Option<String>,
    /// Column name
    pub column: String,
}

impl From<String> for ColumnRef {
    fn from(column: String) -> Self {
        Self {
            table: None,
            column,
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // String
    Concat,
}

impl BinaryOperator {
    /// Does the operator produce a boolean?
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Neq
                | BinaryOperator::Lt
                | BinaryOperator::Gt
                | BinaryOperator::Lte
                | BinaryOperator::Gte
                | BinaryOperator::And
                | BinaryOperator::Or
        )
    }
}

/// Unary operator
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOperator {
    /// NOT
    Not,
    /// - (negation)
    Minus,
    /// + (plus sign)
    Plus,
}

// ========== SQL formatting ==========

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Neq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Concat => "||",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", quote_name(table))?;
        }
        if self.column == "*" {
            f.write_str("*")
        } else {
            f.write_str(&quote_name(&self.column))
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::BinaryOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => write!(f, "NOT {}", expr),
                // A space keeps `- -x` from lexing as a comment
                UnaryOperator::Minus => match expr.as_ref() {
                    Expr::UnaryOp {
                        op: UnaryOperator::Minus,
                        ..
                    } => write!(f, "- {}", expr),
                    _ => write!(f, "-{}", expr),
                },
                UnaryOperator::Plus => write!(f, "+{}", expr),
            },
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                write!(f, "{}(", name)?;
                if *distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::IsNull(e) => write!(f, "{} IS NULL", e),
            Expr::IsNotNull(e) => write!(f, "{} IS NOT NULL", e),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "{} {}BETWEEN {} AND {}", expr, not(negated), low, high),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", expr, not(negated))?;
                write_list(f, list)?;
                f.write_str(")")
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => write!(f, "{} {}LIKE {}", expr, not(negated), pattern),
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(e) = else_clause {
                    write!(f, " ELSE {}", e)?;
                }
                f.write_str(" END")
            }
            Expr::Subquery(s) => write!(f, "({})", s),
            Expr::Exists(s) => write!(f, "EXISTS ({})", s),
            Expr::Nested(e) => write!(f, "({})", e),
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => f.write_str("*"),
            SelectItem::QualifiedWildcard(t) => write!(f, "{}.*", quote_name(t)),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{} AS {}", expr, quote_name(alias)),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_name(alias))?;
        }
        Ok(())
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        };
        write!(f, "{} {}", kind, self.table)?;
        if let Some(cond) = &self.condition {
            write!(f, " ON {}", cond)?;
        }
        Ok(())
    }
}

impl fmt::Display for OrderByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if !self.ascending {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_list(f, &self.columns)?;
        if let Some(from) = &self.from {
            write!(f, " FROM {}", from.table)?;
            for join in &from.joins {
                write!(f, " {}", join)?;
            }
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {}", w)?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if let Some(h) = &self.having {
            write!(f, " HAVING {}", h)?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_list(f, &self.order_by)?;
        }
        if let Some(l) = &self.limit {
            write!(f, " LIMIT {}", l)?;
        }
        if let Some(o) = &self.offset {
            write!(f, " OFFSET {}", o)?;
        }
        Ok(())
    }
}
