//! SQL Parser
//!
//! This module parses SQL tokens into an AST. Besides SELECT it covers the
//! introspection statements (SHOW, HELP), the DDL used to populate the
//! catalog, access control and session statements.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::{DataType, Direction, Privilege};
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse exactly one statement, rejecting trailing input
    pub fn parse_one(sql: &str) -> Result<Statement> {
        let mut parser = Parser::new(sql)?;
        let stmt = parser.parse()?;
        if !parser.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", parser.current()),
            });
        }
        Ok(stmt)
    }

    /// Parse a single SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        Ok(stmt)
    }

    /// Parse multiple SQL statements
    pub fn parse_all(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }
            statements.push(self.parse()?);
        }

        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Show => self.parse_show(),
            Token::Help => self.parse_help(),
            Token::Create => self.parse_create(),
            Token::Drop => self.parse_drop(),
            Token::Grant => self.parse_grant().map(Statement::Grant),
            Token::Revoke => self.parse_revoke().map(Statement::Revoke),
            Token::Set => self.parse_set(),
            Token::Begin | Token::Commit | Token::Rollback => self.parse_transaction_control(),
            _ => Err(Error::UnexpectedToken {
                expected: "SELECT, SHOW, HELP, CREATE, DROP, GRANT, REVOKE, SET, BEGIN, COMMIT or ROLLBACK"
                    .to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== SHOW / HELP ==========

    fn parse_show(&mut self) -> Result<Statement> {
        self.expect(&Token::Show)?;

        if self.check(&Token::All) {
            self.advance();
            return Ok(Statement::ShowVariable("ALL".to_string()));
        }
        if self.check(&Token::Create) {
            self.advance();
            return match self.current() {
                Token::Table => {
                    self.advance();
                    Ok(Statement::ShowCreateTable(self.parse_table_name()?))
                }
                Token::View => {
                    self.advance();
                    Ok(Statement::ShowCreateView(self.parse_table_name()?))
                }
                _ => Err(Error::UnexpectedToken {
                    expected: "TABLE or VIEW".to_string(),
                    found: format!("{}", self.current()),
                }),
            };
        }
        if self.check(&Token::Index) || self.check_word("indexes") || self.check_word("keys") {
            self.advance();
            return Ok(Statement::ShowIndex(self.parse_from_table()?));
        }

        let word = match self.current() {
            Token::Identifier(w) => w.clone(),
            _ => String::new(),
        };
        match word.as_str() {
            "columns" => {
                self.advance();
                Ok(Statement::ShowColumns(self.parse_from_table()?))
            }
            "constraints" => {
                self.advance();
                Ok(Statement::ShowConstraints(self.parse_from_table()?))
            }
            "tables" => {
                self.advance();
                let database = if self.check(&Token::From) || self.check(&Token::In) {
                    self.advance();
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                Ok(Statement::ShowTables(database))
            }
            "databases" => {
                self.advance();
                Ok(Statement::ShowDatabases)
            }
            "users" => {
                self.advance();
                Ok(Statement::ShowUsers)
            }
            "grants" => {
                self.advance();
                self.parse_show_grants()
            }
            _ => self.parse_show_variable(),
        }
    }

    fn parse_from_table(&mut self) -> Result<TableName> {
        if self.check(&Token::From) || self.check(&Token::In) {
            self.advance();
        } else {
            return Err(Error::UnexpectedToken {
                expected: "FROM".to_string(),
                found: format!("{}", self.current()),
            });
        }
        self.parse_table_name()
    }

    fn parse_show_grants(&mut self) -> Result<Statement> {
        let targets = if self.check(&Token::On) {
            self.advance();
            Some(self.parse_target_list()?)
        } else {
            None
        };
        let grantees = if self.check_word("for") {
            self.advance();
            Some(self.parse_identifier_list()?)
        } else {
            None
        };
        Ok(Statement::ShowGrants(ShowGrantsStatement { targets, grantees }))
    }

    /// Variable names may span several words (`TIME ZONE`,
    /// `TRANSACTION ISOLATION LEVEL`); they are kept as written.
    fn parse_show_variable(&mut self) -> Result<Statement> {
        let mut words = Vec::new();
        while !self.is_at_end() && !self.check(&Token::Semicolon) {
            words.push(match self.current() {
                Token::Identifier(w) | Token::QuotedIdentifier(w) => w.clone(),
                tok => tok.to_string(),
            });
            self.advance();
        }
        if words.is_empty() {
            return Err(Error::UnexpectedEof("variable name".to_string()));
        }
        Ok(Statement::ShowVariable(words.join(" ")))
    }

    fn parse_help(&mut self) -> Result<Statement> {
        self.expect(&Token::Help)?;
        let name = match self.current() {
            Token::Eof | Token::Semicolon => {
                return Err(Error::UnexpectedEof("function name".to_string()))
            }
            Token::Identifier(w) | Token::QuotedIdentifier(w) => w.clone(),
            tok => tok.to_string(),
        };
        self.advance();
        Ok(Statement::Help(name.to_lowercase()))
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement::default();

        if self.check(&Token::Distinct) {
            self.advance();
            stmt.distinct = true;
        } else if self.check(&Token::All) {
            self.advance();
        }

        stmt.columns = self.parse_select_list()?;

        if self.check(&Token::From) {
            stmt.from = Some(self.parse_from_clause()?);
        }

        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = Some(self.parse_expr()?);
        }

        if self.check(&Token::Group) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.group_by = self.parse_expr_list()?;
        }

        if self.check(&Token::Having) {
            self.advance();
            stmt.having = Some(self.parse_expr()?);
        }

        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        if self.check(&Token::Limit) {
            self.advance();
            stmt.limit = Some(self.parse_expr()?);
        }

        if self.check(&Token::Offset) {
            self.advance();
            stmt.offset = Some(self.parse_expr()?);
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = vec![self.parse_select_item()?];
        while self.check(&Token::Comma) {
            self.advance();
            items.push(self.parse_select_item()?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        // table.*
        if let Some(name) = self.current_identifier() {
            if self.peek() == Some(&Token::Dot) && self.peek_at(2) == Some(&Token::Asterisk) {
                self.position += 3;
                return Ok(SelectItem::QualifiedWildcard(name));
            }
        }

        let expr = self.parse_expr()?;

        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            self.accept_identifier()
        };

        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_from_clause(&mut self) -> Result<FromClause> {
        self.expect(&Token::From)?;

        let table = self.parse_table_ref()?;
        let mut joins = Vec::new();

        while self.is_join_keyword() {
            joins.push(self.parse_join()?);
        }

        Ok(FromClause { table, joins })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.parse_table_name()?;

        let alias = if self.check(&Token::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            self.accept_identifier()
        };

        Ok(TableRef { name, alias })
    }

    fn is_join_keyword(&self) -> bool {
        matches!(
            self.current(),
            Token::Join | Token::Inner | Token::Left | Token::Right | Token::Full | Token::Cross
        )
    }

    fn parse_join(&mut self) -> Result<Join> {
        let join_type = match self.current() {
            Token::Inner => JoinType::Inner,
            Token::Left => JoinType::Left,
            Token::Right => JoinType::Right,
            Token::Full => JoinType::Full,
            Token::Cross => JoinType::Cross,
            // Just JOIN means INNER JOIN
            _ => JoinType::Inner,
        };
        if !self.check(&Token::Join) {
            self.advance();
            if self.check(&Token::Outer) {
                self.advance();
            }
        }
        self.expect(&Token::Join)?;
        let table = self.parse_table_ref()?;

        let condition = if self.check(&Token::On) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Join {
            join_type,
            table,
            condition,
        })
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let expr = self.parse_expr()?;
            let ascending = self.parse_direction() == Direction::Asc;
            items.push(OrderByItem { expr, ascending });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_direction(&mut self) -> Direction {
        match self.current() {
            Token::Desc => {
                self.advance();
                Direction::Desc
            }
            Token::Asc => {
                self.advance();
                Direction::Asc
            }
            _ => Direction::Asc,
        }
    }

    // ========== CREATE Statements ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;

        match self.current() {
            Token::Database => {
                self.advance();
                let if_not_exists = self.parse_if_not_exists()?;
                let name = self.expect_identifier()?;
                Ok(Statement::CreateDatabase(CreateDatabaseStatement {
                    name,
                    if_not_exists,
                }))
            }
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Index | Token::Unique => self.parse_create_index().map(Statement::CreateIndex),
            Token::View => self.parse_create_view().map(Statement::CreateView),
            Token::Identifier(w) if w == "user" => {
                self.advance();
                Ok(Statement::CreateUser(self.expect_identifier()?))
            }
            _ => Err(Error::UnexpectedToken {
                expected: "DATABASE, TABLE, INDEX, VIEW or USER".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn parse_if_not_exists(&mut self) -> Result<bool> {
        if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Not)?;
            self.expect(&Token::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;

        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_table_name()?;

        self.expect(&Token::LParen)?;

        let mut stmt = CreateTableStatement {
            name,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            families: Vec::new(),
            interleave: None,
            if_not_exists,
        };

        loop {
            match self.current() {
                Token::Index => stmt.indexes.push(self.parse_index_def(false)?),
                Token::Unique if self.peek() == Some(&Token::Index) => {
                    self.advance();
                    stmt.indexes.push(self.parse_index_def(true)?);
                }
                Token::Family => stmt.families.push(self.parse_family_def()?),
                Token::Primary
                | Token::Foreign
                | Token::Unique
                | Token::Check
                | Token::Constraint => stmt.constraints.push(self.parse_table_constraint()?),
                _ => stmt.columns.push(self.parse_column_def()?),
            }

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;
        stmt.interleave = self.parse_interleave()?;

        Ok(stmt)
    }

    /// `INDEX [name] (cols) [STORING (cols)] [INTERLEAVE ...]`, after any UNIQUE
    fn parse_index_def(&mut self, unique: bool) -> Result<IndexDef> {
        self.expect(&Token::Index)?;
        let name = self.accept_identifier();
        let columns = self.parse_index_columns()?;
        let storing = self.parse_storing()?;
        let interleave = self.parse_interleave()?;
        Ok(IndexDef {
            name,
            unique,
            columns,
            storing,
            interleave,
        })
    }

    fn parse_index_columns(&mut self) -> Result<Vec<IndexColumn>> {
        self.expect(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let direction = self.parse_direction();
            columns.push(IndexColumn { name, direction });
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;
        Ok(columns)
    }

    fn parse_storing(&mut self) -> Result<Vec<String>> {
        if !self.check(&Token::Storing) {
            return Ok(Vec::new());
        }
        self.advance();
        self.parse_paren_identifier_list()
    }

    fn parse_interleave(&mut self) -> Result<Option<InterleaveDef>> {
        if !self.check(&Token::Interleave) {
            return Ok(None);
        }
        self.advance();
        self.expect(&Token::In)?;
        self.expect_word("parent")?;
        let parent = self.parse_table_name()?;
        let columns = self.parse_paren_identifier_list()?;
        Ok(Some(InterleaveDef { parent, columns }))
    }

    fn parse_family_def(&mut self) -> Result<FamilyDef> {
        self.expect(&Token::Family)?;
        let name = self.accept_identifier();
        let columns = self.parse_paren_identifier_list()?;
        Ok(FamilyDef { name, columns })
    }

    fn parse_create_index(&mut self) -> Result<CreateIndexStatement> {
        let unique = if self.check(&Token::Unique) {
            self.advance();
            true
        } else {
            false
        };

        self.expect(&Token::Index)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.accept_identifier();
        self.expect(&Token::On)?;
        let table = self.parse_table_name()?;

        let columns = self.parse_index_columns()?;
        let storing = self.parse_storing()?;
        let interleave = self.parse_interleave()?;

        Ok(CreateIndexStatement {
            index: IndexDef {
                name,
                unique,
                columns,
                storing,
                interleave,
            },
            table,
            if_not_exists,
        })
    }

    fn parse_create_view(&mut self) -> Result<CreateViewStatement> {
        self.expect(&Token::View)?;
        let name = self.parse_table_name()?;
        let columns = if self.check(&Token::LParen) {
            Some(self.parse_paren_identifier_list()?)
        } else {
            None
        };
        self.expect(&Token::As)?;
        let query = self.parse_select()?;
        Ok(CreateViewStatement {
            name,
            columns,
            query,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;
        let mut column = ColumnDef::new(name, data_type);

        loop {
            match self.current() {
                Token::Not => {
                    self.advance();
                    self.expect(&Token::Null)?;
                    column.not_null = true;
                }
                Token::Null => {
                    self.advance();
                    column.not_null = false;
                }
                Token::Default => {
                    self.advance();
                    column.default = Some(self.parse_additive_expr()?);
                }
                Token::Primary => {
                    self.advance();
                    self.expect(&Token::Key)?;
                    column.primary_key = true;
                    column.not_null = true;
                }
                Token::Unique => {
                    self.advance();
                    column.unique = true;
                }
                Token::Check => {
                    self.advance();
                    self.expect(&Token::LParen)?;
                    column.check = Some(self.parse_expr()?);
                    self.expect(&Token::RParen)?;
                }
                Token::References => {
                    self.advance();
                    let table = self.parse_table_name()?;
                    let ref_column = if self.check(&Token::LParen) {
                        self.advance();
                        let c = self.expect_identifier()?;
                        self.expect(&Token::RParen)?;
                        Some(c)
                    } else {
                        None
                    };
                    column.references = Some((table, ref_column));
                }
                _ => break,
            }
        }

        Ok(column)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let dt = match self.current() {
            Token::Int | Token::Integer => DataType::Integer,
            Token::BigInt => DataType::BigInt,
            Token::SmallInt => DataType::SmallInt,
            Token::Float => DataType::Float,
            Token::Double => DataType::Double,
            Token::Text | Token::String => DataType::Text,
            Token::Boolean | Token::Bool => DataType::Boolean,
            Token::Date => DataType::Date,
            Token::Time => DataType::Time,
            Token::Timestamp => DataType::Timestamp,
            Token::Bytes => DataType::Bytes,
            Token::Decimal | Token::Numeric => {
                self.advance();
                return if self.check(&Token::LParen) {
                    self.advance();
                    let precision = self.expect_integer()? as u8;
                    let scale = if self.check(&Token::Comma) {
                        self.advance();
                        self.expect_integer()? as u8
                    } else {
                        0
                    };
                    self.expect(&Token::RParen)?;
                    Ok(DataType::Decimal(precision, scale))
                } else {
                    Ok(DataType::Decimal(10, 0))
                };
            }
            Token::Varchar => {
                self.advance();
                self.expect(&Token::LParen)?;
                let len = self.expect_integer()? as usize;
                self.expect(&Token::RParen)?;
                return Ok(DataType::Varchar(len));
            }
            Token::Char => {
                self.advance();
                if !self.check(&Token::LParen) {
                    return Ok(DataType::Char(1));
                }
                self.advance();
                let len = self.expect_integer()? as usize;
                self.expect(&Token::RParen)?;
                return Ok(DataType::Char(len));
            }
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "data type".to_string(),
                    found: format!("{}", self.current()),
                });
            }
        };
        self.advance();

        Ok(dt)
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let name = if self.check(&Token::Constraint) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };

        match self.current() {
            Token::Primary => {
                self.advance();
                self.expect(&Token::Key)?;
                let columns = self.parse_index_columns()?;
                Ok(TableConstraint::PrimaryKey { name, columns })
            }
            Token::Unique => {
                self.advance();
                let columns = self.parse_index_columns()?;
                Ok(TableConstraint::Unique { name, columns })
            }
            Token::Foreign => {
                self.advance();
                self.expect(&Token::Key)?;
                let columns = self.parse_paren_identifier_list()?;
                self.expect(&Token::References)?;
                let ref_table = self.parse_table_name()?;
                let ref_columns = if self.check(&Token::LParen) {
                    Some(self.parse_paren_identifier_list()?)
                } else {
                    None
                };
                Ok(TableConstraint::ForeignKey {
                    name,
                    columns,
                    ref_table,
                    ref_columns,
                })
            }
            Token::Check => {
                self.advance();
                self.expect(&Token::LParen)?;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(TableConstraint::Check { name, expr })
            }
            _ => Err(Error::UnexpectedToken {
                expected: "PRIMARY, UNIQUE, FOREIGN, or CHECK".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== DROP Statement ==========

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(&Token::Drop)?;
        self.expect(&Token::Table)?;

        let if_exists = if self.check(&Token::If) {
            self.advance();
            self.expect(&Token::Exists)?;
            true
        } else {
            false
        };

        let name = self.parse_table_name()?;

        Ok(Statement::DropTable(DropTableStatement { name, if_exists }))
    }

    // ========== GRANT / REVOKE ==========

    fn parse_grant(&mut self) -> Result<GrantStatement> {
        self.expect(&Token::Grant)?;
        let privileges = self.parse_privileges()?;
        self.expect(&Token::On)?;
        let targets = self.parse_target_list()?;
        self.expect(&Token::To)?;
        let grantees = self.parse_identifier_list()?;
        Ok(GrantStatement {
            privileges,
            targets,
            grantees,
        })
    }

    fn parse_revoke(&mut self) -> Result<GrantStatement> {
        self.expect(&Token::Revoke)?;
        let privileges = self.parse_privileges()?;
        self.expect(&Token::On)?;
        let targets = self.parse_target_list()?;
        self.expect(&Token::From)?;
        let grantees = self.parse_identifier_list()?;
        Ok(GrantStatement {
            privileges,
            targets,
            grantees,
        })
    }

    fn parse_privileges(&mut self) -> Result<Vec<Privilege>> {
        if self.check(&Token::All) {
            self.advance();
            if self.check_word("privileges") {
                self.advance();
            }
            return Ok(vec![Privilege::All]);
        }

        let mut privileges = Vec::new();
        loop {
            let privilege =
                Privilege::parse(&self.current().to_string()).ok_or_else(|| {
                    Error::UnexpectedToken {
                        expected: "privilege".to_string(),
                        found: format!("{}", self.current()),
                    }
                })?;
            self.advance();
            privileges.push(privilege);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        Ok(privileges)
    }

    fn parse_target_list(&mut self) -> Result<TargetList> {
        if self.check(&Token::Database) {
            self.advance();
            return Ok(TargetList::Databases(self.parse_identifier_list()?));
        }
        if self.check(&Token::Table) {
            self.advance();
        }

        let mut patterns = Vec::new();
        loop {
            patterns.push(self.parse_table_pattern()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        Ok(TargetList::Tables(patterns))
    }

    fn parse_table_pattern(&mut self) -> Result<TablePattern> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(TablePattern::AllTables(None));
        }
        let first = self.expect_identifier()?;
        if !self.check(&Token::Dot) {
            return Ok(TablePattern::Table(TableName {
                database: None,
                table: first,
            }));
        }
        self.advance();
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(TablePattern::AllTables(Some(first)));
        }
        let table = self.expect_identifier()?;
        Ok(TablePattern::Table(TableName {
            database: Some(first),
            table,
        }))
    }

    // ========== SET / Transactions ==========

    fn parse_set(&mut self) -> Result<Statement> {
        self.expect(&Token::Set)?;

        if self.check(&Token::Transaction) {
            self.advance();
            return self.parse_transaction_modes().map(Statement::SetTransaction);
        }

        let mut words = Vec::new();
        loop {
            match self.current() {
                Token::Eq | Token::To => {
                    self.advance();
                    break;
                }
                Token::Identifier(w) => words.push(w.clone()),
                tok if tok.is_keyword() => words.push(tok.to_string()),
                _ => break,
            }
            self.advance();
        }
        if words.is_empty() {
            return Err(Error::UnexpectedToken {
                expected: "variable name".to_string(),
                found: format!("{}", self.current()),
            });
        }

        let values = self.parse_expr_list()?;
        Ok(Statement::Set(SetStatement {
            name: words.join(" "),
            values,
        }))
    }

    fn parse_transaction_modes(&mut self) -> Result<SetTransactionStatement> {
        let mut stmt = SetTransactionStatement::default();
        loop {
            if self.check_word("isolation") {
                self.advance();
                self.expect_word("level")?;
                stmt.isolation = Some(self.expect_identifier()?);
            } else if self.check_word("priority") {
                self.advance();
                stmt.priority = Some(self.expect_identifier()?);
            } else {
                return Err(Error::UnexpectedToken {
                    expected: "ISOLATION LEVEL or PRIORITY".to_string(),
                    found: format!("{}", self.current()),
                });
            }

            if self.check(&Token::Comma) {
                self.advance();
            } else if self.is_at_end() || self.check(&Token::Semicolon) {
                break;
            }
        }
        Ok(stmt)
    }

    fn parse_transaction_control(&mut self) -> Result<Statement> {
        let stmt = match self.current() {
            Token::Begin => Statement::BeginTransaction,
            Token::Commit => Statement::Commit,
            _ => Statement::Rollback,
        };
        self.advance();
        if self.check(&Token::Transaction) {
            self.advance();
        }
        Ok(stmt)
    }

    // ========== Expression Parsing ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = binary(left, BinaryOperator::Or, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = binary(left, BinaryOperator::And, right);
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            })
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive_expr()?;

        if self.check(&Token::Is) {
            self.advance();
            let negated = self.check(&Token::Not);
            if negated {
                self.advance();
            }
            self.expect(&Token::Null)?;
            return Ok(if negated {
                Expr::IsNotNull(Box::new(left))
            } else {
                Expr::IsNull(Box::new(left))
            });
        }

        let negated = self.check(&Token::Not)
            && matches!(
                self.peek(),
                Some(Token::Between) | Some(Token::In) | Some(Token::Like)
            );
        if negated {
            self.advance();
        }

        match self.current() {
            Token::Between => {
                self.advance();
                let low = self.parse_additive_expr()?;
                self.expect(&Token::And)?;
                let high = self.parse_additive_expr()?;
                return Ok(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                });
            }
            Token::In => {
                self.advance();
                self.expect(&Token::LParen)?;
                let list = self.parse_expr_list()?;
                self.expect(&Token::RParen)?;
                return Ok(Expr::InList {
                    expr: Box::new(left),
                    list,
                    negated,
                });
            }
            Token::Like => {
                self.advance();
                let pattern = self.parse_primary_expr()?;
                return Ok(Expr::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    negated,
                });
            }
            _ => {}
        }

        let op = match self.current() {
            Token::Eq => BinaryOperator::Eq,
            Token::Neq => BinaryOperator::Neq,
            Token::Lt => BinaryOperator::Lt,
            Token::Gt => BinaryOperator::Gt,
            Token::Lte => BinaryOperator::Lte,
            Token::Gte => BinaryOperator::Gte,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive_expr()?;
        Ok(binary(left, op, right))
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.current() {
            Token::Minus => UnaryOperator::Minus,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary_expr(),
        };
        self.advance();
        let expr = self.parse_unary_expr()?;
        Ok(Expr::UnaryOp {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let literal = match self.current().clone() {
            Token::IntegerLiteral(n) => Some(Literal::Integer(n)),
            Token::FloatLiteral(n) => Some(Literal::Float(n)),
            Token::StringLiteral(s) => Some(Literal::String(s)),
            Token::True => Some(Literal::Boolean(true)),
            Token::False => Some(Literal::Boolean(false)),
            Token::Null => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::Literal(literal));
        }

        match self.current() {
            // Parenthesized expression or subquery
            Token::LParen => {
                self.advance();
                if self.check(&Token::Select) {
                    let subquery = self.parse_select()?;
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Subquery(Box::new(subquery)))
                } else {
                    let expr = self.parse_expr()?;
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Nested(Box::new(expr)))
                }
            }
            Token::Exists => {
                self.advance();
                self.expect(&Token::LParen)?;
                let subquery = self.parse_select()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Exists(Box::new(subquery)))
            }
            Token::Case => self.parse_case_expr(),
            Token::Identifier(_) | Token::QuotedIdentifier(_) => {
                let name = self.expect_identifier()?;

                if self.check(&Token::LParen) {
                    self.parse_function(name)
                } else if self.check(&Token::Dot) {
                    self.advance();
                    let column = self.expect_identifier()?;
                    Ok(Expr::Column(ColumnRef {
                        table: Some(name),
                        column,
                    }))
                } else {
                    Ok(Expr::Column(ColumnRef::from(name)))
                }
            }
            _ => Err(Error::UnexpectedToken {
                expected: "expression".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn parse_function(&mut self, name: String) -> Result<Expr> {
        self.expect(&Token::LParen)?;

        let distinct = if self.check(&Token::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let args = if self.check(&Token::Asterisk) {
            self.advance();
            vec![Expr::Column(ColumnRef::from("*".to_string()))]
        } else if self.check(&Token::RParen) {
            vec![]
        } else {
            self.parse_expr_list()?
        };

        self.expect(&Token::RParen)?;

        Ok(Expr::Function {
            name,
            args,
            distinct,
        })
    }

    fn parse_case_expr(&mut self) -> Result<Expr> {
        self.expect(&Token::Case)?;

        let operand = if !self.check(&Token::When) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        let mut when_clauses = Vec::new();
        while self.check(&Token::When) {
            self.advance();
            let when_expr = self.parse_expr()?;
            self.expect(&Token::Then)?;
            let then_expr = self.parse_expr()?;
            when_clauses.push((when_expr, then_expr));
        }

        let else_clause = if self.check(&Token::Else) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };

        self.expect(&Token::End)?;

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    // ========== Helper functions ==========

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.check(&Token::Comma) {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![self.expect_identifier()?];
        while self.check(&Token::Comma) {
            self.advance();
            identifiers.push(self.expect_identifier()?);
        }
        Ok(identifiers)
    }

    fn parse_paren_identifier_list(&mut self) -> Result<Vec<String>> {
        self.expect(&Token::LParen)?;
        let identifiers = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;
        Ok(identifiers)
    }

    /// `name` or `database.name`
    fn parse_table_name(&mut self) -> Result<TableName> {
        let first = self.expect_identifier()?;
        if self.check(&Token::Dot) {
            self.advance();
            let table = self.expect_identifier()?;
            Ok(TableName {
                database: Some(first),
                table,
            })
        } else {
            Ok(TableName {
                database: None,
                table: first,
            })
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    /// Is the current token the unquoted, non-keyword word `word`?
    fn check_word(&self, word: &str) -> bool {
        matches!(self.current(), Token::Identifier(w) if w == word)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: word.to_uppercase(),
                found: format!("{}", self.current()),
            })
        }
    }

    fn current_identifier(&self) -> Option<String> {
        match self.current() {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Consume an identifier if there is one
    fn accept_identifier(&mut self) -> Option<String> {
        let name = self.current_identifier()?;
        self.advance();
        Some(name)
    }

    fn expect_identifier(&mut self) -> Result<String> {
        self.accept_identifier()
            .ok_or_else(|| Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            })
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "integer".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::parse_one(sql).unwrap()
    }

    #[test]
    fn test_parse_simple_select() {
        match parse("SELECT * FROM users") {
            Statement::Select(s) => {
                assert_eq!(s.columns.len(), 1);
                assert!(matches!(s.columns[0], SelectItem::Wildcard));
                assert!(s.from.is_some());
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_join() {
        match parse("SELECT u.name, o.total FROM db.users u LEFT JOIN orders AS o ON u.id = o.user_id")
        {
            Statement::Select(s) => {
                let from = s.from.unwrap();
                assert_eq!(from.table.name, TableName::new(Some("db"), "users"));
                assert_eq!(from.table.alias, Some("u".to_string()));
                assert_eq!(from.joins.len(), 1);
                assert!(matches!(from.joins[0].join_type, JoinType::Left));
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_select_formats_back_to_itself() {
        let sql = "SELECT a, b + 1 AS \"Total\", count(*) FROM db.t WHERE (a > -1) AND b IS NOT NULL ORDER BY a DESC LIMIT 3";
        let first = match parse(sql) {
            Statement::Select(s) => s,
            _ => panic!("Expected SELECT statement"),
        };
        assert_eq!(first.to_string(), sql);
        match parse(&first.to_string()) {
            Statement::Select(second) => assert_eq!(first, second),
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email STRING UNIQUE,
                age INT DEFAULT 0 CHECK (age >= 0),
                INDEX by_name (name DESC) STORING (email),
                FAMILY f1 (id, name),
                CONSTRAINT pos CHECK (id > 0)
            )",
        );

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, TableName::new(None, "users"));
                assert_eq!(ct.columns.len(), 4);
                assert!(ct.columns[0].primary_key);
                assert!(ct.columns[1].not_null);
                assert!(ct.columns[2].unique);
                assert_eq!(ct.columns[2].data_type, DataType::Text);
                assert!(ct.columns[3].default.is_some());
                assert!(ct.columns[3].check.is_some());
                assert_eq!(ct.indexes.len(), 1);
                assert_eq!(ct.indexes[0].columns[0].direction, Direction::Desc);
                assert_eq!(ct.indexes[0].storing, vec!["email"]);
                assert_eq!(ct.families[0].name.as_deref(), Some("f1"));
                assert!(matches!(
                    &ct.constraints[0],
                    TableConstraint::Check { name: Some(n), .. } if n == "pos"
                ));
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_interleave() {
        match parse("CREATE TABLE c (a INT, b INT, PRIMARY KEY (a, b)) INTERLEAVE IN PARENT db.p (a)")
        {
            Statement::CreateTable(ct) => {
                let interleave = ct.interleave.unwrap();
                assert_eq!(interleave.parent, TableName::new(Some("db"), "p"));
                assert_eq!(interleave.columns, vec!["a"]);
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_unique_index_vs_unique_constraint() {
        match parse("CREATE TABLE t (a INT, b INT, UNIQUE INDEX ab (a, b), UNIQUE (b))") {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.indexes.len(), 1);
                assert!(ct.indexes[0].unique);
                assert!(matches!(ct.constraints[0], TableConstraint::Unique { .. }));
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_index() {
        match parse("CREATE UNIQUE INDEX foo ON t (a, b) STORING (c)") {
            Statement::CreateIndex(ci) => {
                assert!(ci.index.unique);
                assert_eq!(ci.index.name.as_deref(), Some("foo"));
                assert_eq!(ci.index.storing, vec!["c"]);
                assert_eq!(ci.table.table, "t");
            }
            _ => panic!("Expected CREATE INDEX statement"),
        }
    }

    #[test]
    fn test_parse_create_view() {
        match parse("CREATE VIEW v (x, y) AS SELECT a, b FROM t") {
            Statement::CreateView(cv) => {
                assert_eq!(cv.columns, Some(vec!["x".to_string(), "y".to_string()]));
                assert_eq!(cv.query.columns.len(), 2);
            }
            _ => panic!("Expected CREATE VIEW statement"),
        }
    }

    #[test]
    fn test_parse_show_statements() {
        assert_eq!(parse("SHOW ALL"), Statement::ShowVariable("ALL".to_string()));
        assert_eq!(
            parse("SHOW TIME ZONE"),
            Statement::ShowVariable("TIME zone".to_string())
        );
        assert_eq!(
            parse("SHOW COLUMNS FROM db.t"),
            Statement::ShowColumns(TableName::new(Some("db"), "t"))
        );
        assert_eq!(parse("SHOW TABLES"), Statement::ShowTables(None));
        assert_eq!(
            parse("SHOW TABLES FROM db"),
            Statement::ShowTables(Some("db".to_string()))
        );
        assert_eq!(parse("SHOW DATABASES"), Statement::ShowDatabases);
        assert_eq!(parse("SHOW USERS"), Statement::ShowUsers);
        assert_eq!(
            parse("SHOW KEYS FROM t"),
            Statement::ShowIndex(TableName::new(None, "t"))
        );
        assert_eq!(
            parse("SHOW CONSTRAINTS FROM t"),
            Statement::ShowConstraints(TableName::new(None, "t"))
        );
        assert_eq!(
            parse("SHOW CREATE VIEW \"V\""),
            Statement::ShowCreateView(TableName::new(None, "V"))
        );
        assert_eq!(parse("HELP Length"), Statement::Help("length".to_string()));
    }

    #[test]
    fn test_parse_show_grants() {
        match parse("SHOW GRANTS ON TABLE t, db.* FOR alice, bob") {
            Statement::ShowGrants(g) => {
                assert_eq!(
                    g.targets,
                    Some(TargetList::Tables(vec![
                        TablePattern::Table(TableName::new(None, "t")),
                        TablePattern::AllTables(Some("db".to_string())),
                    ]))
                );
                assert_eq!(g.grantees.unwrap(), vec!["alice", "bob"]);
            }
            _ => panic!("Expected SHOW GRANTS statement"),
        }
        match parse("SHOW GRANTS") {
            Statement::ShowGrants(g) => assert!(g.targets.is_none() && g.grantees.is_none()),
            _ => panic!("Expected SHOW GRANTS statement"),
        }
    }

    #[test]
    fn test_parse_grant_and_revoke() {
        match parse("GRANT SELECT, INSERT ON DATABASE db TO alice") {
            Statement::Grant(g) => {
                assert_eq!(g.privileges, vec![Privilege::Select, Privilege::Insert]);
                assert_eq!(g.targets, TargetList::Databases(vec!["db".to_string()]));
                assert_eq!(g.grantees, vec!["alice"]);
            }
            _ => panic!("Expected GRANT statement"),
        }
        match parse("REVOKE ALL PRIVILEGES ON t FROM bob") {
            Statement::Revoke(g) => assert_eq!(g.privileges, vec![Privilege::All]),
            _ => panic!("Expected REVOKE statement"),
        }
    }

    #[test]
    fn test_parse_set() {
        match parse("SET DATABASE = db") {
            Statement::Set(s) => {
                assert_eq!(s.name, "DATABASE");
                assert_eq!(s.values.len(), 1);
            }
            _ => panic!("Expected SET statement"),
        }
        match parse("SET TIME ZONE 'UTC'") {
            Statement::Set(s) => assert_eq!(s.name, "TIME zone"),
            _ => panic!("Expected SET statement"),
        }
        match parse("SET TRANSACTION ISOLATION LEVEL snapshot, PRIORITY high") {
            Statement::SetTransaction(s) => {
                assert_eq!(s.isolation.as_deref(), Some("snapshot"));
                assert_eq!(s.priority.as_deref(), Some("high"));
            }
            _ => panic!("Expected SET TRANSACTION statement"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::parse_one("SHOW COLUMNS t").is_err());
        assert!(Parser::parse_one("SHOW").is_err());
        assert!(Parser::parse_one("GRANT FLY ON t TO alice").is_err());
        assert!(Parser::parse_one("SELECT 1 2").is_err());
    }

    #[test]
    fn test_parse_all() {
        let mut parser = Parser::new("BEGIN; SHOW DATABASES;; COMMIT TRANSACTION").unwrap();
        let stmts = parser.parse_all().unwrap();
        assert_eq!(
            stmts,
            vec![
                Statement::BeginTransaction,
                Statement::ShowDatabases,
                Statement::Commit
            ]
        );
    }
}
