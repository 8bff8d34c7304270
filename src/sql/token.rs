//! SQL Token definitions
//!
//! This module defines all tokens that can appear in SQL statements.
//! Words such as `COLUMNS`, `TABLES` or `PARENT` that only matter inside one
//! statement form are not keywords; the parser matches them as identifiers.

use std::fmt;

/// SQL Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Table,
    Index,
    Database,
    View,
    Family,
    Storing,
    Interleave,

    // Introspection & Access Control
    Show,
    Help,
    Grant,
    Revoke,
    To,

    // DML Keywords
    Select,
    Insert,
    Update,
    Delete,
    Set,
    From,
    Where,

    // Clauses
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Outer,
    Full,
    Cross,

    // Ordering & Grouping
    Order,
    By,
    Asc,
    Desc,
    Group,
    Having,
    Limit,
    Offset,

    // Constraints
    Primary,
    Foreign,
    Key,
    References,
    Unique,
    Check,
    Default,
    Constraint,
    Null,

    // Data Types
    Int,
    Integer,
    BigInt,
    SmallInt,
    Float,
    Double,
    Decimal,
    Numeric,
    Varchar,
    Char,
    Text,
    String,
    Boolean,
    Bool,
    Date,
    Time,
    Timestamp,
    Bytes,

    // Boolean Literals
    True,
    False,

    // Other Keywords
    Distinct,
    All,
    Exists,
    In,
    Between,
    Like,
    Is,
    Case,
    When,
    Then,
    Else,
    End,
    If,
    Begin,
    Commit,
    Rollback,
    Transaction,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(std::string::String),
    /// Identifier (table name, column name, etc.), folded to lower case
    Identifier(std::string::String),
    /// Double-quoted identifier, kept verbatim
    QuotedIdentifier(std::string::String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Asterisk,
    /// /
    Slash,
    /// %
    Percent,
    /// ||
    Concat,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        !matches!(
            self,
            Token::IntegerLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::Identifier(_)
                | Token::QuotedIdentifier(_)
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Gt
                | Token::Lte
                | Token::Gte
                | Token::Plus
                | Token::Minus
                | Token::Asterisk
                | Token::Slash
                | Token::Percent
                | Token::Concat
                | Token::LParen
                | Token::RParen
                | Token::Comma
                | Token::Semicolon
                | Token::Dot
                | Token::Eof
        )
    }

    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            // DDL
            "CREATE" => Some(Token::Create),
            "DROP" => Some(Token::Drop),
            "TABLE" => Some(Token::Table),
            "INDEX" => Some(Token::Index),
            "DATABASE" => Some(Token::Database),
            "VIEW" => Some(Token::View),
            "FAMILY" => Some(Token::Family),
            "STORING" => Some(Token::Storing),
            "INTERLEAVE" => Some(Token::Interleave),

            // Introspection & Access Control
            "SHOW" => Some(Token::Show),
            "HELP" => Some(Token::Help),
            "GRANT" => Some(Token::Grant),
            "REVOKE" => Some(Token::Revoke),
            "TO" => Some(Token::To),

            // DML
            "SELECT" => Some(Token::Select),
            "INSERT" => Some(Token::Insert),
            "UPDATE" => Some(Token::Update),
            "DELETE" => Some(Token::Delete),
            "SET" => Some(Token::Set),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),

            // Clauses
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            "AS" => Some(Token::As),
            "ON" => Some(Token::On),
            "JOIN" => Some(Token::Join),
            "INNER" => Some(Token::Inner),
            "LEFT" => Some(Token::Left),
            "RIGHT" => Some(Token::Right),
            "OUTER" => Some(Token::Outer),
            "FULL" => Some(Token::Full),
            "CROSS" => Some(Token::Cross),

            // Ordering & Grouping
            "ORDER" => Some(Token::Order),
            "BY" => Some(Token::By),
            "ASC" => Some(Token::Asc),
            "DESC" => Some(Token::Desc),
            "GROUP" => Some(Token::Group),
            "HAVING" => Some(Token::Having),
            "LIMIT" => Some(Token::Limit),
            "OFFSET" => Some(Token::Offset),

            // Constraints
            "PRIMARY" => Some(Token::Primary),
            "FOREIGN" => Some(Token::Foreign),
            "KEY" => Some(Token::Key),
            "REFERENCES" => Some(Token::References),
            "UNIQUE" => Some(Token::Unique),
            "CHECK" => Some(Token::Check),
            "DEFAULT" => Some(Token::Default),
            "CONSTRAINT" => Some(Token::Constraint),
            "NULL" => Some(Token::Null),

            // Data Types
            "INT" => Some(Token::Int),
            "INTEGER" => Some(Token::Integer),
            "BIGINT" => Some(Token::BigInt),
            "SMALLINT" => Some(Token::SmallInt),
            "FLOAT" => Some(Token::Float),
            "DOUBLE" => Some(Token::Double),
            "DECIMAL" => Some(Token::Decimal),
            "NUMERIC" => Some(Token::Numeric),
            "VARCHAR" => Some(Token::Varchar),
            "CHAR" => Some(Token::Char),
            "TEXT" => Some(Token::Text),
            "STRING" => Some(Token::String),
            "BOOLEAN" => Some(Token::Boolean),
            "BOOL" => Some(Token::Bool),
            "DATE" => Some(Token::Date),
            "TIME" => Some(Token::Time),
            "TIMESTAMP" => Some(Token::Timestamp),
            "BYTES" => Some(Token::Bytes),

            // Boolean Literals
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),

            // Other Keywords
            "DISTINCT" => Some(Token::Distinct),
            "ALL" => Some(Token::All),
            "EXISTS" => Some(Token::Exists),
            "IN" => Some(Token::In),
            "BETWEEN" => Some(Token::Between),
            "LIKE" => Some(Token::Like),
            "IS" => Some(Token::Is),
            "CASE" => Some(Token::Case),
            "WHEN" => Some(Token::When),
            "THEN" => Some(Token::Then),
            "ELSE" => Some(Token::Else),
            "END" => Some(Token::End),
            "IF" => Some(Token::If),
            "BEGIN" => Some(Token::Begin),
            "COMMIT" => Some(Token::Commit),
            "ROLLBACK" => Some(Token::Rollback),
            "TRANSACTION" => Some(Token::Transaction),

            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Create => write!(f, "CREATE"),
            Token::Drop => write!(f, "DROP"),
            Token::Table => write!(f, "TABLE"),
            Token::Index => write!(f, "INDEX"),
            Token::Database => write!(f, "DATABASE"),
            Token::View => write!(f, "VIEW"),
            Token::Family => write!(f, "FAMILY"),
            Token::Storing => write!(f, "STORING"),
            Token::Interleave => write!(f, "INTERLEAVE"),
            Token::Show => write!(f, "SHOW"),
            Token::Help => write!(f, "HELP"),
            Token::Grant => write!(f, "GRANT"),
            Token::Revoke => write!(f, "REVOKE"),
            Token::To => write!(f, "TO"),
            Token::Select => write!(f, "SELECT"),
            Token::Insert => write!(f, "INSERT"),
            Token::Update => write!(f, "UPDATE"),
            Token::Delete => write!(f, "DELETE"),
            Token::Set => write!(f, "SET"),
            Token::From => write!(f, "FROM"),
            Token::Where => write!(f, "WHERE"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::As => write!(f, "AS"),
            Token::On => write!(f, "ON"),
            Token::Join => write!(f, "JOIN"),
            Token::Inner => write!(f, "INNER"),
            Token::Left => write!(f, "LEFT"),
            Token::Right => write!(f, "RIGHT"),
            Token::Outer => write!(f, "OUTER"),
            Token::Full => write!(f, "FULL"),
            Token::Cross => write!(f, "CROSS"),
            Token::Order => write!(f, "ORDER"),
            Token::By => write!(f, "BY"),
            Token::Asc => write!(f, "ASC"),
            Token::Desc => write!(f, "DESC"),
            Token::Group => write!(f, "GROUP"),
            Token::Having => write!(f, "HAVING"),
            Token::Limit => write!(f, "LIMIT"),
            Token::Offset => write!(f, "OFFSET"),
            Token::Primary => write!(f, "PRIMARY"),
            Token::Foreign => write!(f, "FOREIGN"),
            Token::Key => write!(f, "KEY"),
            Token::References => write!(f, "REFERENCES"),
            Token::Unique => write!(f, "UNIQUE"),
            Token::Check => write!(f, "CHECK"),
            Token::Default => write!(f, "DEFAULT"),
            Token::Constraint => write!(f, "CONSTRAINT"),
            Token::Null => write!(f, "NULL"),
            Token::Int => write!(f, "INT"),
            Token::Integer => write!(f, "INTEGER"),
            Token::BigInt => write!(f, "BIGINT"),
            Token::SmallInt => write!(f, "SMALLINT"),
            Token::Float => write!(f, "FLOAT"),
            Token::Double => write!(f, "DOUBLE"),
            Token::Decimal => write!(f, "DECIMAL"),
            Token::Numeric => write!(f, "NUMERIC"),
            Token::Varchar => write!(f, "VARCHAR"),
            Token::Char => write!(f, "CHAR"),
            Token::Text => write!(f, "TEXT"),
            Token::String => write!(f, "STRING"),
            Token::Boolean => write!(f, "BOOLEAN"),
            Token::Bool => write!(f, "BOOL"),
            Token::Date => write!(f, "DATE"),
            Token::Time => write!(f, "TIME"),
            Token::Timestamp => write!(f, "TIMESTAMP"),
            Token::Bytes => write!(f, "BYTES"),
            Token::True => write!(f, "TRUE"),
            Token::False => write!(f, "FALSE"),
            Token::Distinct => write!(f, "DISTINCT"),
            Token::All => write!(f, "ALL"),
            Token::Exists => write!(f, "EXISTS"),
            Token::In => write!(f, "IN"),
            Token::Between => write!(f, "BETWEEN"),
            Token::Like => write!(f, "LIKE"),
            Token::Is => write!(f, "IS"),
            Token::Case => write!(f, "CASE"),
            Token::When => write!(f, "WHEN"),
            Token::Then => write!(f, "THEN"),
            Token::Else => write!(f, "ELSE"),
            Token::End => write!(f, "END"),
            Token::If => write!(f, "IF"),
            Token::Begin => write!(f, "BEGIN"),
            Token::Commit => write!(f, "COMMIT"),
            Token::Rollback => write!(f, "ROLLBACK"),
            Token::Transaction => write!(f, "TRANSACTION"),
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::QuotedIdentifier(s) => write!(f, "\"{}\"", s),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "<>"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Concat => write!(f, "||"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(Token::from_keyword("SELECT"), Some(Token::Select));
        assert_eq!(Token::from_keyword("show"), Some(Token::Show));
        assert_eq!(Token::from_keyword("StOrInG"), Some(Token::Storing));
        assert_eq!(Token::from_keyword("columns"), None);
        assert_eq!(Token::from_keyword("unknown"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(Token::Select.is_keyword());
        assert!(Token::Interleave.is_keyword());
        assert!(!Token::Asterisk.is_keyword());
        assert!(!Token::IntegerLiteral(42).is_keyword());
        assert!(!Token::QuotedIdentifier("select".into()).is_keyword());
    }
}
