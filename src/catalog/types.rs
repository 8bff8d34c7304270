//! Data types for ShowDB
//!
//! This module defines the SQL column types a descriptor can carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Data Types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type
    Boolean,
    /// Small integer (16-bit)
    SmallInt,
    /// Integer (32-bit)
    Integer,
    /// Big integer (64-bit)
    BigInt,
    /// Single-precision floating point
    Float,
    /// Double-precision floating point
    Double,
    /// Fixed-point decimal with precision and scale
    Decimal(u8, u8),
    /// Fixed-length character string
    Char(usize),
    /// Variable-length character string with max length
    Varchar(usize),
    /// Unlimited text
    Text,
    /// Date (year, month, day)
    Date,
    /// Time (hour, minute, second)
    Time,
    /// Timestamp (date + time)
    Timestamp,
    /// Binary data
    Bytes,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::SmallInt
                | DataType::Integer
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
                | DataType::Decimal(_, _)
        )
    }

    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::Char(_) | DataType::Varchar(_) | DataType::Text
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Decimal(p, s) => write!(f, "DECIMAL({}, {})", p, s),
            DataType::Char(n) => write!(f, "CHAR({})", n),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Bytes => write!(f, "BYTES"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
        assert_eq!(DataType::Decimal(10, 2).to_string(), "DECIMAL(10, 2)");
        assert_eq!(DataType::Varchar(100).to_string(), "VARCHAR(100)");
        assert_eq!(DataType::Bytes.to_string(), "BYTES");
    }

    #[test]
    fn test_type_classes() {
        assert!(DataType::BigInt.is_numeric());
        assert!(DataType::Varchar(50).is_string());
        assert!(!DataType::Integer.is_string());
    }
}
