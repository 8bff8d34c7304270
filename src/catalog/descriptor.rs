//! Structured descriptors for databases, tables and views
//!
//! A [`TableDescriptor`] is the single source of truth for everything the
//! SHOW statements and the DDL reconstructor print: ordered columns, the
//! primary index, secondary indexes, column families, check constraints,
//! foreign keys and (for views) the stored query text.

use super::privilege::PrivilegeDescriptor;
use super::types::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by databases and tables
pub type DescriptorId = u32;
/// Column identifier, unique within a table
pub type ColumnId = u32;
/// Index identifier, unique within a table
pub type IndexId = u32;
/// Family identifier, unique within a table
pub type FamilyId = u32;

/// Name of the implicit primary key column of tables declared without one
pub const ROWID_COLUMN: &str = "rowid";
/// Default expression of the implicit primary key column
pub const ROWID_DEFAULT: &str = "unique_rowid()";
/// Name given to primary indexes and default families
pub const PRIMARY_NAME: &str = "primary";

// ========== Databases ==========

/// Database descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub privileges: PrivilegeDescriptor,
}

impl DatabaseDescriptor {
    pub fn new(id: DescriptorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            privileges: PrivilegeDescriptor::new_default(),
        }
    }
}

// ========== Columns ==========

/// Column definition in a table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Unique id within the table
    pub id: ColumnId,
    /// SQL type
    pub data_type: DataType,
    /// Is this column nullable?
    pub nullable: bool,
    /// Default value expression (as SQL text)
    pub default_expr: Option<String>,
    /// Hidden columns (the implicit rowid) are never shown
    pub hidden: bool,
    /// Columns mid schema-change are inactive
    pub active: bool,
}

impl ColumnDescriptor {
    /// Create a new nullable, active column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            id: 0,
            data_type,
            nullable: true,
            default_expr: None,
            hidden: false,
            active: true,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set default expression
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = Some(expr.into());
        self
    }

    /// Set hidden flag
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set active flag
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

// ========== Indexes ==========

/// Sort direction of an index key column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// One step of an interleave hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleaveAncestor {
    /// Ancestor table
    pub table_id: DescriptorId,
    /// Ancestor index (always the ancestor's primary index)
    pub index_id: IndexId,
    /// Number of key columns shared with this ancestor beyond the previous one
    pub shared_prefix_len: usize,
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name
    pub name: String,
    /// Index ID
    pub id: IndexId,
    /// Is this a unique index?
    pub unique: bool,
    /// Ordered key columns
    pub column_names: Vec<String>,
    /// Direction per key column
    pub column_directions: Vec<Direction>,
    /// Ids of the key columns
    pub column_ids: Vec<ColumnId>,
    /// Extra columns stored in the index
    pub store_column_names: Vec<String>,
    /// Ordered interleave ancestors, outermost first
    pub interleave: Vec<InterleaveAncestor>,
}

impl IndexDescriptor {
    /// Create an index over the given key columns, all ascending
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let directions = vec![Direction::Asc; columns.len()];
        Self {
            name: name.into(),
            id: 0,
            unique: false,
            column_names: columns,
            column_directions: directions,
            column_ids: Vec::new(),
            store_column_names: Vec::new(),
            interleave: Vec::new(),
        }
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set per-column directions
    pub fn directions(mut self, directions: Vec<Direction>) -> Self {
        self.column_directions = directions;
        self
    }

    /// Set storing columns
    pub fn storing(mut self, columns: Vec<String>) -> Self {
        self.store_column_names = columns;
        self
    }

    /// Total key columns shared with all interleave ancestors
    pub fn shared_prefix_len(&self) -> usize {
        self.interleave.iter().map(|a| a.shared_prefix_len).sum()
    }

    /// Check the structural invariants of this index
    pub fn validate(&self) -> Result<()> {
        if self.column_directions.len() != self.column_names.len() {
            return Err(Error::InvalidDescriptor(format!(
                "index \"{}\" has {} columns but {} directions",
                self.name,
                self.column_names.len(),
                self.column_directions.len()
            )));
        }
        if self.shared_prefix_len() > self.column_names.len() {
            return Err(Error::InvalidDescriptor(format!(
                "index \"{}\" shares {} columns with its ancestors but has only {}",
                self.name,
                self.shared_prefix_len(),
                self.column_names.len()
            )));
        }
        Ok(())
    }
}

// ========== Families ==========

/// Column family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyDescriptor {
    pub name: String,
    pub id: FamilyId,
    pub column_names: Vec<String>,
    pub column_ids: Vec<ColumnId>,
}

// ========== Constraints ==========

/// Validation state of a constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    #[default]
    Validated,
    Unvalidated,
}

/// CHECK constraint; `expr` is SQL text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub expr: String,
    pub validity: Validity,
}

/// Outbound foreign key reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub name: String,
    pub column_names: Vec<String>,
    pub referenced_table: DescriptorId,
    pub referenced_columns: Vec<String>,
    pub validity: Validity,
}

// ========== Tables and views ==========

/// Table definition - full table (or view) metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table ID
    pub id: DescriptorId,
    /// Owning database
    pub parent_id: DescriptorId,
    /// Table name
    pub name: String,
    /// Ordered columns (for views: the output columns)
    pub columns: Vec<ColumnDescriptor>,
    /// Primary index; empty for views and virtual tables
    pub primary_index: IndexDescriptor,
    /// Ordered secondary indexes
    pub indexes: Vec<IndexDescriptor>,
    /// Ordered column families
    pub families: Vec<FamilyDescriptor>,
    /// Ordered check constraints
    pub checks: Vec<CheckConstraint>,
    /// Outbound foreign keys
    pub foreign_keys: Vec<ForeignKeyReference>,
    /// Stored query of a view
    pub view_query: Option<String>,
    /// Synthesized system table
    #[serde(default)]
    pub is_virtual: bool,
    /// Grants on this table
    pub privileges: PrivilegeDescriptor,
}

impl TableDescriptor {
    /// Create an empty descriptor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            parent_id: 0,
            name: name.into(),
            columns: Vec::new(),
            primary_index: IndexDescriptor::new("", Vec::new()),
            indexes: Vec::new(),
            families: Vec::new(),
            checks: Vec::new(),
            foreign_keys: Vec::new(),
            view_query: None,
            is_virtual: false,
            privileges: PrivilegeDescriptor::new_default(),
        }
    }

    /// Is this a view?
    pub fn is_view(&self) -> bool {
        self.view_query.is_some()
    }

    /// Is this backed by stored rows (not a view, not synthesized)?
    pub fn is_physical_table(&self) -> bool {
        !self.is_view() && !self.is_virtual
    }

    /// Columns a user can see, in declaration order
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> + '_ {
        self.columns.iter().filter(|c| c.active && !c.hidden)
    }

    /// Find an active column by id
    pub fn find_active_column_by_id(&self, id: ColumnId) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.active && c.id == id)
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary index first, then secondary indexes in order
    pub fn all_indexes(&self) -> impl Iterator<Item = &IndexDescriptor> + '_ {
        std::iter::once(&self.primary_index)
            .filter(|idx| !idx.column_names.is_empty())
            .chain(self.indexes.iter())
    }

    /// Find an index by name
    pub fn find_index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.all_indexes().find(|idx| idx.name == name)
    }

    /// Check the structural invariants of this descriptor
    pub fn validate(&self) -> Result<()> {
        for index in self.all_indexes() {
            index.validate()?;
            for column in index
                .column_names
                .iter()
                .chain(index.store_column_names.iter())
            {
                if self.find_column(column).is_none() {
                    return Err(Error::InvalidDescriptor(format!(
                        "index \"{}\" refers to unknown column \"{}\"",
                        index.name, column
                    )));
                }
            }
        }
        for family in &self.families {
            for id in &family.column_ids {
                if !self.columns.iter().any(|c| c.id == *id) {
                    return Err(Error::InvalidDescriptor(format!(
                        "family \"{}\" refers to unknown column id {}",
                        family.name, id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableDescriptor {
        let mut desc = TableDescriptor::new("t");
        desc.columns = vec![
            ColumnDescriptor {
                id: 1,
                ..ColumnDescriptor::new("a", DataType::Integer).nullable(false)
            },
            ColumnDescriptor {
                id: 2,
                ..ColumnDescriptor::new("b", DataType::Text).active(false)
            },
            ColumnDescriptor {
                id: 3,
                ..ColumnDescriptor::new(ROWID_COLUMN, DataType::BigInt)
                    .nullable(false)
                    .hidden(true)
                    .default_expr(ROWID_DEFAULT)
            },
        ];
        desc.primary_index = IndexDescriptor::new(PRIMARY_NAME, vec![ROWID_COLUMN.to_string()]);
        desc
    }

    #[test]
    fn test_visible_columns_skip_hidden_and_inactive() {
        let desc = sample();
        let names: Vec<_> = desc.visible_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
        assert!(desc.find_active_column_by_id(2).is_none());
        assert!(desc.find_active_column_by_id(1).is_some());
    }

    #[test]
    fn test_view_is_not_physical() {
        let mut desc = sample();
        assert!(desc.is_physical_table());
        desc.view_query = Some("SELECT 1".to_string());
        assert!(desc.is_view());
        assert!(!desc.is_physical_table());
    }

    #[test]
    fn test_validate_interleave_prefix() {
        let mut desc = sample();
        desc.primary_index.interleave.push(InterleaveAncestor {
            table_id: 7,
            index_id: 1,
            shared_prefix_len: 2,
        });
        assert!(matches!(desc.validate(), Err(Error::InvalidDescriptor(_))));

        desc.primary_index.interleave[0].shared_prefix_len = 1;
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_index_column() {
        let mut desc = sample();
        desc.indexes
            .push(IndexDescriptor::new("idx", vec!["missing".to_string()]));
        assert!(desc.validate().is_err());
    }
}
