//! Constraint information derived from a table descriptor

use super::descriptor::{DescriptorId, TableDescriptor, Validity};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Kind of a table constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::Unique => write!(f, "UNIQUE"),
            ConstraintKind::ForeignKey => write!(f, "FOREIGN KEY"),
            ConstraintKind::Check => write!(f, "CHECK"),
        }
    }
}

/// One entry of a table's constraint info
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDetail {
    pub kind: ConstraintKind,
    /// Constrained columns; `None` for checks
    pub columns: Option<Vec<String>>,
    /// Free-form details (check expression, referenced table)
    pub details: Option<String>,
    pub unvalidated: bool,
}

/// Constraint name -> detail, in derivation order
pub type ConstraintInfo = IndexMap<String, ConstraintDetail>;

impl TableDescriptor {
    /// Collect every named constraint on this table.
    ///
    /// `lookup` resolves the target of a foreign key by descriptor id.
    pub fn constraint_info<F>(&self, lookup: F) -> Result<ConstraintInfo>
    where
        F: Fn(DescriptorId) -> Result<Arc<TableDescriptor>>,
    {
        let mut info = ConstraintInfo::new();

        if self.is_physical_table() && !self.primary_index.column_names.is_empty() {
            insert(
                &mut info,
                &self.primary_index.name,
                ConstraintDetail {
                    kind: ConstraintKind::PrimaryKey,
                    columns: Some(self.primary_index.column_names.clone()),
                    details: None,
                    unvalidated: false,
                },
            )?;
        }

        for index in self.indexes.iter().filter(|idx| idx.unique) {
            insert(
                &mut info,
                &index.name,
                ConstraintDetail {
                    kind: ConstraintKind::Unique,
                    columns: Some(index.column_names.clone()),
                    details: None,
                    unvalidated: false,
                },
            )?;
        }

        for fk in &self.foreign_keys {
            let parent = lookup(fk.referenced_table)?;
            insert(
                &mut info,
                &fk.name,
                ConstraintDetail {
                    kind: ConstraintKind::ForeignKey,
                    columns: Some(fk.column_names.clone()),
                    details: Some(format!(
                        "{}.[{}]",
                        parent.name,
                        fk.referenced_columns.join(", ")
                    )),
                    unvalidated: fk.validity == Validity::Unvalidated,
                },
            )?;
        }

        for check in &self.checks {
            insert(
                &mut info,
                &check.name,
                ConstraintDetail {
                    kind: ConstraintKind::Check,
                    columns: None,
                    details: Some(check.expr.clone()),
                    unvalidated: check.validity == Validity::Unvalidated,
                },
            )?;
        }

        Ok(info)
    }
}

fn insert(info: &mut ConstraintInfo, name: &str, detail: ConstraintDetail) -> Result<()> {
    if info.contains_key(name) {
        return Err(Error::DuplicateConstraint(name.to_string()));
    }
    info.insert(name.to_string(), detail);
    Ok(())
}
