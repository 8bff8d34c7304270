//! The virtual `information_schema` database
//!
//! Its tables are synthesized from the catalog on every read and never
//! stored. [`InformationSchema`] produces their rows for one catalog snapshot
//! as seen by one principal.

use super::catalog::{CatalogState, QualifiedName};
use super::descriptor::{ColumnDescriptor, DatabaseDescriptor, DescriptorId, TableDescriptor};
use super::privilege::{PrivilegeDescriptor, ROOT_USER};
use super::types::DataType;
use std::sync::Arc;

/// Name of the virtual database
pub const INFORMATION_SCHEMA: &str = "information_schema";

/// Id reserved for the virtual database; its tables count down from here
pub const VIRTUAL_DATABASE_ID: DescriptorId = DescriptorId::MAX;

const VIRTUAL_TABLES: &[(&str, &[&str])] = &[
    (
        "columns",
        &[
            "table_schema",
            "table_name",
            "column_name",
            "ordinal_position",
            "column_default",
            "is_nullable",
            "data_type",
        ],
    ),
    (
        "schema_privileges",
        &["grantee", "table_schema", "privilege_type"],
    ),
    ("schemata", &["schema_name"]),
    (
        "table_privileges",
        &["grantee", "table_schema", "table_name", "privilege_type"],
    ),
    ("tables", &["table_schema", "table_name", "table_type"]),
];

/// Descriptor of a virtual table, if `name` names one
pub fn virtual_table(name: &QualifiedName) -> Option<Arc<TableDescriptor>> {
    if name.database != INFORMATION_SCHEMA {
        return None;
    }
    VIRTUAL_TABLES
        .iter()
        .enumerate()
        .find(|(_, (table, _))| *table == name.table)
        .map(|(i, (table, columns))| Arc::new(virtual_descriptor(i, table, columns)))
}

/// All virtual tables in name order
pub fn virtual_tables() -> Vec<Arc<TableDescriptor>> {
    VIRTUAL_TABLES
        .iter()
        .enumerate()
        .map(|(i, (table, columns))| Arc::new(virtual_descriptor(i, table, columns)))
        .collect()
}

fn virtual_descriptor(i: usize, name: &str, columns: &[&str]) -> TableDescriptor {
    let mut desc = TableDescriptor::new(name);
    desc.id = VIRTUAL_DATABASE_ID - 1 - i as DescriptorId;
    desc.parent_id = VIRTUAL_DATABASE_ID;
    desc.is_virtual = true;
    desc.privileges = PrivilegeDescriptor::default();
    desc.columns = columns
        .iter()
        .enumerate()
        .map(|(j, column)| {
            let data_type = if *column == "ordinal_position" {
                DataType::BigInt
            } else {
                DataType::Text
            };
            ColumnDescriptor {
                id: j as u32 + 1,
                ..ColumnDescriptor::new(*column, data_type)
            }
        })
        .collect();
    desc
}

// ========== View rows ==========

/// Row of `information_schema.tables`
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub schema: String,
    pub name: String,
    pub table_type: &'static str,
}

/// Row of `information_schema.columns`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub ordinal_position: i64,
    pub default_expr: Option<String>,
    pub is_nullable: &'static str,
    pub data_type: String,
}

/// Row of `information_schema.schema_privileges` or `table_privileges`
#[derive(Debug, Clone, PartialEq)]
pub struct PrivilegeRow {
    pub grantee: String,
    pub schema: String,
    /// Empty for schema privileges
    pub table: String,
    pub privilege: String,
}

/// `information_schema` over one snapshot, filtered by what `principal` may see.
///
/// A database is visible to root, to anyone while it is the current
/// database, and to users holding a privilege on it. A table is visible when
/// its database is and the user holds a privilege on the table.
pub struct InformationSchema<'a> {
    state: &'a CatalogState,
    principal: &'a str,
    current_database: &'a str,
}

impl<'a> InformationSchema<'a> {
    pub fn new(state: &'a CatalogState, principal: &'a str, current_database: &'a str) -> Self {
        Self {
            state,
            principal,
            current_database,
        }
    }

    fn database_visible(&self, db: &DatabaseDescriptor) -> bool {
        self.principal == ROOT_USER
            || db.name == self.current_database
            || db.privileges.any_privilege(self.principal)
    }

    fn table_visible(&self, table: &TableDescriptor) -> bool {
        self.principal == ROOT_USER || table.privileges.any_privilege(self.principal)
    }

    fn visible_databases(&self) -> impl Iterator<Item = &'a DatabaseDescriptor> + '_ {
        self.state.databases().filter(|db| self.database_visible(db))
    }

    /// (schema, table) pairs of every visible table, virtual ones included
    fn visible_tables(&self) -> Vec<(String, Arc<TableDescriptor>)> {
        let mut out: Vec<_> = virtual_tables()
            .into_iter()
            .map(|t| (INFORMATION_SCHEMA.to_string(), t))
            .collect();
        for db in self.visible_databases() {
            for table in self.state.tables_in(db.id) {
                if self.table_visible(table) {
                    out.push((db.name.clone(), table.clone()));
                }
            }
        }
        out
    }

    /// `information_schema.schemata`
    pub fn schemata(&self) -> Vec<String> {
        std::iter::once(INFORMATION_SCHEMA.to_string())
            .chain(self.visible_databases().map(|db| db.name.clone()))
            .collect()
    }

    /// `information_schema.tables`
    pub fn tables(&self) -> Vec<TableRow> {
        self.visible_tables()
            .into_iter()
            .map(|(schema, table)| TableRow {
                table_type: if table.is_virtual {
                    "SYSTEM VIEW"
                } else if table.is_view() {
                    "VIEW"
                } else {
                    "BASE TABLE"
                },
                schema,
                name: table.name.clone(),
            })
            .collect()
    }

    /// `information_schema.columns`
    pub fn columns(&self) -> Vec<ColumnRow> {
        let mut out = Vec::new();
        for (schema, table) in self.visible_tables() {
            for (i, column) in table.visible_columns().enumerate() {
                out.push(ColumnRow {
                    schema: schema.clone(),
                    table: table.name.clone(),
                    name: column.name.clone(),
                    ordinal_position: i as i64 + 1,
                    default_expr: column.default_expr.clone(),
                    is_nullable: if column.nullable { "YES" } else { "NO" },
                    data_type: column.data_type.to_string(),
                });
            }
        }
        out
    }

    /// `information_schema.schema_privileges`
    pub fn schema_privileges(&self) -> Vec<PrivilegeRow> {
        let mut out = Vec::new();
        for db in self.visible_databases() {
            for (user, privilege) in db.privileges.grants() {
                out.push(PrivilegeRow {
                    grantee: user.to_string(),
                    schema: db.name.clone(),
                    table: String::new(),
                    privilege: privilege.to_string(),
                });
            }
        }
        out
    }

    /// `information_schema.table_privileges`
    pub fn table_privileges(&self) -> Vec<PrivilegeRow> {
        let mut out = Vec::new();
        for (schema, table) in self.visible_tables() {
            for (user, privilege) in table.privileges.grants() {
                out.push(PrivilegeRow {
                    grantee: user.to_string(),
                    schema: schema.clone(),
                    table: table.name.clone(),
                    privilege: privilege.to_string(),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog::{Catalog, GrantTarget, TableBuilder};
    use crate::catalog::privilege::Privilege;

    fn setup() -> Catalog {
        let catalog = Catalog::new();
        catalog.create_database("db").unwrap();
        catalog.create_database("other").unwrap();
        catalog.create_user("alice").unwrap();
        TableBuilder::new("t")
            .simple_column("a", DataType::Integer)
            .build(&catalog, "db")
            .unwrap();
        TableBuilder::new("u").build(&catalog, "db").unwrap();
        catalog
            .grant(
                &GrantTarget::Table(QualifiedName::new("db", "t")),
                &[Privilege::Select],
                &["alice".to_string()],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_virtual_table_lookup() {
        let desc = virtual_table(&QualifiedName::new(INFORMATION_SCHEMA, "tables")).unwrap();
        assert!(desc.is_virtual);
        assert!(!desc.is_physical_table());
        assert!(virtual_table(&QualifiedName::new(INFORMATION_SCHEMA, "nope")).is_none());
        assert!(virtual_table(&QualifiedName::new("db", "tables")).is_none());
    }

    #[test]
    fn test_root_sees_everything() {
        let catalog = setup();
        let state = catalog.snapshot();
        let view = InformationSchema::new(&state, ROOT_USER, "");
        assert_eq!(view.schemata(), vec![INFORMATION_SCHEMA, "db", "other"]);
        let tables: Vec<_> = view
            .tables()
            .into_iter()
            .filter(|t| t.schema == "db")
            .map(|t| t.name)
            .collect();
        assert_eq!(tables, vec!["t", "u"]);
    }

    #[test]
    fn test_visibility_follows_current_database() {
        let catalog = setup();
        let state = catalog.snapshot();

        let outside = InformationSchema::new(&state, "alice", "");
        assert_eq!(outside.schemata(), vec![INFORMATION_SCHEMA]);
        assert!(outside.table_privileges().iter().all(|r| r.schema != "db"));

        let inside = InformationSchema::new(&state, "alice", "db");
        let tables: Vec<_> = inside
            .tables()
            .into_iter()
            .filter(|t| t.schema == "db")
            .map(|t| t.name)
            .collect();
        assert_eq!(tables, vec!["t"]);

        let columns: Vec<_> = inside
            .columns()
            .into_iter()
            .filter(|c| c.schema == "db")
            .map(|c| (c.name, c.ordinal_position))
            .collect();
        assert_eq!(columns, vec![("a".to_string(), 1)]);
    }
}
