//! Descriptor access and the privilege gate
//!
//! Name normalization, descriptor resolution through the transaction
//! snapshot, and privilege checks for the session user. Root and virtual
//! `information_schema` tables always pass; checks can also be suppressed
//! for a scope through [`EvalContext`](super::session::EvalContext).

use std::sync::Arc;

use super::catalog_reader::CatalogQuery;
use super::planner::Planner;
use super::session::DatabaseOverride;
use crate::catalog::virtual_schema::{virtual_table, virtual_tables};
use crate::catalog::{Privilege, QualifiedName, TableDescriptor, INFORMATION_SCHEMA};
use crate::error::{Error, Result};
use crate::sql::ast::{TableName, TablePattern};

impl Planner {
    /// Fill in the session database when `name` has none
    pub fn normalize(&self, name: &TableName) -> Result<QualifiedName> {
        let database = match &name.database {
            Some(db) => db.clone(),
            None => self.session().database.clone(),
        };
        if database.is_empty() {
            return Err(Error::NoDatabase);
        }
        Ok(QualifiedName::new(database, name.table.as_str()))
    }

    /// Existence probe that ignores the user's privileges
    pub fn check_database_exists(&self, database: &str) -> Result<()> {
        let rows = self.query_rows_as_root(CatalogQuery::SchemaExists { schema: database })?;
        if rows.is_empty() {
            return Err(Error::UndefinedDatabase(database.to_string()));
        }
        Ok(())
    }

    /// Existence probe that ignores the user's privileges
    pub fn check_table_exists(&self, name: &QualifiedName) -> Result<()> {
        let rows = self.query_rows_as_root(CatalogQuery::TableExists {
            schema: &name.database,
            table: &name.table,
        })?;
        if rows.is_empty() {
            return Err(Error::UndefinedTable(name.to_string()));
        }
        Ok(())
    }

    /// Make `name` readable through the catalog views for this user.
    ///
    /// Probes the database and the table as root, then switches the current
    /// database to the table's and requires the user to hold a privilege on
    /// it. The returned guard keeps the switch in effect.
    pub fn enter_table(&self, name: &QualifiedName) -> Result<DatabaseOverride<'_>> {
        self.check_database_exists(&name.database)?;
        self.check_table_exists(name)?;

        let guard = self.eval().override_database(&name.database);
        if virtual_table(name).is_none()
            && !self.session().is_root()
            && !self.eval().privilege_checks_suppressed()
        {
            let rows = self.query_rows(CatalogQuery::TablePrivilegeExists {
                schema: &name.database,
                table: &name.table,
                grantee: self.user(),
            })?;
            if rows.is_empty() {
                return Err(Error::PermissionDenied(format!(
                    "user {} has no privileges on table {}",
                    self.user(),
                    name
                )));
            }
        }
        Ok(guard)
    }

    /// Table or view descriptor for `name`
    pub fn get_table_or_view_desc(&self, name: &QualifiedName) -> Result<Arc<TableDescriptor>> {
        if let Some(desc) = virtual_table(name) {
            return Ok(desc);
        }
        let state = self.txn().read()?;
        state.resolve(name).cloned()
    }

    /// Descriptor of a table; views are rejected
    pub fn must_get_table_desc(&self, name: &QualifiedName) -> Result<Arc<TableDescriptor>> {
        let desc = self.get_table_or_view_desc(name)?;
        if desc.is_view() {
            return Err(Error::WrongObjectType {
                name: name.to_string(),
                expected: "table",
            });
        }
        Ok(desc)
    }

    /// Descriptor of a view; tables are rejected
    pub fn must_get_view_desc(&self, name: &QualifiedName) -> Result<Arc<TableDescriptor>> {
        let desc = self.get_table_or_view_desc(name)?;
        if !desc.is_view() {
            return Err(Error::WrongObjectType {
                name: name.to_string(),
                expected: "view",
            });
        }
        Ok(desc)
    }

    /// `database.table` for diagnostics
    fn display_name(&self, desc: &TableDescriptor) -> String {
        if desc.is_virtual {
            return QualifiedName::new(INFORMATION_SCHEMA, desc.name.as_str()).to_string();
        }
        self.txn()
            .read()
            .ok()
            .and_then(|state| state.databases().find(|db| db.id == desc.parent_id))
            .map(|db| QualifiedName::new(db.name.as_str(), desc.name.as_str()).to_string())
            .unwrap_or_else(|| desc.name.clone())
    }

    fn bypasses_privileges(&self, desc: &TableDescriptor) -> bool {
        desc.is_virtual || self.session().is_root() || self.eval().privilege_checks_suppressed()
    }

    /// Require at least one privilege on `desc`
    pub fn any_privilege(&self, desc: &TableDescriptor) -> Result<()> {
        if self.bypasses_privileges(desc) || desc.privileges.any_privilege(self.user()) {
            return Ok(());
        }
        Err(Error::PermissionDenied(format!(
            "user {} has no privileges on table {}",
            self.user(),
            self.display_name(desc)
        )))
    }

    /// Require `privilege` on `desc`
    pub fn check_privilege(&self, desc: &TableDescriptor, privilege: Privilege) -> Result<()> {
        if self.bypasses_privileges(desc) || desc.privileges.check(self.user(), privilege) {
            return Ok(());
        }
        Err(Error::PermissionDenied(format!(
            "user {} does not have {} privilege on table {}",
            self.user(),
            privilege,
            self.display_name(desc)
        )))
    }

    /// Require `privilege` on the database `name`
    pub fn check_database_privilege(&self, name: &str, privilege: Privilege) -> Result<()> {
        if self.session().is_root() {
            return Ok(());
        }
        let state = self.txn().read()?;
        let db = state
            .database(name)
            .ok_or_else(|| Error::UndefinedDatabase(name.to_string()))?;
        if db.privileges.check(self.user(), privilege) {
            return Ok(());
        }
        Err(Error::PermissionDenied(format!(
            "user {} does not have {} privilege on database {}",
            self.user(),
            privilege,
            name
        )))
    }

    /// Expand `t`, `db.t`, `db.*` or `*` to table names
    pub fn expand_table_pattern(&self, pattern: &TablePattern) -> Result<Vec<QualifiedName>> {
        match pattern {
            TablePattern::Table(name) => Ok(vec![self.normalize(name)?]),
            TablePattern::AllTables(database) => {
                let database = match database {
                    Some(db) => db.clone(),
                    None => self.normalize(&TableName::new(None, "*"))?.database,
                };
                self.check_database_exists(&database)?;

                if database == INFORMATION_SCHEMA {
                    return Ok(virtual_tables()
                        .iter()
                        .map(|t| QualifiedName::new(INFORMATION_SCHEMA, t.name.as_str()))
                        .collect());
                }
                let state = self.txn().read()?;
                let db = state
                    .database(&database)
                    .ok_or_else(|| Error::UndefinedDatabase(database.clone()))?;
                Ok(state
                    .tables_in(db.id)
                    .map(|t| QualifiedName::new(database.as_str(), t.name.as_str()))
                    .collect())
            }
        }
    }
}
