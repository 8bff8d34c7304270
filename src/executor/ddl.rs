//! Catalog DDL
//!
//! Applies CREATE / DROP / GRANT / REVOKE statements to the catalog after
//! checking the session user's privileges against the statement's
//! snapshot. Expressions (defaults, checks, view queries) are stored as the
//! SQL text their AST formats to.

use tracing::debug;

use super::planner::Planner;
use crate::catalog::{
    Catalog, ColumnDescriptor, Direction, GrantTarget, IndexDescriptor, IndexSpec,
    InterleaveSpec, Privilege, QualifiedName, TableBuilder,
};
use crate::error::{Error, Result};
use crate::sql::ast::*;

impl Planner {
    /// Apply one DDL statement to `catalog`
    pub fn apply_ddl(&self, catalog: &Catalog, stmt: &Statement) -> Result<()> {
        debug!(tag = stmt.tag(), user = self.user(), "applying DDL");
        match stmt {
            Statement::CreateDatabase(create) => {
                self.require_root("CREATE DATABASE")?;
                match catalog.create_database(&create.name) {
                    Err(Error::DatabaseAlreadyExists(_)) if create.if_not_exists => Ok(()),
                    other => other.map(|_| ()),
                }
            }
            Statement::CreateUser(name) => {
                self.require_root("CREATE USER")?;
                catalog.create_user(name)
            }
            Statement::CreateTable(create) => self.create_table(catalog, create),
            Statement::CreateIndex(create) => self.create_index(catalog, create),
            Statement::CreateView(create) => self.create_view(catalog, create),
            Statement::DropTable(drop) => {
                let name = self.normalize(&drop.name)?;
                let desc = match self.get_table_or_view_desc(&name) {
                    Err(Error::UndefinedTable(_)) if drop.if_exists => return Ok(()),
                    other => other?,
                };
                self.check_privilege(&desc, Privilege::Drop)?;
                catalog.drop_table(&name)
            }
            Statement::Grant(grant) => {
                for target in self.grant_targets(&grant.targets)? {
                    catalog.grant(&target, &grant.privileges, &grant.grantees)?;
                }
                Ok(())
            }
            Statement::Revoke(revoke) => {
                for target in self.grant_targets(&revoke.targets)? {
                    catalog.revoke(&target, &revoke.privileges, &revoke.grantees)?;
                }
                Ok(())
            }
            other => Err(Error::Unsupported(format!("{} is not a DDL statement", other.tag()))),
        }
    }

    fn require_root(&self, what: &str) -> Result<()> {
        if self.session().is_root() {
            return Ok(());
        }
        Err(Error::PermissionDenied(format!(
            "only root is allowed to {}",
            what
        )))
    }

    /// Resolve a parent reference; an unqualified name is in `database`
    fn parent_name(database: &str, name: &TableName) -> QualifiedName {
        QualifiedName::new(
            name.database.as_deref().unwrap_or(database),
            name.table.as_str(),
        )
    }

    fn create_table(&self, catalog: &Catalog, create: &CreateTableStatement) -> Result<()> {
        let name = self.normalize(&create.name)?;
        self.check_database_privilege(&name.database, Privilege::Create)?;
        let database = name.database.as_str();

        let mut builder = TableBuilder::new(name.table.as_str());
        let mut primary_key = None;

        for def in &create.columns {
            let mut column = ColumnDescriptor::new(def.name.as_str(), def.data_type.clone())
                .nullable(!def.not_null);
            if let Some(default) = &def.default {
                column = column.default_expr(default.to_string());
            }
            builder = builder.column(column);

            if def.primary_key {
                set_primary_key(
                    &mut primary_key,
                    IndexDescriptor::new("", vec![def.name.clone()]),
                )?;
            }
            if def.unique {
                builder = builder.unique_column(def.name.as_str());
            }
            if let Some(check) = &def.check {
                builder = builder.check(None, check.to_string(), check.column_names());
            }
            if let Some((parent, column)) = &def.references {
                builder = builder.foreign_key(
                    None,
                    vec![def.name.clone()],
                    Self::parent_name(database, parent),
                    column.clone().map(|c| vec![c]),
                );
            }
        }

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey { name, columns } => {
                    set_primary_key(
                        &mut primary_key,
                        index_descriptor(name.clone().unwrap_or_default(), columns),
                    )?;
                }
                TableConstraint::Unique { name, columns } => {
                    let index_name = name.clone().unwrap_or_else(|| {
                        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                        format!("{}_{}_key", name_of(create), names.join("_"))
                    });
                    builder = builder.index(IndexSpec::new(
                        index_descriptor(index_name, columns).unique(true),
                    ));
                }
                TableConstraint::ForeignKey {
                    name,
                    columns,
                    ref_table,
                    ref_columns,
                } => {
                    builder = builder.foreign_key(
                        name.clone(),
                        columns.clone(),
                        Self::parent_name(database, ref_table),
                        ref_columns.clone(),
                    );
                }
                TableConstraint::Check { name, expr } => {
                    builder = builder.check(name.clone(), expr.to_string(), expr.column_names());
                }
            }
        }

        if let Some(pk) = primary_key {
            builder = builder.primary_key(pk);
        }
        for index in &create.indexes {
            builder = builder.index(index_spec(database, index));
        }
        for family in &create.families {
            builder = builder.family(family.name.clone(), family.columns.clone());
        }
        if let Some(interleave) = &create.interleave {
            builder = builder.interleave(InterleaveSpec {
                parent: Self::parent_name(database, &interleave.parent),
                columns: interleave.columns.clone(),
            });
        }

        match catalog.create_table(database, builder) {
            Err(Error::TableAlreadyExists(_)) if create.if_not_exists => Ok(()),
            other => other.map(|_| ()),
        }
    }

    fn create_index(&self, catalog: &Catalog, create: &CreateIndexStatement) -> Result<()> {
        let name = self.normalize(&create.table)?;
        let desc = self.must_get_table_desc(&name)?;
        self.check_privilege(&desc, Privilege::Create)?;
        match catalog.create_index(&name, index_spec(&name.database, &create.index)) {
            Err(Error::IndexAlreadyExists(_)) if create.if_not_exists => Ok(()),
            other => other,
        }
    }

    fn create_view(&self, catalog: &Catalog, create: &CreateViewStatement) -> Result<()> {
        let name = self.normalize(&create.name)?;
        self.check_database_privilege(&name.database, Privilege::Create)?;

        // Stored queries always name their tables fully
        let mut query = create.query.clone();
        if let Some(from) = query.from.as_mut() {
            let refs = std::iter::once(&mut from.table).chain(from.joins.iter_mut().map(|j| &mut j.table));
            for table in refs {
                if table.name.database.is_none() {
                    table.name.database = Some(self.normalize(&table.name)?.database);
                }
            }
        }

        let mut columns = self.plan_select_columns(&query)?;
        if let Some(names) = &create.columns {
            if names.len() != columns.len() {
                return Err(Error::InvalidDescriptor(format!(
                    "CREATE VIEW specifies {} column names, but data source has {} columns",
                    names.len(),
                    columns.len()
                )));
            }
            for (column, name) in columns.iter_mut().zip(names) {
                column.name = name.clone();
            }
        }

        let builder = columns.into_iter().fold(
            TableBuilder::view(name.table.as_str(), query.to_string()),
            |builder, column| builder.simple_column(column.name, column.typ),
        );
        catalog.create_table(&name.database, builder).map(|_| ())
    }

    fn grant_targets(&self, targets: &TargetList) -> Result<Vec<GrantTarget>> {
        let mut out = Vec::new();
        match targets {
            TargetList::Databases(databases) => {
                for database in databases {
                    self.check_database_privilege(database, Privilege::Grant)?;
                    out.push(GrantTarget::Database(database.clone()));
                }
            }
            TargetList::Tables(patterns) => {
                for pattern in patterns {
                    for name in self.expand_table_pattern(pattern)? {
                        let desc = self.get_table_or_view_desc(&name)?;
                        self.check_privilege(&desc, Privilege::Grant)?;
                        out.push(GrantTarget::Table(name));
                    }
                }
            }
        }
        Ok(out)
    }
}

fn name_of(create: &CreateTableStatement) -> &str {
    &create.name.table
}

fn set_primary_key(slot: &mut Option<IndexDescriptor>, pk: IndexDescriptor) -> Result<()> {
    if slot.is_some() {
        return Err(Error::InvalidDescriptor(
            "multiple primary keys are not allowed".to_string(),
        ));
    }
    *slot = Some(pk);
    Ok(())
}

fn index_descriptor(name: String, columns: &[IndexColumn]) -> IndexDescriptor {
    let names = columns.iter().map(|c| c.name.clone()).collect();
    let directions: Vec<Direction> = columns.iter().map(|c| c.direction).collect();
    IndexDescriptor::new(name, names).directions(directions)
}

fn index_spec(database: &str, def: &IndexDef) -> IndexSpec {
    let index = index_descriptor(def.name.clone().unwrap_or_default(), &def.columns)
        .unique(def.unique)
        .storing(def.storing.clone());
    IndexSpec {
        index,
        interleave: def.interleave.as_ref().map(|i| InterleaveSpec {
            parent: Planner::parent_name(database, &i.parent),
            columns: i.columns.clone(),
        }),
    }
}
