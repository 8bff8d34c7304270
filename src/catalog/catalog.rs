//! System Catalog for ShowDB
//!
//! The catalog holds databases, table and view descriptors and users. Every
//! mutation produces a new immutable [`CatalogState`]; readers hold an
//! `Arc<CatalogState>` snapshot and never observe a half-applied change.

use super::descriptor::{
    CheckConstraint, ColumnDescriptor, DatabaseDescriptor, DescriptorId, FamilyDescriptor,
    ForeignKeyReference, IndexDescriptor, InterleaveAncestor, TableDescriptor, Validity,
    PRIMARY_NAME, ROWID_COLUMN, ROWID_DEFAULT,
};
use super::privilege::{Privilege, PrivilegeDescriptor, ROOT_USER};
use super::types::DataType;
use super::virtual_schema::INFORMATION_SCHEMA;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// A fully qualified object name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub database: String,
    pub table: String,
}

impl QualifiedName {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Object a privilege is granted on
#[derive(Debug, Clone, PartialEq)]
pub enum GrantTarget {
    Database(String),
    Table(QualifiedName),
}

// ========== Catalog state ==========

/// One immutable version of the catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    databases: BTreeMap<String, DatabaseDescriptor>,
    tables: HashMap<DescriptorId, Arc<TableDescriptor>>,
    /// (database id, table name) -> table id
    names: BTreeMap<(DescriptorId, String), DescriptorId>,
    users: BTreeSet<String>,
    next_id: DescriptorId,
}

impl CatalogState {
    /// Get a database by name
    pub fn database(&self, name: &str) -> Option<&DatabaseDescriptor> {
        self.databases.get(name)
    }

    /// All databases in name order
    pub fn databases(&self) -> impl Iterator<Item = &DatabaseDescriptor> + '_ {
        self.databases.values()
    }

    /// Get a table or view by database id and name
    pub fn table(&self, database_id: DescriptorId, name: &str) -> Option<&Arc<TableDescriptor>> {
        self.names
            .get(&(database_id, name.to_string()))
            .and_then(|id| self.tables.get(id))
    }

    /// Get a table or view by id
    pub fn table_by_id(&self, id: DescriptorId) -> Option<&Arc<TableDescriptor>> {
        self.tables.get(&id)
    }

    /// Tables and views of a database in name order
    pub fn tables_in(
        &self,
        database_id: DescriptorId,
    ) -> impl Iterator<Item = &Arc<TableDescriptor>> + '_ {
        self.names
            .range((database_id, String::new())..)
            .take_while(move |((db, _), _)| *db == database_id)
            .filter_map(|(_, id)| self.tables.get(id))
    }

    /// All users in name order
    pub fn users(&self) -> impl Iterator<Item = &str> + '_ {
        self.users.iter().map(String::as_str)
    }

    /// Check if a user exists
    pub fn user_exists(&self, name: &str) -> bool {
        self.users.contains(name)
    }

    /// Resolve a qualified name to its descriptor
    pub fn resolve(&self, name: &QualifiedName) -> Result<&Arc<TableDescriptor>> {
        let db = self
            .database(&name.database)
            .ok_or_else(|| Error::UndefinedDatabase(name.database.clone()))?;
        self.table(db.id, &name.table)
            .ok_or_else(|| Error::UndefinedTable(name.to_string()))
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut DatabaseDescriptor> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| Error::UndefinedDatabase(name.to_string()))
    }

    fn allocate_id(&mut self) -> DescriptorId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_table(&mut self, desc: TableDescriptor) -> Arc<TableDescriptor> {
        let desc = Arc::new(desc);
        self.names
            .insert((desc.parent_id, desc.name.clone()), desc.id);
        self.tables.insert(desc.id, desc.clone());
        desc
    }
}

// ========== Catalog ==========

/// System Catalog - manages all database metadata
#[derive(Debug)]
pub struct Catalog {
    state: RwLock<Arc<CatalogState>>,
}

impl Catalog {
    /// Create a new catalog holding only the root user
    pub fn new() -> Self {
        let mut state = CatalogState {
            next_id: 1,
            ..CatalogState::default()
        };
        state.users.insert(ROOT_USER.to_string());
        Self {
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// Current version of the catalog
    pub fn snapshot(&self) -> Arc<CatalogState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` to a private copy of the state and publish it on success
    fn mutate<T>(&self, f: impl FnOnce(&mut CatalogState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = CatalogState::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Create a new database
    pub fn create_database(&self, name: &str) -> Result<DescriptorId> {
        let id = self.mutate(|state| {
            if name == INFORMATION_SCHEMA || state.databases.contains_key(name) {
                return Err(Error::DatabaseAlreadyExists(name.to_string()));
            }
            let id = state.allocate_id();
            state
                .databases
                .insert(name.to_string(), DatabaseDescriptor::new(id, name));
            Ok(id)
        })?;
        info!(database = name, id, "created database");
        Ok(id)
    }

    /// Create a table or view from a builder
    pub fn create_table(&self, database: &str, builder: TableBuilder) -> Result<Arc<TableDescriptor>> {
        let desc = self.mutate(|state| {
            let db = state
                .database(database)
                .ok_or_else(|| Error::UndefinedDatabase(database.to_string()))?
                .clone();
            if state.table(db.id, &builder.name).is_some() {
                return Err(Error::TableAlreadyExists(
                    QualifiedName::new(database, builder.name.as_str()).to_string(),
                ));
            }
            let mut desc = builder.resolve(state, &db)?;
            desc.id = state.allocate_id();
            desc.parent_id = db.id;
            desc.privileges = db.privileges.clone();
            desc.validate()?;
            Ok(state.insert_table(desc))
        })?;
        info!(database, table = %desc.name, id = desc.id, view = desc.is_view(), "created table");
        Ok(desc)
    }

    /// Add a secondary index to an existing table
    pub fn create_index(&self, table: &QualifiedName, spec: IndexSpec) -> Result<()> {
        let index_name = spec.index.name.clone();
        self.mutate(|state| {
            let existing = state.resolve(table)?.clone();
            if !existing.is_physical_table() {
                return Err(Error::WrongObjectType {
                    name: table.to_string(),
                    expected: "table",
                });
            }
            let mut desc = TableDescriptor::clone(&existing);
            let next_id = desc
                .all_indexes()
                .map(|idx| idx.id)
                .max()
                .unwrap_or(0)
                + 1;
            let index = resolve_index(state, &desc, &table.database, spec, next_id)?;
            desc.indexes.push(index);
            desc.validate()?;
            state.insert_table(desc);
            Ok(())
        })?;
        info!(table = %table, index = %index_name, "created index");
        Ok(())
    }

    /// Replace a table descriptor in place (schema changes)
    pub fn update_table<F>(&self, table: &QualifiedName, f: F) -> Result<()>
    where
        F: FnOnce(&mut TableDescriptor) -> Result<()>,
    {
        self.mutate(|state| {
            let mut desc = TableDescriptor::clone(state.resolve(table)?);
            f(&mut desc)?;
            desc.validate()?;
            state.insert_table(desc);
            Ok(())
        })
    }

    /// Drop a table or view
    pub fn drop_table(&self, table: &QualifiedName) -> Result<()> {
        self.mutate(|state| {
            let desc = state.resolve(table)?.clone();
            let dependent = state.tables.values().find(|other| {
                other.id != desc.id
                    && (other.foreign_keys.iter().any(|fk| fk.referenced_table == desc.id)
                        || other
                            .all_indexes()
                            .flat_map(|idx| idx.interleave.iter())
                            .any(|a| a.table_id == desc.id))
            });
            if let Some(other) = dependent {
                return Err(Error::InvalidDescriptor(format!(
                    "\"{}\" is referenced by \"{}\"",
                    table, other.name
                )));
            }
            state.names.remove(&(desc.parent_id, desc.name.clone()));
            state.tables.remove(&desc.id);
            Ok(())
        })?;
        info!(table = %table, "dropped table");
        Ok(())
    }

    /// Create a user
    pub fn create_user(&self, name: &str) -> Result<()> {
        self.mutate(|state| {
            if !state.users.insert(name.to_string()) {
                return Err(Error::UserAlreadyExists(name.to_string()));
            }
            Ok(())
        })?;
        info!(user = name, "created user");
        Ok(())
    }

    /// Grant privileges on an object to users
    pub fn grant(&self, target: &GrantTarget, privileges: &[Privilege], users: &[String]) -> Result<()> {
        self.update_privileges(target, users, |desc, user| desc.grant(user, privileges))?;
        info!(?target, ?privileges, ?users, "granted privileges");
        Ok(())
    }

    /// Revoke privileges on an object from users
    pub fn revoke(&self, target: &GrantTarget, privileges: &[Privilege], users: &[String]) -> Result<()> {
        self.update_privileges(target, users, |desc, user| desc.revoke(user, privileges))?;
        info!(?target, ?privileges, ?users, "revoked privileges");
        Ok(())
    }

    fn update_privileges<F>(&self, target: &GrantTarget, users: &[String], apply: F) -> Result<()>
    where
        F: Fn(&mut PrivilegeDescriptor, &str),
    {
        self.mutate(|state| {
            if let Some(missing) = users.iter().find(|u| !state.user_exists(u)) {
                return Err(Error::UndefinedUser(missing.clone()));
            }
            match target {
                GrantTarget::Database(name) => {
                    let db = state.database_mut(name)?;
                    for user in users {
                        apply(&mut db.privileges, user);
                    }
                }
                GrantTarget::Table(name) => {
                    let mut desc = TableDescriptor::clone(state.resolve(name)?);
                    for user in users {
                        apply(&mut desc.privileges, user);
                    }
                    state.insert_table(desc);
                }
            }
            Ok(())
        })
    }

    /// Save catalog to disk
    pub fn save_to_disk(&self, path: &str) -> Result<()> {
        let state = self.snapshot();
        let mut tables: Vec<TableDescriptor> =
            state.tables.values().map(|t| (**t).clone()).collect();
        tables.sort_by_key(|t| t.id);
        let data = CatalogData {
            databases: state.databases.values().cloned().collect(),
            tables,
            users: state.users.iter().cloned().collect(),
            next_id: state.next_id,
        };

        let json = serde_json::to_string_pretty(&data)?;
        std::fs::write(path, json)?;
        info!(path, "saved catalog");
        Ok(())
    }

    /// Load catalog from disk
    pub fn load_from_disk(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let data: CatalogData = serde_json::from_str(&json)?;

        let mut state = CatalogState {
            next_id: data.next_id,
            ..CatalogState::default()
        };
        for db in data.databases {
            state.databases.insert(db.name.clone(), db);
        }
        for table in data.tables {
            state.insert_table(table);
        }
        state.users = data.users.into_iter().collect();
        state.users.insert(ROOT_USER.to_string());

        info!(path, databases = state.databases.len(), tables = state.tables.len(), "loaded catalog");
        Ok(Self {
            state: RwLock::new(Arc::new(state)),
        })
    }
}

/// Serializable proxy for Catalog
#[derive(Serialize, Deserialize)]
struct CatalogData {
    databases: Vec<DatabaseDescriptor>,
    tables: Vec<TableDescriptor>,
    users: Vec<String>,
    next_id: DescriptorId,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Table builder ==========

/// `INTERLEAVE IN PARENT <parent> (<columns>)`
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveSpec {
    pub parent: QualifiedName,
    pub columns: Vec<String>,
}

/// A secondary index before ids and ancestors are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub index: IndexDescriptor,
    pub interleave: Option<InterleaveSpec>,
}

impl IndexSpec {
    pub fn new(index: IndexDescriptor) -> Self {
        Self {
            index,
            interleave: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ForeignKeySpec {
    name: Option<String>,
    columns: Vec<String>,
    parent: QualifiedName,
    parent_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
struct CheckSpec {
    name: Option<String>,
    expr: String,
    columns: Vec<String>,
}

/// Builder for creating tables with a fluent API
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Option<IndexDescriptor>,
    interleave: Option<InterleaveSpec>,
    indexes: Vec<IndexSpec>,
    unique_columns: Vec<String>,
    families: Vec<(Option<String>, Vec<String>)>,
    checks: Vec<CheckSpec>,
    foreign_keys: Vec<ForeignKeySpec>,
    view_query: Option<String>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            interleave: None,
            indexes: Vec::new(),
            unique_columns: Vec::new(),
            families: Vec::new(),
            checks: Vec::new(),
            foreign_keys: Vec::new(),
            view_query: None,
        }
    }

    /// Start building a view over `query` with the given output columns
    pub fn view(name: impl Into<String>, query: impl Into<String>) -> Self {
        let mut builder = Self::new(name);
        builder.view_query = Some(query.into());
        builder
    }

    /// Add a column
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Shorthand for a nullable column
    pub fn simple_column(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.column(ColumnDescriptor::new(name, data_type))
    }

    /// Declare the primary key
    pub fn primary_key(mut self, index: IndexDescriptor) -> Self {
        self.primary_key = Some(index);
        self
    }

    /// Interleave the primary index into a parent table
    pub fn interleave(mut self, spec: InterleaveSpec) -> Self {
        self.interleave = Some(spec);
        self
    }

    /// Add a secondary index
    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    /// Column-level UNIQUE; becomes a `<table>_<column>_key` index
    pub fn unique_column(mut self, column: impl Into<String>) -> Self {
        self.unique_columns.push(column.into());
        self
    }

    /// Add a column family
    pub fn family(mut self, name: Option<String>, columns: Vec<String>) -> Self {
        self.families.push((name, columns));
        self
    }

    /// Add a check constraint; `columns` are the columns the expression reads
    pub fn check(mut self, name: Option<String>, expr: impl Into<String>, columns: Vec<String>) -> Self {
        self.checks.push(CheckSpec {
            name,
            expr: expr.into(),
            columns,
        });
        self
    }

    /// Add a foreign key
    pub fn foreign_key(
        mut self,
        name: Option<String>,
        columns: Vec<String>,
        parent: QualifiedName,
        parent_columns: Option<Vec<String>>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeySpec {
            name,
            columns,
            parent,
            parent_columns,
        });
        self
    }

    /// Build the table in the catalog
    pub fn build(self, catalog: &Catalog, database: &str) -> Result<Arc<TableDescriptor>> {
        catalog.create_table(database, self)
    }

    /// Turn the builder into a descriptor, resolving references against `state`
    fn resolve(self, state: &CatalogState, db: &DatabaseDescriptor) -> Result<TableDescriptor> {
        let qualified = QualifiedName::new(db.name.as_str(), self.name.as_str());
        let mut desc = TableDescriptor::new(self.name.as_str());
        desc.view_query = self.view_query.clone();

        for (i, mut column) in self.columns.into_iter().enumerate() {
            if desc.find_column(&column.name).is_some() {
                return Err(Error::DuplicateColumn(column.name, qualified.to_string()));
            }
            column.id = i as u32 + 1;
            desc.columns.push(column);
        }

        if desc.is_view() {
            return Ok(desc);
        }

        // Primary key
        let mut primary = match self.primary_key {
            Some(mut pk) => {
                if pk.name.is_empty() {
                    pk.name = PRIMARY_NAME.to_string();
                }
                for name in &pk.column_names {
                    let column = desc
                        .columns
                        .iter_mut()
                        .find(|c| &c.name == name)
                        .ok_or_else(|| Error::ColumnNotFound(name.clone(), qualified.to_string()))?;
                    column.nullable = false;
                }
                pk
            }
            None => {
                let id = desc.columns.len() as u32 + 1;
                let mut rowid = ColumnDescriptor::new(ROWID_COLUMN, DataType::BigInt)
                    .nullable(false)
                    .hidden(true)
                    .default_expr(ROWID_DEFAULT);
                rowid.id = id;
                if desc.find_column(ROWID_COLUMN).is_some() {
                    return Err(Error::DuplicateColumn(
                        ROWID_COLUMN.to_string(),
                        qualified.to_string(),
                    ));
                }
                desc.columns.push(rowid);
                IndexDescriptor::new(PRIMARY_NAME, vec![ROWID_COLUMN.to_string()]).unique(true)
            }
        };
        primary.id = 1;
        primary.unique = true;
        primary.column_ids = column_ids(&desc, &primary.column_names, &qualified)?;
        if let Some(spec) = &self.interleave {
            primary.interleave = resolve_interleave(state, &db.name, spec, &primary)?;
        }
        desc.primary_index = primary;

        // Secondary indexes, explicit ones first then column-level UNIQUE
        let mut specs = self.indexes;
        for column in &self.unique_columns {
            specs.push(IndexSpec::new(
                IndexDescriptor::new(format!("{}_{}_key", desc.name, column), vec![column.clone()])
                    .unique(true),
            ));
        }
        for (i, spec) in specs.into_iter().enumerate() {
            let index = resolve_index(state, &desc, &db.name, spec, i as u32 + 2)?;
            desc.indexes.push(index);
        }

        // Families
        let mut assigned: BTreeSet<u32> = BTreeSet::new();
        for (i, (name, columns)) in self.families.into_iter().enumerate() {
            let ids = column_ids(&desc, &columns, &qualified)?;
            for (id, column) in ids.iter().zip(&columns) {
                if !assigned.insert(*id) {
                    return Err(Error::InvalidDescriptor(format!(
                        "column \"{}\" is in multiple column families",
                        column
                    )));
                }
            }
            let id = i as u32;
            let name = name.unwrap_or_else(|| {
                if id == 0 {
                    PRIMARY_NAME.to_string()
                } else {
                    format!("fam_{}_{}", id, columns.join("_"))
                }
            });
            desc.families.push(FamilyDescriptor {
                name,
                id,
                column_names: columns,
                column_ids: ids,
            });
        }
        if desc.families.is_empty() {
            desc.families.push(FamilyDescriptor {
                name: PRIMARY_NAME.to_string(),
                id: 0,
                column_names: Vec::new(),
                column_ids: Vec::new(),
            });
        }
        for column in &desc.columns {
            if !assigned.contains(&column.id) {
                desc.families[0].column_names.push(column.name.clone());
                desc.families[0].column_ids.push(column.id);
            }
        }

        // Constraint names share one namespace
        let mut taken: BTreeSet<String> = std::iter::once(desc.primary_index.name.clone())
            .chain(desc.indexes.iter().filter(|i| i.unique).map(|i| i.name.clone()))
            .collect();

        for spec in self.foreign_keys {
            let parent = state.resolve(&spec.parent)?;
            let parent_columns = spec
                .parent_columns
                .unwrap_or_else(|| parent.primary_index.column_names.clone());
            column_ids(&desc, &spec.columns, &qualified)?;
            for column in &parent_columns {
                if parent.find_column(column).is_none() {
                    return Err(Error::ColumnNotFound(column.clone(), spec.parent.to_string()));
                }
            }
            if parent_columns.len() != spec.columns.len() {
                return Err(Error::InvalidDescriptor(format!(
                    "foreign key on {} columns references {} columns of \"{}\"",
                    spec.columns.len(),
                    parent_columns.len(),
                    spec.parent
                )));
            }
            let name = claim_name(
                &mut taken,
                spec.name,
                format!("fk_{}_ref_{}", spec.columns.join("_"), parent.name),
            )?;
            desc.foreign_keys.push(ForeignKeyReference {
                name,
                column_names: spec.columns,
                referenced_table: parent.id,
                referenced_columns: parent_columns,
                validity: Validity::Validated,
            });
        }

        for spec in self.checks {
            column_ids(&desc, &spec.columns, &qualified)?;
            let mut generated = String::from("check");
            let mut seen = BTreeSet::new();
            for column in spec.columns.iter().filter(|c| seen.insert(c.as_str())) {
                generated.push('_');
                generated.push_str(column);
            }
            let name = claim_name(&mut taken, spec.name, generated)?;
            desc.checks.push(CheckConstraint {
                name,
                expr: spec.expr,
                validity: Validity::Validated,
            });
        }

        Ok(desc)
    }
}

/// Reserve a constraint name: explicit names must be free, generated ones
/// get a numeric suffix until they are.
fn claim_name(taken: &mut BTreeSet<String>, explicit: Option<String>, generated: String) -> Result<String> {
    match explicit {
        Some(name) => {
            if !taken.insert(name.clone()) {
                return Err(Error::DuplicateConstraint(name));
            }
            Ok(name)
        }
        None => {
            let mut name = generated.clone();
            let mut suffix = 1;
            while !taken.insert(name.clone()) {
                name = format!("{}{}", generated, suffix);
                suffix += 1;
            }
            Ok(name)
        }
    }
}

fn column_ids(desc: &TableDescriptor, names: &[String], table: &QualifiedName) -> Result<Vec<u32>> {
    names
        .iter()
        .map(|name| {
            desc.find_column(name)
                .map(|c| c.id)
                .ok_or_else(|| Error::ColumnNotFound(name.clone(), table.to_string()))
        })
        .collect()
}

fn resolve_index(
    state: &CatalogState,
    desc: &TableDescriptor,
    database: &str,
    spec: IndexSpec,
    id: u32,
) -> Result<IndexDescriptor> {
    let table = QualifiedName::new(database, desc.name.as_str());
    let mut index = spec.index;
    if index.name.is_empty() {
        index.name = format!("{}_{}_idx", desc.name, index.column_names.join("_"));
    }
    if desc.find_index(&index.name).is_some() {
        return Err(Error::IndexAlreadyExists(index.name));
    }
    index.id = id;
    index.column_ids = column_ids(desc, &index.column_names, &table)?;
    column_ids(desc, &index.store_column_names, &table)?;
    if let Some(stored) = index
        .store_column_names
        .iter()
        .find(|c| index.column_names.contains(c))
    {
        return Err(Error::InvalidDescriptor(format!(
            "index \"{}\" both indexes and stores column \"{}\"",
            index.name, stored
        )));
    }
    if let Some(interleave) = &spec.interleave {
        index.interleave = resolve_interleave(state, database, interleave, &index)?;
    }
    Ok(index)
}

/// Compute the ancestor chain for an index interleaved into `spec.parent`.
fn resolve_interleave(
    state: &CatalogState,
    database: &str,
    spec: &InterleaveSpec,
    index: &IndexDescriptor,
) -> Result<Vec<InterleaveAncestor>> {
    let parent_name = if spec.parent.database.is_empty() {
        QualifiedName::new(database, spec.parent.table.as_str())
    } else {
        spec.parent.clone()
    };
    let parent = state.resolve(&parent_name)?;
    if !parent.is_physical_table() {
        return Err(Error::WrongObjectType {
            name: parent_name.to_string(),
            expected: "table",
        });
    }
    let parent_key = &parent.primary_index.column_names;
    if spec.columns.len() != parent_key.len()
        || spec.columns.len() > index.column_names.len()
        || spec.columns[..] != index.column_names[..spec.columns.len()]
    {
        return Err(Error::InvalidDescriptor(format!(
            "declared interleave columns ({}) must match the parent's primary key ({}) and prefix index \"{}\"",
            spec.columns.join(", "),
            parent_key.join(", "),
            index.name
        )));
    }
    let mut ancestors = parent.primary_index.interleave.clone();
    let inherited = parent.primary_index.shared_prefix_len();
    ancestors.push(InterleaveAncestor {
        table_id: parent.id,
        index_id: parent.primary_index.id,
        shared_prefix_len: spec.columns.len() - inherited,
    });
    Ok(ancestors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor::Direction;

    fn catalog_with_db() -> Catalog {
        let catalog = Catalog::new();
        catalog.create_database("db").unwrap();
        catalog
    }

    #[test]
    fn test_create_and_get_table() {
        let catalog = catalog_with_db();
        let table = TableBuilder::new("users")
            .column(ColumnDescriptor::new("id", DataType::Integer))
            .simple_column("name", DataType::Varchar(100))
            .primary_key(IndexDescriptor::new("", vec!["id".to_string()]))
            .build(&catalog, "db")
            .unwrap();

        assert_eq!(table.name, "users");
        assert_eq!(table.primary_index.name, "primary");
        assert!(!table.columns[0].nullable);

        let snapshot = catalog.snapshot();
        let retrieved = snapshot.resolve(&QualifiedName::new("db", "users")).unwrap();
        assert_eq!(retrieved.id, table.id);
    }

    #[test]
    fn test_table_already_exists() {
        let catalog = catalog_with_db();
        TableBuilder::new("test").build(&catalog, "db").unwrap();
        let result = TableBuilder::new("test").build(&catalog, "db");
        assert!(matches!(result, Err(Error::TableAlreadyExists(name)) if name == "db.test"));
    }

    #[test]
    fn test_missing_database() {
        let catalog = Catalog::new();
        let result = TableBuilder::new("t").build(&catalog, "nope");
        assert!(matches!(result, Err(Error::UndefinedDatabase(_))));
        assert!(matches!(
            catalog.create_database(INFORMATION_SCHEMA),
            Err(Error::DatabaseAlreadyExists(_))
        ));
    }

    #[test]
    fn test_rowid_and_default_family() {
        let catalog = catalog_with_db();
        let table = TableBuilder::new("t")
            .simple_column("a", DataType::Integer)
            .unique_column("a")
            .build(&catalog, "db")
            .unwrap();

        let rowid = table.find_column(ROWID_COLUMN).unwrap();
        assert!(rowid.hidden);
        assert_eq!(rowid.default_expr.as_deref(), Some(ROWID_DEFAULT));
        assert_eq!(table.primary_index.column_names, vec!["rowid"]);
        assert_eq!(table.indexes[0].name, "t_a_key");
        assert_eq!(table.families.len(), 1);
        assert_eq!(table.families[0].name, "primary");
        assert_eq!(table.families[0].column_names, vec!["a", "rowid"]);
    }

    #[test]
    fn test_snapshot_isolation() {
        let catalog = catalog_with_db();
        let before = catalog.snapshot();
        TableBuilder::new("t").build(&catalog, "db").unwrap();

        let db = before.database("db").unwrap().id;
        assert!(before.table(db, "t").is_none());
        assert!(catalog.snapshot().table(db, "t").is_some());
    }

    #[test]
    fn test_failed_mutation_leaves_state_untouched() {
        let catalog = catalog_with_db();
        let result = TableBuilder::new("t")
            .simple_column("a", DataType::Integer)
            .index(IndexSpec::new(IndexDescriptor::new("i", vec!["zzz".to_string()])))
            .build(&catalog, "db");
        assert!(matches!(result, Err(Error::ColumnNotFound(..))));

        let snapshot = catalog.snapshot();
        let db = snapshot.database("db").unwrap().id;
        assert_eq!(snapshot.tables_in(db).count(), 0);
    }

    #[test]
    fn test_interleave_ancestors() {
        let catalog = catalog_with_db();
        TableBuilder::new("p")
            .simple_column("a", DataType::Integer)
            .primary_key(IndexDescriptor::new("", vec!["a".to_string()]))
            .build(&catalog, "db")
            .unwrap();
        let child = TableBuilder::new("c")
            .simple_column("a", DataType::Integer)
            .simple_column("b", DataType::Integer)
            .primary_key(
                IndexDescriptor::new("", vec!["a".to_string(), "b".to_string()])
                    .directions(vec![Direction::Asc, Direction::Desc]),
            )
            .interleave(InterleaveSpec {
                parent: QualifiedName::new("", "p"),
                columns: vec!["a".to_string()],
            })
            .build(&catalog, "db")
            .unwrap();
        assert_eq!(child.primary_index.interleave.len(), 1);
        assert_eq!(child.primary_index.shared_prefix_len(), 1);

        let grandchild = TableBuilder::new("g")
            .simple_column("a", DataType::Integer)
            .simple_column("b", DataType::Integer)
            .simple_column("c", DataType::Integer)
            .primary_key(IndexDescriptor::new(
                "",
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ))
            .interleave(InterleaveSpec {
                parent: QualifiedName::new("db", "c"),
                columns: vec!["a".to_string(), "b".to_string()],
            })
            .build(&catalog, "db")
            .unwrap();
        let ancestors = &grandchild.primary_index.interleave;
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[1].table_id, child.id);
        assert_eq!(ancestors[1].shared_prefix_len, 1);
        assert_eq!(grandchild.primary_index.shared_prefix_len(), 2);

        let dropped = catalog.drop_table(&QualifiedName::new("db", "p"));
        assert!(matches!(dropped, Err(Error::InvalidDescriptor(_))));
    }

    #[test]
    fn test_generated_check_names() {
        let catalog = catalog_with_db();
        let table = TableBuilder::new("t")
            .simple_column("a", DataType::Integer)
            .check(None, "a > 0", vec!["a".to_string()])
            .check(None, "a < 10", vec!["a".to_string(), "a".to_string()])
            .check(Some("c".to_string()), "true", vec![])
            .build(&catalog, "db")
            .unwrap();
        let names: Vec<_> = table.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["check_a", "check_a1", "c"]);
    }

    #[test]
    fn test_grant_requires_user() {
        let catalog = catalog_with_db();
        let target = GrantTarget::Database("db".to_string());
        let result = catalog.grant(&target, &[Privilege::Select], &["alice".to_string()]);
        assert!(matches!(result, Err(Error::UndefinedUser(_))));

        catalog.create_user("alice").unwrap();
        catalog
            .grant(&target, &[Privilege::Select], &["alice".to_string()])
            .unwrap();
        let snapshot = catalog.snapshot();
        assert!(snapshot
            .database("db")
            .unwrap()
            .privileges
            .check("alice", Privilege::Select));
    }

    #[test]
    fn test_tables_inherit_database_privileges() {
        let catalog = catalog_with_db();
        catalog.create_user("bob").unwrap();
        catalog
            .grant(
                &GrantTarget::Database("db".to_string()),
                &[Privilege::Create],
                &["bob".to_string()],
            )
            .unwrap();
        let table = TableBuilder::new("t").build(&catalog, "db").unwrap();
        assert!(table.privileges.check("bob", Privilege::Create));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let path = path.to_str().unwrap();

        let catalog = catalog_with_db();
        catalog.create_user("alice").unwrap();
        TableBuilder::new("t")
            .simple_column("a", DataType::Text)
            .build(&catalog, "db")
            .unwrap();
        catalog.save_to_disk(path).unwrap();

        let loaded = Catalog::load_from_disk(path).unwrap();
        let snapshot = loaded.snapshot();
        assert!(snapshot.user_exists("alice"));
        let table = snapshot.resolve(&QualifiedName::new("db", "t")).unwrap();
        assert_eq!(table.columns.len(), 2);

        let id = loaded.create_database("other").unwrap();
        assert!(id > table.id);
    }
}
