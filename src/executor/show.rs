//! SHOW statements over the catalog
//!
//! Each builder fixes the result columns immediately and returns a
//! [`DelayedNode`] whose constructor does every catalog read. Existence is
//! probed as root; what the user may see is decided by the catalog views,
//! with the current database switched to the target for the duration of
//! the read.

use std::collections::BTreeMap;

use super::catalog_reader::CatalogQuery;
use super::plan::{DelayedNode, PlanNode};
use super::planner::Planner;
use super::rows::{columns, Datum, ResultColumn};
use super::vars;
use crate::catalog::{DataType, QualifiedName};
use crate::error::{Error, Result};
use crate::sql::ast::{ShowGrantsStatement, TableName, TargetList};

/// Direction shown for stored (non-key) index columns
pub const NOT_APPLICABLE: &str = "N/A";

impl Planner {
    /// `SHOW ALL` / `SHOW <variable>`
    pub fn show_variable(&self, name: &str) -> Result<PlanNode> {
        let name = name.to_uppercase();
        if name == "ALL" {
            let cols = columns(&[("Variable", DataType::Text), ("Value", DataType::Text)]);
            return Ok(PlanNode::Delayed(DelayedNode::new(
                "SHOW ALL",
                cols.clone(),
                move |p: &Planner| {
                    p.values(cols, |rows| {
                        for (var, accessor) in vars::all() {
                            rows.add_row(vec![Datum::string(var), Datum::string(accessor(p))])?;
                        }
                        Ok(())
                    })
                },
            )));
        }

        let accessor = vars::lookup(&name).ok_or_else(|| Error::UnknownVariable(name.clone()))?;
        let label = format!("SHOW {}", name);
        let cols = vec![ResultColumn::new(name, DataType::Text)];
        Ok(PlanNode::Delayed(DelayedNode::new(
            label,
            cols.clone(),
            move |p: &Planner| {
                p.values(cols, |rows| rows.add_row(vec![Datum::string(accessor(p))]))
            },
        )))
    }

    /// `SHOW COLUMNS FROM <table>`
    pub fn show_columns(&self, table: &TableName) -> Result<PlanNode> {
        let name = self.normalize(table)?;
        let cols = columns(&[
            ("Field", DataType::Text),
            ("Type", DataType::Text),
            ("Null", DataType::Boolean),
            ("Default", DataType::Text),
        ]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("SHOW COLUMNS FROM {}", name),
            cols.clone(),
            move |p: &Planner| {
                let _guard = p.enter_table(&name)?;
                let found = p.query_rows(CatalogQuery::Columns {
                    schema: &name.database,
                    table: &name.table,
                })?;
                p.values(cols, |rows| {
                    for mut row in found {
                        // is_nullable is YES / NO in the catalog view
                        row[2] = Datum::Bool(row[2].as_str() != Some("NO"));
                        rows.add_row(row)?;
                    }
                    Ok(())
                })
            },
        )))
    }

    /// `SHOW TABLES [FROM <database>]`
    pub fn show_tables(&self, database: Option<&str>) -> Result<PlanNode> {
        let database = database
            .unwrap_or(self.session().database.as_str())
            .to_string();
        if database.is_empty() {
            return Err(Error::NoDatabase);
        }
        let cols = columns(&[("Table", DataType::Text)]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("SHOW TABLES FROM {}", database),
            cols.clone(),
            move |p: &Planner| {
                p.check_database_exists(&database)?;
                let _guard = p.eval().override_database(&database);
                let found = p.query_rows(CatalogQuery::Tables { schema: &database })?;
                p.values(cols, |rows| found.into_iter().try_for_each(|r| rows.add_row(r)))
            },
        )))
    }

    /// `SHOW DATABASES`
    pub fn show_databases(&self) -> Result<PlanNode> {
        let cols = columns(&[("Database", DataType::Text)]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            "SHOW DATABASES",
            cols.clone(),
            move |p: &Planner| {
                let found = p.query_rows(CatalogQuery::Schemata)?;
                p.values(cols, |rows| found.into_iter().try_for_each(|r| rows.add_row(r)))
            },
        )))
    }

    /// `SHOW GRANTS ON <targets> [FOR <users>]`
    pub fn show_grants(&self, show: &ShowGrantsStatement) -> Result<PlanNode> {
        let targets = show
            .targets
            .clone()
            .ok_or_else(|| Error::Unsupported("SHOW GRANTS with no targets".to_string()))?;
        let grantees = show.grantees.clone();
        let object = match targets {
            TargetList::Databases(_) => "Database",
            TargetList::Tables(_) => "Table",
        };
        let cols = columns(&[
            (object, DataType::Text),
            ("User", DataType::Text),
            ("Privileges", DataType::Text),
        ]);

        let plan = DelayedNode::new("SHOW GRANTS", cols.clone(), move |p: &Planner| {
            let grantees = grantees.as_deref();
            let mut found = Vec::new();
            match &targets {
                TargetList::Databases(databases) => {
                    for database in databases {
                        p.check_database_exists(database)?;
                    }
                    for database in databases {
                        let _guard = p.eval().override_database(database);
                        found.extend(p.query_rows(CatalogQuery::SchemaGrants {
                            schemas: std::slice::from_ref(database),
                            grantees,
                        })?);
                    }
                }
                TargetList::Tables(patterns) => {
                    let mut by_database: BTreeMap<String, Vec<QualifiedName>> = BTreeMap::new();
                    for pattern in patterns {
                        for table in p.expand_table_pattern(pattern)? {
                            p.check_table_exists(&table)?;
                            by_database
                                .entry(table.database.clone())
                                .or_default()
                                .push(table);
                        }
                    }
                    for (database, tables) in &by_database {
                        let _guard = p.eval().override_database(database);
                        found.extend(p.query_rows(CatalogQuery::TableGrants {
                            tables,
                            grantees,
                        })?);
                    }
                }
            }
            p.values(cols, |rows| found.into_iter().try_for_each(|r| rows.add_row(r)))
        });
        Ok(PlanNode::Delayed(plan).sorted(vec![0, 1, 2]))
    }

    /// `SHOW INDEX FROM <table>`
    pub fn show_index(&self, table: &TableName) -> Result<PlanNode> {
        let name = self.normalize(table)?;
        let cols = columns(&[
            ("Table", DataType::Text),
            ("Name", DataType::Text),
            ("Unique", DataType::Boolean),
            ("Seq", DataType::BigInt),
            ("Column", DataType::Text),
            ("Direction", DataType::Text),
            ("Storing", DataType::Boolean),
        ]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("SHOW INDEX FROM {}", name),
            cols.clone(),
            move |p: &Planner| {
                p.check_database_exists(&name.database)?;
                let desc = p.must_get_table_desc(&name)?;
                p.any_privilege(&desc)?;

                p.values(cols, |rows| {
                    for index in desc.all_indexes() {
                        let key = index
                            .column_names
                            .iter()
                            .zip(&index.column_directions)
                            .map(|(column, direction)| (column, direction.to_string(), false));
                        let stored = index
                            .store_column_names
                            .iter()
                            .map(|column| (column, NOT_APPLICABLE.to_string(), true));
                        for (seq, (column, direction, storing)) in key.chain(stored).enumerate() {
                            rows.add_row(vec![
                                Datum::string(name.table.as_str()),
                                Datum::string(index.name.as_str()),
                                Datum::Bool(index.unique),
                                Datum::Int(seq as i64 + 1),
                                Datum::string(column.as_str()),
                                Datum::String(direction),
                                Datum::Bool(storing),
                            ])?;
                        }
                    }
                    Ok(())
                })
            },
        )))
    }

    /// `SHOW CONSTRAINTS FROM <table>`
    pub fn show_constraints(&self, table: &TableName) -> Result<PlanNode> {
        let name = self.normalize(table)?;
        let cols = columns(&[
            ("Table", DataType::Text),
            ("Name", DataType::Text),
            ("Type", DataType::Text),
            ("Column(s)", DataType::Text),
            ("Details", DataType::Text),
        ]);
        let label = format!("SHOW CONSTRAINTS FROM {}", name);
        let plan = DelayedNode::new(label, cols.clone(), move |p: &Planner| {
            p.check_database_exists(&name.database)?;
            let desc = p.must_get_table_desc(&name)?;
            p.any_privilege(&desc)?;

            let state = p.txn().read()?;
            let info = desc.constraint_info(|id| {
                state
                    .table_by_id(id)
                    .cloned()
                    .ok_or_else(|| Error::InvalidDescriptor(format!("no table with id {}", id)))
            })?;

            p.values(cols, |rows| {
                for (constraint, detail) in info {
                    let mut kind = detail.kind.to_string();
                    if detail.unvalidated {
                        kind.push_str(" (UNVALIDATED)");
                    }
                    rows.add_row(vec![
                        Datum::string(name.table.as_str()),
                        Datum::String(constraint),
                        Datum::String(kind),
                        Datum::opt_string(detail.columns.map(|c| c.join(", "))),
                        Datum::opt_string(detail.details),
                    ])?;
                }
                Ok(())
            })
        });
        Ok(PlanNode::Delayed(plan).sorted(vec![0, 1]))
    }

    /// `SHOW USERS`
    pub fn show_users(&self) -> Result<PlanNode> {
        let cols = columns(&[("username", DataType::Text)]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            "SHOW USERS",
            cols.clone(),
            move |p: &Planner| {
                if !p.session().is_root() {
                    return Err(Error::PermissionDenied(format!(
                        "user {} may not list users",
                        p.user()
                    )));
                }
                let state = p.txn().read()?;
                p.values(cols, |rows| {
                    state
                        .users()
                        .try_for_each(|u| rows.add_row(vec![Datum::string(u)]))
                })
            },
        )))
    }
}
