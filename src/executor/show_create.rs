//! `SHOW CREATE TABLE` and `SHOW CREATE VIEW`
//!
//! Reconstructs canonical DDL from descriptors. The output parses back to a
//! statement that creates an identical descriptor, so rendering the result
//! again yields the same text.

use super::plan::{DelayedNode, PlanNode};
use super::planner::Planner;
use super::rows::{columns, Datum};
use crate::catalog::{DataType, Direction, IndexDescriptor, QualifiedName, TableDescriptor};
use crate::error::{Error, Result};
use crate::sql::ast::{Statement, TableName};
use crate::sql::{quote_name, quote_names, quote_qualified, Parser};

impl Planner {
    /// `SHOW CREATE TABLE <table>`
    pub fn show_create_table(&self, table: &TableName) -> Result<PlanNode> {
        let name = self.normalize(table)?;
        let written = table.to_string();
        let cols = columns(&[("Table", DataType::Text), ("CreateTable", DataType::Text)]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("SHOW CREATE TABLE {}", name),
            cols.clone(),
            move |p: &Planner| {
                p.check_database_exists(&name.database)?;
                let desc = p.must_get_table_desc(&name)?;
                p.any_privilege(&desc)?;
                let ddl = p.create_table_ddl(&written, &name.database, &desc)?;
                p.values(cols, |rows| {
                    rows.add_row(vec![Datum::String(written), Datum::String(ddl)])
                })
            },
        )))
    }

    /// `SHOW CREATE VIEW <view>`
    pub fn show_create_view(&self, view: &TableName) -> Result<PlanNode> {
        let name = self.normalize(view)?;
        let written = view.to_string();
        let cols = columns(&[("View", DataType::Text), ("CreateView", DataType::Text)]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("SHOW CREATE VIEW {}", name),
            cols.clone(),
            move |p: &Planner| {
                p.check_database_exists(&name.database)?;
                let desc = p.must_get_view_desc(&name)?;
                p.any_privilege(&desc)?;
                let ddl = p.create_view_ddl(&written, &name, &desc)?;
                p.values(cols, |rows| {
                    rows.add_row(vec![Datum::String(written), Datum::String(ddl)])
                })
            },
        )))
    }

    /// Render `CREATE TABLE` for `desc`, headed by `written`
    pub fn create_table_ddl(
        &self,
        written: &str,
        database: &str,
        desc: &TableDescriptor,
    ) -> Result<String> {
        let mut buf = format!("CREATE TABLE {} (", written);
        let mut primary = None;

        for (i, column) in desc.visible_columns().enumerate() {
            if i != 0 {
                buf.push(',');
            }
            buf.push_str(&format!(
                "\n\t{} {} {}",
                quote_name(&column.name),
                column.data_type,
                if column.nullable { "NULL" } else { "NOT NULL" }
            ));
            if let Some(default) = &column.default_expr {
                buf.push_str(&format!(" DEFAULT {}", default));
            }
            // rowid is hidden, so a rowid-only key never matches here
            if desc.is_physical_table() && desc.primary_index.column_ids.first() == Some(&column.id) {
                primary = Some(format!(
                    ",\n\tCONSTRAINT {} PRIMARY KEY ({})",
                    quote_name(&desc.primary_index.name),
                    key_columns(&desc.primary_index, desc.primary_index.column_names.len())
                ));
            }
        }
        if let Some(primary) = primary {
            buf.push_str(&primary);
        }

        for index in &desc.indexes {
            buf.push_str(&format!(
                ",\n\t{}INDEX {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                quote_name(&index.name),
                key_columns(index, index.column_names.len())
            ));
            if !index.store_column_names.is_empty() {
                buf.push_str(&format!(" STORING ({})", quote_names(&index.store_column_names)));
            }
            buf.push_str(&self.interleave_clause(database, index)?);
        }

        for check in &desc.checks {
            buf.push_str(",\n\t");
            if !check.name.is_empty() {
                buf.push_str(&format!("CONSTRAINT {} ", quote_name(&check.name)));
            }
            buf.push_str(&format!("CHECK ({})", check.expr));
        }

        for family in &desc.families {
            let active: Vec<&str> = family
                .column_ids
                .iter()
                .zip(&family.column_names)
                .filter(|(id, _)| desc.find_active_column_by_id(**id).is_some())
                .map(|(_, name)| name.as_str())
                .collect();
            buf.push_str(&format!(
                ",\n\tFAMILY {} ({})",
                quote_name(&family.name),
                quote_names(&active)
            ));
        }

        buf.push_str("\n)");
        buf.push_str(&self.interleave_clause(database, &desc.primary_index)?);
        Ok(buf)
    }

    /// ` INTERLEAVE IN PARENT <parent> (<shared columns>)`, or nothing
    fn interleave_clause(&self, database: &str, index: &IndexDescriptor) -> Result<String> {
        let Some(parent) = index.interleave.last() else {
            return Ok(String::new());
        };
        let state = self.txn().read()?;
        let parent_desc = state.table_by_id(parent.table_id).ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "index \"{}\" is interleaved into missing table {}",
                index.name, parent.table_id
            ))
        })?;
        let parent_database = state
            .databases()
            .find(|db| db.id == parent_desc.parent_id)
            .map(|db| db.name.as_str());
        let parent_name = match parent_database {
            Some(db) if db != database => quote_qualified(Some(db), &parent_desc.name),
            _ => quote_name(&parent_desc.name),
        };
        Ok(format!(
            " INTERLEAVE IN PARENT {} ({})",
            parent_name,
            quote_names(&index.column_names[..index.shared_prefix_len()])
        ))
    }

    /// Render `CREATE VIEW` for `desc`, adding the column list when the
    /// recorded names differ from what the stored query produces
    pub fn create_view_ddl(
        &self,
        written: &str,
        name: &QualifiedName,
        desc: &TableDescriptor,
    ) -> Result<String> {
        let query = desc.view_query.as_deref().unwrap_or_default();
        let select = match Parser::parse_one(query) {
            Ok(Statement::Select(select)) => select,
            Ok(_) => {
                return Err(Error::MalformedStoredDefinition(format!(
                    "failed to parse underlying query from view \"{}\" as a select",
                    name
                )))
            }
            Err(e) => {
                return Err(Error::MalformedStoredDefinition(format!(
                    "failed to parse underlying query from view \"{}\": {}",
                    name, e
                )))
            }
        };

        let planned = {
            let _suppressed = self.eval().suppress_privilege_checks();
            self.plan_select_columns(&select).map_err(|e| {
                Error::MalformedStoredDefinition(format!(
                    "failed to plan underlying query from view \"{}\": {}",
                    name, e
                ))
            })?
        };

        let custom_names = planned.len() != desc.columns.len()
            || planned
                .iter()
                .zip(&desc.columns)
                .any(|(planned, recorded)| planned.name != recorded.name);

        let mut buf = format!("CREATE VIEW {} ", written);
        if custom_names {
            let names: Vec<&str> = desc.columns.iter().map(|c| c.name.as_str()).collect();
            buf.push_str(&format!("({}) ", quote_names(&names)));
        }
        buf.push_str(&format!("AS {}", query));
        Ok(buf)
    }
}

/// The first `n` key columns of `index`, quoted, with DESC where it applies
fn key_columns(index: &IndexDescriptor, n: usize) -> String {
    index
        .column_names
        .iter()
        .zip(&index.column_directions)
        .take(n)
        .map(|(column, direction)| match direction {
            Direction::Asc => quote_name(column),
            Direction::Desc => format!("{} DESC", quote_name(column)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
