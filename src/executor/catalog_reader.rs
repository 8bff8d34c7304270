//! Catalog reads through `information_schema`
//!
//! Every catalog lookup an introspection statement makes is one of the fixed
//! [`CatalogQuery`] templates. A query runs against the transaction's
//! snapshot as seen by a principal: the session user normally, or root for
//! existence probes that must not depend on the object's own privileges.

use super::planner::Planner;
use super::rows::Datum;
use crate::catalog::{InformationSchema, QualifiedName, ROOT_USER};
use crate::error::Result;
use tracing::trace;

const SCHEMA_EXISTS: &str =
    "SELECT schema_name FROM information_schema.schemata WHERE schema_name = $1 LIMIT 1";
const TABLE_EXISTS: &str = "SELECT table_schema FROM information_schema.tables \
     WHERE table_schema = $1 AND table_name = $2 LIMIT 1";
const TABLE_PRIVILEGE_EXISTS: &str = "SELECT table_name FROM information_schema.table_privileges \
     WHERE table_schema = $1 AND table_name = $2 AND grantee = $3 LIMIT 1";
const COLUMNS: &str = "SELECT column_name, data_type, is_nullable, column_default \
     FROM information_schema.columns WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";
const TABLES: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = $1 ORDER BY table_name";
const SCHEMATA: &str =
    "SELECT schema_name FROM information_schema.schemata ORDER BY schema_name";
const SCHEMA_GRANTS: &str = "SELECT table_schema, grantee, privilege_type \
     FROM information_schema.schema_privileges WHERE table_schema IN ($1)";
const TABLE_GRANTS: &str = "SELECT table_name, grantee, privilege_type \
     FROM information_schema.table_privileges WHERE (table_schema, table_name) IN ($1)";
const GRANTEE_FILTER: &str = " AND grantee IN ($2)";

/// Parameterized catalog query templates
#[derive(Debug, Clone, Copy)]
pub enum CatalogQuery<'a> {
    SchemaExists {
        schema: &'a str,
    },
    TableExists {
        schema: &'a str,
        table: &'a str,
    },
    TablePrivilegeExists {
        schema: &'a str,
        table: &'a str,
        grantee: &'a str,
    },
    Columns {
        schema: &'a str,
        table: &'a str,
    },
    Tables {
        schema: &'a str,
    },
    Schemata,
    SchemaGrants {
        schemas: &'a [String],
        grantees: Option<&'a [String]>,
    },
    TableGrants {
        tables: &'a [QualifiedName],
        grantees: Option<&'a [String]>,
    },
}

impl CatalogQuery<'_> {
    /// The SQL text of this template
    pub fn sql(&self) -> String {
        match self {
            CatalogQuery::SchemaExists { .. } => SCHEMA_EXISTS.to_string(),
            CatalogQuery::TableExists { .. } => TABLE_EXISTS.to_string(),
            CatalogQuery::TablePrivilegeExists { .. } => TABLE_PRIVILEGE_EXISTS.to_string(),
            CatalogQuery::Columns { .. } => COLUMNS.to_string(),
            CatalogQuery::Tables { .. } => TABLES.to_string(),
            CatalogQuery::Schemata => SCHEMATA.to_string(),
            CatalogQuery::SchemaGrants { grantees, .. } => with_grantees(SCHEMA_GRANTS, grantees),
            CatalogQuery::TableGrants { grantees, .. } => with_grantees(TABLE_GRANTS, grantees),
        }
    }

    fn run(&self, view: &InformationSchema<'_>) -> Vec<Vec<Datum>> {
        let keep = |grantees: &Option<&[String]>, grantee: &str| {
            grantees.map_or(true, |g| g.iter().any(|u| u == grantee))
        };

        match *self {
            CatalogQuery::SchemaExists { schema } => view
                .schemata()
                .into_iter()
                .filter(|s| s == schema)
                .take(1)
                .map(|s| vec![Datum::String(s)])
                .collect(),
            CatalogQuery::TableExists { schema, table } => view
                .tables()
                .into_iter()
                .filter(|t| t.schema == schema && t.name == table)
                .take(1)
                .map(|t| vec![Datum::String(t.schema)])
                .collect(),
            CatalogQuery::TablePrivilegeExists {
                schema,
                table,
                grantee,
            } => view
                .table_privileges()
                .into_iter()
                .filter(|p| p.schema == schema && p.table == table && p.grantee == grantee)
                .take(1)
                .map(|p| vec![Datum::String(p.table)])
                .collect(),
            CatalogQuery::Columns { schema, table } => {
                let mut rows: Vec<_> = view
                    .columns()
                    .into_iter()
                    .filter(|c| c.schema == schema && c.table == table)
                    .collect();
                rows.sort_by_key(|c| c.ordinal_position);
                rows.into_iter()
                    .map(|c| {
                        vec![
                            Datum::String(c.name),
                            Datum::String(c.data_type),
                            Datum::string(c.is_nullable),
                            Datum::opt_string(c.default_expr),
                        ]
                    })
                    .collect()
            }
            CatalogQuery::Tables { schema } => {
                let mut names: Vec<_> = view
                    .tables()
                    .into_iter()
                    .filter(|t| t.schema == schema)
                    .map(|t| t.name)
                    .collect();
                names.sort();
                names.into_iter().map(|n| vec![Datum::String(n)]).collect()
            }
            CatalogQuery::Schemata => {
                let mut names = view.schemata();
                names.sort();
                names.into_iter().map(|n| vec![Datum::String(n)]).collect()
            }
            CatalogQuery::SchemaGrants { schemas, grantees } => view
                .schema_privileges()
                .into_iter()
                .filter(|p| schemas.contains(&p.schema) && keep(&grantees, &p.grantee))
                .map(|p| {
                    vec![
                        Datum::String(p.schema),
                        Datum::String(p.grantee),
                        Datum::String(p.privilege),
                    ]
                })
                .collect(),
            CatalogQuery::TableGrants { tables, grantees } => view
                .table_privileges()
                .into_iter()
                .filter(|p| {
                    tables
                        .iter()
                        .any(|t| t.database == p.schema && t.table == p.table)
                        && keep(&grantees, &p.grantee)
                })
                .map(|p| {
                    vec![
                        Datum::String(p.table),
                        Datum::String(p.grantee),
                        Datum::String(p.privilege),
                    ]
                })
                .collect(),
        }
    }
}

fn with_grantees(base: &str, grantees: &Option<&[String]>) -> String {
    match grantees {
        Some(_) => format!("{}{}", base, GRANTEE_FILTER),
        None => base.to_string(),
    }
}

impl Planner {
    /// Run `query` as the session user
    pub fn query_rows(&self, query: CatalogQuery<'_>) -> Result<Vec<Vec<Datum>>> {
        self.query_rows_as(self.user(), query)
    }

    /// Run `query` as root; used only for existence probes
    pub fn query_rows_as_root(&self, query: CatalogQuery<'_>) -> Result<Vec<Vec<Datum>>> {
        self.query_rows_as(ROOT_USER, query)
    }

    fn query_rows_as(&self, principal: &str, query: CatalogQuery<'_>) -> Result<Vec<Vec<Datum>>> {
        let state = self.txn().read()?;
        let database = self.eval().database();
        trace!(sql = %query.sql(), principal, database = %database, "catalog query");
        let view = InformationSchema::new(state, principal, &database);
        Ok(query.run(&view))
    }
}
