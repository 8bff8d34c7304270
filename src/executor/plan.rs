//! Plan nodes for introspection statements
//!
//! Statements are planned in two phases. Planning produces a [`PlanNode`]
//! whose columns are already final; a [`DelayedNode`] holds the callback that
//! reads the catalog and produces rows, run only when the plan is started.
//! A plan that is never started never touches the catalog.

use std::fmt;

use tracing::trace;

use super::planner::Planner;
use super::rows::{Datum, ResultColumn, RowContainer};
use crate::error::{Error, Result};

/// Deferred row construction, invoked at most once
pub type PlanConstructor = Box<dyn FnOnce(&Planner) -> Result<PlanNode>>;

/// A plan node
pub enum PlanNode {
    Delayed(DelayedNode),
    Values(ValuesNode),
    Sort(SortNode),
}

/// Fixed columns now, rows from `constructor` later
pub struct DelayedNode {
    name: String,
    columns: Vec<ResultColumn>,
    constructor: Option<PlanConstructor>,
    plan: Option<Box<PlanNode>>,
}

impl DelayedNode {
    pub fn new<F>(name: impl Into<String>, columns: Vec<ResultColumn>, constructor: F) -> Self
    where
        F: FnOnce(&Planner) -> Result<PlanNode> + 'static,
    {
        Self {
            name: name.into(),
            columns,
            constructor: Some(Box::new(constructor)),
            plan: None,
        }
    }

    /// Name used in diagnostics, e.g. `SHOW COLUMNS FROM db.t`
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Materialized rows
pub struct ValuesNode {
    rows: RowContainer,
    next_row: usize,
}

impl ValuesNode {
    pub fn new(rows: RowContainer) -> Self {
        Self { rows, next_row: 0 }
    }
}

/// Ascending sort over the listed columns of a materialized input
pub struct SortNode {
    input: Box<PlanNode>,
    ordering: Vec<usize>,
    sorted: Option<ValuesNode>,
}

impl SortNode {
    pub fn new(input: PlanNode, ordering: Vec<usize>) -> Self {
        Self {
            input: Box::new(input),
            ordering,
            sorted: None,
        }
    }
}

impl PlanNode {
    /// Wrap `self` in an ascending sort on `ordering`
    pub fn sorted(self, ordering: Vec<usize>) -> PlanNode {
        PlanNode::Sort(SortNode::new(self, ordering))
    }

    /// Statement this plan answers, for diagnostics
    pub fn name(&self) -> &str {
        match self {
            PlanNode::Delayed(n) => n.name(),
            PlanNode::Values(_) => "values",
            PlanNode::Sort(n) => n.input.name(),
        }
    }

    /// Output columns; known before the plan is started
    pub fn columns(&self) -> &[ResultColumn] {
        match self {
            PlanNode::Delayed(n) => &n.columns,
            PlanNode::Values(n) => n.rows.columns(),
            PlanNode::Sort(n) => n.input.columns(),
        }
    }

    /// Run deferred construction so rows can be read
    pub fn start(&mut self, planner: &Planner) -> Result<()> {
        match self {
            PlanNode::Delayed(n) => {
                let constructor = n.constructor.take().ok_or_else(|| {
                    Error::Internal(format!("plan {} started twice", n.name))
                })?;
                trace!(plan = %n.name, "running deferred constructor");
                let mut plan = constructor(planner)?;
                if plan.columns() != n.columns.as_slice() {
                    plan.close();
                    return Err(Error::Internal(format!(
                        "plan {} produced columns that differ from its declared columns",
                        n.name
                    )));
                }
                plan.start(planner)?;
                n.plan = Some(Box::new(plan));
                Ok(())
            }
            PlanNode::Values(_) => Ok(()),
            PlanNode::Sort(n) => {
                n.input.start(planner)?;
                let mut rows = RowContainer::new(n.input.columns().to_vec(), planner.monitor());
                while let Some(row) = n.input.next()? {
                    rows.add_row(row)?;
                }
                n.input.close();
                rows.sort_by_columns(&n.ordering);
                n.sorted = Some(ValuesNode::new(rows));
                Ok(())
            }
        }
    }

    /// Next row, or `None` when exhausted or not started
    pub fn next(&mut self) -> Result<Option<Vec<Datum>>> {
        match self {
            PlanNode::Delayed(n) => match n.plan.as_mut() {
                Some(plan) => plan.next(),
                None => Ok(None),
            },
            PlanNode::Values(n) => {
                let row = n.rows.row(n.next_row).map(<[Datum]>::to_vec);
                if row.is_some() {
                    n.next_row += 1;
                }
                Ok(row)
            }
            PlanNode::Sort(n) => match n.sorted.as_mut() {
                Some(values) => {
                    let row = values.rows.row(values.next_row).map(<[Datum]>::to_vec);
                    if row.is_some() {
                        values.next_row += 1;
                    }
                    Ok(row)
                }
                None => Ok(None),
            },
        }
    }

    /// Release all held rows
    pub fn close(&mut self) {
        match self {
            PlanNode::Delayed(n) => {
                n.constructor = None;
                if let Some(plan) = n.plan.as_mut() {
                    plan.close();
                }
            }
            PlanNode::Values(n) => n.rows.close(),
            PlanNode::Sort(n) => {
                n.input.close();
                if let Some(sorted) = n.sorted.as_mut() {
                    sorted.rows.close();
                }
            }
        }
    }

    /// Start the plan and drain every row, closing it on all paths
    pub fn collect(mut self, planner: &Planner) -> Result<Vec<Vec<Datum>>> {
        let result = self.start(planner).and_then(|_| {
            let mut out = Vec::new();
            while let Some(row) = self.next()? {
                out.push(row);
            }
            Ok(out)
        });
        self.close();
        result
    }
}

impl fmt::Debug for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::Delayed(n) => f
                .debug_struct("Delayed")
                .field("name", &n.name)
                .field("columns", &n.columns)
                .field("started", &n.constructor.is_none())
                .finish(),
            PlanNode::Values(n) => f
                .debug_struct("Values")
                .field("rows", &n.rows.len())
                .finish(),
            PlanNode::Sort(n) => f
                .debug_struct("Sort")
                .field("ordering", &n.ordering)
                .field("input", &n.input)
                .finish(),
        }
    }
}
