//! Result rows and the row accumulator
//!
//! [`RowContainer`] is the append-only buffer every introspection plan fills.
//! Each row is charged against a shared [`MemoryMonitor`]; the charge is
//! returned when the container is closed, explicitly or by drop.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::catalog::DataType;
use crate::error::{Error, Result};

/// A single result value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
}

impl Datum {
    pub fn string(s: impl Into<String>) -> Self {
        Datum::String(s.into())
    }

    /// `NULL` for `None`
    pub fn opt_string(s: Option<impl Into<String>>) -> Self {
        s.map_or(Datum::Null, |s| Datum::String(s.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Can this value appear in a column of type `typ`?
    pub fn fits(&self, typ: &DataType) -> bool {
        match self {
            Datum::Null => true,
            Datum::Bool(_) => *typ == DataType::Boolean,
            Datum::Int(_) => typ.is_numeric(),
            Datum::String(_) => typ.is_string(),
        }
    }

    /// Bytes charged to the memory monitor for this value
    pub fn size(&self) -> usize {
        std::mem::size_of::<Datum>()
            + match self {
                Datum::String(s) => s.len(),
                _ => 0,
            }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{}", b),
            Datum::Int(n) => write!(f, "{}", n),
            Datum::String(s) => write!(f, "{}", s),
        }
    }
}

/// A result column: name and type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: DataType,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, typ: DataType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }
}

/// Build a column list from `(name, type)` pairs
pub fn columns(defs: &[(&str, DataType)]) -> Vec<ResultColumn> {
    defs.iter()
        .map(|(name, typ)| ResultColumn::new(*name, typ.clone()))
        .collect()
}

// ========== Memory accounting ==========

/// Tracks bytes held by result containers against a fixed budget
#[derive(Debug)]
pub struct MemoryMonitor {
    limit: usize,
    used: AtomicUsize,
}

impl MemoryMonitor {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently reserved
    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Reserve `bytes`, failing without side effects when over budget
    pub fn reserve(&self, bytes: usize) -> Result<()> {
        let mut current = self.used.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(bytes);
            if next > self.limit {
                return Err(Error::MemoryBudgetExceeded {
                    requested: bytes,
                    used: current,
                    limit: self.limit,
                });
            }
            match self
                .used
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn release(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_sub(bytes))
            });
    }
}

// ========== Row container ==========

/// Ordered, append-only rows typed by a fixed column list
#[derive(Debug)]
pub struct RowContainer {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Datum>>,
    monitor: Arc<MemoryMonitor>,
    reserved: usize,
    closed: bool,
}

impl RowContainer {
    pub fn new(columns: Vec<ResultColumn>, monitor: Arc<MemoryMonitor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            monitor,
            reserved: 0,
            closed: false,
        }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    /// Append a row; its arity and value types must match the columns
    pub fn add_row(&mut self, row: Vec<Datum>) -> Result<()> {
        if self.closed {
            return Err(Error::Internal("row added to a closed container".to_string()));
        }
        if row.len() != self.columns.len() {
            return Err(Error::Internal(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (datum, column) in row.iter().zip(&self.columns) {
            if !datum.fits(&column.typ) {
                return Err(Error::Internal(format!(
                    "value {} does not fit column \"{}\" of type {}",
                    datum, column.name, column.typ
                )));
            }
        }

        let bytes: usize = row.iter().map(Datum::size).sum();
        self.monitor.reserve(bytes)?;
        self.reserved += bytes;
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[Datum]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Stable ascending sort on the given column positions
    pub fn sort_by_columns(&mut self, ordering: &[usize]) {
        self.rows.sort_by(|a, b| {
            ordering
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Drop all rows and return their memory
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rows.clear();
        self.monitor.release(self.reserved);
        trace!(bytes = self.reserved, "row container closed");
        self.reserved = 0;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RowContainer {
    fn drop(&mut self) {
        self.close();
    }
}
