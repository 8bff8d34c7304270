//! Builtin function registry and `HELP`

use super::plan::{DelayedNode, PlanNode};
use super::planner::Planner;
use super::rows::{columns, Datum};
use crate::catalog::DataType;
use crate::error::Result;

/// Function category shown by `HELP`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    String,
    Numeric,
    DateTime,
    Id,
    Aggregate,
    Comparison,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::String => "String and Byte Functions",
            Category::Numeric => "Math and Numeric Functions",
            Category::DateTime => "Date and Time Functions",
            Category::Id => "ID Generation Functions",
            Category::Aggregate => "Aggregate Functions",
            Category::Comparison => "Comparison Functions",
        }
    }
}

/// One overload of a builtin function
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub category: Category,
    pub details: &'static str,
}

const fn builtin(
    name: &'static str,
    signature: &'static str,
    category: Category,
    details: &'static str,
) -> Builtin {
    Builtin {
        name,
        signature,
        category,
        details,
    }
}

static BUILTINS: &[Builtin] = &[
    builtin("abs", "(val: int) -> int", Category::Numeric, "Calculates the absolute value of `val`."),
    builtin("abs", "(val: float) -> float", Category::Numeric, "Calculates the absolute value of `val`."),
    builtin("avg", "(arg: int) -> decimal", Category::Aggregate, "Calculates the average of the selected values."),
    builtin("ceil", "(val: float) -> float", Category::Numeric, "Calculates the smallest integer greater than `val`."),
    builtin("coalesce", "(anyelement...) -> anyelement", Category::Comparison, "Returns the first non-NULL argument."),
    builtin("concat", "(string...) -> string", Category::String, "Concatenates a comma-separated list of strings."),
    builtin("count", "(arg: anyelement) -> int", Category::Aggregate, "Calculates the number of selected elements."),
    builtin("floor", "(val: float) -> float", Category::Numeric, "Calculates the largest integer not greater than `val`."),
    builtin("length", "(val: string) -> int", Category::String, "Calculates the number of characters in `val`."),
    builtin("length", "(val: bytes) -> int", Category::String, "Calculates the number of bytes in `val`."),
    builtin("lower", "(val: string) -> string", Category::String, "Converts all characters in `val` to their lower-case equivalents."),
    builtin("max", "(arg: anyelement) -> anyelement", Category::Aggregate, "Identifies the maximum selected value."),
    builtin("min", "(arg: anyelement) -> anyelement", Category::Aggregate, "Identifies the minimum selected value."),
    builtin("now", "() -> timestamp", Category::DateTime, "Returns the current transaction's timestamp."),
    builtin("round", "(input: float) -> float", Category::Numeric, "Rounds `input` to the nearest integer."),
    builtin("round", "(input: float, decimal_accuracy: int) -> float", Category::Numeric, "Keeps `decimal_accuracy` digits of `input` after rounding."),
    builtin("sqrt", "(val: float) -> float", Category::Numeric, "Calculates the square root of `val`."),
    builtin("substr", "(input: string, substr_pos: int) -> string", Category::String, "Returns the portion of `input` starting at `substr_pos`."),
    builtin("substr", "(input: string, start_pos: int, length: int) -> string", Category::String, "Returns `length` characters of `input` starting at `start_pos`."),
    builtin("sum", "(arg: int) -> decimal", Category::Aggregate, "Calculates the sum of the selected values."),
    builtin("unique_rowid", "() -> int", Category::Id, "Returns a unique ID used when a table has no primary key."),
    builtin("upper", "(val: string) -> string", Category::String, "Converts all characters in `val` to their upper-case equivalents."),
];

/// Every overload registered under `name` (already lower-cased)
pub fn lookup(name: &str) -> impl Iterator<Item = &'static Builtin> + '_ {
    BUILTINS.iter().filter(move |b| b.name == name)
}

impl Planner {
    /// `HELP <function>`
    pub fn help(&self, name: &str) -> Result<PlanNode> {
        let name = name.to_lowercase();
        let cols = columns(&[
            ("Function", DataType::Text),
            ("Signature", DataType::Text),
            ("Category", DataType::Text),
            ("Details", DataType::Text),
        ]);
        Ok(PlanNode::Delayed(DelayedNode::new(
            format!("HELP {}", name),
            cols.clone(),
            move |p: &Planner| {
                p.values(cols, |rows| {
                    for b in lookup(&name) {
                        rows.add_row(vec![
                            Datum::string(b.name),
                            Datum::string(b.signature),
                            Datum::string(b.category.as_str()),
                            Datum::string(b.details),
                        ])?;
                    }
                    Ok(())
                })
            },
        )))
    }
}
