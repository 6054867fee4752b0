use super::{Column, RawExpr};
use crate::value::Value;

/// `field = ?`
#[derive(Debug, Clone)]
pub struct Assignment {
    pub(crate) field: String,
    pub(crate) value: Value,
}

pub fn assign(field: impl Into<String>, value: impl Into<Value>) -> Assignment {
    Assignment {
        field: field.into(),
        value: value.into(),
    }
}

/// Targets of UPDATE `SET` lists and upsert clauses.
///
/// A bare [`Column`] means "take the value from the row being inserted" and
/// is only meaningful in an upsert.
#[derive(Debug, Clone)]
pub enum Assignable {
    Assignment(Assignment),
    Column(Column),
    Raw(RawExpr),
}

impl Assignable {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Assignable::Assignment(_) => "assignment",
            Assignable::Column(_) => "column",
            Assignable::Raw(_) => "raw expression",
        }
    }
}

impl From<Assignment> for Assignable {
    fn from(a: Assignment) -> Self {
        Assignable::Assignment(a)
    }
}

impl From<Column> for Assignable {
    fn from(c: Column) -> Self {
        Assignable::Column(c)
    }
}

impl From<RawExpr> for Assignable {
    fn from(r: RawExpr) -> Self {
        Assignable::Raw(r)
    }
}
