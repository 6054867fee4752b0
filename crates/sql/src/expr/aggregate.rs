use super::comparisons;
use crate::table::TableReference;
use std::sync::Arc;

/// `FUNC(column)` over one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub(crate) func: &'static str,
    pub(crate) arg: String,
    pub(crate) table: Option<Arc<TableReference>>,
    pub(crate) alias: Option<String>,
}

impl Aggregate {
    pub(crate) fn new(func: &'static str, field: impl Into<String>) -> Self {
        Self {
            func,
            arg: field.into(),
            table: None,
            alias: None,
        }
    }

    pub(crate) fn on(mut self, table: TableReference) -> Self {
        self.table = Some(Arc::new(table));
        self
    }

    pub fn func(&self) -> &'static str {
        self.func
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

comparisons!(Aggregate);

pub fn avg(field: impl Into<String>) -> Aggregate {
    Aggregate::new("AVG", field)
}

pub fn count(field: impl Into<String>) -> Aggregate {
    Aggregate::new("COUNT", field)
}

pub fn max(field: impl Into<String>) -> Aggregate {
    Aggregate::new("MAX", field)
}

pub fn min(field: impl Into<String>) -> Aggregate {
    Aggregate::new("MIN", field)
}

pub fn sum(field: impl Into<String>) -> Aggregate {
    Aggregate::new("SUM", field)
}
