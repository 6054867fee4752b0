use super::{comparisons, Expr, Op, Predicate};
use crate::table::TableReference;
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A reference to an entity field by its Rust name.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) table: Option<Arc<TableReference>>,
    pub(crate) alias: Option<String>,
    pub(crate) order: Order,
}

/// A column of the statement's own entity.
pub fn col(name: impl Into<String>) -> Column {
    Column {
        name: name.into(),
        table: None,
        alias: None,
        order: Order::Asc,
    }
}

impl Column {
    pub(crate) fn with_table(name: impl Into<String>, table: TableReference) -> Self {
        Column {
            table: Some(Arc::new(table)),
            ..col(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&TableReference> {
        self.table.as_deref()
    }

    /// Output alias. Only honoured in a SELECT list.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn asc(mut self) -> Self {
        self.order = Order::Asc;
        self
    }

    pub fn desc(mut self) -> Self {
        self.order = Order::Desc;
        self
    }

    pub fn like(self, pattern: impl Into<Expr>) -> Predicate {
        Predicate::binary(self.into(), Op::Like, pattern.into())
    }

    /// `col IN (?,?,..)`
    pub fn is_in<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Predicate::binary(self.into(), Op::In, Expr::List(list))
    }

    pub fn not_in<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Predicate::binary(self.into(), Op::NotIn, Expr::List(list))
    }

    /// `col IN (<expr>)`, typically a raw sub-select.
    pub fn in_expr(self, expr: impl Into<Expr>) -> Predicate {
        Predicate::binary(self.into(), Op::In, expr.into())
    }

    pub fn not_in_expr(self, expr: impl Into<Expr>) -> Predicate {
        Predicate::binary(self.into(), Op::NotIn, expr.into())
    }
}

comparisons!(Column);

/// Structural identity: same field name on the same table.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.table, &other.table) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || **a == **b,
            _ => false,
        }
    }
}
