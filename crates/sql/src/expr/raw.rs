use super::Predicate;
use crate::value::Value;

/// A verbatim SQL fragment with its own positional arguments.
///
/// Nothing inside `sql` is quoted or checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    pub(crate) sql: String,
    pub(crate) args: Vec<Value>,
}

pub fn raw(sql: impl Into<String>) -> RawExpr {
    RawExpr {
        sql: sql.into(),
        args: Vec::new(),
    }
}

impl RawExpr {
    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn as_predicate(self) -> Predicate {
        Predicate {
            left: Some(Box::new(self.into())),
            op: None,
            right: None,
        }
    }
}
