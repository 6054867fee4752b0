//! The expression tree: columns, literal values, aggregates, raw fragments
//! and predicates combining them.
//!
//! Every node is plain data. Combinators consume their operands and return a
//! new [`Predicate`], so a tree is never mutated after it is built.

/// Generates the comparison helpers shared by columns and aggregates.
macro_rules! comparisons {
    ($ty:ty) => {
        impl $ty {
            pub fn eq(self, rhs: impl Into<$crate::expr::Expr>) -> $crate::expr::Predicate {
                $crate::expr::Predicate::binary(self.into(), $crate::expr::Op::Eq, rhs.into())
            }

            pub fn gt(self, rhs: impl Into<$crate::expr::Expr>) -> $crate::expr::Predicate {
                $crate::expr::Predicate::binary(self.into(), $crate::expr::Op::Gt, rhs.into())
            }

            pub fn lt(self, rhs: impl Into<$crate::expr::Expr>) -> $crate::expr::Predicate {
                $crate::expr::Predicate::binary(self.into(), $crate::expr::Op::Lt, rhs.into())
            }

            pub fn ge(self, rhs: impl Into<$crate::expr::Expr>) -> $crate::expr::Predicate {
                $crate::expr::Predicate::binary(self.into(), $crate::expr::Op::Ge, rhs.into())
            }

            pub fn le(self, rhs: impl Into<$crate::expr::Expr>) -> $crate::expr::Predicate {
                $crate::expr::Predicate::binary(self.into(), $crate::expr::Op::Le, rhs.into())
            }
        }
    };
}

pub(crate) use comparisons;

mod aggregate;
mod assign;
mod column;
mod raw;

pub use aggregate::{avg, count, max, min, sum, Aggregate};
pub use assign::{assign, Assignable, Assignment};
pub use column::{col, Column, Order};
pub use raw::{raw, RawExpr};

use crate::value::Value;
use std::fmt;

/// Any node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    Value(Value),
    Aggregate(Aggregate),
    Raw(RawExpr),
    Predicate(Predicate),
    /// Parenthesized value list; only valid as the right side of `IN`/`NOT IN`.
    List(Vec<Value>),
}

impl Expr {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Expr::Column(_) => "column",
            Expr::Value(_) => "value",
            Expr::Aggregate(_) => "aggregate",
            Expr::Raw(_) => "raw expression",
            Expr::Predicate(_) => "predicate",
            Expr::List(_) => "value list",
        }
    }
}

impl From<Column> for Expr {
    fn from(c: Column) -> Self {
        Expr::Column(c)
    }
}

impl From<Aggregate> for Expr {
    fn from(a: Aggregate) -> Self {
        Expr::Aggregate(a)
    }
}

impl From<RawExpr> for Expr {
    fn from(r: RawExpr) -> Self {
        Expr::Raw(r)
    }
}

impl From<Predicate> for Expr {
    fn from(p: Predicate) -> Self {
        Expr::Predicate(p)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(v: Option<T>) -> Self {
        Expr::Value(v.into())
    }
}

macro_rules! expr_from_literal {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Value(Value::from(v))
                }
            }
        )*
    };
}

expr_from_literal!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, &str, Vec<u8>
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    In,
    NotIn,
    And,
    Or,
    Not,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Like => "LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Not => "NOT",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binary node. `NOT` has only a right operand; a raw fragment used as a
/// predicate has only a left operand and no operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub(crate) left: Option<Box<Expr>>,
    pub(crate) op: Option<Op>,
    pub(crate) right: Option<Box<Expr>>,
}

impl Predicate {
    pub(crate) fn binary(left: Expr, op: Op, right: Expr) -> Self {
        Self {
            left: Some(Box::new(left)),
            op: Some(op),
            right: Some(Box::new(right)),
        }
    }

    pub fn and(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into(), Op::And, rhs.into())
    }

    pub fn or(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into(), Op::Or, rhs.into())
    }

    pub fn op(&self) -> Option<Op> {
        self.op
    }

    pub fn left(&self) -> Option<&Expr> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Expr> {
        self.right.as_deref()
    }
}

/// `NOT (p)`
pub fn not(p: Predicate) -> Predicate {
    Predicate {
        left: None,
        op: Some(Op::Not),
        right: Some(Box::new(p.into())),
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        not(self)
    }
}

/// Folds a predicate list left to right with `AND`.
pub(crate) fn fold_and(ps: &[Predicate]) -> Option<Predicate> {
    let (first, rest) = ps.split_first()?;
    Some(
        rest.iter()
            .cloned()
            .fold(first.clone(), |acc, p| acc.and(p)),
    )
}

/// Items accepted by a SELECT list, ORDER BY and GROUP BY.
#[derive(Debug, Clone)]
pub enum Selectable {
    Column(Column),
    Aggregate(Aggregate),
    Raw(RawExpr),
}

impl From<Column> for Selectable {
    fn from(c: Column) -> Self {
        Selectable::Column(c)
    }
}

impl From<Aggregate> for Selectable {
    fn from(a: Aggregate) -> Self {
        Selectable::Aggregate(a)
    }
}

impl From<RawExpr> for Selectable {
    fn from(r: RawExpr) -> Self {
        Selectable::Raw(r)
    }
}
