//! Table references: plain entity tables, joins and subqueries.

use crate::entity::Entity;
use crate::expr::{Aggregate, Column, Predicate};
use crate::model::{Model, Registry};
use crate::statement::SelectStatement;
use crate::Result;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Type-erased handle to an entity's model.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    type_name: &'static str,
    resolve: fn(&Registry) -> Result<Arc<Model>>,
}

impl EntityRef {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            resolve: Registry::get::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn model(&self, registry: &Registry) -> Result<Arc<Model>> {
        (self.resolve)(registry)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Table(Table),
    Join(Join),
    SubQuery(SubQuery),
}

impl TableReference {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TableReference::Table(_) => "table",
            TableReference::Join(_) => "join",
            TableReference::SubQuery(_) => "subquery",
        }
    }
}

impl From<Table> for TableReference {
    fn from(t: Table) -> Self {
        TableReference::Table(t)
    }
}

impl From<Join> for TableReference {
    fn from(j: Join) -> Self {
        TableReference::Join(j)
    }
}

impl From<SubQuery> for TableReference {
    fn from(s: SubQuery) -> Self {
        TableReference::SubQuery(s)
    }
}

/// The table of entity `T`.
pub fn table_of<T: Entity>() -> Table {
    Table {
        entity: EntityRef::of::<T>(),
        alias: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) entity: EntityRef,
    pub(crate) alias: Option<String>,
}

macro_rules! join_methods {
    () => {
        pub fn join(self, right: impl Into<TableReference>) -> JoinBuilder {
            JoinBuilder::new(self.into(), right.into(), JoinKind::Inner)
        }

        pub fn left_join(self, right: impl Into<TableReference>) -> JoinBuilder {
            JoinBuilder::new(self.into(), right.into(), JoinKind::Left)
        }

        pub fn right_join(self, right: impl Into<TableReference>) -> JoinBuilder {
            JoinBuilder::new(self.into(), right.into(), JoinKind::Right)
        }
    };
}

impl Table {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn col(&self, name: impl Into<String>) -> Column {
        Column::with_table(name, self.clone().into())
    }

    pub fn avg(&self, field: impl Into<String>) -> Aggregate {
        crate::expr::avg(field).on(self.clone().into())
    }

    pub fn count(&self, field: impl Into<String>) -> Aggregate {
        crate::expr::count(field).on(self.clone().into())
    }

    pub fn max(&self, field: impl Into<String>) -> Aggregate {
        crate::expr::max(field).on(self.clone().into())
    }

    pub fn min(&self, field: impl Into<String>) -> Aggregate {
        crate::expr::min(field).on(self.clone().into())
    }

    pub fn sum(&self, field: impl Into<String>) -> Aggregate {
        crate::expr::sum(field).on(self.clone().into())
    }

    join_methods!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// A join waiting for its `ON` or `USING` clause.
#[derive(Debug)]
pub struct JoinBuilder {
    left: TableReference,
    right: TableReference,
    kind: JoinKind,
}

impl JoinBuilder {
    fn new(left: TableReference, right: TableReference, kind: JoinKind) -> Self {
        Self { left, right, kind }
    }

    pub fn on(self, predicate: Predicate) -> Join {
        Join {
            left: Box::new(self.left),
            right: Box::new(self.right),
            kind: self.kind,
            on: vec![predicate],
            using: Vec::new(),
        }
    }

    pub fn using<I, S>(self, fields: I) -> Join
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Join {
            left: Box::new(self.left),
            right: Box::new(self.right),
            kind: self.kind,
            on: Vec::new(),
            using: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub(crate) left: Box<TableReference>,
    pub(crate) right: Box<TableReference>,
    pub(crate) kind: JoinKind,
    pub(crate) on: Vec<Predicate>,
    pub(crate) using: Vec<String>,
}

impl Join {
    /// Adds another `ON` predicate, combined with `AND`.
    pub fn on(mut self, predicate: Predicate) -> Self {
        self.on.push(predicate);
        self
    }

    join_methods!();
}

/// A SELECT used as a table.
#[derive(Debug, Clone)]
pub struct SubQuery {
    pub(crate) stmt: Arc<SelectStatement>,
    pub(crate) alias: String,
}

impl SubQuery {
    pub(crate) fn new(stmt: SelectStatement, alias: String) -> Self {
        Self {
            stmt: Arc::new(stmt),
            alias,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// A column of the subquery's output, by output alias or source field.
    pub fn col(&self, name: impl Into<String>) -> Column {
        Column::with_table(name, self.clone().into())
    }

    join_methods!();
}

impl PartialEq for SubQuery {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && Arc::ptr_eq(&self.stmt, &other.stmt)
    }
}
