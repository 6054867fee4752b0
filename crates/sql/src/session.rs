//! The boundary between statements and whatever executes them.

use crate::accessor::AccessorKind;
use crate::builder::{Builder, Query};
use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::model::{Model, Registry};
use crate::value::Value;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Shared by every statement created from a session.
#[derive(Debug, Clone)]
pub struct Core {
    registry: Arc<Registry>,
    dialect: &'static dyn Dialect,
    accessor: AccessorKind,
}

impl Core {
    pub fn new(dialect: &'static dyn Dialect) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            dialect,
            accessor: AccessorKind::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_accessor(mut self, accessor: AccessorKind) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    pub fn accessor(&self) -> AccessorKind {
        self.accessor
    }

    pub(crate) fn model<T: Entity>(&self) -> Result<Arc<Model>> {
        self.registry.get::<T>()
    }

    pub(crate) fn builder(&self, model: Arc<Model>) -> Builder<'_> {
        Builder::new(&self.registry, self.dialect, model)
    }
}

/// Result of an INSERT/UPDATE/DELETE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// A buffered result set.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
        }
    }

    /// Appends a row. Its length must match the column count.
    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push_back(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn next_row(&mut self) -> Option<Vec<Value>> {
        self.rows.pop_front()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }
}

/// Executes compiled queries. Implemented by connections and transactions.
#[async_trait]
pub trait Session: Send + Sync {
    fn core(&self) -> &Core;

    async fn query(&self, query: &Query) -> Result<Rows>;

    async fn query_row(&self, query: &Query) -> Result<Rows> {
        let mut rows = self.query(query).await?;
        rows.truncate(1);
        Ok(rows)
    }

    async fn exec(&self, query: &Query) -> Result<ExecResult>;
}
