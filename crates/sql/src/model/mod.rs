//! Table metadata derived from [`Entity`](crate::Entity) descriptors.

mod registry;

pub use registry::{underscore_name, Registry};

use crate::entity::TypeDescriptor;
use crate::value::Value;
use crate::{Error, Result};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Cached metadata for one entity type. Immutable once registered.
pub struct Model {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) size: usize,
    pub(crate) table_name: String,
    pub(crate) fields: Vec<Field>,
    pub(crate) field_map: HashMap<String, usize>,
    pub(crate) column_map: HashMap<String, usize>,
    pub(crate) sharding: Option<ShardingRule>,
}

#[derive(Debug, Clone)]
pub struct Field {
    /// Rust field name.
    pub name: String,
    pub column: String,
    pub ty: TypeDescriptor,
    pub offset: usize,
}

impl Model {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn sharding(&self) -> Option<&ShardingRule> {
        self.sharding.as_ref()
    }

    /// Looks up a field by Rust name. Misses carry a spelling suggestion.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.field_map
            .get(name)
            .map(|&idx| &self.fields[idx])
            .ok_or_else(|| Error::UnknownField {
                field: name.to_string(),
                suggestion: tessera_error::closest_match(
                    name,
                    self.fields.iter().map(|f| f.name.as_str()),
                ),
            })
    }

    pub fn field_by_column(&self, column: &str) -> Result<&Field> {
        self.column_map
            .get(column)
            .map(|&idx| &self.fields[idx])
            .ok_or_else(|| Error::UnknownColumn(column.to_string()))
    }

    fn apply(&mut self, option: ModelOption) -> Result<()> {
        match option {
            ModelOption::TableName(name) => {
                self.table_name = name;
            }
            ModelOption::ColumnName { field, column } => {
                let idx = *self.field_map.get(&field).ok_or_else(|| Error::UnknownField {
                    field: field.clone(),
                    suggestion: None,
                })?;
                if let Some(&other) = self.column_map.get(&column) {
                    if other != idx {
                        return Err(Error::ModelType {
                            type_name: self.type_name.to_string(),
                            reason: format!(
                                "duplicate column `{}` for fields `{}` and `{}`",
                                column, self.fields[other].name, field
                            ),
                        });
                    }
                }
                let old = std::mem::replace(&mut self.fields[idx].column, column.clone());
                self.column_map.remove(&old);
                self.column_map.insert(column, idx);
            }
            ModelOption::Sharding(rule) => {
                for key in &rule.keys {
                    self.field(key)?;
                }
                self.sharding = Some(rule);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .field("sharding", &self.sharding)
            .finish()
    }
}

/// Post-processing applied to a freshly registered [`Model`].
#[derive(Debug, Clone)]
pub enum ModelOption {
    TableName(String),
    ColumnName { field: String, column: String },
    Sharding(ShardingRule),
}

impl ModelOption {
    pub fn table_name(name: impl Into<String>) -> Self {
        ModelOption::TableName(name.into())
    }

    pub fn column_name(field: impl Into<String>, column: impl Into<String>) -> Self {
        ModelOption::ColumnName {
            field: field.into(),
            column: column.into(),
        }
    }
}

/// A physical shard destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dst {
    pub db: String,
    pub table: String,
}

impl Dst {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Dst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.table)
    }
}

pub type ShardingFn = Arc<dyn Fn(&HashMap<String, Value>) -> Dst + Send + Sync>;

/// Shard-key fields and the function routing their values to a [`Dst`].
#[derive(Clone)]
pub struct ShardingRule {
    keys: HashSet<String>,
    func: ShardingFn,
}

impl ShardingRule {
    pub fn new<I, S, F>(keys: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&HashMap<String, Value>) -> Dst + Send + Sync + 'static,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    pub fn is_key(&self, field: &str) -> bool {
        self.keys.contains(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn route(&self, values: &HashMap<String, Value>) -> Dst {
        (self.func)(values)
    }
}

impl fmt::Debug for ShardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardingRule")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
