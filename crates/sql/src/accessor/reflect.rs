use super::Accessor;
use crate::entity::Entity;
use crate::model::Model;
use crate::value::Value;
use crate::{Error, Result};
use std::sync::Arc;

/// Resolves every access by name through [`Entity::get_field`] and
/// [`Entity::set_field`].
#[derive(Debug, Clone)]
pub struct ReflectAccessor {
    model: Arc<Model>,
}

impl ReflectAccessor {
    pub fn new(model: Arc<Model>) -> Self {
        Self { model }
    }
}

impl<T: Entity> Accessor<T> for ReflectAccessor {
    fn field(&self, entity: &T, name: &str) -> Result<Value> {
        let field = self.model.field(name)?;
        entity.get_field(&field.name).ok_or_else(|| Error::UnknownField {
            field: name.to_string(),
            suggestion: None,
        })
    }

    fn set_columns(&self, entity: &mut T, columns: &[String], row: Vec<Value>) -> Result<()> {
        for (column, value) in columns.iter().zip(row) {
            let field = self.model.field_by_column(column)?;
            entity
                .set_field(&field.name, value)
                .map_err(|err| match err {
                    Error::Conversion {
                        expected, found, ..
                    } => Error::Conversion {
                        column: column.clone(),
                        expected,
                        found,
                    },
                    other => other,
                })?;
        }
        Ok(())
    }
}
