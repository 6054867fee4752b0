use super::Accessor;
use crate::entity::Entity;
use crate::model::Model;
use crate::value::Value;
use crate::{Error, Result};
use std::any::TypeId;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;

/// Reads and writes fields directly at their registered byte offsets.
///
/// Only constructible for the exact type the model was registered for, so
/// every offset it uses was checked against `T`'s layout.
#[derive(Debug)]
pub struct OffsetAccessor<T> {
    model: Arc<Model>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> OffsetAccessor<T> {
    pub fn new(model: Arc<Model>) -> Result<Self> {
        if model.type_id() != TypeId::of::<T>() || model.size != size_of::<T>() {
            return Err(Error::ModelType {
                type_name: std::any::type_name::<T>().to_string(),
                reason: format!("model was registered for `{}`", model.type_name()),
            });
        }
        Ok(Self {
            model,
            _marker: PhantomData,
        })
    }
}

impl<T: Entity> Accessor<T> for OffsetAccessor<T> {
    fn field(&self, entity: &T, name: &str) -> Result<Value> {
        let field = self.model.field(name)?;
        let base = (entity as *const T).cast::<u8>();
        // SAFETY: the model belongs to `T` (checked in `new`) and the registry
        // verified that `offset + size` lies inside `T` with `ty` matching the
        // declared field type.
        Ok(unsafe { field.ty.read(base.add(field.offset)) })
    }

    fn set_columns(&self, entity: &mut T, columns: &[String], row: Vec<Value>) -> Result<()> {
        let base = (entity as *mut T).cast::<u8>();
        for (column, value) in columns.iter().zip(row) {
            let field = self.model.field_by_column(column)?;
            let found = value.type_name();
            // SAFETY: as in `field`; `entity` is exclusively borrowed.
            let stored = unsafe { field.ty.write(base.add(field.offset), value) };
            if !stored {
                return Err(Error::Conversion {
                    column: column.clone(),
                    expected: field.ty.type_name.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;

    crate::entity! {
        #[derive(Debug, Default)]
        struct A {
            id: i64,
        }
    }

    crate::entity! {
        #[derive(Debug, Default)]
        struct B {
            id: i64,
        }
    }

    #[test]
    fn test_rejects_foreign_model() {
        let r = Registry::new();
        let model_a = r.get::<A>().unwrap();
        assert!(OffsetAccessor::<A>::new(Arc::clone(&model_a)).is_ok());
        assert!(matches!(
            OffsetAccessor::<B>::new(model_a),
            Err(Error::ModelType { .. })
        ));
    }
}
