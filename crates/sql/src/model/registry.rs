use super::{Field, Model, ModelOption};
use crate::entity::{Entity, EntityDescriptor};
use crate::{Error, Result};
use std::any::TypeId;
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe cache of [`Model`]s keyed by entity type.
#[derive(Debug, Default)]
pub struct Registry {
    models: RwLock<HashMap<TypeId, Arc<Model>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached model for `T`, registering it with no options on
    /// first use.
    pub fn get<T: Entity>(&self) -> Result<Arc<Model>> {
        let key = TypeId::of::<T>();
        if let Some(m) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(m));
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have registered while we waited for the lock.
        if let Some(m) = models.get(&key) {
            return Ok(Arc::clone(m));
        }

        let model = Arc::new(build_model::<T>(Vec::new())?);
        models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Builds the model for `T`, applies `options` in order and caches the
    /// result, replacing any earlier registration.
    pub fn register<T: Entity>(
        &self,
        options: impl IntoIterator<Item = ModelOption>,
    ) -> Result<Arc<Model>> {
        let model = Arc::new(build_model::<T>(options)?);
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::clone(&model));
        Ok(model)
    }
}

fn build_model<T: Entity>(options: impl IntoIterator<Item = ModelOption>) -> Result<Model> {
    let desc = T::descriptor();
    validate_layout(&desc, size_of::<T>())?;

    let mut fields = Vec::with_capacity(desc.fields.len());
    let mut field_map = HashMap::with_capacity(desc.fields.len());
    let mut column_map = HashMap::with_capacity(desc.fields.len());

    for (idx, fd) in desc.fields.iter().enumerate() {
        let column = fd
            .column
            .map(str::to_string)
            .unwrap_or_else(|| underscore_name(fd.name));
        if column_map.insert(column.clone(), idx).is_some() {
            return Err(model_type(&desc, format!("duplicate column `{}`", column)));
        }
        field_map.insert(fd.name.to_string(), idx);
        fields.push(Field {
            name: fd.name.to_string(),
            column,
            ty: fd.ty,
            offset: fd.offset,
        });
    }

    let mut model = Model {
        type_id: TypeId::of::<T>(),
        type_name: desc.type_name,
        size: size_of::<T>(),
        table_name: desc
            .table_name
            .map(str::to_string)
            .unwrap_or_else(|| underscore_name(desc.type_name)),
        fields,
        field_map,
        column_map,
        sharding: None,
    };

    for option in options {
        model.apply(option)?;
    }

    tracing::debug!(
        target: "registry",
        entity = desc.type_name,
        table = %model.table_name,
        fields = model.fields.len(),
        sharded = model.sharding.is_some(),
        "Registered model"
    );
    Ok(model)
}

/// A descriptor is accepted only if its fields are non-empty, uniquely named,
/// aligned, inside the record and non-overlapping.
fn validate_layout(desc: &EntityDescriptor, size: usize) -> Result<()> {
    if desc.fields.is_empty() {
        return Err(model_type(desc, "record has no fields".to_string()));
    }

    let mut spans: Vec<(usize, usize, &str)> = Vec::with_capacity(desc.fields.len());
    for fd in &desc.fields {
        if spans.iter().any(|(_, _, name)| *name == fd.name) {
            return Err(model_type(desc, format!("duplicate field `{}`", fd.name)));
        }
        let end = fd.offset.checked_add(fd.ty.size).filter(|&end| end <= size);
        let Some(end) = end else {
            return Err(model_type(
                desc,
                format!("field `{}` lies outside the record", fd.name),
            ));
        };
        if fd.ty.align == 0 || fd.offset % fd.ty.align != 0 {
            return Err(model_type(
                desc,
                format!("field `{}` is misaligned", fd.name),
            ));
        }
        spans.push((fd.offset, end, fd.name));
    }

    spans.sort_unstable();
    for pair in spans.windows(2) {
        let (_, prev_end, prev) = pair[0];
        let (start, end, name) = pair[1];
        // Zero-sized fields may share an offset with anything.
        if start < prev_end && start != end {
            return Err(model_type(
                desc,
                format!("fields `{}` and `{}` overlap", prev, name),
            ));
        }
    }
    Ok(())
}

fn model_type(desc: &EntityDescriptor, reason: String) -> Error {
    Error::ModelType {
        type_name: desc.type_name.to_string(),
        reason,
    }
}

/// `CamelCase` to `snake_case`: an underscore before every uppercase letter
/// except the first, then lowercase.
pub fn underscore_name(name: &str) -> String {
    let mut res = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                res.push('_');
            }
            res.extend(ch.to_lowercase());
        } else {
            res.push(ch);
        }
    }
    res
}
