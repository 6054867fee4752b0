//! Moving values between entity instances and result rows.
//!
//! Two interchangeable strategies implement [`Accessor`]: [`ReflectAccessor`]
//! goes through the entity's by-name `get_field`/`set_field`, while
//! [`OffsetAccessor`] reads and writes fields at the byte offsets the
//! registry validated.

mod offset;
mod reflect;

pub use offset::OffsetAccessor;
pub use reflect::ReflectAccessor;

use crate::entity::Entity;
use crate::model::Model;
use crate::session::Rows;
use crate::value::Value;
use crate::{Error, Result};
use std::sync::Arc;

pub trait Accessor<T: Entity>: Send + Sync {
    /// Current value of the field named `name`.
    fn field(&self, entity: &T, name: &str) -> Result<Value>;

    /// Stores one row, matching result columns to fields by column name.
    fn set_columns(&self, entity: &mut T, columns: &[String], row: Vec<Value>) -> Result<()>;
}

/// Which [`Accessor`] statements use to move values in and out of entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessorKind {
    Reflect,
    #[default]
    Offset,
}

impl AccessorKind {
    pub fn accessor<T: Entity>(self, model: Arc<Model>) -> Result<Box<dyn Accessor<T>>> {
        Ok(match self {
            AccessorKind::Reflect => Box::new(ReflectAccessor::new(model)),
            AccessorKind::Offset => Box::new(OffsetAccessor::<T>::new(model)?),
        })
    }
}

/// Where populated rows go.
pub enum Target<'a, T> {
    /// The next row overwrites this instance.
    One(&'a mut T),
    /// Every remaining row is appended as a new instance.
    Many(&'a mut Vec<T>),
}

pub fn populate<T: Entity>(
    accessor: &dyn Accessor<T>,
    rows: &mut Rows,
    target: Target<'_, T>,
) -> Result<()> {
    match target {
        Target::One(entity) => {
            let row = rows.next_row().ok_or(Error::NoRows)?;
            accessor.set_columns(entity, rows.columns(), row)
        }
        Target::Many(out) => {
            out.reserve(rows.len());
            while let Some(row) = rows.next_row() {
                let mut entity = T::default();
                accessor.set_columns(&mut entity, rows.columns(), row)?;
                out.push(entity);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;

    crate::entity! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct TestModel {
            pub id: i64,
            pub first_name: String,
            pub age: i8,
            pub last_name: Option<String>,
        }
    }

    fn rows() -> Rows {
        let mut rows = Rows::new(vec![
            "id".to_string(),
            "first_name".to_string(),
            "age".to_string(),
            "last_name".to_string(),
        ]);
        rows.push(vec![
            Value::Int(1),
            Value::from("Tom"),
            Value::Int(18),
            Value::from("Jerry"),
        ]);
        rows.push(vec![
            Value::Int(2),
            Value::from("Alice"),
            Value::Int(20),
            Value::Null,
        ]);
        rows
    }

    fn both(model: Arc<Model>) -> Vec<(&'static str, Box<dyn Accessor<TestModel>>)> {
        vec![
            (
                "reflect",
                AccessorKind::Reflect.accessor(Arc::clone(&model)).unwrap(),
            ),
            ("offset", AccessorKind::Offset.accessor(model).unwrap()),
        ]
    }

    #[test]
    fn test_field() {
        let model = Registry::new().get::<TestModel>().unwrap();
        let entity = TestModel {
            id: 12,
            first_name: "Tom".to_string(),
            age: 18,
            last_name: None,
        };
        for (name, acc) in both(model) {
            assert_eq!(acc.field(&entity, "id").unwrap(), Value::Int(12), "{}", name);
            assert_eq!(
                acc.field(&entity, "first_name").unwrap(),
                Value::from("Tom"),
                "{}",
                name
            );
            assert_eq!(acc.field(&entity, "last_name").unwrap(), Value::Null);
            assert!(matches!(
                acc.field(&entity, "invalid"),
                Err(Error::UnknownField { .. })
            ));
        }
    }

    #[test]
    fn test_populate_one_and_many() {
        let model = Registry::new().get::<TestModel>().unwrap();
        for (name, acc) in both(model) {
            let mut one = TestModel::default();
            populate(acc.as_ref(), &mut rows(), Target::One(&mut one)).unwrap();
            assert_eq!(
                one,
                TestModel {
                    id: 1,
                    first_name: "Tom".to_string(),
                    age: 18,
                    last_name: Some("Jerry".to_string()),
                },
                "{}",
                name
            );

            let mut many = Vec::new();
            populate(acc.as_ref(), &mut rows(), Target::Many(&mut many)).unwrap();
            assert_eq!(many.len(), 2, "{}", name);
            assert_eq!(many[1].first_name, "Alice");
            assert_eq!(many[1].last_name, None);
        }
    }

    #[test]
    fn test_populate_partial_columns() {
        let model = Registry::new().get::<TestModel>().unwrap();
        for (name, acc) in both(model) {
            let mut rows = Rows::new(vec!["first_name".to_string()]);
            rows.push(vec![Value::from("Tom")]);
            let mut one = TestModel {
                id: 7,
                ..Default::default()
            };
            populate(acc.as_ref(), &mut rows, Target::One(&mut one)).unwrap();
            assert_eq!(one.id, 7, "{}", name);
            assert_eq!(one.first_name, "Tom", "{}", name);
        }
    }

    #[test]
    fn test_unknown_column() {
        let model = Registry::new().get::<TestModel>().unwrap();
        for (name, acc) in both(model) {
            let mut rows = Rows::new(vec!["id".to_string(), "gender".to_string()]);
            rows.push(vec![Value::Int(1), Value::from("f")]);
            let mut one = TestModel::default();
            let err = populate(acc.as_ref(), &mut rows, Target::One(&mut one)).unwrap_err();
            assert!(
                matches!(err, Error::UnknownColumn(ref c) if c == "gender"),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_conversion_error_names_column() {
        let model = Registry::new().get::<TestModel>().unwrap();
        for (name, acc) in both(model) {
            let mut rows = Rows::new(vec!["age".to_string()]);
            rows.push(vec![Value::Int(1000)]);
            let mut one = TestModel::default();
            let err = populate(acc.as_ref(), &mut rows, Target::One(&mut one)).unwrap_err();
            assert!(
                matches!(err, Error::Conversion { ref column, .. } if column == "age"),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_populate_one_on_empty_rows() {
        let model = Registry::new().get::<TestModel>().unwrap();
        let acc = AccessorKind::Offset.accessor::<TestModel>(model).unwrap();
        let mut one = TestModel::default();
        let mut rows = Rows::new(vec!["id".to_string()]);
        assert!(matches!(
            populate(acc.as_ref(), &mut rows, Target::One(&mut one)),
            Err(Error::NoRows)
        ));
    }
}
