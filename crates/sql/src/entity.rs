//! Record types the registry can describe.
//!
//! Most users declare entities with [`entity!`](crate::entity), which derives
//! the descriptor from the struct definition itself.

use crate::value::{SqlType, Value};
use crate::Result;
use std::any::TypeId;
use std::mem::{align_of, size_of};

/// A record that maps to one table.
///
/// # Safety
///
/// Every [`FieldDescriptor`] returned by [`Entity::descriptor`] must describe
/// a real field of `Self`: `offset` must be the field's byte offset and `ty`
/// must be [`TypeDescriptor::of`] the field's exact type. The offset accessor
/// reads and writes through those offsets once the registry has checked them
/// against `size_of::<Self>()`.
pub unsafe trait Entity: Default + Send + Sync + 'static {
    fn descriptor() -> EntityDescriptor;

    /// Reads a field by its Rust name.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Writes a field by its Rust name.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub type_name: &'static str,
    /// Overrides the table name derived from `type_name`.
    pub table_name: Option<&'static str>,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Overrides the column name derived from `name`.
    pub column: Option<&'static str>,
    pub offset: usize,
    pub ty: TypeDescriptor,
}

/// Layout and value conversions for one field type.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub size: usize,
    pub align: usize,
    read: unsafe fn(*const u8) -> Value,
    write: unsafe fn(*mut u8, Value) -> bool,
}

impl TypeDescriptor {
    pub fn of<V: SqlType>() -> Self {
        Self {
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            size: size_of::<V>(),
            align: align_of::<V>(),
            read: read_at::<V>,
            write: write_at::<V>,
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to an initialized value of the described type.
    pub(crate) unsafe fn read(&self, ptr: *const u8) -> Value {
        (self.read)(ptr)
    }

    /// Returns `false`, leaving the target untouched, when `value` does not
    /// convert.
    ///
    /// # Safety
    ///
    /// `ptr` must point to an initialized value of the described type.
    pub(crate) unsafe fn write(&self, ptr: *mut u8, value: Value) -> bool {
        (self.write)(ptr, value)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

unsafe fn read_at<V: SqlType>(ptr: *const u8) -> Value {
    (*ptr.cast::<V>()).to_value()
}

unsafe fn write_at<V: SqlType>(ptr: *mut u8, value: Value) -> bool {
    match V::from_value(value) {
        Some(v) => {
            *ptr.cast::<V>() = v;
            true
        }
        None => false,
    }
}

/// Declares a struct and implements [`Entity`] for it.
///
/// A leading `@table "name";` overrides the table name, and
/// `#[orm(column = "..")]` overrides a field's column.
///
/// ```
/// use tessera_sql::Entity;
///
/// tessera_sql::entity! {
///     @table "users";
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct User {
///         pub id: i64,
///         #[orm(column = "first")]
///         pub first_name: String,
///         pub age: Option<i32>,
///     }
/// }
///
/// let desc = User::descriptor();
/// assert_eq!(desc.table_name, Some("users"));
/// assert_eq!(desc.fields[1].column, Some("first"));
/// ```
#[macro_export]
macro_rules! entity {
    (@opt) => { ::core::option::Option::None };
    (@opt $v:literal) => { ::core::option::Option::Some($v) };
    (
        $(@table $table:literal;)?
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[orm(column = $column:literal)])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $fty, )*
        }

        unsafe impl $crate::Entity for $name {
            fn descriptor() -> $crate::EntityDescriptor {
                $crate::EntityDescriptor {
                    type_name: ::core::stringify!($name),
                    table_name: $crate::entity!(@opt $($table)?),
                    fields: ::std::vec![
                        $(
                            $crate::FieldDescriptor {
                                name: ::core::stringify!($field),
                                column: $crate::entity!(@opt $($column)?),
                                offset: ::core::mem::offset_of!($name, $field),
                                ty: $crate::TypeDescriptor::of::<$fty>(),
                            },
                        )*
                    ],
                }
            }

            fn get_field(&self, name: &str) -> ::core::option::Option<$crate::Value> {
                match name {
                    $(
                        ::core::stringify!($field) => ::core::option::Option::Some(
                            $crate::SqlType::to_value(&self.$field),
                        ),
                    )*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(&mut self, name: &str, value: $crate::Value) -> $crate::Result<()> {
                match name {
                    $(
                        ::core::stringify!($field) => {
                            let found = value.type_name();
                            match <$fty as $crate::SqlType>::from_value(value) {
                                ::core::option::Option::Some(v) => {
                                    self.$field = v;
                                    ::core::result::Result::Ok(())
                                }
                                ::core::option::Option::None => {
                                    ::core::result::Result::Err($crate::Error::Conversion {
                                        column: name.to_string(),
                                        expected: ::std::any::type_name::<$fty>().to_string(),
                                        found: found.to_string(),
                                    })
                                }
                            }
                        }
                    )*
                    _ => ::core::result::Result::Err($crate::Error::UnknownField {
                        field: name.to_string(),
                        suggestion: ::core::option::Option::None,
                    }),
                }
            }
        }
    };
}
