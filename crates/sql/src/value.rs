//! Literal values bound to positional placeholders, and the conversions
//! between them and entity field types.

use std::fmt;

/// A literal destined for a `?` placeholder or read back from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int(_) => "INT",
            Value::UInt(_) => "UINT",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTES",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

value_from!(Int as i64: i8, i16, i32, i64, isize, u8, u16, u32);
value_from!(UInt as u64: u64, usize);
value_from!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that can be stored in an entity field.
///
/// `from_value` returns `None` when the value cannot be represented in
/// `Self` (wrong kind, out of range, invalid UTF-8).
pub trait SqlType: Sized + Send + Sync + 'static {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! sql_int {
    ($($t:ty),*) => {
        $(
            impl SqlType for $t {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => <$t>::try_from(v).ok(),
                        Value::UInt(v) => <$t>::try_from(v).ok(),
                        Value::Bool(v) => Some(<$t>::from(v)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

sql_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! sql_float {
    ($($t:ty),*) => {
        $(
            impl SqlType for $t {
                fn to_value(&self) -> Value {
                    Value::Float(*self as f64)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Float(v) => Some(v as $t),
                        Value::Int(v) => Some(v as $t),
                        Value::UInt(v) => Some(v as $t),
                        _ => None,
                    }
                }
            }
        )*
    };
}

sql_float!(f32, f64);

impl SqlType for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(v),
            Value::Int(0) | Value::UInt(0) => Some(false),
            Value::Int(1) | Value::UInt(1) => Some(true),
            _ => None,
        }
    }
}

impl SqlType for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v),
            Value::Bytes(v) => String::from_utf8(v).ok(),
            _ => None,
        }
    }
}

impl SqlType for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bytes(v) => Some(v),
            Value::Text(v) => Some(v.into_bytes()),
            _ => None,
        }
    }
}

impl<T: SqlType> SqlType for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, SqlType::to_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            v => T::from_value(v).map(Some),
        }
    }
}
