use rusqlite::types::{Value as SqliteValue, ValueRef};
use tessera_sql::{Error, Result, Value};

pub(crate) fn to_sqlite(value: &Value) -> Result<SqliteValue> {
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::UInt(u) => SqliteValue::Integer(i64::try_from(*u).map_err(|_| {
            Error::session(format!("integer argument {} exceeds SQLite's range", u))
        })?),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
    })
}

pub(crate) fn to_sqlite_args(args: &[Value]) -> Result<Vec<SqliteValue>> {
    args.iter().map(to_sqlite).collect()
}

pub(crate) fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}
