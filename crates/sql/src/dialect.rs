//! SQL dialects: identifier quoting, upsert and pagination syntax.
//!
//! Dialects are stateless singletons. Look one up by name with
//! [`dialect_by_name`] and hand it to a session's [`Core`](crate::Core).

use crate::builder::Builder;
use crate::expr::Assignable;
use crate::{Error, Result};
use std::fmt;

/// Assignments applied when an INSERT hits an existing key.
#[derive(Debug, Clone, Default)]
pub struct Upsert {
    pub assigns: Vec<Assignable>,
    /// Field names forming the conflict target. Ignored by MySQL, required
    /// by Postgres.
    pub conflict_columns: Vec<String>,
}

pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn quoter(&self) -> char {
        '`'
    }

    fn build_upsert(&self, b: &mut Builder<'_>, upsert: &Upsert) -> Result<()>;

    fn build_limit_offset(&self, b: &mut Builder<'_>, offset: u64, limit: u64) -> Result<()> {
        standard_limit_offset(b, offset, limit)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite3Dialect;

pub static MYSQL: MySqlDialect = MySqlDialect;
pub static POSTGRES: PostgresDialect = PostgresDialect;
pub static SQLITE3: Sqlite3Dialect = Sqlite3Dialect;

/// Resolves a configured dialect name, case-insensitively.
pub fn dialect_by_name(name: &str) -> Option<&'static dyn Dialect> {
    match name.to_lowercase().as_str() {
        "mysql" => Some(&MYSQL),
        "postgres" | "postgresql" => Some(&POSTGRES),
        "sqlite3" | "sqlite" => Some(&SQLITE3),
        _ => {
            tracing::warn!(target: "sql_builder", dialect = %name, "Unknown SQL dialect");
            None
        }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn build_upsert(&self, b: &mut Builder<'_>, upsert: &Upsert) -> Result<()> {
        b.write_str(" ON DUPLICATE KEY UPDATE ");
        build_upsert_assigns(b, upsert, |b, column| {
            b.write_str(" = VALUES(");
            b.quote(column)?;
            b.write_char(')');
            Ok(())
        })
    }

    fn build_limit_offset(&self, b: &mut Builder<'_>, offset: u64, limit: u64) -> Result<()> {
        // MySQL has no OFFSET without LIMIT.
        let limit = if limit == 0 && offset > 0 {
            u64::MAX
        } else {
            limit
        };
        standard_limit_offset(b, offset, limit)
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quoter(&self) -> char {
        '"'
    }

    fn build_upsert(&self, b: &mut Builder<'_>, upsert: &Upsert) -> Result<()> {
        // DO UPDATE needs a conflict target here, unlike SQLite.
        if upsert.conflict_columns.is_empty() {
            return Err(Error::UnsupportedExpression(
                "ON CONFLICT DO UPDATE without conflict columns".to_string(),
            ));
        }
        build_on_conflict(b, upsert)
    }
}

impl Dialect for Sqlite3Dialect {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn build_upsert(&self, b: &mut Builder<'_>, upsert: &Upsert) -> Result<()> {
        build_on_conflict(b, upsert)
    }

    fn build_limit_offset(&self, b: &mut Builder<'_>, offset: u64, limit: u64) -> Result<()> {
        if limit == 0 && offset > 0 {
            b.write_str(" LIMIT -1 OFFSET ");
            b.write_str(&offset.to_string());
            return Ok(());
        }
        standard_limit_offset(b, offset, limit)
    }
}

fn standard_limit_offset(b: &mut Builder<'_>, offset: u64, limit: u64) -> Result<()> {
    if limit > 0 {
        b.write_str(" LIMIT ");
        b.write_str(&limit.to_string());
    }
    if offset > 0 {
        b.write_str(" OFFSET ");
        b.write_str(&offset.to_string());
    }
    Ok(())
}

/// `ON CONFLICT(cols) DO UPDATE SET col = EXCLUDED.col`
fn build_on_conflict(b: &mut Builder<'_>, upsert: &Upsert) -> Result<()> {
    b.write_str(" ON CONFLICT");
    if !upsert.conflict_columns.is_empty() {
        b.write_char('(');
        for (i, field) in upsert.conflict_columns.iter().enumerate() {
            if i > 0 {
                b.write_char(',');
            }
            let column = b.field_column(field)?;
            b.quote(&column)?;
        }
        b.write_char(')');
    }
    b.write_str(" DO UPDATE SET ");
    build_upsert_assigns(b, upsert, |b, column| {
        b.write_str(" = EXCLUDED.");
        b.quote(column)
    })
}

/// Emits the assignment list; `from_insert` renders the "value from the
/// inserted row" form for a bare column.
fn build_upsert_assigns<F>(b: &mut Builder<'_>, upsert: &Upsert, from_insert: F) -> Result<()>
where
    F: Fn(&mut Builder<'_>, &str) -> Result<()>,
{
    for (i, assign) in upsert.assigns.iter().enumerate() {
        if i > 0 {
            b.write_char(',');
        }
        match assign {
            Assignable::Assignment(a) => {
                let column = b.field_column(&a.field)?;
                b.quote(&column)?;
                b.write_str(" = ?");
                b.push_arg(a.value.clone());
            }
            Assignable::Column(c) => {
                let column = b.field_column(&c.name)?;
                b.quote(&column)?;
                from_insert(b, &column)?;
            }
            other => return Err(Error::UnsupportedAssignable(other.kind().to_string())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_by_name() {
        assert_eq!(dialect_by_name("MySQL").unwrap().name(), "mysql");
        assert_eq!(dialect_by_name("postgresql").unwrap().name(), "postgres");
        assert_eq!(dialect_by_name("sqlite").unwrap().name(), "sqlite3");
        assert!(dialect_by_name("oracle").is_none());
    }

    #[test]
    fn test_quoters() {
        assert_eq!(MYSQL.quoter(), '`');
        assert_eq!(SQLITE3.quoter(), '`');
        assert_eq!(POSTGRES.quoter(), '"');
    }
}
