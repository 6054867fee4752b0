use super::{decode_all, decode_one};
use crate::builder::{Builder, Query};
use crate::entity::Entity;
use crate::expr::{Predicate, Selectable};
use crate::session::Session;
use crate::table::{EntityRef, SubQuery, TableReference};
use crate::value::SqlType;
use crate::{Error, Result};
use std::marker::PhantomData;

/// Builder methods shared by [`Selector`] and the sharding selector.
macro_rules! select_clauses {
    ($ty:ident) => {
        impl<'s, T: $crate::Entity> $ty<'s, T> {
            /// Replaces the select list. Empty selects `*`.
            pub fn select<I, S>(mut self, columns: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<$crate::expr::Selectable>,
            {
                self.stmt.columns = columns.into_iter().map(Into::into).collect();
                self
            }

            /// Adds a WHERE predicate. Multiple calls are joined with `AND`.
            pub fn filter(mut self, predicate: $crate::expr::Predicate) -> Self {
                self.stmt.filters.push(predicate);
                self
            }

            pub fn order_by<I, S>(mut self, columns: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<$crate::expr::Selectable>,
            {
                self.stmt.order_by = columns.into_iter().map(Into::into).collect();
                self
            }

            pub fn group_by<I, S>(mut self, columns: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<$crate::expr::Selectable>,
            {
                self.stmt.group_by = columns.into_iter().map(Into::into).collect();
                self
            }

            /// Adds a HAVING predicate. Ignored without GROUP BY.
            pub fn having(mut self, predicate: $crate::expr::Predicate) -> Self {
                self.stmt.having.push(predicate);
                self
            }

            pub fn limit(mut self, limit: u64) -> Self {
                self.stmt.limit = limit;
                self
            }

            pub fn offset(mut self, offset: u64) -> Self {
                self.stmt.offset = offset;
                self
            }
        }
    };
}

pub(crate) use select_clauses;

/// Everything a SELECT is compiled from, detached from any session so it can
/// be nested as a subquery.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub(crate) entity: EntityRef,
    pub(crate) table: Option<TableReference>,
    pub(crate) from_raw: Option<String>,
    pub(crate) columns: Vec<Selectable>,
    pub(crate) filters: Vec<Predicate>,
    pub(crate) order_by: Vec<Selectable>,
    pub(crate) group_by: Vec<Selectable>,
    pub(crate) having: Vec<Predicate>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
    pub(crate) count: bool,
}

impl SelectStatement {
    pub(crate) fn new<T: Entity>() -> Self {
        Self {
            entity: EntityRef::of::<T>(),
            table: None,
            from_raw: None,
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            limit: 0,
            offset: 0,
            count: false,
        }
    }

    /// Compiles the statement into `b` without the trailing `;`.
    ///
    /// `from_override` replaces the FROM target verbatim; the sharding
    /// selector uses it for `db.table` destinations.
    pub(crate) fn build_into(
        &self,
        b: &mut Builder<'_>,
        from_override: Option<&str>,
    ) -> Result<()> {
        b.write_str("SELECT ");
        if self.count {
            b.write_str("COUNT(*)");
        } else {
            b.build_selectables(&self.columns)?;
        }

        b.write_str(" FROM ");
        match (from_override, &self.from_raw, &self.table) {
            (Some(from), _, _) => b.write_str(from),
            (None, Some(from), _) => b.write_str(from),
            (None, None, Some(table)) => b.build_table(table)?,
            (None, None, None) => {
                let table = b.model().table_name().to_string();
                b.quote(&table)?;
            }
        }

        if !self.filters.is_empty() {
            b.write_str(" WHERE ");
            b.build_predicates(&self.filters)?;
        }

        if !self.group_by.is_empty() {
            b.write_str(" GROUP BY ");
            for (i, s) in self.group_by.iter().enumerate() {
                if i > 0 {
                    b.write_char(',');
                }
                match s {
                    Selectable::Column(c) => b.build_column(c, false)?,
                    Selectable::Raw(r) => b.build_raw(r, false),
                    Selectable::Aggregate(a) => {
                        return Err(Error::UnsupportedExpression(format!(
                            "aggregate {} in GROUP BY",
                            a.func()
                        )))
                    }
                }
            }
            if !self.having.is_empty() {
                b.write_str(" HAVING ");
                b.build_predicates(&self.having)?;
            }
        }

        if !self.order_by.is_empty() {
            b.write_str(" ORDER BY ");
            for (i, s) in self.order_by.iter().enumerate() {
                if i > 0 {
                    b.write_char(',');
                }
                match s {
                    Selectable::Column(c) => {
                        b.build_column(c, false)?;
                        b.write_char(' ');
                        b.write_str(c.order.as_str());
                    }
                    Selectable::Aggregate(a) => b.build_aggregate(a, false)?,
                    Selectable::Raw(r) => b.build_raw(r, true),
                }
            }
        }

        if self.limit > 0 || self.offset > 0 {
            let dialect = b.dialect();
            dialect.build_limit_offset(b, self.offset, self.limit)?;
        }
        Ok(())
    }
}

/// Builds and runs a SELECT returning `T`.
///
/// ```ignore
/// let users = Selector::<User>::new(&db)
///     .filter(col("age").gt(18).and(col("last_name").like("A%")))
///     .order_by([col("id").desc()])
///     .limit(10)
///     .get_multi()
///     .await?;
/// ```
pub struct Selector<'s, T> {
    stmt: SelectStatement,
    sess: &'s dyn Session,
    _marker: PhantomData<fn() -> T>,
}

select_clauses!(Selector);

impl<'s, T: Entity> Selector<'s, T> {
    pub fn new(sess: &'s dyn Session) -> Self {
        Self {
            stmt: SelectStatement::new::<T>(),
            sess,
            _marker: PhantomData,
        }
    }

    /// Selects from a table, join or subquery instead of `T`'s table.
    pub fn from(mut self, table: impl Into<TableReference>) -> Self {
        self.stmt.table = Some(table.into());
        self
    }

    /// Uses `sql` verbatim as the FROM target.
    pub fn from_raw(mut self, sql: impl Into<String>) -> Self {
        self.stmt.from_raw = Some(sql.into());
        self
    }

    /// Selects `COUNT(*)` instead of the select list.
    pub fn count(mut self) -> Self {
        self.stmt.count = true;
        self
    }

    /// Wraps the statement built so far as a subquery named `alias`.
    pub fn as_subquery(&self, alias: impl Into<String>) -> SubQuery {
        SubQuery::new(self.stmt.clone(), alias.into())
    }

    pub fn build(&self) -> Result<Query> {
        self.compile(&self.stmt)
    }

    fn compile(&self, stmt: &SelectStatement) -> Result<Query> {
        let core = self.sess.core();
        let mut b = core.builder(core.model::<T>()?);
        stmt.build_into(&mut b, None)?;
        Ok(b.finish())
    }

    /// First matching row. [`Error::NoRows`] when nothing matched.
    pub async fn get(&self) -> Result<T> {
        let mut stmt = self.stmt.clone();
        stmt.limit = 1;
        let query = self.compile(&stmt)?;
        let rows = self.sess.query_row(&query).await?;
        decode_one(self.sess.core(), rows)
    }

    pub async fn get_multi(&self) -> Result<Vec<T>> {
        let query = self.build()?;
        let rows = self.sess.query(&query).await?;
        decode_all(self.sess.core(), rows)
    }

    /// Runs the statement as `SELECT COUNT(*)`.
    pub async fn get_count(&self) -> Result<u64> {
        let mut stmt = self.stmt.clone();
        stmt.count = true;
        let query = self.compile(&stmt)?;
        let mut rows = self.sess.query_row(&query).await?;
        let value = rows
            .next_row()
            .and_then(|row| row.into_iter().next())
            .ok_or(Error::NoRows)?;
        let found = value.type_name();
        u64::from_value(value).ok_or_else(|| Error::Conversion {
            column: "COUNT(*)".to_string(),
            expected: "u64".to_string(),
            found: found.to_string(),
        })
    }
}
