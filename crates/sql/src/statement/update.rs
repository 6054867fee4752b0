use crate::builder::{Builder, Query};
use crate::entity::Entity;
use crate::expr::{Assignable, Predicate};
use crate::session::{ExecResult, Session};
use crate::table::TableReference;
use crate::{Error, Result};
use std::marker::PhantomData;

/// Builds and runs an UPDATE of `T`'s table.
pub struct Updater<'a, T> {
    sess: &'a dyn Session,
    table: Option<TableReference>,
    assigns: Vec<Assignable>,
    filters: Vec<Predicate>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Updater<'a, T> {
    pub fn new(sess: &'a dyn Session) -> Self {
        Self {
            sess,
            table: None,
            assigns: Vec::new(),
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Only plain tables can be updated.
    pub fn table(mut self, table: impl Into<TableReference>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Appends assignments to the SET list.
    pub fn set<I, A>(mut self, assigns: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Assignable>,
    {
        self.assigns.extend(assigns.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn build(&self) -> Result<Query> {
        if self.assigns.is_empty() {
            return Err(Error::UpdateNoSet);
        }
        let core = self.sess.core();
        let mut b = core.builder(core.model::<T>()?);

        b.write_str("UPDATE ");
        build_target(&mut b, self.table.as_ref())?;

        b.write_str(" SET ");
        for (i, assign) in self.assigns.iter().enumerate() {
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
                Assignable::Raw(r) => b.build_raw(r, false),
                other => return Err(Error::UnsupportedAssignable(other.kind().to_string())),
            }
        }

        if !self.filters.is_empty() {
            b.write_str(" WHERE ");
            b.build_predicates(&self.filters)?;
        }
        Ok(b.finish())
    }

    pub async fn exec(&self) -> Result<ExecResult> {
        let query = self.build()?;
        self.sess.exec(&query).await
    }
}

/// Writes the target of an UPDATE or DELETE: the model's own table when none
/// is set, otherwise a plain [`Table`](crate::table::Table).
pub(super) fn build_target(b: &mut Builder<'_>, table: Option<&TableReference>) -> Result<()> {
    match table {
        None => {
            let name = b.model().table_name().to_string();
            b.quote(&name)
        }
        Some(t @ TableReference::Table(_)) => b.build_table(t),
        Some(other) => Err(Error::UnsupportedTable(other.kind().to_string())),
    }
}
