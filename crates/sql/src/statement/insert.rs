use crate::builder::Query;
use crate::dialect::Upsert;
use crate::entity::Entity;
use crate::expr::Assignable;
use crate::model::Field;
use crate::session::{ExecResult, Session};
use crate::{Error, Result};

/// Builds and runs an INSERT of one or more `T` rows.
pub struct Inserter<'a, T> {
    sess: &'a dyn Session,
    values: Vec<&'a T>,
    columns: Vec<String>,
    upsert: Option<Upsert>,
}

impl<'a, T: Entity> Inserter<'a, T> {
    pub fn new(sess: &'a dyn Session) -> Self {
        Self {
            sess,
            values: Vec::new(),
            columns: Vec::new(),
            upsert: None,
        }
    }

    /// Appends rows to insert.
    pub fn values(mut self, values: impl IntoIterator<Item = &'a T>) -> Self {
        self.values.extend(values);
        self
    }

    /// Restricts the insert to these fields, in this order. Empty means every
    /// field.
    pub fn columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Starts an upsert clause.
    pub fn on_duplicate_key(self) -> UpsertBuilder<'a, T> {
        UpsertBuilder {
            inserter: self,
            conflict_columns: Vec::new(),
        }
    }

    pub fn build(&self) -> Result<Query> {
        if self.values.is_empty() {
            return Err(Error::InsertZeroRow);
        }
        let core = self.sess.core();
        let model = core.model::<T>()?;
        let accessor = core.accessor().accessor::<T>(model.clone())?;

        let fields: Vec<&Field> = if self.columns.is_empty() {
            model.fields().iter().collect()
        } else {
            self.columns
                .iter()
                .map(|name| model.field(name))
                .collect::<Result<_>>()?
        };

        let mut b = core.builder(model.clone());
        b.write_str("INSERT INTO ");
        b.quote(model.table_name())?;
        b.write_str(" (");
        for (i, f) in fields.iter().enumerate() {
            if i > 0 {
                b.write_char(',');
            }
            b.quote(&f.column)?;
        }
        b.write_str(") VALUES ");
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                b.write_char(',');
            }
            b.write_char('(');
            for (j, f) in fields.iter().enumerate() {
                if j > 0 {
                    b.write_char(',');
                }
                b.write_char('?');
                b.push_arg(accessor.field(value, &f.name)?);
            }
            b.write_char(')');
        }

        if let Some(upsert) = &self.upsert {
            let dialect = b.dialect();
            dialect.build_upsert(&mut b, upsert)?;
        }
        Ok(b.finish())
    }

    pub async fn exec(&self) -> Result<ExecResult> {
        let query = self.build()?;
        self.sess.exec(&query).await
    }
}

/// Collects the conflict target and the assignments of an upsert.
pub struct UpsertBuilder<'a, T> {
    inserter: Inserter<'a, T>,
    conflict_columns: Vec<String>,
}

impl<'a, T: Entity> UpsertBuilder<'a, T> {
    /// Conflict target fields. Ignored by MySQL.
    pub fn conflict_columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict_columns = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn update<I, A>(mut self, assigns: I) -> Inserter<'a, T>
    where
        I: IntoIterator<Item = A>,
        A: Into<Assignable>,
    {
        self.inserter.upsert = Some(Upsert {
            assigns: assigns.into_iter().map(Into::into).collect(),
            conflict_columns: self.conflict_columns,
        });
        self.inserter
    }
}
