use super::update::build_target;
use crate::builder::Query;
use crate::entity::Entity;
use crate::expr::Predicate;
use crate::session::{ExecResult, Session};
use crate::table::TableReference;
use crate::Result;
use std::marker::PhantomData;

/// Builds and runs a DELETE against `T`'s table.
pub struct Deleter<'a, T> {
    sess: &'a dyn Session,
    table: Option<TableReference>,
    from_raw: Option<String>,
    filters: Vec<Predicate>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Deleter<'a, T> {
    pub fn new(sess: &'a dyn Session) -> Self {
        Self {
            sess,
            table: None,
            from_raw: None,
            filters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Only plain tables are accepted.
    pub fn from(mut self, table: impl Into<TableReference>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn from_raw(mut self, sql: impl Into<String>) -> Self {
        self.from_raw = Some(sql.into());
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn build(&self) -> Result<Query> {
        let core = self.sess.core();
        let mut b = core.builder(core.model::<T>()?);
        b.write_str("DELETE FROM ");
        match &self.from_raw {
            Some(raw) => b.write_str(raw),
            None => build_target(&mut b, self.table.as_ref())?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MYSQL, POSTGRES};
    use crate::expr::col;
    use crate::statement::testing::MockSession;
    use crate::statement::Selector;
    use crate::table::table_of;
    use crate::value::Value;
    use crate::Error;

    crate::entity! {
        #[derive(Debug, Default)]
        pub struct TestModel {
            pub id: i64,
            pub first_name: String,
        }
    }

    #[test]
    fn test_delete() {
        let sess = MockSession::new(&MYSQL);

        let q = Deleter::<TestModel>::new(&sess).build().unwrap();
        assert_eq!(q.sql, "DELETE FROM `test_model`;");

        let q = Deleter::<TestModel>::new(&sess)
            .from(table_of::<TestModel>())
            .filter(col("id").eq(16).or(col("id").eq(17)))
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "DELETE FROM `test_model` WHERE (`id` = ?) OR (`id` = ?);"
        );
        assert_eq!(q.args, vec![Value::Int(16), Value::Int(17)]);

        let q = Deleter::<TestModel>::new(&sess)
            .from_raw("`archive`.`test_model`")
            .filter(col("first_name").eq("Tom"))
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "DELETE FROM `archive`.`test_model` WHERE `first_name` = ?;"
        );

        let pg = MockSession::new(&POSTGRES);
        let q = Deleter::<TestModel>::new(&pg)
            .filter(col("id").eq(1))
            .build()
            .unwrap();
        assert_eq!(q.sql, "DELETE FROM \"test_model\" WHERE \"id\" = ?;");
    }

    #[test]
    fn test_delete_rejects_subquery() {
        let sess = MockSession::new(&MYSQL);
        let sub = Selector::<TestModel>::new(&sess).as_subquery("sub");
        let err = Deleter::<TestModel>::new(&sess).from(sub).build().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTable(_)));
    }

    #[tokio::test]
    async fn test_exec() {
        let sess = MockSession::new(&MYSQL);
        let res = Deleter::<TestModel>::new(&sess)
            .filter(col("id").eq(1))
            .exec()
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 1);
        assert_eq!(sess.last().sql, "DELETE FROM `test_model` WHERE `id` = ?;");
    }
}
