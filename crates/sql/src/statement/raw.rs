use super::{decode_all, decode_one};
use crate::builder::Query;
use crate::entity::Entity;
use crate::session::{ExecResult, Session};
use crate::value::Value;
use crate::Result;
use std::marker::PhantomData;

/// A hand-written statement whose rows decode into `T`.
pub struct RawQuerier<'a, T> {
    sess: &'a dyn Session,
    sql: String,
    args: Vec<Value>,
    _marker: PhantomData<fn() -> T>,
}

pub fn raw_query<'a, T, I, V>(
    sess: &'a dyn Session,
    sql: impl Into<String>,
    args: I,
) -> RawQuerier<'a, T>
where
    T: Entity,
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    RawQuerier {
        sess,
        sql: sql.into(),
        args: args.into_iter().map(Into::into).collect(),
        _marker: PhantomData,
    }
}

impl<'a, T: Entity> RawQuerier<'a, T> {
    /// The SQL is passed through unchanged.
    pub fn build(&self) -> Result<Query> {
        Ok(Query::new(self.sql.clone(), self.args.clone()))
    }

    pub async fn get(&self) -> Result<T> {
        let query = self.build()?;
        let rows = self.sess.query_row(&query).await?;
        decode_one(self.sess.core(), rows)
    }

    pub async fn get_multi(&self) -> Result<Vec<T>> {
        let query = self.build()?;
        let rows = self.sess.query(&query).await?;
        decode_all(self.sess.core(), rows)
    }

    pub async fn exec(&self) -> Result<ExecResult> {
        let query = self.build()?;
        self.sess.exec(&query).await
    }
}
