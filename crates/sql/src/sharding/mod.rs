//! Shard routing for SELECTs over models registered with a
//! [`ShardingRule`].
//!
//! Routing looks at the WHERE tree only. Equality on a shard-key field with a
//! literal value routes through the rule's function; `AND` unions the
//! destinations of both sides. Any other use of a shard key cannot be routed
//! and fails with [`Error::UnsupportedRoutingOperator`]. Predicates that do
//! not mention a shard key add no destinations.

use crate::builder::{validate_identifier, Query};
use crate::entity::Entity;
use crate::expr::{fold_and, Expr, Op, Predicate};
use crate::model::{Dst, ShardingRule};
use crate::session::{Core, Rows, Session};
use crate::statement::{decode_all, decode_one, select_clauses, SelectStatement};
use crate::{Error, Result};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::task::JoinSet;

/// A set of per-database sessions sharing one [`Core`].
pub trait ShardSet: Send + Sync {
    fn core(&self) -> &Core;

    /// Session for the shard database named `db`.
    fn shard(&self, db: &str) -> Option<Arc<dyn Session>>;
}

/// Destinations the predicate routes to, in first-seen order without
/// duplicates.
pub fn find_dst(rule: &ShardingRule, predicate: &Predicate) -> Result<Vec<Dst>> {
    let mut out = Vec::new();
    collect_dst(rule, predicate, &mut out)?;
    Ok(out)
}

fn collect_dst(rule: &ShardingRule, p: &Predicate, out: &mut Vec<Dst>) -> Result<()> {
    let Some(op) = p.op else {
        // Raw predicate.
        return Ok(());
    };
    match op {
        Op::And => {
            for side in [&p.left, &p.right].into_iter().flatten() {
                if let Expr::Predicate(inner) = side.as_ref() {
                    collect_dst(rule, inner, out)?;
                }
            }
            Ok(())
        }
        Op::Eq => match (p.left.as_deref(), p.right.as_deref()) {
            (Some(Expr::Column(c)), Some(right)) if rule.is_key(&c.name) => match right {
                Expr::Value(v) => {
                    let values = HashMap::from([(c.name.clone(), v.clone())]);
                    let dst = rule.route(&values);
                    tracing::debug!(target: "sharding", key = %c.name, value = %v, dst = %dst, "Routed predicate");
                    if !out.contains(&dst) {
                        out.push(dst);
                    }
                    Ok(())
                }
                other => Err(Error::UnsupportedRoutingOperator(format!(
                    "= with {} operand",
                    other.kind()
                ))),
            },
            _ => Ok(()),
        },
        op if mentions_key(rule, p) => Err(Error::UnsupportedRoutingOperator(op.to_string())),
        _ => Ok(()),
    }
}

fn mentions_key(rule: &ShardingRule, p: &Predicate) -> bool {
    [&p.left, &p.right].into_iter().flatten().any(|e| match e.as_ref() {
        Expr::Column(c) => rule.is_key(&c.name),
        Expr::Predicate(inner) => mentions_key(rule, inner),
        _ => false,
    })
}

/// A SELECT fanned out to every shard its WHERE clause routes to.
pub struct ShardingSelector<'s, T> {
    stmt: SelectStatement,
    shards: &'s dyn ShardSet,
    _marker: PhantomData<fn() -> T>,
}

select_clauses!(ShardingSelector);

impl<'s, T: Entity> ShardingSelector<'s, T> {
    pub fn new(shards: &'s dyn ShardSet) -> Self {
        Self {
            stmt: SelectStatement::new::<T>(),
            shards,
            _marker: PhantomData,
        }
    }

    /// One query per destination, each with [`Query::database`] set.
    pub fn build(&self) -> Result<Vec<Query>> {
        self.compile(&self.stmt)
    }

    fn compile(&self, stmt: &SelectStatement) -> Result<Vec<Query>> {
        let core = self.shards.core();
        let model = core.model::<T>()?;
        let rule = model
            .sharding()
            .ok_or_else(|| Error::ShardingNotConfigured(model.type_name().to_string()))?;
        let predicate = fold_and(&stmt.filters).ok_or(Error::NoWhereClause)?;
        let dsts = find_dst(rule, &predicate)?;
        if dsts.is_empty() {
            return Err(Error::NoDestination);
        }

        let quote = core.dialect().quoter();
        let mut queries = Vec::with_capacity(dsts.len());
        for dst in dsts {
            validate_identifier(&dst.db, quote)?;
            validate_identifier(&dst.table, quote)?;
            let from = dst.to_string();
            let mut b = core.builder(Arc::clone(&model));
            stmt.build_into(&mut b, Some(&from))?;
            let mut query = b.finish();
            query.database = Some(dst.db);
            queries.push(query);
        }
        Ok(queries)
    }

    /// One row from the routed shards. When several shards return a row, the
    /// last destination wins.
    pub async fn get(&self) -> Result<T> {
        let mut stmt = self.stmt.clone();
        stmt.limit = 1;
        let queries = self.compile(&stmt)?;
        let results = self.fan_out(queries).await?;
        let rows = results
            .into_iter()
            .filter(|rows| !rows.is_empty())
            .last()
            .ok_or(Error::NoRows)?;
        decode_one(self.shards.core(), rows)
    }

    /// Rows from every routed shard, concatenated in destination order.
    pub async fn get_multi(&self) -> Result<Vec<T>> {
        let queries = self.compile(&self.stmt)?;
        let results = self.fan_out(queries).await?;
        let mut out = Vec::new();
        for rows in results {
            out.extend(decode_all::<T>(self.shards.core(), rows)?);
        }
        Ok(out)
    }

    /// Runs every query concurrently. Fails with the first error after all
    /// tasks have finished.
    async fn fan_out(&self, queries: Vec<Query>) -> Result<Vec<Rows>> {
        let mut jobs = Vec::with_capacity(queries.len());
        for query in queries {
            let db = query.database.clone().unwrap_or_default();
            let sess = self
                .shards
                .shard(&db)
                .ok_or_else(|| Error::UnknownShard(db.clone()))?;
            jobs.push((sess, query));
        }

        tracing::debug!(target: "sharding", shards = jobs.len(), "Fanning out query");
        let mut tasks = JoinSet::new();
        for (idx, (sess, query)) in jobs.into_iter().enumerate() {
            tasks.spawn(async move { (idx, sess.query(&query).await) });
        }

        let mut results: Vec<Option<Rows>> = Vec::new();
        results.resize_with(tasks.len(), || None);
        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(rows))) => results[idx] = Some(rows),
                Ok((_, Err(e))) => {
                    first_err.get_or_insert(e);
                }
                Err(e) => {
                    first_err.get_or_insert(Error::session(e));
                }
            }
        }
        if let Some(e) = first_err {
            tracing::warn!(target: "sharding", error = %e, "Sharded query failed");
            return Err(e);
        }
        Ok(results.into_iter().flatten().collect())
    }
}
