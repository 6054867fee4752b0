//! Recursive SQL compiler.
//!
//! A [`Builder`] owns the text buffer and argument list for one statement and
//! is threaded through a recursive descent over expressions and table
//! references. Statements drive it clause by clause and finish it into a
//! [`Query`].

mod sanitize;

pub use sanitize::validate_identifier;

use crate::dialect::Dialect;
use crate::expr::{fold_and, Aggregate, Column, Expr, Op, Predicate, RawExpr, Selectable};
use crate::model::{Model, Registry};
use crate::table::{SubQuery, TableReference};
use crate::value::Value;
use crate::{Error, Result};
use std::sync::Arc;

/// Compiled statement: `;`-terminated SQL and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
    /// Shard database the query must run against.
    pub database: Option<String>,
}

impl Query {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
            database: None,
        }
    }
}

/// A column name after resolution through the table tree.
struct Resolved {
    qualifier: Option<String>,
    column: String,
}

pub struct Builder<'a> {
    sql: String,
    args: Vec<Value>,
    model: Arc<Model>,
    registry: &'a Registry,
    dialect: &'a dyn Dialect,
    quote: char,
}

impl<'a> Builder<'a> {
    pub fn new(registry: &'a Registry, dialect: &'a dyn Dialect, model: Arc<Model>) -> Self {
        Self {
            sql: String::with_capacity(128),
            args: Vec::new(),
            model,
            registry,
            dialect,
            quote: dialect.quoter(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    pub fn write_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub fn write_char(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Writes `name` between the dialect's quote characters.
    pub fn quote(&mut self, name: &str) -> Result<()> {
        validate_identifier(name, self.quote)?;
        self.sql.push(self.quote);
        self.sql.push_str(name);
        self.sql.push(self.quote);
        Ok(())
    }

    pub fn push_arg(&mut self, value: Value) {
        self.args.push(value);
    }

    /// Column name of a field of the statement's model.
    pub fn field_column(&self, field: &str) -> Result<String> {
        Ok(self.model.field(field)?.column.clone())
    }

    /// Terminates the statement.
    pub fn finish(mut self) -> Query {
        self.sql.push(';');
        tracing::debug!(
            target: "sql_builder",
            dialect = self.dialect.name(),
            sql = %self.sql,
            args = self.args.len(),
            "Built query"
        );
        Query::new(self.sql, self.args)
    }

    /// Compiled text without the terminator, for splicing into another
    /// statement.
    pub(crate) fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }

    pub(crate) fn build_raw(&mut self, r: &RawExpr, parenthesize: bool) {
        if parenthesize {
            self.sql.push('(');
        }
        self.sql.push_str(&r.sql);
        if parenthesize {
            self.sql.push(')');
        }
        self.args.extend(r.args.iter().cloned());
    }

    /// SELECT list. Empty means `*`.
    pub(crate) fn build_selectables(&mut self, cols: &[Selectable]) -> Result<()> {
        if cols.is_empty() {
            self.sql.push('*');
            return Ok(());
        }
        for (i, c) in cols.iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            match c {
                Selectable::Column(c) => self.build_column(c, true)?,
                Selectable::Aggregate(a) => self.build_aggregate(a, true)?,
                Selectable::Raw(r) => self.build_raw(r, false),
            }
        }
        Ok(())
    }

    pub(crate) fn build_column(&mut self, c: &Column, with_alias: bool) -> Result<()> {
        let resolved = self.resolve(c.table.as_deref(), &c.name)?;
        if let Some(q) = &resolved.qualifier {
            self.quote(q)?;
            self.sql.push('.');
        }
        self.quote(&resolved.column)?;
        if with_alias {
            if let Some(alias) = &c.alias {
                self.sql.push_str(" AS ");
                self.quote(alias)?;
            }
        }
        Ok(())
    }

    pub(crate) fn build_aggregate(&mut self, a: &Aggregate, with_alias: bool) -> Result<()> {
        let resolved = self.resolve(a.table.as_deref(), &a.arg)?;
        self.sql.push_str(a.func);
        self.sql.push('(');
        if let Some(q) = &resolved.qualifier {
            self.quote(q)?;
            self.sql.push('.');
        }
        self.quote(&resolved.column)?;
        self.sql.push(')');
        if with_alias {
            if let Some(alias) = &a.alias {
                self.sql.push_str(" AS ");
                self.quote(alias)?;
            }
        }
        Ok(())
    }

    /// Folds `ps` with `AND` and compiles the result. Does nothing for an
    /// empty slice.
    pub(crate) fn build_predicates(&mut self, ps: &[Predicate]) -> Result<()> {
        match fold_and(ps) {
            Some(p) => self.build_predicate(&p),
            None => Ok(()),
        }
    }

    fn build_predicate(&mut self, p: &Predicate) -> Result<()> {
        if let Some(left) = &p.left {
            self.build_operand(left)?;
        }
        if let Some(op) = p.op {
            if p.left.is_some() {
                self.sql.push(' ');
            }
            self.sql.push_str(op.as_str());
            if p.right.is_some() {
                self.sql.push(' ');
            }
        }
        if let Some(right) = &p.right {
            match (p.op, right.as_ref()) {
                (Some(Op::In | Op::NotIn), Expr::List(values)) => self.build_list(values)?,
                _ => self.build_operand(right)?,
            }
        }
        Ok(())
    }

    /// Nested predicates are parenthesized; leaves are not.
    fn build_operand(&mut self, e: &Expr) -> Result<()> {
        if let Expr::Predicate(p) = e {
            self.sql.push('(');
            self.build_predicate(p)?;
            self.sql.push(')');
            return Ok(());
        }
        self.build_expr(e)
    }

    pub(crate) fn build_expr(&mut self, e: &Expr) -> Result<()> {
        match e {
            // Output aliases are meaningless inside filters.
            Expr::Column(c) => self.build_column(c, false),
            Expr::Aggregate(a) => self.build_aggregate(a, false),
            Expr::Value(v) => {
                self.sql.push('?');
                self.args.push(v.clone());
                Ok(())
            }
            Expr::Raw(r) => {
                self.build_raw(r, true);
                Ok(())
            }
            Expr::Predicate(p) => self.build_predicate(p),
            Expr::List(_) => Err(Error::UnsupportedExpression(format!(
                "{} outside IN",
                e.kind()
            ))),
        }
    }

    fn build_list(&mut self, values: &[Value]) -> Result<()> {
        if values.is_empty() {
            return Err(Error::UnsupportedExpression("empty IN list".to_string()));
        }
        self.sql.push('(');
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            self.sql.push('?');
            self.args.push(v.clone());
        }
        self.sql.push(')');
        Ok(())
    }

    pub(crate) fn build_table(&mut self, t: &TableReference) -> Result<()> {
        match t {
            TableReference::Table(t) => {
                let model = t.entity.model(self.registry)?;
                self.quote(&model.table_name)?;
                if let Some(alias) = &t.alias {
                    self.sql.push_str(" AS ");
                    self.quote(alias)?;
                }
            }
            TableReference::Join(j) => {
                self.sql.push('(');
                self.build_table(&j.left)?;
                self.sql.push(' ');
                self.sql.push_str(j.kind.as_str());
                self.sql.push(' ');
                self.build_table(&j.right)?;
                if !j.using.is_empty() {
                    self.sql.push_str(" USING (");
                    for (i, field) in j.using.iter().enumerate() {
                        if i > 0 {
                            self.sql.push(',');
                        }
                        let resolved = self.resolve(Some(t), field)?;
                        self.quote(&resolved.column)?;
                    }
                    self.sql.push(')');
                }
                if !j.on.is_empty() {
                    self.sql.push_str(" ON ");
                    self.build_predicates(&j.on)?;
                }
                self.sql.push(')');
            }
            TableReference::SubQuery(s) => {
                let model = s.stmt.entity.model(self.registry)?;
                let mut inner = Builder::new(self.registry, self.dialect, model);
                s.stmt.build_into(&mut inner, None)?;
                let (sql, args) = inner.into_parts();
                self.sql.push('(');
                self.sql.push_str(&sql);
                self.sql.push_str(") AS ");
                self.quote(&s.alias)?;
                self.args.extend(args);
            }
        }
        Ok(())
    }

    /// Resolves `field` against `table`, or against the statement's model
    /// when no table is attached.
    fn resolve(&self, table: Option<&TableReference>, field: &str) -> Result<Resolved> {
        match table {
            None => Ok(Resolved {
                qualifier: None,
                column: self.field_column(field)?,
            }),
            Some(TableReference::Table(t)) => {
                let model = t.entity.model(self.registry)?;
                Ok(Resolved {
                    qualifier: t.alias.clone(),
                    column: model.field(field)?.column.clone(),
                })
            }
            // First match wins; ambiguous names are not detected.
            Some(TableReference::Join(j)) => match self.resolve(Some(j.left.as_ref()), field) {
                Err(Error::UnknownField { .. }) => self.resolve(Some(j.right.as_ref()), field),
                res => res,
            },
            Some(TableReference::SubQuery(s)) => {
                let column = self.resolve_in_subquery(s, field)?;
                Ok(Resolved {
                    qualifier: Some(s.alias.clone()),
                    column,
                })
            }
        }
    }

    fn resolve_in_subquery(&self, s: &SubQuery, field: &str) -> Result<String> {
        let inner_table = s.stmt.table.as_ref();
        let inner_model = s.stmt.entity.model(self.registry)?;
        let inner_column = |name: &str| -> Result<String> {
            match inner_table {
                Some(t) => Ok(self.resolve(Some(t), name)?.column),
                None => Ok(inner_model.field(name)?.column.clone()),
            }
        };

        if s.stmt.columns.is_empty() {
            return inner_column(field);
        }
        for c in &s.stmt.columns {
            match c {
                Selectable::Column(c) if c.alias.as_deref() == Some(field) => {
                    return Ok(field.to_string())
                }
                Selectable::Column(c) if c.name == field => {
                    return match &c.alias {
                        Some(alias) => Ok(alias.clone()),
                        None => inner_column(field),
                    }
                }
                Selectable::Aggregate(a) if a.alias.as_deref() == Some(field) => {
                    return Ok(field.to_string())
                }
                _ => {}
            }
        }
        Err(Error::UnknownField {
            field: field.to_string(),
            suggestion: None,
        })
    }
}
