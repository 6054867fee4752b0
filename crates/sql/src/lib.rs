//! Typed SQL construction for Tessera.
//!
//! - **Expressions** ([`expr`]): columns, values, aggregates, raw fragments
//!   and predicates, assembled fluently into immutable trees.
//! - **Registry** ([`model`]): table and column metadata derived once per
//!   [`Entity`] type and shared across threads.
//! - **Statements** ([`statement`]): SELECT/INSERT/UPDATE/DELETE builders
//!   compiled by a recursive [`builder::Builder`] into parameterized
//!   [`Query`] values for a chosen [`dialect`].
//! - **Sharding** ([`sharding`]): routes a SELECT's WHERE clause to physical
//!   shards and fans it out concurrently.
//!
//! Execution happens behind the [`Session`] trait; `tessera-runtime` provides
//! the SQLite implementation.

pub mod accessor;
pub mod builder;
pub mod dialect;
pub mod entity;
pub mod expr;
pub mod model;
pub mod session;
pub mod sharding;
pub mod statement;
pub mod table;
pub mod value;

pub use accessor::{Accessor, AccessorKind};
pub use builder::Query;
pub use dialect::{dialect_by_name, Dialect, Upsert, MYSQL, POSTGRES, SQLITE3};
pub use entity::{Entity, EntityDescriptor, FieldDescriptor, TypeDescriptor};
pub use expr::{
    assign, avg, col, count, max, min, not, raw, sum, Assignable, Column, Expr, Op, Predicate,
    Selectable,
};
pub use model::{Dst, Model, ModelOption, Registry, ShardingRule};
pub use session::{Core, ExecResult, Rows, Session};
pub use sharding::{ShardSet, ShardingSelector};
pub use statement::{raw_query, Deleter, Inserter, RawQuerier, Selector, Updater};
pub use table::{table_of, Table, TableReference};
pub use tessera_error::{Error, ErrorCategory, ErrorCode, Result};
pub use value::{SqlType, Value};
