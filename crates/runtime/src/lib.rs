//! Executes tessera statements against SQLite.
//!
//! [`Db`] and [`Tx`] implement [`Session`](tessera_sql::Session) over a
//! single `rusqlite` connection, running driver calls on tokio's blocking
//! pool. [`MasterSlaveDb`] splits reads from writes and [`ShardingDb`] maps
//! shard database names to those groups for the sharding selector.

mod convert;
pub mod db;
pub mod shard;

pub use db::{Db, DbOptions, Tx};
pub use shard::{MasterSlaveDb, ShardingDb};
