use crate::convert::{from_sqlite, to_sqlite_args};
use anyhow::Context;
use async_trait::async_trait;
use futures::future::BoxFuture;
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tessera_common::{AccessorSetting, AppConfig};
use tessera_sql::builder::validate_identifier;
use tessera_sql::{
    dialect_by_name, AccessorKind, Core, Dialect, Error, ExecResult, Query, Registry, Result,
    Rows, Session, SQLITE3,
};
use tokio::sync::OwnedMutexGuard;

const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(200);

/// How a [`Db`] renders and runs statements.
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub dialect: &'static dyn Dialect,
    pub accessor: AccessorKind,
    /// Shared with other handles so models registered once are seen by all.
    pub registry: Option<Arc<Registry>>,
    pub slow_query_threshold: Duration,
    /// Opens an in-memory main database and attaches the URL under this
    /// schema name, so `name.table` resolves.
    pub attach_as: Option<String>,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            dialect: &SQLITE3,
            accessor: AccessorKind::default(),
            registry: None,
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
            attach_as: None,
        }
    }
}

impl DbOptions {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let dialect = dialect_by_name(&config.database.dialect)
            .with_context(|| format!("Unsupported dialect '{}'", config.database.dialect))?;
        let accessor = match config.database.accessor {
            AccessorSetting::Reflect => AccessorKind::Reflect,
            AccessorSetting::Offset => AccessorKind::Offset,
        };
        Ok(Self {
            dialect,
            accessor,
            registry: None,
            slow_query_threshold: config.logging.slow_query_threshold(),
            attach_as: None,
        })
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn attach_as(mut self, name: impl Into<String>) -> Self {
        self.attach_as = Some(name.into());
        self
    }
}

/// State shared by a [`Db`] and the transactions it starts.
struct Shared {
    core: Core,
    conn: Arc<Mutex<Connection>>,
    /// Held by an open transaction; every other statement waits on it.
    gate: Arc<tokio::sync::Mutex<()>>,
    slow_query_threshold: Duration,
}

/// A session over one SQLite connection.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("core", &self.shared.core)
            .finish_non_exhaustive()
    }
}

impl Db {
    pub fn open(url: &str, options: DbOptions) -> Result<Self> {
        let conn = match &options.attach_as {
            Some(name) => {
                validate_identifier(name, '"')?;
                let conn = Connection::open_in_memory().map_err(Error::session)?;
                conn.execute(&format!("ATTACH DATABASE ?1 AS \"{}\"", name), [url])
                    .map_err(Error::session)?;
                conn
            }
            None => Connection::open(url).map_err(Error::session)?,
        };

        let registry = options
            .registry
            .unwrap_or_else(|| Arc::new(Registry::new()));
        let core = Core::new(options.dialect)
            .with_registry(registry)
            .with_accessor(options.accessor);
        tracing::info!(target: "tessera", url, dialect = options.dialect.name(), "Opened database");

        Ok(Self {
            shared: Arc::new(Shared {
                core,
                conn: Arc::new(Mutex::new(conn)),
                gate: Arc::new(tokio::sync::Mutex::new(())),
                slow_query_threshold: options.slow_query_threshold,
            }),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:", DbOptions::default())
    }

    /// Opens `config.database.url` with the configured dialect, accessor and
    /// slow query threshold.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let options = DbOptions::from_config(config)?;
        Self::open(&config.database.url, options)
            .with_context(|| format!("Failed to open database '{}'", config.database.url))
    }

    /// Runs a batch of `;`-separated statements, typically DDL.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let _gate = self.shared.gate.lock().await;
        let sql = sql.to_string();
        run_blocking(&self.shared.conn, move |conn| conn.execute_batch(&sql)).await
    }

    /// Starts a transaction. Other statements on this `Db` wait until it
    /// finishes, so a transaction must not be driven through its parent.
    pub async fn begin(&self) -> Result<Tx> {
        let gate = Arc::clone(&self.shared.gate).lock_owned().await;
        run_blocking(&self.shared.conn, |conn| conn.execute_batch("BEGIN")).await?;
        tracing::debug!(target: "queries", "BEGIN");
        Ok(Tx {
            shared: Arc::clone(&self.shared),
            gate: Mutex::new(Some(gate)),
        })
    }

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on
    /// `Err`.
    pub async fn do_tx<F, R>(&self, f: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, Result<R>>,
    {
        let tx = self.begin().await?;
        match f(&tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(target: "queries", error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Session for Db {
    fn core(&self) -> &Core {
        &self.shared.core
    }

    async fn query(&self, query: &Query) -> Result<Rows> {
        let _gate = self.shared.gate.lock().await;
        run_query(&self.shared, query).await
    }

    async fn exec(&self, query: &Query) -> Result<ExecResult> {
        let _gate = self.shared.gate.lock().await;
        run_exec(&self.shared, query).await
    }
}

/// An open transaction. Rolled back on drop unless committed; inside a
/// runtime the rollback runs on the blocking pool and the parent [`Db`]
/// stays gated until it completes.
pub struct Tx {
    shared: Arc<Shared>,
    gate: Mutex<Option<OwnedMutexGuard<()>>>,
}

impl Tx {
    pub async fn commit(&self) -> Result<()> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(&self) -> Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&self, sql: &'static str) -> Result<()> {
        let gate = self.take_gate().ok_or(Error::TxDone)?;
        let res = run_blocking(&self.shared.conn, move |conn| conn.execute_batch(sql)).await;
        drop(gate);
        tracing::debug!(target: "queries", sql, ok = res.is_ok(), "Transaction finished");
        res
    }

    fn take_gate(&self) -> Option<OwnedMutexGuard<()>> {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn ensure_open(&self) -> Result<()> {
        let open = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if open {
            Ok(())
        } else {
            Err(Error::TxDone)
        }
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        let Some(gate) = self.take_gate() else {
            return;
        };
        let conn = Arc::clone(&self.shared.conn);
        // The gate stays held until ROLLBACK has run, so queued statements
        // never observe the abandoned transaction.
        let rollback = move || {
            let res = conn
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .execute_batch("ROLLBACK");
            drop(gate);
            match res {
                Ok(()) => tracing::debug!(target: "queries", "Transaction rolled back on drop"),
                Err(e) => tracing::warn!(target: "queries", error = %e, "Rollback on drop failed"),
            }
        };
        // Off the executor when inside a runtime, since a blocking query may
        // still hold the connection.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(rollback);
            }
            Err(_) => rollback(),
        }
    }
}

#[async_trait]
impl Session for Tx {
    fn core(&self) -> &Core {
        &self.shared.core
    }

    async fn query(&self, query: &Query) -> Result<Rows> {
        self.ensure_open()?;
        run_query(&self.shared, query).await
    }

    async fn exec(&self, query: &Query) -> Result<ExecResult> {
        self.ensure_open()?;
        run_exec(&self.shared, query).await
    }
}

async fn run_blocking<F, R>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<R>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn).map_err(Error::session)
    })
    .await
    .map_err(Error::session)?
}

async fn run_query(shared: &Shared, query: &Query) -> Result<Rows> {
    let args = to_sqlite_args(&query.args)?;
    let sql = query.sql.clone();
    let start = Instant::now();
    let res = run_blocking(&shared.conn, move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut out = Rows::new(columns);
        let mut rows = stmt.query(params_from_iter(args))?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sqlite(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    })
    .await;
    observe(shared, query, start.elapsed(), &res);
    res
}

async fn run_exec(shared: &Shared, query: &Query) -> Result<ExecResult> {
    let args = to_sqlite_args(&query.args)?;
    let sql = query.sql.clone();
    let start = Instant::now();
    let res = run_blocking(&shared.conn, move |conn| {
        let affected = conn.execute(&sql, params_from_iter(args))?;
        Ok(ExecResult {
            rows_affected: affected as u64,
            last_insert_id: Some(conn.last_insert_rowid()),
        })
    })
    .await;
    observe(shared, query, start.elapsed(), &res);
    res
}

fn observe<T>(shared: &Shared, query: &Query, elapsed: Duration, res: &Result<T>) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match res {
        Ok(_) => tracing::debug!(
            target: "queries",
            sql = %query.sql,
            args = query.args.len(),
            database = query.database.as_deref(),
            elapsed_ms,
            "Executed query"
        ),
        Err(e) => tracing::warn!(
            target: "queries",
            sql = %query.sql,
            database = query.database.as_deref(),
            elapsed_ms,
            error = %e,
            "Query failed"
        ),
    }
    if elapsed >= shared.slow_query_threshold {
        tracing::warn!(
            target: "slow_queries",
            sql = %query.sql,
            elapsed_ms,
            threshold_ms = shared.slow_query_threshold.as_millis() as u64,
            "Slow query"
        );
    }
}
