use crate::db::{Db, DbOptions};
use anyhow::Context;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_common::AppConfig;
use tessera_sql::{Core, ExecResult, Query, Registry, Result, Rows, Session, ShardSet};

/// One logical database: writes go to the master, reads to a random slave
/// (or the master when there are none).
#[derive(Debug, Clone)]
pub struct MasterSlaveDb {
    master: Db,
    slaves: Vec<Db>,
}

impl MasterSlaveDb {
    pub fn new(master: Db, slaves: Vec<Db>) -> Self {
        Self { master, slaves }
    }

    pub fn master(&self) -> &Db {
        &self.master
    }

    fn reader(&self) -> &Db {
        self.slaves
            .choose(&mut rand::rng())
            .unwrap_or(&self.master)
    }
}

#[async_trait]
impl Session for MasterSlaveDb {
    fn core(&self) -> &Core {
        self.master.core()
    }

    async fn query(&self, query: &Query) -> Result<Rows> {
        self.reader().query(query).await
    }

    async fn exec(&self, query: &Query) -> Result<ExecResult> {
        self.master.exec(query).await
    }
}

/// Shard database name to [`MasterSlaveDb`], for
/// [`ShardingSelector`](tessera_sql::ShardingSelector).
#[derive(Debug)]
pub struct ShardingDb {
    core: Core,
    shards: HashMap<String, Arc<MasterSlaveDb>>,
}

impl ShardingDb {
    /// Every shard added later should share `core`'s registry.
    pub fn new(core: Core) -> Self {
        Self {
            core,
            shards: HashMap::new(),
        }
    }

    pub fn with_shard(mut self, name: impl Into<String>, db: MasterSlaveDb) -> Self {
        self.shards.insert(name.into(), Arc::new(db));
        self
    }

    /// Opens every configured shard, attaching each master and slave under
    /// the shard's name so `shard.table` resolves on its connections.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(Registry::new());
        let options = DbOptions::from_config(config)?.with_registry(Arc::clone(&registry));
        let core = Core::new(options.dialect)
            .with_registry(registry)
            .with_accessor(options.accessor);

        let mut sharding = Self::new(core);
        for shard in &config.sharding.shards {
            let attach = options.clone().attach_as(shard.name.clone());
            let master = Db::open(&shard.master, attach.clone())
                .with_context(|| format!("Failed to open master of shard '{}'", shard.name))?;
            let slaves = shard
                .slaves
                .iter()
                .map(|url| {
                    Db::open(url, attach.clone()).with_context(|| {
                        format!("Failed to open slave '{}' of shard '{}'", url, shard.name)
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            tracing::info!(
                target: "sharding",
                shard = %shard.name,
                slaves = slaves.len(),
                "Opened shard"
            );
            sharding = sharding.with_shard(shard.name.clone(), MasterSlaveDb::new(master, slaves));
        }
        Ok(sharding)
    }
}

impl ShardSet for ShardingDb {
    fn core(&self) -> &Core {
        &self.core
    }

    fn shard(&self, db: &str) -> Option<Arc<dyn Session>> {
        self.shards
            .get(db)
            .map(|s| Arc::clone(s) as Arc<dyn Session>)
    }
}
