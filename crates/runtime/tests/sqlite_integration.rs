use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tessera_common::AppConfig;
use tessera_runtime::{Db, DbOptions, MasterSlaveDb, ShardingDb};
use tessera_sql::{
    assign, col, raw_query, AccessorKind, Deleter, Dst, Error, Inserter, ModelOption, Registry,
    Selector, Session, ShardSet, ShardingRule, ShardingSelector, Updater, Value,
};

tessera_sql::entity! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct TestModel {
        pub id: i64,
        pub first_name: String,
        pub age: i8,
        pub last_name: Option<String>,
    }
}

tessera_sql::entity! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Order {
        pub user_id: u64,
        pub order_id: u64,
        pub content: String,
    }
}

const CREATE_TEST_MODEL: &str = "CREATE TABLE test_model (
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    age INTEGER NOT NULL,
    last_name TEXT
);";

fn person(id: i64, first_name: &str, age: i8, last_name: Option<&str>) -> TestModel {
    TestModel {
        id,
        first_name: first_name.to_string(),
        age,
        last_name: last_name.map(str::to_string),
    }
}

async fn seeded(options: DbOptions) -> Db {
    let db = Db::open(":memory:", options).unwrap();
    db.execute_batch(CREATE_TEST_MODEL).await.unwrap();
    let rows = [
        person(1, "Tom", 18, Some("Jerry")),
        person(2, "Alice", 20, None),
        person(3, "Bob", 30, Some("Builder")),
    ];
    Inserter::<TestModel>::new(&db)
        .values(rows.iter())
        .exec()
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_crud_round_trip() {
    for accessor in [AccessorKind::Reflect, AccessorKind::Offset] {
        let db = seeded(DbOptions {
            accessor,
            ..Default::default()
        })
        .await;

        let tom = Selector::<TestModel>::new(&db)
            .filter(col("id").eq(1))
            .get()
            .await
            .unwrap();
        assert_eq!(tom, person(1, "Tom", 18, Some("Jerry")));

        let adults = Selector::<TestModel>::new(&db)
            .filter(col("age").ge(20))
            .order_by([col("age").desc()])
            .get_multi()
            .await
            .unwrap();
        let names: Vec<_> = adults.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice"]);

        let res = Updater::<TestModel>::new(&db)
            .set([assign("age", 19), assign("last_name", Option::<String>::None)])
            .filter(col("id").eq(1))
            .exec()
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 1);
        let tom = Selector::<TestModel>::new(&db)
            .filter(col("id").eq(1))
            .get()
            .await
            .unwrap();
        assert_eq!(tom.age, 19);
        assert_eq!(tom.last_name, None);

        let res = Deleter::<TestModel>::new(&db)
            .filter(col("id").eq(2).or(col("id").eq(3)))
            .exec()
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 2);
        let count = Selector::<TestModel>::new(&db).get_count().await.unwrap();
        assert_eq!(count, 1);

        let err = Selector::<TestModel>::new(&db)
            .filter(col("id").eq(2))
            .get()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRows));
    }
}

#[tokio::test]
async fn test_aggregates_and_raw() {
    let db = seeded(DbOptions::default()).await;

    let got: Vec<TestModel> = raw_query(
        &db,
        "SELECT * FROM test_model WHERE age > ? ORDER BY id;",
        [18],
    )
    .get_multi()
    .await
    .unwrap();
    assert_eq!(got.len(), 2);

    let q = Selector::<TestModel>::new(&db)
        .select([tessera_sql::avg("age").alias("avg_age")])
        .build()
        .unwrap();
    let mut rows = db.query(&q).await.unwrap();
    assert_eq!(rows.columns(), ["avg_age".to_string()]);
    let avg = rows.next_row().unwrap();
    assert!(matches!(avg[0], Value::Float(v) if (v - 68.0 / 3.0).abs() < 1e-9));
}

#[tokio::test]
async fn test_upsert() {
    let db = seeded(DbOptions::default()).await;
    let tom = person(1, "Thomas", 40, None);
    Inserter::<TestModel>::new(&db)
        .values([&tom])
        .on_duplicate_key()
        .conflict_columns(["id"])
        .update([col("first_name"), col("age")])
        .exec()
        .await
        .unwrap();

    let got = Selector::<TestModel>::new(&db)
        .filter(col("id").eq(1))
        .get()
        .await
        .unwrap();
    assert_eq!(got.first_name, "Thomas");
    assert_eq!(got.age, 40);
    // Not in the update list.
    assert_eq!(got.last_name.as_deref(), Some("Jerry"));
}

#[tokio::test]
async fn test_conversion_error() {
    let db = Db::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE test_model (id INTEGER, first_name TEXT, age INTEGER, last_name TEXT);
         INSERT INTO test_model VALUES (1, 'Tom', 1000, NULL);",
    )
    .await
    .unwrap();
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert!(matches!(err, Error::Conversion { ref column, .. } if column == "age"));
}

#[tokio::test]
async fn test_transactions() {
    let db = seeded(DbOptions::default()).await;

    let tx = db.begin().await.unwrap();
    Updater::<TestModel>::new(&tx)
        .set([assign("age", 50)])
        .filter(col("id").eq(1))
        .exec()
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    let tom = Selector::<TestModel>::new(&db)
        .filter(col("id").eq(1))
        .get()
        .await
        .unwrap();
    assert_eq!(tom.age, 18);

    {
        let tx = db.begin().await.unwrap();
        Deleter::<TestModel>::new(&tx).exec().await.unwrap();
    }
    let count = Selector::<TestModel>::new(&db).get_count().await.unwrap();
    assert_eq!(count, 3, "dropped transaction rolls back");

    let tx = db.begin().await.unwrap();
    Updater::<TestModel>::new(&tx)
        .set([assign("age", 50)])
        .filter(col("id").eq(1))
        .exec()
        .await
        .unwrap();
    tx.commit().await.unwrap();
    let tom = Selector::<TestModel>::new(&db)
        .filter(col("id").eq(1))
        .get()
        .await
        .unwrap();
    assert_eq!(tom.age, 50);
}

#[tokio::test]
async fn test_do_tx() {
    let db = seeded(DbOptions::default()).await;

    let err = db
        .do_tx(|tx| {
            Box::pin(async move {
                Deleter::<TestModel>::new(tx).exec().await?;
                Selector::<TestModel>::new(tx).get().await
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoRows));
    let count = Selector::<TestModel>::new(&db).get_count().await.unwrap();
    assert_eq!(count, 3);

    let deleted = db
        .do_tx(|tx| {
            Box::pin(async move {
                let res = Deleter::<TestModel>::new(tx)
                    .filter(col("id").eq(3))
                    .exec()
                    .await?;
                Ok(res.rows_affected)
            })
        })
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    let count = Selector::<TestModel>::new(&db).get_count().await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_file_database_persists() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();
    {
        let db = Db::open(&path, DbOptions::default()).unwrap();
        db.execute_batch(CREATE_TEST_MODEL).await.unwrap();
        let tom = person(1, "Tom", 18, None);
        Inserter::<TestModel>::new(&db)
            .values([&tom])
            .exec()
            .await
            .unwrap();
    }
    let db = Db::open(&path, DbOptions::default()).unwrap();
    let got = Selector::<TestModel>::new(&db).get_multi().await.unwrap();
    assert_eq!(got, vec![person(1, "Tom", 18, None)]);
}

#[tokio::test]
async fn test_master_slave_routing() {
    let master_file = NamedTempFile::new().unwrap();
    let slave_file = NamedTempFile::new().unwrap();
    let master = Db::open(master_file.path().to_str().unwrap(), DbOptions::default()).unwrap();
    let options = DbOptions::default().with_registry(Arc::clone(master.core().registry()));
    let slave = Db::open(slave_file.path().to_str().unwrap(), options).unwrap();
    for db in [&master, &slave] {
        db.execute_batch(CREATE_TEST_MODEL).await.unwrap();
    }
    let replica_row = person(9, "Replica", 1, None);
    Inserter::<TestModel>::new(&slave)
        .values([&replica_row])
        .exec()
        .await
        .unwrap();

    let group = MasterSlaveDb::new(master.clone(), vec![slave]);
    let written = person(1, "Tom", 18, None);
    Inserter::<TestModel>::new(&group)
        .values([&written])
        .exec()
        .await
        .unwrap();

    let read = Selector::<TestModel>::new(&group).get_multi().await.unwrap();
    assert_eq!(read, vec![replica_row]);
    let on_master = Selector::<TestModel>::new(&master).get_multi().await.unwrap();
    assert_eq!(on_master, vec![written]);
}

fn order_rule() -> ShardingRule {
    ShardingRule::new(["user_id"], |values| {
        let uid = match values.get("user_id") {
            Some(Value::Int(v)) => *v as u64,
            Some(Value::UInt(v)) => *v,
            _ => 0,
        };
        Dst::new(
            format!("order_db_{}", uid / 100),
            format!("order_table_{}", uid % 10),
        )
    })
}

async fn create_shard(sharding: &ShardingDb, db: &str, table: &str, rows: &[(u64, &str)]) {
    let shard = sharding.shard(db).unwrap();
    raw_query::<Order, _, Value>(
        &*shard,
        format!(
            "CREATE TABLE {}.{} (user_id INTEGER, order_id INTEGER, content TEXT);",
            db, table
        ),
        [],
    )
    .exec()
    .await
    .unwrap();
    for (i, (uid, content)) in rows.iter().enumerate() {
        raw_query::<Order, _, Value>(
            &*shard,
            format!("INSERT INTO {}.{} VALUES (?, ?, ?);", db, table),
            [Value::from(*uid), Value::from(i as i64), Value::from(*content)],
        )
        .exec()
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_sharded_select() {
    let registry = Arc::new(Registry::new());
    registry
        .register::<Order>([ModelOption::Sharding(order_rule())])
        .unwrap();
    let options = DbOptions::default().with_registry(Arc::clone(&registry));

    let files: Vec<NamedTempFile> = (0..2).map(|_| NamedTempFile::new().unwrap()).collect();
    let core = tessera_sql::Core::new(&tessera_sql::SQLITE3).with_registry(registry);
    let mut sharding = ShardingDb::new(core);
    for (name, file) in ["order_db_2", "order_db_4"].iter().zip(&files) {
        let db = Db::open(
            file.path().to_str().unwrap(),
            options.clone().attach_as(*name),
        )
        .unwrap();
        sharding = sharding.with_shard(*name, MasterSlaveDb::new(db, vec![]));
    }
    create_shard(&sharding, "order_db_2", "order_table_2", &[(222, "book")]).await;
    let rows = [(435, "pen"), (435, "ink")];
    create_shard(&sharding, "order_db_4", "order_table_5", &rows).await;

    let one = ShardingSelector::<Order>::new(&sharding)
        .filter(col("user_id").eq(222))
        .get()
        .await
        .unwrap();
    assert_eq!(one.content, "book");

    let all = ShardingSelector::<Order>::new(&sharding)
        .filter(col("user_id").eq(222).and(col("user_id").eq(435)))
        .get_multi()
        .await
        .unwrap();
    assert!(all.is_empty(), "no row has both user ids");

    let pens = ShardingSelector::<Order>::new(&sharding)
        .filter(col("user_id").eq(435))
        .order_by([col("order_id").asc()])
        .get_multi()
        .await
        .unwrap();
    let contents: Vec<_> = pens.iter().map(|o| o.content.as_str()).collect();
    assert_eq!(contents, vec!["pen", "ink"]);

    let err = ShardingSelector::<Order>::new(&sharding)
        .filter(col("user_id").eq(11))
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownShard(ref db) if db == "order_db_0"));
}

fn yaml_file() -> NamedTempFile {
    tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap()
}

#[tokio::test]
async fn test_from_config() {
    let mut file = yaml_file();
    writeln!(
        file,
        "database:\n  dialect: sqlite3\n  url: \":memory:\"\n  accessor: reflect\nlogging:\n  slow_query_threshold_ms: 0"
    )
    .unwrap();
    let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
    let db = Db::from_config(&config).unwrap();
    assert_eq!(db.core().accessor(), AccessorKind::Reflect);
    assert_eq!(db.core().dialect().name(), "sqlite3");
    db.execute_batch(CREATE_TEST_MODEL).await.unwrap();
    let count = Selector::<TestModel>::new(&db).get_count().await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_sharding_from_config() {
    let files: Vec<NamedTempFile> = (0..2).map(|_| NamedTempFile::new().unwrap()).collect();
    let mut file = yaml_file();
    writeln!(
        file,
        "sharding:\n  shards:\n    - name: order_db_2\n      master: \"{}\"\n    - name: order_db_4\n      master: \"{}\"",
        files[0].path().display(),
        files[1].path().display(),
    )
    .unwrap();
    let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
    let sharding = ShardingDb::from_config(&config).unwrap();
    sharding
        .core()
        .registry()
        .register::<Order>([ModelOption::Sharding(order_rule())])
        .unwrap();

    create_shard(&sharding, "order_db_4", "order_table_5", &[(435, "pen")]).await;
    let got = ShardingSelector::<Order>::new(&sharding)
        .filter(col("user_id").eq(435))
        .get()
        .await
        .unwrap();
    assert_eq!(got.content, "pen");
    assert!(sharding.shard("order_db_9").is_none());
}
