use crate::common::{where_clause, RecordingSession, TestModel};
use std::sync::Arc;
use tessera_sql::{
    assign, col, Error, Inserter, Registry, Rows, Selector, Updater, Value, MYSQL, SQLITE3,
};

#[test]
fn test_equality_compiles_to_placeholder() {
    let sess = RecordingSession::new(&MYSQL);
    let (sql, args) = where_clause(&sess, col("id").eq(18));
    assert_eq!(sql, "`id` = ?");
    assert_eq!(args, vec![Value::Int(18)]);
}

#[test]
fn test_or_parenthesizes_operands() {
    let sess = RecordingSession::new(&MYSQL);
    let (sql, args) = where_clause(&sess, col("id").eq(18).or(col("last_name").eq("hello")));
    assert_eq!(sql, "(`id` = ?) OR (`last_name` = ?)");
    assert_eq!(args, vec![Value::Int(18), Value::from("hello")]);
}

#[test]
fn test_alias_is_dropped_in_filters() {
    let sess = RecordingSession::new(&MYSQL);
    assert_eq!(
        where_clause(&sess, col("id").alias("user_id").eq(18)),
        where_clause(&sess, col("id").eq(18)),
    );
}

#[test]
fn test_limit_then_offset() {
    let sess = RecordingSession::new(&SQLITE3);
    let q = Selector::<TestModel>::new(&sess)
        .limit(10)
        .offset(10)
        .build()
        .unwrap();
    assert!(q.sql.ends_with(" LIMIT 10 OFFSET 10;"), "{}", q.sql);
}

#[test]
fn test_registry_is_cached_and_maps_are_inverse() {
    let registry = Registry::new();
    let a = registry.get::<TestModel>().unwrap();
    let b = registry.get::<TestModel>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    for field in a.fields() {
        let by_column = a.field_by_column(&field.column).unwrap();
        assert_eq!(by_column.name, field.name);
        assert_eq!(a.field(&field.name).unwrap().column, field.column);
    }
}

#[tokio::test]
async fn test_empty_statements_fail() {
    let sess = RecordingSession::new(&MYSQL);
    assert!(matches!(
        Inserter::<TestModel>::new(&sess).exec().await,
        Err(Error::InsertZeroRow)
    ));
    assert!(matches!(
        Updater::<TestModel>::new(&sess).exec().await,
        Err(Error::UpdateNoSet)
    ));
    assert!(matches!(
        Selector::<TestModel>::new(&sess)
            .filter(col("id").eq(1))
            .get()
            .await,
        Err(Error::NoRows)
    ));
    assert_eq!(sess.seen().len(), 1);
}

#[tokio::test]
async fn test_insert_then_read_back() {
    let sess = RecordingSession::new(&SQLITE3);
    let tom = TestModel {
        id: 1,
        first_name: "Tom".to_string(),
        age: 18,
        last_name: None,
    };
    Inserter::<TestModel>::new(&sess)
        .values([&tom])
        .exec()
        .await
        .unwrap();

    let inserted = &sess.seen()[0];
    let mut rows = Rows::new(vec![
        "id".to_string(),
        "first_name".to_string(),
        "age".to_string(),
        "last_name".to_string(),
    ]);
    rows.push(inserted.args.clone());
    sess.push_rows(rows);

    let got = Selector::<TestModel>::new(&sess)
        .filter(col("id").eq(1))
        .get()
        .await
        .unwrap();
    assert_eq!(got, tom);

    Updater::<TestModel>::new(&sess)
        .set([assign("age", 19)])
        .filter(col("id").eq(1))
        .exec()
        .await
        .unwrap();
    assert_eq!(
        sess.seen().last().unwrap().sql,
        "UPDATE `test_model` SET `age` = ? WHERE `id` = ?;"
    );
}
