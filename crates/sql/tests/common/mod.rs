use async_trait::async_trait;
use std::sync::Mutex;
use tessera_sql::{Core, Dialect, ExecResult, Query, Result, Rows, Session};

tessera_sql::entity! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct TestModel {
        pub id: i64,
        pub first_name: String,
        pub age: i8,
        pub last_name: Option<String>,
    }
}

/// Records every statement and replays queued result sets in order.
pub struct RecordingSession {
    core: Core,
    rows: Mutex<Vec<Rows>>,
    seen: Mutex<Vec<Query>>,
}

#[allow(dead_code)]
impl RecordingSession {
    pub fn new(dialect: &'static dyn Dialect) -> Self {
        Self {
            core: Core::new(dialect),
            rows: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push_rows(&self, rows: Rows) {
        self.rows.lock().unwrap().push(rows);
    }

    pub fn seen(&self) -> Vec<Query> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for RecordingSession {
    fn core(&self) -> &Core {
        &self.core
    }

    async fn query(&self, query: &Query) -> Result<Rows> {
        self.seen.lock().unwrap().push(query.clone());
        let mut rows = self.rows.lock().unwrap();
        if rows.is_empty() {
            Ok(Rows::default())
        } else {
            Ok(rows.remove(0))
        }
    }

    async fn exec(&self, query: &Query) -> Result<ExecResult> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }
}

/// Compiled WHERE clause of `SELECT * FROM test_model`.
#[allow(dead_code)]
pub fn where_clause(sess: &RecordingSession, p: tessera_sql::Predicate) -> (String, Vec<tessera_sql::Value>) {
    let q = tessera_sql::Selector::<TestModel>::new(sess)
        .filter(p)
        .build()
        .unwrap();
    let sql = q
        .sql
        .strip_prefix("SELECT * FROM `test_model` WHERE ")
        .and_then(|s| s.strip_suffix(';'))
        .unwrap()
        .to_string();
    (sql, q.args)
}
