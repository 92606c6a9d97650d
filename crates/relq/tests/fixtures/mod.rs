//! Shared test fixtures: a scripted in-memory connection and a small
//! entity model.

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};
use relq::prelude::*;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

/// One scripted result for the next statement the engine issues.
#[derive(Debug, Clone)]
pub enum MockResult {
    Rows(Vec<Row>),
    Scalar(Option<Value>),
    Affected(u64),
    Fail(String),
}

/// A connection that replays scripted results and records every
/// statement it was asked to run.
#[derive(Debug)]
pub struct MockConnection {
    dialect: Dialect,
    script: Mutex<VecDeque<MockResult>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            script: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.script.lock().unwrap().push_back(MockResult::Rows(rows));
    }

    pub fn push_scalar(&self, value: Option<Value>) {
        self.script.lock().unwrap().push_back(MockResult::Scalar(value));
    }

    pub fn push_affected(&self, n: u64) {
        self.script.lock().unwrap().push_back(MockResult::Affected(n));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(MockResult::Fail(message.to_string()));
    }

    /// Every statement issued so far, in order.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    fn record_and_next(&self, sql: String, params: Vec<Value>) -> Option<MockResult> {
        self.log.lock().unwrap().push((sql, params));
        self.script.lock().unwrap().pop_front()
    }
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match self.record_and_next(sql, params) {
                None => Outcome::Ok(Vec::new()),
                Some(MockResult::Rows(rows)) => Outcome::Ok(rows),
                Some(MockResult::Fail(msg)) => Outcome::Err(Error::Connection(msg)),
                Some(other) => Outcome::Err(Error::Connection(format!(
                    "mock: expected rows script entry, got {other:?}"
                ))),
            }
        }
    }

    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match self.record_and_next(sql, params) {
                None => Outcome::Ok(None),
                Some(MockResult::Rows(rows)) => Outcome::Ok(rows.into_iter().next()),
                Some(MockResult::Fail(msg)) => Outcome::Err(Error::Connection(msg)),
                Some(other) => Outcome::Err(Error::Connection(format!(
                    "mock: expected rows script entry, got {other:?}"
                ))),
            }
        }
    }

    fn query_scalar(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Value>, Error>> + Send {
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match self.record_and_next(sql, params) {
                None => Outcome::Ok(None),
                Some(MockResult::Scalar(value)) => Outcome::Ok(value),
                Some(MockResult::Rows(rows)) => {
                    Outcome::Ok(rows.first().map(relq::Row::scalar))
                }
                Some(MockResult::Fail(msg)) => Outcome::Err(Error::Connection(msg)),
                Some(other) => Outcome::Err(Error::Connection(format!(
                    "mock: expected scalar script entry, got {other:?}"
                ))),
            }
        }
    }

    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match self.record_and_next(sql, params) {
                None => Outcome::Ok(0),
                Some(MockResult::Affected(n)) => Outcome::Ok(n),
                Some(MockResult::Fail(msg)) => Outcome::Err(Error::Connection(msg)),
                Some(other) => Outcome::Err(Error::Connection(format!(
                    "mock: expected execute script entry, got {other:?}"
                ))),
            }
        }
    }
}

// ==================== Entities ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub category_id: i64,
    pub view_count: i64,
}

impl FromRow for Article {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Article {
            id: i64::from_value(row.require("id")?.clone())?,
            title: String::from_value(row.require("title")?.clone())?,
            category_id: i64::from_value(row.require("category_id")?.clone())?,
            view_count: i64::from_value(row.require("view_count")?.clone())?,
        })
    }
}

impl Entity for Article {
    const TABLE_NAME: &'static str = "article";

    fn columns() -> &'static [ColumnInfo] {
        static COLUMNS: &[ColumnInfo] = &[
            ColumnInfo::new("id", "id").primary_key(true),
            ColumnInfo::new("title", "title"),
            ColumnInfo::new("category_id", "category_id"),
            ColumnInfo::new("view_count", "view_count"),
            ColumnInfo::new("deleted", "deleted").soft_delete(true),
        ];
        COLUMNS
    }
}

impl Article {
    pub const ID: Field<Article, i64> = Field::new("id");
    pub const TITLE: Field<Article, String> = Field::new("title");
    pub const CATEGORY_ID: Field<Article, i64> = Field::new("category_id");
    pub const VIEW_COUNT: Field<Article, i64> = Field::new("view_count");
}

/// A row shaped like the default Article projection.
pub fn article_row(id: i64, title: &str, category_id: i64, view_count: i64) -> Row {
    Row::from_pairs(vec![
        ("id", Value::BigInt(id)),
        ("title", Value::Text(title.to_string())),
        ("category_id", Value::BigInt(category_id)),
        ("view_count", Value::BigInt(view_count)),
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl FromRow for Category {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Category {
            id: i64::from_value(row.require("id")?.clone())?,
            name: String::from_value(row.require("name")?.clone())?,
        })
    }
}

impl Entity for Category {
    const TABLE_NAME: &'static str = "category";

    fn columns() -> &'static [ColumnInfo] {
        static COLUMNS: &[ColumnInfo] = &[
            ColumnInfo::new("id", "id").primary_key(true),
            ColumnInfo::new("name", "name"),
        ];
        COLUMNS
    }
}

impl Category {
    pub const ID: Field<Category, i64> = Field::new("id");
    pub const NAME: Field<Category, String> = Field::new("name");
}

/// An entity carrying a tenant column, for tenant-filter tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub amount: i64,
}

impl FromRow for Order {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Order {
            id: i64::from_value(row.require("id")?.clone())?,
            amount: i64::from_value(row.require("amount")?.clone())?,
        })
    }
}

impl Entity for Order {
    const TABLE_NAME: &'static str = "orders";

    fn columns() -> &'static [ColumnInfo] {
        static COLUMNS: &[ColumnInfo] = &[
            ColumnInfo::new("id", "id").primary_key(true),
            ColumnInfo::new("amount", "amount"),
            ColumnInfo::new("tenant_id", "tenant_id").tenant(true),
        ];
        COLUMNS
    }
}

impl Order {
    pub const ID: Field<Order, i64> = Field::new("id");
    pub const AMOUNT: Field<Order, i64> = Field::new("amount");
}

// ==================== Harness ====================

/// Run a future on a fresh current-thread runtime.
pub fn run<F: Future>(f: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(f)
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn unwrap_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Ok(v) => panic!("expected error, got {v:?}"),
        Outcome::Err(e) => e,
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}
