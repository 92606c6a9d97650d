//! Compilation behavior through the public builder surface.

mod fixtures;

use fixtures::{Article, Category, MockConnection, Order};
use relq::prelude::*;
use relq::EMPTY_UUID;
use std::sync::Arc;

fn db() -> Db<MockConnection> {
    let db = Db::new(MockConnection::new(Dialect::Postgres));
    db.register::<Article>();
    db.register::<Category>();
    db.register::<Order>();
    db
}

#[test]
fn end_to_end_join_filter_sort_limit() {
    let db = db();
    let query = db
        .query::<Article>()
        .unwrap()
        .inner_join::<Category>(Article::CATEGORY_ID.eq_field(Category::ID))
        .filter(Article::TITLE.eq("x"))
        .order_by_desc(Article::ID)
        .limit(0, 10)
        .unwrap();
    let compiled = query.compile().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT T1.\"id\", T1.\"title\", T1.\"category_id\", T1.\"view_count\" \
         FROM \"article\" AS T1 \
         INNER JOIN \"category\" AS T2 ON T1.\"category_id\" = T2.\"id\" \
         WHERE T1.\"deleted\" = FALSE AND T1.\"title\" = $1 \
         ORDER BY T1.\"id\" DESC LIMIT 10 OFFSET 0"
    );
    assert_eq!(compiled.params, vec![Value::Text("x".to_string())]);
}

#[test]
fn copy_branches_are_independent() {
    let db = db();
    let base = db
        .query::<Article>()
        .unwrap()
        .filter(Article::VIEW_COUNT.gt(100i64));

    let branched = base
        .copy()
        .filter(Article::TITLE.eq("x"))
        .order_by(Article::ID);

    let base_sql = base.compile().unwrap();
    let branched_sql = branched.compile().unwrap();

    assert!(!base_sql.sql.contains("title"));
    assert!(!base_sql.sql.contains("ORDER BY"));
    assert_eq!(base_sql.params, vec![Value::BigInt(100)]);
    assert!(branched_sql.sql.contains("T1.\"title\" = $2"));
    assert!(branched_sql.sql.contains("ORDER BY T1.\"id\" ASC"));
}

#[test]
fn order_by_is_last_write_wins() {
    let db = db();
    let query = db
        .query::<Article>()
        .unwrap()
        .order_by(Article::TITLE)
        .order_by_desc(Article::VIEW_COUNT);
    let compiled = query.compile().unwrap();
    assert!(compiled.sql.ends_with("ORDER BY T1.\"view_count\" DESC"));
    assert!(!compiled.sql.contains("\"title\" ASC"));
}

#[test]
fn limit_rejects_non_positive_take() {
    let db = db();
    let err = db.query::<Article>().unwrap().limit(0, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = db.query::<Article>().unwrap().limit(10, -3).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn select_and_select_exclude_conflict() {
    let db = db();
    let err = db
        .query::<Article>()
        .unwrap()
        .select(Selection::of(Article::TITLE))
        .unwrap()
        .select_exclude(Selection::of(Article::VIEW_COUNT))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidProjection(_)));

    let err = db
        .query::<Article>()
        .unwrap()
        .select_exclude(Selection::of(Article::VIEW_COUNT))
        .unwrap()
        .select(Selection::of(Article::TITLE))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidProjection(_)));
}

#[test]
fn filter_not_empty_honors_uuid_sentinel() {
    let db = db();
    let empty = db
        .query::<Article>()
        .unwrap()
        .filter_not_empty(Value::Uuid(EMPTY_UUID.to_string()), Article::TITLE.eq("x"))
        .compile()
        .unwrap();
    assert!(!empty.sql.contains("title"));
    assert!(empty.params.is_empty());

    let real = db
        .query::<Article>()
        .unwrap()
        .filter_not_empty(
            Value::Uuid("8a6e0804-2bd0-4672-b79d-d97027f9071a".to_string()),
            Article::TITLE.eq("x"),
        )
        .compile()
        .unwrap();
    assert!(real.sql.contains("T1.\"title\" = $1"));
    assert_eq!(real.params.len(), 1);
}

#[test]
fn filter_guards() {
    let db = db();
    let compiled = db
        .query::<Article>()
        .unwrap()
        .filter_if(false, Article::TITLE.eq("skipped"))
        .filter_if(true, Article::VIEW_COUNT.gt(1i64))
        .filter_if_else(false, Article::ID.gt(100i64), Article::ID.le(100i64))
        .filter_not_null(None::<String>, Article::TITLE.eq("skipped"))
        .filter_not_null("set", Article::TITLE.ne("draft"))
        .compile()
        .unwrap();
    assert!(!compiled.sql.contains("$4"));
    assert_eq!(
        compiled.params,
        vec![
            Value::BigInt(1),
            Value::BigInt(100),
            Value::Text("draft".to_string()),
        ]
    );
    assert!(compiled.sql.contains("T1.\"id\" <= $2"));
}

#[test]
fn joining_an_unregistered_entity_surfaces_at_compile() {
    let db = Db::new(MockConnection::new(Dialect::Postgres));
    db.register::<Article>();
    let query = db
        .query::<Article>()
        .unwrap()
        .inner_join::<Category>(Article::CATEGORY_ID.eq_field(Category::ID));
    let err = query.compile().unwrap_err();
    assert_eq!(err, Error::UnregisteredEntity { entity: "Category" });
}

#[test]
fn querying_an_unregistered_root_fails_immediately() {
    let db = Db::new(MockConnection::new(Dialect::Postgres));
    let err = db.query::<Article>().unwrap_err();
    assert_eq!(err, Error::UnregisteredEntity { entity: "Article" });
}

#[test]
fn sub_query_embeds_without_touching_outer_filters() {
    let db = db();
    let categories = db
        .query::<Category>()
        .unwrap()
        .filter(Category::NAME.eq("tech"))
        .select(Selection::of(Category::ID))
        .unwrap();

    let compiled = db
        .query::<Article>()
        .unwrap()
        .filter(Article::VIEW_COUNT.gt(10i64))
        .sub_query_in(Article::CATEGORY_ID, &categories)
        .compile()
        .unwrap();

    assert!(compiled.sql.contains(
        "T1.\"category_id\" IN (SELECT T1.\"id\" FROM \"category\" AS T1 WHERE T1.\"name\" = $2)"
    ));
    assert!(compiled.sql.contains("T1.\"view_count\" > $1"));
    assert_eq!(
        compiled.params,
        vec![Value::BigInt(10), Value::Text("tech".to_string())]
    );

    // The embedded builder stays usable and unchanged.
    let sub_compiled = categories.compile().unwrap();
    assert!(!sub_compiled.sql.contains("view_count"));
}

#[test]
fn soft_delete_filter_is_on_by_default_and_can_be_dropped() {
    let db = db();
    let filtered = db.query::<Article>().unwrap().compile().unwrap();
    assert!(filtered.sql.contains("T1.\"deleted\" = FALSE"));

    let unfiltered = db
        .query::<Article>()
        .unwrap()
        .include_deleted()
        .compile()
        .unwrap();
    assert!(!unfiltered.sql.contains("deleted"));
}

#[test]
fn tenant_filter_uses_snapshotted_resolver_value() {
    let db = Db::new(MockConnection::new(Dialect::Postgres))
        .with_tenant_resolver(Arc::new(FixedTenant(Value::BigInt(42))));
    db.register::<Order>();

    let compiled = db.query::<Order>().unwrap().compile().unwrap();
    assert!(compiled.sql.contains("T1.\"tenant_id\" = $1"));
    assert_eq!(compiled.params, vec![Value::BigInt(42)]);

    let all = db.query::<Order>().unwrap().all_tenants().compile().unwrap();
    assert!(!all.sql.contains("tenant_id\" ="));
    assert!(all.params.is_empty());
}

#[test]
fn raw_fragments_are_validated() {
    let db = db();
    let err = db
        .query::<Article>()
        .unwrap()
        .filter_raw("title = 'x'; DROP TABLE article")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = db.query::<Article>().unwrap().order_by_raw("id; --").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let ok = db
        .query::<Article>()
        .unwrap()
        .filter_raw("T1.view_count > 0")
        .unwrap()
        .compile()
        .unwrap();
    assert!(ok.sql.contains("T1.view_count > 0"));
}

#[test]
fn grouping_compiles_keys_aggregates_and_having() {
    let db = db();
    let compiled = db
        .query::<Article>()
        .unwrap()
        .group_by(Selection::of(Article::CATEGORY_ID))
        .agg(Agg::count().as_alias("articles"))
        .agg(Agg::sum(Article::VIEW_COUNT).as_alias("views"))
        .having(Agg::count().gt(5i64))
        .order_by_raw_desc("views")
        .unwrap()
        .compile()
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT T1.\"category_id\" AS \"category_id\", COUNT(*) AS \"articles\", \
         SUM(T1.\"view_count\") AS \"views\" \
         FROM \"article\" AS T1 WHERE T1.\"deleted\" = FALSE \
         GROUP BY T1.\"category_id\" HAVING COUNT(*) > $1 \
         ORDER BY views DESC"
    );
    assert_eq!(compiled.params, vec![Value::BigInt(5)]);
}
