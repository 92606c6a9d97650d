//! Pagination metadata, unit-of-work routing, and grouped reads.

mod fixtures;

use fixtures::{Article, MockConnection, article_row, run, unwrap_outcome};
use asupersync::Cx;
use relq::prelude::*;

fn db() -> Db<MockConnection> {
    let db = Db::new(MockConnection::new(Dialect::Postgres));
    db.register::<Article>();
    db
}

#[test]
fn pagination_runs_count_then_page_query() {
    let cx = Cx::for_testing();
    let db = db();
    db.connection().push_scalar(Some(Value::BigInt(18)));
    db.connection().push_rows(vec![
        article_row(1, "a", 1, 10),
        article_row(2, "b", 1, 20),
    ]);

    run(async {
        let page = unwrap_outcome(
            db.query::<Article>()
                .unwrap()
                .order_by_desc(Article::ID)
                .to_pagination(&cx, &Pagination::new(3, 10))
                .await,
        );

        assert_eq!(page.total, 18);
        assert_eq!(page.page, 3);
        assert_eq!(page.size, 10);
        assert_eq!(page.items.len(), 2);

        let statements = db.connection().statements();
        assert_eq!(statements.len(), 2);
        // The count ignores sort and limit.
        assert!(statements[0].0.starts_with("SELECT COUNT(*) FROM"));
        assert!(!statements[0].0.contains("ORDER BY"));
        assert!(!statements[0].0.contains("LIMIT"));
        // The page query selects rows 21-30.
        assert!(statements[1].0.ends_with("ORDER BY T1.\"id\" DESC LIMIT 10 OFFSET 20"));
    });
}

#[test]
fn pagination_total_override_skips_the_count_query() {
    let cx = Cx::for_testing();
    let db = db();
    db.connection().push_rows(vec![article_row(1, "a", 1, 10)]);

    run(async {
        let page = unwrap_outcome(
            db.query::<Article>()
                .unwrap()
                .to_pagination(&cx, &Pagination::new(1, 15).with_total(99))
                .await,
        );
        assert_eq!(page.total, 99);
        assert_eq!(db.connection().statements().len(), 1);
    });
}

#[test]
fn pagination_defaults_to_first_page_of_fifteen() {
    let cx = Cx::for_testing();
    let db = db();
    db.connection().push_scalar(Some(Value::BigInt(0)));
    run(async {
        let page = unwrap_outcome(
            db.query::<Article>()
                .unwrap()
                .to_pagination(&cx, &Pagination::default())
                .await,
        );
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
        let statements = db.connection().statements();
        assert!(statements[1].0.ends_with("LIMIT 15 OFFSET 0"));
    });
}

#[test]
fn unit_of_work_routes_every_read_through_its_connection() {
    let cx = Cx::for_testing();
    let db = db();

    run(async {
        let mut uow = db.unit_of_work();
        unwrap_outcome(uow.begin(&cx).await);
        assert!(uow.is_active());

        let _ = unwrap_outcome(
            db.query::<Article>()
                .unwrap()
                .filter(Article::ID.gt(0i64))
                .use_uow(&uow)
                .to_list(&cx)
                .await,
        );

        unwrap_outcome(uow.commit(&cx).await);
        assert!(!uow.is_active());

        let statements = db.connection().statements();
        assert_eq!(statements[0].0, "BEGIN");
        assert!(statements[1].0.starts_with("SELECT"));
        assert_eq!(statements[2].0, "COMMIT");
    });
}

#[test]
fn commit_without_begin_is_an_error() {
    let cx = Cx::for_testing();
    let db = db();
    run(async {
        let mut uow = db.unit_of_work();
        match uow.commit(&cx).await {
            Outcome::Err(Error::InvalidArgument(_)) => {}
            other => panic!("expected invalid-argument outcome, got {other:?}"),
        }
    });
}

#[test]
fn rollback_closes_the_transaction() {
    let cx = Cx::for_testing();
    let db = db();
    run(async {
        let mut uow = db.unit_of_work();
        unwrap_outcome(uow.begin(&cx).await);
        unwrap_outcome(uow.rollback(&cx).await);
        assert!(!uow.is_active());
        let statements = db.connection().statements();
        assert_eq!(statements[0].0, "BEGIN");
        assert_eq!(statements[1].0, "ROLLBACK");
    });
}

#[test]
fn grouped_read_returns_rows() {
    let cx = Cx::for_testing();
    let db = db();
    db.connection().push_rows(vec![Row::from_pairs(vec![
        ("category_id", Value::BigInt(2)),
        ("articles", Value::BigInt(7)),
    ])]);

    run(async {
        let rows = unwrap_outcome(
            db.query::<Article>()
                .unwrap()
                .group_by(Selection::of(Article::CATEGORY_ID))
                .agg(Agg::count().as_alias("articles"))
                .having(Agg::count().gt(5i64))
                .to_rows(&cx)
                .await,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("articles"), Some(&Value::BigInt(7)));

        let (sql, params) = &db.connection().statements()[0];
        assert!(sql.contains("GROUP BY T1.\"category_id\""));
        assert!(sql.contains("HAVING COUNT(*) > $1"));
        assert_eq!(params, &vec![Value::BigInt(5)]);
    });
}
