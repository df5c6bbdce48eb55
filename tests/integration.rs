//! End-to-end tests against a live postgres server.
//!
//! These are gated behind `#[ignore]` since they need `DATABASE_URL` (or the
//! `PG*` variables `Config::from_env` falls back to) pointing at a running
//! server. Run with `cargo test -- --ignored`.
use pgwire::{Connection, DecodeError, ErrorKind, Row, execute, query};

async fn conn() -> Connection {
    Connection::connect_env().await.expect("connect to DATABASE_URL")
}

#[tokio::test]
#[ignore]
async fn create_insert_select_textual() {
    let mut conn = conn().await;

    execute("DROP TABLE IF EXISTS pgwire_it_post", &mut conn).await.unwrap();
    execute("CREATE TABLE pgwire_it_post(id serial, name text)", &mut conn).await.unwrap();

    execute("INSERT INTO pgwire_it_post(name) VALUES('hello')", &mut conn).await.unwrap();

    let rows = query::<_, _, (i32, String)>("SELECT id,name FROM pgwire_it_post", &mut conn)
        .fetch_all()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, "hello");
}

#[tokio::test]
#[ignore]
async fn parameterized_insert_and_select() {
    let mut conn = conn().await;

    execute("DROP TABLE IF EXISTS pgwire_it_param", &mut conn).await.unwrap();
    execute("CREATE TABLE pgwire_it_param(id int, name text)", &mut conn).await.unwrap();

    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        execute("INSERT INTO pgwire_it_param(id,name) VALUES($1,$2)", &mut conn)
            .bind(id)
            .bind(name)
            .await
            .unwrap();
    }

    let row = query::<_, _, (i32, String)>("SELECT id,name FROM pgwire_it_param WHERE id=$1", &mut conn)
        .bind(2)
        .fetch_one()
        .await
        .unwrap();

    assert_eq!(row, (2, "b".to_owned()));
}

struct Post {
    id: i32,
    name: String,
}

impl pgwire::FromRow for Post {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(Self { id: row.try_get(0)?, name: row.try_get(1)? })
    }
}

#[tokio::test]
#[ignore]
async fn typed_record_mapping() {
    let mut conn = conn().await;

    execute("DROP TABLE IF EXISTS pgwire_it_record", &mut conn).await.unwrap();
    execute("CREATE TABLE pgwire_it_record(id int, name text)", &mut conn).await.unwrap();
    execute("INSERT INTO pgwire_it_record(id,name) VALUES(7,'seven')", &mut conn).await.unwrap();

    let post = query::<_, _, Post>("SELECT id,name FROM pgwire_it_record", &mut conn)
        .fetch_one()
        .await
        .unwrap();

    assert_eq!(post.id, 7);
    assert_eq!(post.name, "seven");
}

#[tokio::test]
#[ignore]
async fn column_reorder_by_name() {
    let mut conn = conn().await;

    let row = query::<_, _, Row>("SELECT 1 AS value, 'x' AS name", &mut conn)
        .fetch_one()
        .await
        .unwrap();

    let by_position: (i32, String) = (row.try_get(0).unwrap(), row.try_get(1).unwrap());
    let by_name: (String, i32) = (row.try_get("name").unwrap(), row.try_get("value").unwrap());

    assert_eq!(by_position, (1, "x".to_owned()));
    assert_eq!(by_name, ("x".to_owned(), 1));
}

#[tokio::test]
#[ignore]
async fn composite_and_array() {
    let mut conn = conn().await;

    let row = query::<_, _, Row>(
        "SELECT ROW('text',ARRAY[1,2,3],100), ARRAY[ROW(1,'str'),ROW(2,'aab')], 'x', 'anotherText'",
        &mut conn,
    )
    .fetch_one()
    .await
    .unwrap();

    let composite: (String, Vec<i32>, i32) = row.try_get(0).unwrap();
    let array_of_composite: Vec<(i32, String)> = row.try_get(1).unwrap();
    let text: String = row.try_get(2).unwrap();
    let another_text: String = row.try_get(3).unwrap();

    assert_eq!(composite, ("text".to_owned(), vec![1, 2, 3], 100));
    assert_eq!(
        array_of_composite,
        vec![(1, "str".to_owned()), (2, "aab".to_owned())]
    );
    assert_eq!(text, "x");
    assert_eq!(another_text, "anotherText");
}

#[tokio::test]
#[ignore]
async fn drop_absent_table_raises_server_error() {
    let mut conn = conn().await;

    let err = execute("DROP TABLE pgwire_it_definitely_absent", &mut conn)
        .await
        .unwrap_err();

    match err.kind() {
        ErrorKind::Database(db) => assert_eq!(db.code, "42P01"),
        other => panic!("expected a database error, got {other:?}"),
    }

    // connection survives the error and is immediately ready for another query
    query::<_, _, (i32,)>("SELECT 1", &mut conn).fetch_one().await.unwrap();
}
