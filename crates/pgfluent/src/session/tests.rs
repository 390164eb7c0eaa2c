use super::*;
use crate::args;
use crate::fixtures::{Event, User, user_row};
use crate::memory::{MemoryDriver, MemoryRow};
use crate::scan::{BoxedRecords, Records};

fn session(driver: &MemoryDriver) -> Db<&MemoryDriver> {
    Db::with_config(driver, SessionConfig::new().log_statements(false))
}

#[tokio::test]
async fn scan_records_compiles_model_select() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![user_row(1, "a", "en"), user_row(2, "b", "en")]);
    let mut db = session(&driver);

    let mut users: Vec<User> = Vec::new();
    db.model::<User>()
        .where_sql("lang = ?", args!["en"])
        .order("counter desc")
        .limit(10)
        .offset(5)
        .scan(Records(&mut users))
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT "users"."counter","users"."username","users"."lang","users"."email" FROM "users" WHERE lang = $1 ORDER BY "counter" desc LIMIT 10 OFFSET 5"#
    );
    assert_eq!(driver.executed()[0].params, [r#""en""#]);
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn list_argument_expands_to_numbered_markers() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut names: Vec<String> = Vec::new();
    db.model::<User>()
        .where_sql("counter IN (?)", args![vec![1_i64, 2, 3]])
        .pluck("username", &mut names)
        .await
        .unwrap();

    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT username FROM "users" WHERE counter IN ($1,$2,$3)"#
    );
    assert_eq!(driver.executed()[0].params, ["1", "2", "3"]);
}

#[tokio::test]
async fn markers_are_numbered_across_fragments() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut n = 0_i64;
    db.select("count(*) + ?", args![1_i64])
        .table("users u")
        .joins("JOIN profiles p ON p.counter = u.counter AND p.kind = ?", args!["x"])
        .where_sql("u.lang = ?", args!["en"])
        .where_sql("u.counter > ?", args![5_i64])
        .scan(Scalar(&mut n))
        .await
        .unwrap_err();

    assert_eq!(
        driver.last_sql().unwrap(),
        "SELECT count(*) + $1 FROM users u JOIN profiles p ON p.counter = u.counter AND p.kind = $2 WHERE (u.lang = $3) AND (u.counter > $4)"
    );
}

#[tokio::test]
async fn state_is_cleared_after_success_and_error() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![MemoryRow::new().col("count", 3_i64)]);
    let mut db = session(&driver);

    let mut n = 0_i64;
    db.model::<User>()
        .where_sql("lang = ?", args!["en"])
        .count(&mut n)
        .await
        .unwrap();
    assert_eq!(n, 3);
    assert!(db.state().is_empty());

    driver.push_error("relation does not exist");
    let err = db
        .model::<User>()
        .order("counter")
        .limit(1)
        .count(&mut n)
        .await
        .unwrap_err();
    assert!(!err.is_usage());
    assert!(db.state().is_empty());

    // builder error surfaces at the terminal call and is cleared too
    let err = db
        .model::<User>()
        .where_sql("lang = ? AND x = ?", args!["en"])
        .count(&mut n)
        .await
        .unwrap_err();
    assert!(err.is_usage());
    assert!(db.state().is_empty());
    assert_eq!(driver.executed().len(), 2);

    // next chain starts clean
    driver.push_rows(vec![MemoryRow::new().col("count", 1_i64)]);
    db.table("events").count(&mut n).await.unwrap();
    assert_eq!(driver.last_sql().unwrap(), "SELECT count(*) FROM events");
}

#[tokio::test]
async fn first_found_and_not_found() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![user_row(4, "igor", "en")]);
    let mut db = session(&driver);

    let mut user = User::default();
    db.first(&mut user, 4).await.unwrap();
    assert_eq!(user.username, "igor");
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT "users"."counter","users"."username","users"."lang","users"."email" FROM "users" WHERE "users"."counter" = $1 LIMIT 1"#
    );

    let before = user.clone();
    let err = db.first(&mut user, 99).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(user, before);
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn first_without_primary_key_is_schema_error() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);
    let mut event = Event::default();
    let err = db.first(&mut event, ()).await.unwrap_err();
    assert!(err.is_schema());
    assert!(driver.executed().is_empty());
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn create_reads_back_server_values() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![
        MemoryRow::new()
            .col("counter", 11_i64)
            .col("username", "igor")
            .col("lang", "en")
            .col("email", None::<String>),
    ]);
    let mut db = session(&driver);

    let mut user = User {
        username: "igor".into(),
        cached_rank: 8,
        ..Default::default()
    };
    db.create(&mut user).await.unwrap();

    assert_eq!(
        driver.last_sql().unwrap(),
        r#"INSERT INTO "users" ("username") VALUES ($1) RETURNING "counter","username","lang","email""#
    );
    assert_eq!(user.counter, 11);
    assert_eq!(user.lang, "en");
    assert_eq!(user.cached_rank, 8);
}

#[tokio::test]
async fn create_skipped_by_conflict_leaves_record() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut user = User {
        username: "igor".into(),
        ..Default::default()
    };
    db.on_conflict("(username) DO NOTHING")
        .create(&mut user)
        .await
        .unwrap();
    assert_eq!(user.counter, 0);
    assert!(driver.last_sql().unwrap().contains("ON CONFLICT (username) DO NOTHING"));
}

#[tokio::test]
async fn create_of_blank_record_never_executes() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);
    let err = db.create(&mut User::default()).await.unwrap_err();
    assert!(err.is_usage());
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn updates_by_primary_key() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![user_row(4, "igor", "ru")]);
    let mut db = session(&driver);

    let mut user = User {
        counter: 4,
        lang: "ru".into(),
        ..Default::default()
    };
    let n = db.updates(&mut user).await.unwrap();

    assert_eq!(n, 1);
    assert_eq!(user.username, "igor");
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"UPDATE "users" SET "lang" = $1 WHERE "users"."counter" = $2 RETURNING "counter","username","lang","email""#
    );
}

#[tokio::test]
async fn updates_with_explicit_where() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![user_row(1, "a", "ru"), user_row(2, "b", "ru")]);
    let mut db = session(&driver);

    let mut patch = User {
        lang: "ru".into(),
        ..Default::default()
    };
    let n = db
        .model::<User>()
        .where_sql("lang = ?", args!["en"])
        .updates(&mut patch)
        .await
        .unwrap();
    assert_eq!(n, 2);
    assert_eq!(patch.counter, 1);
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"UPDATE "users" SET "lang" = $1 WHERE lang = $2 RETURNING "counter","username","lang","email""#
    );
}

#[tokio::test]
async fn delete_by_example_and_by_where() {
    let driver = MemoryDriver::new();
    driver.push_affected(1).push_affected(3);
    let mut db = session(&driver);

    let user = User {
        counter: 9,
        username: "ignored".into(),
        ..Default::default()
    };
    assert_eq!(db.delete(&user).await.unwrap(), 1);
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"DELETE FROM "users" WHERE "users"."counter" = $1"#
    );

    let n = db
        .where_sql("counter IN (?)", args![vec![1_i64, 2, 3]])
        .delete(&User::default())
        .await
        .unwrap();
    assert_eq!(n, 3);
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"DELETE FROM "users" WHERE counter IN ($1,$2,$3)"#
    );
}

#[tokio::test]
async fn delete_without_predicate_is_refused() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let err = db.delete(&User::default()).await.unwrap_err();
    assert!(err.is_usage());
    assert!(driver.executed().is_empty());
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn scan_appends_to_sequences() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![user_row(3, "c", "en"), user_row(4, "d", "en")]);
    let mut db = session(&driver);

    let mut users = vec![User::default(), User::default()];
    db.model::<User>().scan(Records(&mut users)).await.unwrap();
    assert_eq!(users.len(), 4);
    assert_eq!(users[3].counter, 4);
}

#[tokio::test]
async fn invalid_destinations_never_execute() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let err = db.model::<User>().scan(()).await.unwrap_err();
    assert!(err.is_usage());
    let mut boxed: Vec<Box<User>> = Vec::new();
    let err = db
        .model::<User>()
        .scan(BoxedRecords(&mut boxed))
        .await
        .unwrap_err();
    assert!(err.is_usage());
    assert!(driver.executed().is_empty());
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn multi_destination_scan() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![
        MemoryRow::new()
            .col("counter", 5_i64)
            .col("username", "igor")
            .col("lang", "en"),
    ]);
    let mut db = session(&driver);

    let (mut counter, mut username, mut lang) = (0_i64, String::new(), String::new());
    db.select("counter, username, lang", args![])
        .model::<User>()
        .where_sql("counter = ?", args![5_i64])
        .scan((&mut counter, &mut username, &mut lang))
        .await
        .unwrap();
    assert_eq!((counter, username.as_str(), lang.as_str()), (5, "igor", "en"));
}

#[tokio::test]
async fn raw_cursor_skips_compilation() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![
        MemoryRow::new().col("counter", 1_i64),
        MemoryRow::new().col("counter", 2_i64),
    ]);
    let mut db = session(&driver);

    let mut counters: Vec<i64> = Vec::new();
    db.raw("SELECT counter FROM users WHERE lang = ? AND counter IN (?)", args!["en", vec![1_i64, 2]])
        .await
        .unwrap()
        .scan(Scalars(&mut counters))
        .await
        .unwrap();

    assert_eq!(counters, [1, 2]);
    assert_eq!(driver.executed().len(), 1);
    assert_eq!(
        driver.last_sql().unwrap(),
        "SELECT counter FROM users WHERE lang = $1 AND counter IN ($2,$3)"
    );
    assert_eq!(driver.open_cursors(), 0);
}

#[tokio::test]
async fn exec_returns_affected_rows() {
    let driver = MemoryDriver::new();
    driver.push_affected(2);
    let mut db = session(&driver);

    let n = db
        .exec("UPDATE users SET lang = ? WHERE counter IN (?)", args!["en", [1_i64, 2]])
        .await
        .unwrap();
    assert_eq!(n, 2);
    assert_eq!(
        driver.last_sql().unwrap(),
        "UPDATE users SET lang = $1 WHERE counter IN ($2,$3)"
    );
}

#[tokio::test]
async fn where_record_without_key_ands_fields() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let example = User {
        username: "igor".into(),
        lang: "en".into(),
        ..Default::default()
    };
    let mut users: Vec<User> = Vec::new();
    db.where_record(&example).scan(Records(&mut users)).await.unwrap();
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT "users"."counter","users"."username","users"."lang","users"."email" FROM "users" WHERE "users"."username" = $1 AND "users"."lang" = $2"#
    );
}

#[tokio::test]
async fn first_with_blank_key_still_filters_by_key() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut user = User {
        username: "igor".into(),
        ..Default::default()
    };
    let before = user.clone();
    let err = db.first(&mut user, 0).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(user, before);
    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT "users"."counter","users"."username","users"."lang","users"."email" FROM "users" WHERE "users"."counter" = $1 LIMIT 1"#
    );
    assert_eq!(driver.executed()[0].params, ["0"]);
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn created_record_reads_back_equal_by_key() {
    let driver = MemoryDriver::new();
    let stored = MemoryRow::new()
        .col("counter", 21_i64)
        .col("username", "igor")
        .col("lang", "en")
        .col("email", Some("igor@example.com"));
    driver.push_rows(vec![stored.clone()]);
    driver.push_rows(vec![stored]);
    let mut db = session(&driver);

    let mut created = User {
        username: "igor".into(),
        email: Some("igor@example.com".into()),
        ..Default::default()
    };
    db.create(&mut created).await.unwrap();
    assert_eq!(created.counter, 21);

    let mut fresh = User::default();
    db.first(&mut fresh, created.counter).await.unwrap();
    assert_eq!(fresh, created);
    assert_eq!(driver.executed()[1].params, ["21"]);
}

#[tokio::test]
async fn exec_discards_unread_raw_rows() {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![MemoryRow::new().col("counter", 1_i64)]);
    driver.push_affected(1);
    let mut db = session(&driver);

    db.raw("SELECT counter FROM users", args![]).await.unwrap();
    assert_eq!(driver.open_cursors(), 1);

    db.exec("DELETE FROM users WHERE counter = ?", args![1_i64])
        .await
        .unwrap();
    assert_eq!(driver.open_cursors(), 0);

    let mut counters: Vec<i64> = Vec::new();
    db.table("users").pluck("counter", &mut counters).await.unwrap();
    assert!(counters.is_empty());
    assert_eq!(driver.last_sql().unwrap(), "SELECT counter FROM users");
}

#[tokio::test]
async fn on_conflict_with_marker_never_executes() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut user = User {
        username: "igor".into(),
        ..Default::default()
    };
    let err = db
        .on_conflict("(username) DO UPDATE SET lang = ?")
        .create(&mut user)
        .await
        .unwrap_err();
    assert!(err.is_usage());
    assert!(driver.executed().is_empty());
    assert!(db.state().is_empty());
}

#[tokio::test]
async fn blank_order_leaves_no_order_clause() {
    let driver = MemoryDriver::new();
    let mut db = session(&driver);

    let mut names: Vec<String> = Vec::new();
    db.model::<User>().order(" ").pluck("username", &mut names).await.unwrap();
    assert_eq!(driver.last_sql().unwrap(), r#"SELECT username FROM "users""#);
}
