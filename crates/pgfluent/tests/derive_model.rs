use pgfluent::memory::{MemoryDriver, MemoryRow};
use pgfluent::{Db, Model, OrmResult, Records, SessionConfig, args};

#[derive(Debug, Default, Clone, PartialEq, Model)]
#[orm(table = "audits")]
struct Audit {
    created_by: String,
    #[orm(column = "note_text")]
    note: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Model)]
#[orm(table = "posts")]
struct Post {
    #[orm(id)]
    counter: i64,
    title: String,
    #[orm(column = "body_text")]
    body: String,
    r#type: String,
    #[orm(skip)]
    comments: Vec<String>,
    #[orm(flatten)]
    audit: Audit,
}

fn session(driver: &MemoryDriver) -> Db<&MemoryDriver> {
    Db::with_config(driver, SessionConfig::new().log_statements(false))
}

fn post_row(counter: i64, title: &str) -> MemoryRow {
    MemoryRow::new()
        .col("counter", counter)
        .col("title", title)
        .col("body_text", "body")
        .col("type", "article")
        .col("created_by", "igor")
        .col("note_text", Some("first"))
}

#[test]
fn derived_descriptor_follows_field_order() {
    let desc = Post::describe();
    assert_eq!(desc.table(), "posts");

    let columns: Vec<_> = desc.columns().iter().map(|c| c.column).collect();
    assert_eq!(
        columns,
        ["counter", "title", "body_text", "type", "created_by", "note_text"]
    );
    assert_eq!(desc.primary_key().map(|c| c.column), Some("counter"));
    assert_eq!(desc.ignored(), ["comments"]);
    assert!(std::ptr::eq(desc, Post::describe()));
}

#[test]
fn model_without_id_has_no_key() {
    assert!(Audit::describe().primary_key().is_none());
    let mut audit = Audit::default();
    assert!(audit.set_key(()).unwrap_err().is_schema());
}

#[test]
fn values_flag_blank_fields() {
    let post = Post {
        title: "hello".into(),
        audit: Audit {
            created_by: "igor".into(),
            note: None,
        },
        ..Default::default()
    };
    let blanks: Vec<_> = post.values().iter().map(|v| v.blank).collect();
    assert_eq!(blanks, [true, false, true, true, false, true]);
}

#[tokio::test]
async fn first_reads_flattened_columns_and_keeps_skipped_field() -> OrmResult<()> {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![post_row(7, "hello")]);
    let mut db = session(&driver);

    let mut post = Post {
        comments: vec!["kept".into()],
        ..Default::default()
    };
    db.first(&mut post, 7).await?;

    assert_eq!(
        driver.last_sql().unwrap(),
        r#"SELECT "posts"."counter","posts"."title","posts"."body_text","posts"."type","posts"."created_by","posts"."note_text" FROM "posts" WHERE "posts"."counter" = $1 LIMIT 1"#
    );
    assert_eq!(post.counter, 7);
    assert_eq!(post.r#type, "article");
    assert_eq!(post.audit.note.as_deref(), Some("first"));
    assert_eq!(post.comments, ["kept"]);
    Ok(())
}

#[tokio::test]
async fn create_omits_blank_and_key_columns() -> OrmResult<()> {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![post_row(1, "hello")]);
    let mut db = session(&driver);

    let mut post = Post {
        counter: 99,
        title: "hello".into(),
        audit: Audit {
            created_by: "igor".into(),
            note: None,
        },
        ..Default::default()
    };
    db.create(&mut post).await?;

    assert_eq!(
        driver.last_sql().unwrap(),
        r#"INSERT INTO "posts" ("title","created_by") VALUES ($1,$2) RETURNING "counter","title","body_text","type","created_by","note_text""#
    );
    assert_eq!(post.counter, 1);
    assert_eq!(post.body, "body");
    Ok(())
}

#[tokio::test]
async fn scan_appends_derived_records() -> OrmResult<()> {
    let driver = MemoryDriver::new();
    driver.push_rows(vec![post_row(2, "b"), post_row(3, "c")]);
    let mut db = session(&driver);

    let mut posts = vec![Post::default()];
    db.model::<Post>()
        .where_sql("counter IN (?)", args![vec![2_i64, 3]])
        .scan(Records(&mut posts))
        .await?;

    assert_eq!(posts.len(), 3);
    assert_eq!(posts[1].title, "b");
    assert_eq!(posts[2].counter, 3);
    assert!(posts[2].comments.is_empty());
    Ok(())
}
