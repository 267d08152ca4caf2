use portfolio_site::{
    editor::{Confirmation, FormInput, ListEditor},
    models::{Experience, Message},
    schema::init_schema,
    store::{OrderBy, PostgresStore, StoreState, Table, TableStore},
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

// --- Test Context and Setup ---

/// Holds the pool of the database named by DATABASE_URL.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        init_schema(&pool)
            .await
            .expect("Failed to apply the schema.");

        DbTestContext { pool }
    }

    fn store(&self) -> PostgresStore {
        PostgresStore::new(self.pool.clone())
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_postgres_insert_update_delete_roundtrip() {
    let ctx = DbTestContext::setup().await;
    let store = ctx.store();

    let inserted = store
        .insert(
            Table::Certifications,
            json!({ "name": "Rust Basics", "issuer": "Test Org", "url": null }),
        )
        .await
        .unwrap();
    let id = inserted["id"].as_i64().expect("store assigns a numeric id");

    let updated = store
        .update(Table::Certifications, id, json!({ "name": "Rust Advanced" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["name"], "Rust Advanced");
    assert_eq!(updated["issuer"], "Test Org");

    assert!(store.delete(Table::Certifications, id).await.unwrap());
    assert!(!store.delete(Table::Certifications, id).await.unwrap());
    assert!(
        store
            .update(Table::Certifications, id, json!({ "name": "Gone" }))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_postgres_type_column_and_arrays() {
    let ctx = DbTestContext::setup().await;
    let editor = ListEditor::<Experience>::new(Arc::new(ctx.store()) as StoreState);

    let form: FormInput = [
        ("title", "Integration Intern"),
        ("company_name", "Acme"),
        ("period", "2024"),
        ("type", "Internship"),
        ("description", "one\ntwo"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let created = editor.create(&form).await.unwrap();
    assert_eq!(created.kind, "Internship");
    assert_eq!(created.description, vec!["one", "two"]);

    let removed = editor.remove(created.id, Confirmation::Confirmed).await;
    assert!(removed.items.iter().all(|e| e.id != created.id));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_postgres_messages_newest_first() {
    let ctx = DbTestContext::setup().await;
    let store = ctx.store();

    let old = store
        .insert(
            Table::Messages,
            json!({ "name": "Old", "email": "o@x.io", "message": "m", "created_at": "2000-01-01T00:00:00Z" }),
        )
        .await
        .unwrap();
    let editor = ListEditor::<Message>::new(Arc::new(ctx.store()) as StoreState);
    let form: FormInput = [("name", "New"), ("email", "n@x.io"), ("message", "m")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let new = editor.create(&form).await.unwrap();

    let rows = store
        .list(Table::Messages, Some(OrderBy::desc("created_at")))
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
    let pos_new = ids.iter().position(|&id| id == new.id).unwrap();
    let pos_old = ids.iter().position(|&id| Some(id) == old["id"].as_i64()).unwrap();
    assert!(pos_new < pos_old);

    store.delete(Table::Messages, new.id).await.unwrap();
    store
        .delete(Table::Messages, old["id"].as_i64().unwrap())
        .await
        .unwrap();
}
