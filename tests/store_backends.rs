//! Almacenes contra servicios reales.
//!
//! Necesitan `TEST_DATABASE_URL` y, para la cache, `TEST_REDIS_URL`:
//!
//! ```text
//! TEST_DATABASE_URL=postgres://... TEST_REDIS_URL=redis://localhost:6379 cargo test --test store_backends -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use airline_commander::cache::redis_client::RedisClient;
use airline_commander::cache::CacheConfig;
use airline_commander::database::DatabaseConnection;
use airline_commander::repositories::cached_document_store::CachedDocumentStore;
use airline_commander::repositories::gateway::DocumentStream;
use airline_commander::repositories::pg_document_store::PgDocumentStore;
use airline_commander::repositories::{DocumentSnapshot, DocumentStore, PersistenceGateway};
use futures::StreamExt;
use serde_json::json;
use tokio::time::timeout;
use uuid::Uuid;

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{} no definido", name))
}

async fn pg_store() -> PgDocumentStore {
    let connection = DatabaseConnection::connect(&env("TEST_DATABASE_URL")).await.unwrap();
    PgDocumentStore::new(connection.pool().clone())
}

async fn redis_client() -> RedisClient {
    RedisClient::new(CacheConfig {
        redis_url: env("TEST_REDIS_URL"),
        default_ttl: 60,
    })
    .await
    .unwrap()
}

fn unique_key() -> String {
    format!("artifacts/test/users/{}/data/routes", Uuid::new_v4())
}

async fn next(stream: &mut DocumentStream) -> DocumentSnapshot {
    timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("snapshot esperado")
        .expect("stream abierto")
        .expect("lectura correcta")
}

/// Último snapshot emitido tras dejar asentar los avisos
async fn settled(stream: &mut DocumentStream) -> DocumentSnapshot {
    let mut last = next(stream).await;
    while let Ok(Some(snapshot)) = timeout(Duration::from_millis(300), stream.next()).await {
        last = snapshot.unwrap();
    }
    last
}

#[tokio::test]
#[ignore]
async fn test_pg_put_get_delete() {
    let store = pg_store().await;
    let key = unique_key();

    assert_eq!(store.get(&key).await.unwrap(), None);
    store.put(&key, json!({ "list": [] })).await.unwrap();
    store.put(&key, json!({ "list": [1] })).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(json!({ "list": [1] })));

    store.delete(&key).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), None);
    // borrar algo inexistente no es un error
    store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_pg_listener_reaches_other_instance() {
    let writer = pg_store().await;
    let reader = Arc::new(pg_store().await);
    let listener = reader.start_listener().await.unwrap();

    let key = unique_key();
    let gateway = PersistenceGateway::new(reader.clone(), "test");
    let mut stream = gateway.subscribe(&key);
    assert!(!next(&mut stream).await.exists);

    writer.put(&key, json!({ "list": [] })).await.unwrap();
    assert!(settled(&mut stream).await.exists);

    writer.delete(&key).await.unwrap();
    assert!(!settled(&mut stream).await.exists);

    listener.abort();
}

#[tokio::test]
#[ignore]
async fn test_redis_cache_over_pg_reports_delete() {
    let inner: Arc<dyn DocumentStore> = Arc::new(pg_store().await);
    let store = Arc::new(CachedDocumentStore::new(inner, redis_client().await));
    let key = unique_key();

    store.put(&key, json!({ "list": [1] })).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(json!({ "list": [1] })));

    let gateway = PersistenceGateway::new(store.clone(), "test");
    let mut stream = gateway.subscribe(&key);
    assert!(next(&mut stream).await.exists);

    store.put(&key, json!({ "list": [2] })).await.unwrap();
    assert_eq!(settled(&mut stream).await.value, Some(json!({ "list": [2] })));

    store.delete(&key).await.unwrap();
    assert!(!settled(&mut stream).await.exists);
    assert_eq!(store.get(&key).await.unwrap(), None);
}
