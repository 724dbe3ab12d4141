//! Cache de lectura delante de otro almacén
//!
//! Los avisos de cambio los emite el almacén interno. Tras cada escritura o
//! borrado se vuelve a avisar con la cache ya actualizada, porque un
//! suscriptor despertado por el primer aviso pudo leer la entrada anterior.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::document_store::{ChangeHub, DocumentStore};
use crate::cache::redis_client::RedisClient;
use crate::cache::CacheOperations;
use crate::utils::errors::AppResult;

const CACHE_PREFIX: &str = "airline_commander:document";

pub struct CachedDocumentStore<C = RedisClient> {
    inner: Arc<dyn DocumentStore>,
    cache: C,
    ttl: u64,
}

impl CachedDocumentStore<RedisClient> {
    pub fn new(inner: Arc<dyn DocumentStore>, redis: RedisClient) -> Self {
        let ttl = redis.default_ttl();
        Self::with_cache(inner, redis, ttl)
    }
}

impl<C: CacheOperations + Send + Sync> CachedDocumentStore<C> {
    pub fn with_cache(inner: Arc<dyn DocumentStore>, cache: C, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }

    fn cache_key(key: &str) -> String {
        format!("{}:{}", CACHE_PREFIX, key)
    }

    async fn invalidate(&self, cache_key: &str) {
        if let Err(e) = self.cache.delete(cache_key).await {
            warn!("⚠️ No se pudo invalidar {}: {}", cache_key, e);
        }
    }
}

#[async_trait]
impl<C: CacheOperations + Send + Sync + 'static> DocumentStore for CachedDocumentStore<C> {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let cache_key = Self::cache_key(key);
        let cached: anyhow::Result<Option<Value>> = self.cache.get(&cache_key).await;
        match cached {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(e) => warn!("⚠️ Documento en cache ilegible {}: {}", cache_key, e),
        }

        let value = self.inner.get(key).await?;
        if let Some(value) = &value {
            if let Err(e) = self.cache.set(&cache_key, value, self.ttl).await {
                warn!("⚠️ No se pudo cachear {}: {}", cache_key, e);
            }
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: Value) -> AppResult<()> {
        let cache_key = Self::cache_key(key);
        self.invalidate(&cache_key).await;
        self.inner.put(key, value.clone()).await?;

        if let Err(e) = self.cache.set(&cache_key, &value, self.ttl).await {
            warn!("⚠️ No se pudo cachear {}: {}", cache_key, e);
            self.invalidate(&cache_key).await;
        }
        self.inner.changes().notify(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let cache_key = Self::cache_key(key);
        self.invalidate(&cache_key).await;
        self.inner.delete(key).await?;

        // una lectura concurrente pudo volver a cachear el documento borrado
        self.invalidate(&cache_key).await;
        self.inner.changes().notify(key);
        Ok(())
    }

    fn changes(&self) -> &ChangeHub {
        self.inner.changes()
    }

    fn backend_name(&self) -> &'static str {
        "redis-cached"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::document_store::{DocumentSnapshot, MemoryDocumentStore};
    use crate::repositories::gateway::PersistenceGateway;
    use futures::StreamExt;
    use serde::{de::DeserializeOwned, Serialize};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Cache en memoria con la misma semántica que Redis
    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CacheOperations for MemoryCache {
        async fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
            let raw = self.entries.lock().unwrap().get(key).cloned();
            match raw {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            }
        }

        async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, _ttl: u64) -> anyhow::Result<()> {
            let raw = serde_json::to_string(value)?;
            self.entries.lock().unwrap().insert(key.to_string(), raw);
            Ok(())
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Almacén que cede el turno después de avisar, como lo haría una base de datos remota
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryDocumentStore,
    }

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn get(&self, key: &str) -> AppResult<Option<Value>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: Value) -> AppResult<()> {
            self.inner.put(key, value).await?;
            settle().await;
            Ok(())
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.inner.delete(key).await?;
            settle().await;
            Ok(())
        }

        fn changes(&self) -> &ChangeHub {
            self.inner.changes()
        }

        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn cached_store() -> Arc<CachedDocumentStore<MemoryCache>> {
        Arc::new(CachedDocumentStore::with_cache(
            Arc::new(SlowStore::default()),
            MemoryCache::default(),
            60,
        ))
    }

    /// Reenviar cada snapshot del stream a un canal
    fn watch(store: Arc<CachedDocumentStore<MemoryCache>>, key: &str) -> mpsc::UnboundedReceiver<DocumentSnapshot> {
        let gateway = PersistenceGateway::new(store, "test-app");
        let mut stream = gateway.subscribe(key);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(Ok(snapshot)) = stream.next().await {
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });
        rx
    }

    async fn last_snapshot(rx: &mut mpsc::UnboundedReceiver<DocumentSnapshot>) -> DocumentSnapshot {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut last = rx.recv().await.expect("al menos un snapshot");
        while let Ok(snapshot) = rx.try_recv() {
            last = snapshot;
        }
        last
    }

    #[tokio::test]
    async fn test_read_through_and_put() {
        let store = cached_store();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", json!({ "list": [] })).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({ "list": [] })));
        assert!(store.cache.entries.lock().unwrap().contains_key("airline_commander:document:k"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_sees_delete_not_cached_document() {
        let store = cached_store();
        store.put("k", json!({ "list": [1] })).await.unwrap();

        let mut rx = watch(store.clone(), "k");
        let first = rx.recv().await.unwrap();
        assert!(first.exists);

        store.delete("k").await.unwrap();
        let last = last_snapshot(&mut rx).await;
        assert!(!last.exists);
        assert!(store.cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_put() {
        let store = cached_store();
        store.put("k", json!({ "list": [1] })).await.unwrap();

        let mut rx = watch(store.clone(), "k");
        rx.recv().await.unwrap();

        store.put("k", json!({ "list": [2] })).await.unwrap();
        let last = last_snapshot(&mut rx).await;
        assert_eq!(last.value, Some(json!({ "list": [2] })));
    }
}
