//! Almacén de documentos clave-valor
//!
//! Contrato mínimo del almacén: lectura, reemplazo completo y borrado de un
//! documento JSON, más un `ChangeHub` que avisa a los suscriptores de cada
//! clave cuando su documento cambia.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::utils::errors::AppResult;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Estado de un documento en un momento dado
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSnapshot {
    pub exists: bool,
    pub value: Option<Value>,
}

impl From<Option<Value>> for DocumentSnapshot {
    fn from(value: Option<Value>) -> Self {
        Self {
            exists: value.is_some(),
            value,
        }
    }
}

/// Difusión de cambios por clave
#[derive(Clone, Default)]
pub struct ChangeHub {
    senders: Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, key: &str) -> broadcast::Receiver<()> {
        let mut senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // canales cuyos suscriptores ya no existen
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Avisar a los suscriptores de `key`; sin suscriptores se libera el canal
    pub fn notify(&self, key: &str) {
        let mut senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = senders.get(key) {
            if sender.send(()).is_err() {
                senders.remove(key);
            }
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, key: &str) -> usize {
        let senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.get(key).map_or(0, |sender| sender.receiver_count())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;

    /// Reemplazo completo del documento
    async fn put(&self, key: &str, value: Value) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    fn changes(&self) -> &ChangeHub;

    fn backend_name(&self) -> &'static str;
}

/// Almacén en memoria para un solo nodo y para tests
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
    changes: ChangeHub,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> AppResult<()> {
        self.documents.write().await.insert(key.to_string(), value);
        self.changes.notify(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let removed = self.documents.write().await.remove(key);
        if removed.is_some() {
            self.changes.notify(key);
        }
        Ok(())
    }

    fn changes(&self) -> &ChangeHub {
        &self.changes
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_put_get_delete() {
        let store = MemoryDocumentStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.put("k", json!({"list": []})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"list": []})));

        store.put("k", json!({"list": [1]})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"list": [1]})));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_change_hub_notifies_only_matching_key() {
        let store = MemoryDocumentStore::new();
        let mut routes = store.changes().subscribe("routes");
        let mut status = store.changes().subscribe("status");

        store.put("routes", json!({})).await.unwrap();

        assert!(routes.try_recv().is_ok());
        assert!(status.try_recv().is_err());
        assert_eq!(store.changes().subscriber_count("routes"), 1);
    }

    #[test]
    fn test_change_hub_drops_channels_without_subscribers() {
        let hub = ChangeHub::new();
        let first = hub.subscribe("old");
        drop(first);

        let _current = hub.subscribe("new");
        assert_eq!(hub.subscriber_count("old"), 0);
        assert_eq!(hub.senders.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_from_option() {
        assert_eq!(
            DocumentSnapshot::from(None),
            DocumentSnapshot {
                exists: false,
                value: None
            }
        );
        assert!(DocumentSnapshot::from(Some(json!({}))).exists);
    }
}
