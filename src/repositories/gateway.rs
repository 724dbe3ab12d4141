//! Gateway de persistencia
//!
//! Única puerta al almacén de documentos: claves por identidad, lectura
//! tipada de los documentos `routes` y `status`, y suscripciones como streams.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};

use super::document_store::{DocumentSnapshot, DocumentStore};
use crate::models::route::{RouteRecord, RoutesDocument};
use crate::models::status::{ActiveStatusMap, StatusDocument};
use crate::utils::errors::{store_error, AppResult};

pub type DocumentStream = BoxStream<'static, AppResult<DocumentSnapshot>>;

#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn DocumentStore>,
    app_id: String,
}

struct Subscription {
    store: Arc<dyn DocumentStore>,
    key: String,
    changes: broadcast::Receiver<()>,
    primed: bool,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn DocumentStore>, app_id: impl Into<String>) -> Self {
        Self {
            store,
            app_id: app_id.into(),
        }
    }

    fn user_key(&self, uid: &str, document: &str) -> String {
        format!("artifacts/{}/users/{}/data/{}", self.app_id, uid, document)
    }

    pub fn routes_key(&self, uid: &str) -> String {
        self.user_key(uid, "routes")
    }

    pub fn status_key(&self, uid: &str) -> String {
        self.user_key(uid, "status")
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Stream del documento: primero el valor actual, luego una lectura
    /// nueva tras cada cambio. Un suscriptor retrasado recibe el último valor.
    pub fn subscribe(&self, key: &str) -> DocumentStream {
        let state = Subscription {
            store: self.store.clone(),
            key: key.to_string(),
            // suscribirse antes de la primera lectura para no perder cambios
            changes: self.store.changes().subscribe(key),
            primed: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.primed {
                match state.changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return None,
                }
            }
            state.primed = true;
            let snapshot = state.store.get(&state.key).await.map(DocumentSnapshot::from);
            Some((snapshot, state))
        })
        .boxed()
    }

    pub async fn put(&self, key: &str, value: Value) -> AppResult<()> {
        self.store
            .put(key, value)
            .await
            .map_err(|e| store_error("put", key, e))
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.store
            .delete(key)
            .await
            .map_err(|e| store_error("delete", key, e))
    }

    pub async fn save_routes(&self, uid: &str, routes: &[RouteRecord]) -> AppResult<()> {
        self.put(&self.routes_key(uid), json!({ "list": routes })).await
    }

    pub async fn save_status(&self, uid: &str, active: &ActiveStatusMap) -> AppResult<()> {
        self.put(&self.status_key(uid), json!({ "active": active })).await
    }

    /// Borrar ambos documentos de la identidad. No es atómico entre documentos.
    pub async fn clear_user(&self, uid: &str) -> AppResult<()> {
        self.delete(&self.routes_key(uid)).await?;
        self.delete(&self.status_key(uid)).await
    }
}

/// Un documento inexistente equivale a un conjunto vacío
pub fn decode_routes(snapshot: &DocumentSnapshot) -> AppResult<Vec<RouteRecord>> {
    match &snapshot.value {
        Some(value) if snapshot.exists => {
            let document: RoutesDocument = serde_json::from_value(value.clone())?;
            Ok(document.list)
        }
        _ => Ok(Vec::new()),
    }
}

pub fn decode_status(snapshot: &DocumentSnapshot) -> AppResult<ActiveStatusMap> {
    match &snapshot.value {
        Some(value) if snapshot.exists => {
            let document: StatusDocument = serde_json::from_value(value.clone())?;
            Ok(document.active)
        }
        _ => Ok(ActiveStatusMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::document_store::MemoryDocumentStore;
    use std::time::Duration;
    use tokio::time::timeout;

    fn gateway() -> PersistenceGateway {
        PersistenceGateway::new(Arc::new(MemoryDocumentStore::new()), "test-app")
    }

    async fn next(stream: &mut DocumentStream) -> DocumentSnapshot {
        timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("snapshot esperado")
            .expect("stream abierto")
            .expect("lectura correcta")
    }

    #[test]
    fn test_keys_are_scoped_per_identity() {
        let gateway = gateway();
        assert_eq!(gateway.routes_key("u1"), "artifacts/test-app/users/u1/data/routes");
        assert_eq!(gateway.status_key("u1"), "artifacts/test-app/users/u1/data/status");
    }

    #[tokio::test]
    async fn test_subscribe_emits_current_then_changes() {
        let gateway = gateway();
        let key = gateway.routes_key("u1");
        let mut stream = gateway.subscribe(&key);

        let first = next(&mut stream).await;
        assert!(!first.exists);
        assert!(decode_routes(&first).unwrap().is_empty());

        let mut route = RouteRecord::with_defaults("1");
        route.name = "Paris".to_string();
        gateway.save_routes("u1", &[route.clone()]).await.unwrap();

        let second = next(&mut stream).await;
        assert!(second.exists);
        assert_eq!(decode_routes(&second).unwrap(), vec![route]);

        gateway.clear_user("u1").await.unwrap();
        let third = next(&mut stream).await;
        assert!(!third.exists);
    }

    #[tokio::test]
    async fn test_status_document_roundtrip() {
        let gateway = gateway();
        let mut active = ActiveStatusMap::new();
        active.insert("1".to_string(), true);
        gateway.save_status("u1", &active).await.unwrap();

        let mut stream = gateway.subscribe(&gateway.status_key("u1"));
        let snapshot = next(&mut stream).await;
        assert_eq!(snapshot.value, Some(json!({ "active": { "1": true } })));
        assert_eq!(decode_status(&snapshot).unwrap(), active);
    }

    #[test]
    fn test_decode_rejects_malformed_document() {
        let snapshot = DocumentSnapshot::from(Some(json!({ "list": "nope" })));
        assert!(decode_routes(&snapshot).is_err());
    }
}
