//! Almacén de documentos sobre PostgreSQL
//!
//! Cada documento es una fila JSONB. Las escrituras publican la clave en el
//! canal `document_changes` para que las demás instancias refresquen a sus
//! suscriptores.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::document_store::{ChangeHub, DocumentStore};
use crate::utils::errors::AppResult;

const CHANGES_CHANNEL: &str = "document_changes";

pub struct PgDocumentStore {
    pool: PgPool,
    changes: ChangeHub,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            changes: ChangeHub::new(),
        }
    }

    /// Escuchar `document_changes` y reenviar cada clave al `ChangeHub`
    pub async fn start_listener(&self) -> AppResult<JoinHandle<()>> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGES_CHANNEL).await?;
        info!("👂 Escuchando cambios de documentos en '{}'", CHANGES_CHANNEL);

        let changes = self.changes.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        debug!("📣 Cambio recibido para {}", notification.payload());
                        changes.notify(notification.payload());
                    }
                    Err(e) => {
                        warn!("⚠️ Error en el listener de documentos: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }))
    }

    async fn publish(&self, key: &str) -> AppResult<()> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGES_CHANNEL)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let row: Option<(Json<Value>,)> = sqlx::query_as("SELECT value FROM documents WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(Json(value),)| value))
    }

    async fn put(&self, key: &str, value: Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(Json(&value))
        .execute(&self.pool)
        .await?;

        self.changes.notify(key);
        if let Err(e) = self.publish(key).await {
            warn!("⚠️ No se pudo publicar el cambio de {}: {}", key, e);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.changes.notify(key);
            if let Err(e) = self.publish(key).await {
                warn!("⚠️ No se pudo publicar el borrado de {}: {}", key, e);
            }
        }
        Ok(())
    }

    fn changes(&self) -> &ChangeHub {
        &self.changes
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
