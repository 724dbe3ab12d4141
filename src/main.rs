use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use airline_commander::cache::redis_client::RedisClient;
use airline_commander::cache::CacheConfig;
use airline_commander::config::environment::{EnvironmentConfig, StorageBackend};
use airline_commander::database::DatabaseConnection;
use airline_commander::repositories::cached_document_store::CachedDocumentStore;
use airline_commander::repositories::pg_document_store::PgDocumentStore;
use airline_commander::repositories::{DocumentStore, MemoryDocumentStore};
use airline_commander::utils::metrics::AppMetrics;
use airline_commander::{create_app_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("✈️ Airline Commander - Dashboard de rutas");
    info!("=========================================");

    let config = EnvironmentConfig::from_env().context("Configuración inválida")?;
    info!("🌍 Entorno: {}", config.environment);

    let (store, listener) = create_store(&config).await?;
    let metrics = AppMetrics::new().context("Error creando el registro de métricas")?;
    let state = AppState::new(config.clone(), store, metrics);
    let sessions = state.sessions.clone();
    let sweeper = sessions.spawn_idle_sweeper(Duration::from_secs(config.session_idle_timeout));

    let app = create_app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Dirección inválida {}:{}", config.host, config.port))?;

    info!("🌐 Servidor iniciando en {}", config.server_url());
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Estado del servicio");
    info!("   GET    /metrics - Métricas Prometheus");
    info!("   POST   /api/session - Iniciar sesión");
    info!("   DELETE /api/session - Cerrar sesión");
    info!("   GET    /api/dashboard - Dashboard completo");
    info!("   GET    /api/routes - Rutas visibles");
    info!("   POST   /api/routes/upload - Subir CSV");
    info!("   DELETE /api/routes?confirm=true - Borrar datos");
    info!("   POST   /api/routes/:id/toggle - Cambiar estado en uso");
    info!("   PUT    /api/view - Parámetros de vista");

    let tcp_listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(tcp_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    sweeper.abort();
    sessions.stop_all().await;
    if let Some(listener) = listener {
        listener.abort();
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Elegir el almacén de documentos según la configuración
async fn create_store(config: &EnvironmentConfig) -> Result<(Arc<dyn DocumentStore>, Option<JoinHandle<()>>)> {
    let (store, listener): (Arc<dyn DocumentStore>, Option<JoinHandle<()>>) = match config.storage_backend {
        StorageBackend::Memory => {
            warn!("🧠 Almacén en memoria: los datos se pierden al reiniciar");
            (Arc::new(MemoryDocumentStore::new()), None)
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL requerido para el almacén postgres")?;
            let connection = DatabaseConnection::connect(url).await?;
            let store = PgDocumentStore::new(connection.pool().clone());
            let listener = store.start_listener().await?;
            (Arc::new(store), Some(listener))
        }
    };

    let Some(redis_url) = config.redis_url.clone() else {
        return Ok((store, listener));
    };

    let cache_config = CacheConfig {
        redis_url,
        default_ttl: config.cache_ttl,
    };
    match RedisClient::new(cache_config).await {
        Ok(redis) => {
            info!("⚡ Cache Redis activada (TTL {}s)", config.cache_ttl);
            let cached = CachedDocumentStore::new(store, redis);
            Ok((Arc::new(cached), listener))
        }
        Err(e) => {
            warn!("⚠️ Redis no disponible, se sigue sin cache: {}", e);
            Ok((store, listener))
        }
    }
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
