//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::{DocumentStore, PersistenceGateway};
use crate::services::{IdentityService, SessionRegistry};
use crate::utils::jwt::JwtConfig;
use crate::utils::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub gateway: PersistenceGateway,
    pub sessions: SessionRegistry,
    pub identity: IdentityService,
    pub metrics: AppMetrics,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn DocumentStore>, metrics: AppMetrics) -> Self {
        let gateway = PersistenceGateway::new(store, config.app_id.clone());
        let sessions = SessionRegistry::new(gateway.clone(), metrics.clone());
        let identity = IdentityService::new(JwtConfig::from(&config));

        Self {
            config,
            gateway,
            sessions,
            identity,
            metrics,
        }
    }
}
