//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "airline-commander-dev-secret-change-me";

/// Errores al leer la configuración
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Backend de almacenamiento de documentos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(()),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub app_id: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub cache_ttl: u64,
    pub max_concurrent_requests: usize,
    pub max_upload_bytes: usize,
    /// Segundos sin peticiones antes de detener la sesión de una identidad
    pub session_idle_timeout: u64,
}

impl EnvironmentConfig {
    /// Leer la configuración desde las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Construir la configuración a partir de una función de búsqueda
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "production" => return Err(ConfigError::Missing("JWT_SECRET")),
            None => DEV_JWT_SECRET.to_string(),
        };

        let storage_backend = match get("STORAGE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                value,
            })?,
            None => StorageBackend::Memory,
        };

        let database_url = get("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", 3000)?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            app_id: get("APP_ID").unwrap_or_else(|| "default-app-id".to_string()),
            jwt_secret,
            jwt_expiration: parse_or(get("JWT_EXPIRATION"), "JWT_EXPIRATION", 86_400)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            storage_backend,
            database_url,
            redis_url: get("REDIS_URL"),
            cache_ttl: parse_or(get("CACHE_TTL"), "CACHE_TTL", 3600)?,
            max_concurrent_requests: parse_or(get("MAX_CONCURRENT_REQUESTS"), "MAX_CONCURRENT_REQUESTS", 256)?,
            max_upload_bytes: parse_or(get("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            session_idle_timeout: parse_or(get("SESSION_IDLE_TIMEOUT"), "SESSION_IDLE_TIMEOUT", 1800)?,
            environment,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
