//! Cache
//!
//! Este módulo contiene el cliente Redis usado como cache de documentos.

pub mod cache_config;
pub mod redis_client;

pub use cache_config::{CacheConfig, CacheOperations};
