//! Middleware del sistema
//!
//! Autenticación por token de sesión y CORS.

pub mod auth;
pub mod cors;

pub use auth::Identity;
pub use cors::cors_layer;
