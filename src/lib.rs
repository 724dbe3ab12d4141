//! Airline Commander
//!
//! Backend del dashboard de rutas aéreas: subida de CSV, vista derivada con
//! búsqueda, filtros, orden y paginación, y estado "en uso" por ruta
//! sincronizado con el almacén de documentos.

pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app_router;
pub use state::AppState;
