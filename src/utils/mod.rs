//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, JWT y métricas.

pub mod errors;
pub mod jwt;
pub mod metrics;
