//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos de rutas, estado de uso y
//! parámetros de vista, con la forma exacta de los documentos persistidos.

pub mod route;
pub mod status;
pub mod view;
