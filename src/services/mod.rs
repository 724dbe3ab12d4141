//! Services module
//!
//! Lógica de negocio: parser de CSV, motor de vista derivada, toggle de
//! estado, identidad y la sesión de dashboard que los une.

pub mod csv_parser;
pub mod identity_service;
pub mod session_service;
pub mod status_toggle;
pub mod view_engine;

pub use identity_service::IdentityService;
pub use session_service::{SessionHandle, SessionRegistry, SessionView};
