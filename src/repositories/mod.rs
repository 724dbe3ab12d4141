//! Repositorios
//!
//! Almacenes de documentos y el gateway de persistencia que usa la sesión.

pub mod cached_document_store;
pub mod document_store;
pub mod gateway;
pub mod pg_document_store;

pub use document_store::{ChangeHub, DocumentSnapshot, DocumentStore, MemoryDocumentStore};
pub use gateway::PersistenceGateway;
