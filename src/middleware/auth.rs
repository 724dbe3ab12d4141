//! Autenticación de la sesión
//!
//! Extrae la identidad del header `Authorization: Bearer` y la verifica con
//! el secreto JWT del servicio.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{
    state::AppState,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token},
    },
};

/// Identidad autenticada que se inyecta en los handlers
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub provider: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

        let token = extract_token_from_header(auth_header)?;
        let claims = verify_token(token, state.identity.jwt_config())
            .map_err(|_| AppError::Unauthorized("Token inválido".to_string()))?;

        Ok(Identity {
            uid: claims.sub,
            provider: claims.provider,
        })
    }
}
