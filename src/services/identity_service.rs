//! Servicio de identidad
//!
//! Inicio de sesión anónimo o con un token personalizado emitido por otro
//! servicio con el mismo secreto. En ambos casos se emite un token de sesión.

use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::utils::errors::AppError;
use crate::utils::jwt::{generate_token, verify_token, JwtConfig};

pub const PROVIDER_ANONYMOUS: &str = "anonymous";
pub const PROVIDER_CUSTOM: &str = "custom";

/// Identidad con sesión iniciada
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub uid: String,
    pub provider: String,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct IdentityService {
    jwt: JwtConfig,
}

impl IdentityService {
    pub fn new(jwt: JwtConfig) -> Self {
        Self { jwt }
    }

    pub fn sign_in(&self, custom_token: Option<&str>) -> Result<SignedIn, AppError> {
        match custom_token.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => self.sign_in_with_custom_token(token),
            None => self.sign_in_anonymously(),
        }
    }

    pub fn sign_in_anonymously(&self) -> Result<SignedIn, AppError> {
        let uid = Uuid::new_v4().to_string();
        info!("👤 Sesión anónima creada: {}", uid);
        self.issue(uid, PROVIDER_ANONYMOUS)
    }

    /// El token personalizado fija el uid, así un cliente recupera sus datos
    pub fn sign_in_with_custom_token(&self, custom_token: &str) -> Result<SignedIn, AppError> {
        let claims = verify_token(custom_token, &self.jwt).map_err(|e| {
            warn!("🚫 Token personalizado rechazado: {}", e);
            AppError::Unauthorized("Token personalizado inválido".to_string())
        })?;

        info!("🔑 Sesión con token personalizado: {}", claims.sub);
        self.issue(claims.sub, PROVIDER_CUSTOM)
    }

    fn issue(&self, uid: String, provider: &str) -> Result<SignedIn, AppError> {
        let token = generate_token(&uid, provider, &self.jwt)?;
        Ok(SignedIn {
            uid,
            provider: provider.to_string(),
            token,
            expires_in: self.jwt.expiration,
        })
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        IdentityService::new(JwtConfig {
            secret: "test-secret".to_string(),
            expiration: 60,
        })
    }

    #[test]
    fn test_anonymous_sign_in_issues_verifiable_token() {
        let service = service();
        let signed_in = service.sign_in(None).unwrap();
        assert_eq!(signed_in.provider, PROVIDER_ANONYMOUS);
        assert!(Uuid::parse_str(&signed_in.uid).is_ok());

        let claims = verify_token(&signed_in.token, service.jwt_config()).unwrap();
        assert_eq!(claims.sub, signed_in.uid);
    }

    #[test]
    fn test_blank_custom_token_falls_back_to_anonymous() {
        let signed_in = service().sign_in(Some("  ")).unwrap();
        assert_eq!(signed_in.provider, PROVIDER_ANONYMOUS);
    }

    #[test]
    fn test_custom_token_keeps_uid() {
        let service = service();
        let custom = generate_token("pilot-42", "external", service.jwt_config()).unwrap();
        let signed_in = service.sign_in(Some(&custom)).unwrap();
        assert_eq!(signed_in.uid, "pilot-42");
        assert_eq!(signed_in.provider, PROVIDER_CUSTOM);
    }

    #[test]
    fn test_invalid_custom_token_is_unauthorized() {
        let result = service().sign_in(Some("not-a-jwt"));
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
