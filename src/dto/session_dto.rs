use serde::{Deserialize, Serialize};

use crate::services::identity_service::SignedIn;

// Request para iniciar sesión; sin token se crea una identidad anónima
#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    pub custom_token: Option<String>,
}

// Response de sesión iniciada
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub uid: String,
    pub provider: String,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub storage_backend: &'static str,
}

impl SessionResponse {
    pub fn new(signed_in: SignedIn, storage_backend: &'static str) -> Self {
        Self {
            uid: signed_in.uid,
            provider: signed_in.provider,
            token: signed_in.token,
            token_type: "Bearer",
            expires_in: signed_in.expires_in,
            storage_backend,
        }
    }
}
