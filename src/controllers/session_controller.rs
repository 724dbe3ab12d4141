use log::info;

use crate::dto::common_dto::ApiResponse;
use crate::dto::session_dto::{SessionResponse, SignInRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct SessionController {
    state: AppState,
}

impl SessionController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Emitir el token; el bucle de la identidad arranca con su primera petición
    pub async fn sign_in(&self, request: SignInRequest) -> Result<ApiResponse<SessionResponse>, AppError> {
        let signed_in = self.state.identity.sign_in(request.custom_token.as_deref())?;

        Ok(ApiResponse::success(SessionResponse::new(
            signed_in,
            self.state.gateway.backend_name(),
        )))
    }

    pub async fn sign_out(&self, uid: &str) -> Result<ApiResponse<()>, AppError> {
        let stopped = self.state.sessions.stop(uid).await;
        info!("👋 Sesión cerrada para {} (bucle activo: {})", uid, stopped);
        Ok(ApiResponse::message("Sesión cerrada"))
    }
}
