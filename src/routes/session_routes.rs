use axum::{
    extract::State,
    routing::post,
    Json, Router,
};

use crate::controllers::session_controller::SessionController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::session_dto::{SessionResponse, SignInRequest};
use crate::middleware::auth::Identity;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_session_router() -> Router<AppState> {
    Router::new().route("/", post(sign_in).delete(sign_out))
}

async fn sign_in(
    State(state): State<AppState>,
    body: Option<Json<SignInRequest>>,
) -> Result<Json<ApiResponse<SessionResponse>>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let controller = SessionController::new(state);
    let response = controller.sign_in(request).await?;
    Ok(Json(response))
}

async fn sign_out(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = SessionController::new(state);
    let response = controller.sign_out(&identity.uid).await?;
    Ok(Json(response))
}
