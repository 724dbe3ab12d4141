use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::controllers::route_controller::{RouteController, UploadedFile};
use crate::dto::common_dto::ApiResponse;
use crate::dto::route_dto::{
    ClearQuery, DashboardResponse, RouteListResponse, ToggleResponse, UploadResponse, ViewUpdateRequest,
};
use crate::middleware::auth::Identity;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppError};

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).delete(clear_routes))
        .route("/upload", post(upload_routes))
        .route("/:id/toggle", post(toggle_route))
}

pub fn create_dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/view", put(update_view))
}

async fn get_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<DashboardResponse>, AppError> {
    let controller = RouteController::new(state);
    let response = controller.dashboard(&identity.uid).await?;
    Ok(Json(response))
}

async fn list_routes(
    State(state): State<AppState>,
    identity: Identity,
    Query(request): Query<ViewUpdateRequest>,
) -> Result<Json<RouteListResponse>, AppError> {
    let controller = RouteController::new(state);
    let response = controller.list(&identity.uid, request).await?;
    Ok(Json(response))
}

async fn update_view(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<ViewUpdateRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let controller = RouteController::new(state);
    let response = controller.update_view(&identity.uid, request).await?;
    Ok(Json(response))
}

async fn upload_routes(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut origin: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("Multipart inválido: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request_error(&format!("No se pudo leer el archivo: {}", e)))?;
                file = Some((file_name, content.to_vec()));
            }
            Some("origin") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request_error(&format!("Campo origin inválido: {}", e)))?;
                origin = Some(value);
            }
            _ => {}
        }
    }

    let (file_name, content) = file.ok_or_else(|| bad_request_error("Falta el campo 'file'"))?;
    let controller = RouteController::new(state);
    let response = controller
        .upload(
            &identity.uid,
            UploadedFile {
                file_name,
                content,
                origin,
            },
        )
        .await?;
    Ok(Json(response))
}

async fn toggle_route(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, AppError> {
    let controller = RouteController::new(state);
    let response = controller.toggle(&identity.uid, &id).await?;
    Ok(Json(response))
}

async fn clear_routes(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = RouteController::new(state);
    let response = controller.clear(&identity.uid, query.confirm).await?;
    Ok(Json(response))
}
