use log::{error, info};
use validator::Validate;

use crate::dto::common_dto::ApiResponse;
use crate::dto::route_dto::{
    DashboardResponse, RouteListResponse, ToggleResponse, UploadResponse, ViewUpdateRequest,
};
use crate::services::csv_parser::{fingerprint, parse_routes, ParseContext};
use crate::services::session_service::SessionHandle;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, validation_error, AppError};

/// Archivo recibido en una subida
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
    pub origin: Option<String>,
}

pub struct RouteController {
    state: AppState,
}

impl RouteController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn session(&self, uid: &str) -> SessionHandle {
        self.state.sessions.get_or_start(uid).await
    }

    pub async fn dashboard(&self, uid: &str) -> Result<DashboardResponse, AppError> {
        let view = self.session(uid).await.view().await?;
        Ok(DashboardResponse::from(view))
    }

    /// Rutas visibles; los parámetros de la query se guardan en la sesión
    pub async fn list(&self, uid: &str, request: ViewUpdateRequest) -> Result<RouteListResponse, AppError> {
        request.validate()?;
        let session = self.session(uid).await;
        let view = if request.is_empty() {
            session.view().await?
        } else {
            session.update_view(request.into()).await?
        };
        Ok(RouteListResponse::from(view))
    }

    pub async fn update_view(&self, uid: &str, request: ViewUpdateRequest) -> Result<DashboardResponse, AppError> {
        request.validate()?;
        let view = self.session(uid).await.update_view(request.into()).await?;
        Ok(DashboardResponse::from(view))
    }

    pub async fn upload(&self, uid: &str, file: UploadedFile) -> Result<ApiResponse<UploadResponse>, AppError> {
        if !file.file_name.to_lowercase().ends_with(".csv") {
            return Err(validation_error("file", "Solo se aceptan archivos .csv"));
        }

        let text = String::from_utf8_lossy(&file.content);
        let ctx = ParseContext {
            file_name: &file.file_name,
            uploaded_at_millis: chrono::Utc::now().timestamp_millis(),
            origin_override: file.origin.as_deref(),
        };
        let parsed = parse_routes(&text, &ctx);
        let report = parsed.report;

        info!(
            "📄 {} parseado para {}: {} rutas, {} líneas vacías, {} valores por defecto",
            file.file_name, uid, report.rows, report.blank_lines_skipped, report.malformed_values
        );

        if let Err(e) = self.state.gateway.save_routes(uid, &parsed.routes).await {
            error!("❌ Error guardando las rutas de {}: {}", uid, e);
            self.state.metrics.record_failure("save_routes");
            return Err(e);
        }

        self.state.metrics.uploads.inc();
        self.state.metrics.routes_parsed.inc_by(parsed.routes.len() as u64);

        let fingerprint = fingerprint(&parsed.routes);
        self.session(uid).await.apply_routes(parsed.routes).await?;

        let rows = report.rows;
        Ok(ApiResponse::success_with_message(
            UploadResponse {
                file_name: file.file_name,
                report,
                fingerprint,
            },
            format!("{} rutas importadas", rows),
        ))
    }

    pub async fn toggle(&self, uid: &str, route_id: &str) -> Result<ToggleResponse, AppError> {
        let outcome = self.session(uid).await.toggle(route_id).await?;
        Ok(ToggleResponse {
            route_id: outcome.route_id,
            in_use: outcome.in_use,
            active_count: outcome.active_count,
        })
    }

    /// Borrado destructivo de rutas y estado; exige confirmación explícita
    pub async fn clear(&self, uid: &str, confirm: bool) -> Result<ApiResponse<()>, AppError> {
        if !confirm {
            return Err(bad_request_error("Confirmación requerida: use ?confirm=true"));
        }

        self.session(uid).await.clear().await?;
        info!("🗑️ Datos borrados para {}", uid);
        Ok(ApiResponse::message("Datos borrados"))
    }
}
