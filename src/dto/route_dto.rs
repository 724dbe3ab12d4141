use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::route::RouteRecord;
use crate::models::view::{selection, PageInfo, SortKey, StatusFilter, ViewParams, ViewStats, ViewUpdate, VisibleRoute};
use crate::services::csv_parser::ParseReport;
use crate::services::session_service::SessionView;

// Request para cambiar los parámetros de vista (body de PUT o query de GET)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ViewUpdateRequest {
    #[validate(length(max = 200))]
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub status: Option<StatusFilter>,
    /// "all" o una aeronave exacta
    pub aircraft: Option<String>,
    /// "all" o un origen exacto
    pub origin: Option<String>,
    #[validate(range(max = 1000))]
    pub page_size: Option<usize>,
    #[validate(range(min = 1))]
    pub page: Option<usize>,
}

impl ViewUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.sort.is_none()
            && self.status.is_none()
            && self.aircraft.is_none()
            && self.origin.is_none()
            && self.page_size.is_none()
            && self.page.is_none()
    }
}

impl From<ViewUpdateRequest> for ViewUpdate {
    fn from(request: ViewUpdateRequest) -> Self {
        Self {
            search: request.search,
            sort: request.sort,
            status: request.status,
            aircraft: request.aircraft.as_deref().map(selection),
            origin: request.origin.as_deref().map(selection),
            page_size: request.page_size,
            page: request.page,
        }
    }
}

// Query del borrado de datos
#[derive(Debug, Default, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub confirm: bool,
}

// Tarjeta de ruta lista para pintar
#[derive(Debug, Serialize)]
pub struct RouteCard {
    #[serde(flatten)]
    pub route: RouteRecord,
    pub in_use: bool,
    pub flight_time_label: String,
}

impl From<VisibleRoute> for RouteCard {
    fn from(visible: VisibleRoute) -> Self {
        Self {
            flight_time_label: visible.route.flight_time_label(),
            route: visible.route,
            in_use: visible.in_use,
        }
    }
}

// Response del dashboard completo
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub loading: bool,
    pub params: ViewParams,
    pub stats: ViewStats,
    pub page: PageInfo,
    pub aircraft_options: Vec<String>,
    pub origin_options: Vec<String>,
    pub routes: Vec<RouteCard>,
}

impl From<SessionView> for DashboardResponse {
    fn from(session: SessionView) -> Self {
        let view = session.view;
        Self {
            loading: session.loading,
            params: session.params,
            stats: view.stats,
            page: view.page,
            aircraft_options: view.aircraft_options,
            origin_options: view.origin_options,
            routes: view.routes.into_iter().map(RouteCard::from).collect(),
        }
    }
}

// Response de la lista de rutas visibles
#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    pub routes: Vec<RouteCard>,
    pub page: PageInfo,
    pub stats: ViewStats,
}

impl From<SessionView> for RouteListResponse {
    fn from(session: SessionView) -> Self {
        let view = session.view;
        Self {
            routes: view.routes.into_iter().map(RouteCard::from).collect(),
            page: view.page,
            stats: view.stats,
        }
    }
}

// Response de una subida de CSV
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub report: ParseReport,
    pub fingerprint: String,
}

// Response de un toggle
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub route_id: String,
    pub in_use: bool,
    pub active_count: usize,
}
