//! Parámetros de vista y resultado derivado
//!
//! Búsqueda, filtros, orden y paginación que el cliente aplica sobre el
//! conjunto de rutas de su sesión.

use serde::{Deserialize, Serialize};

use super::route::RouteRecord;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const ALL: &str = "all";

/// Campo de ordenación (siempre descendente)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Profit,
    #[serde(alias = "dist")]
    Distance,
    Time,
}

impl SortKey {
    pub fn value_of(&self, route: &RouteRecord) -> f64 {
        match self {
            SortKey::Profit => route.profit,
            SortKey::Distance => route.dist,
            SortKey::Time => route.time,
        }
    }
}

/// Filtro por estado de uso
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Used,
    Unused,
}

impl StatusFilter {
    pub fn matches(&self, in_use: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Used => in_use,
            StatusFilter::Unused => !in_use,
        }
    }
}

/// Parámetros de vista de una sesión
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewParams {
    pub search: String,
    pub sort: SortKey,
    pub status: StatusFilter,
    /// `None` = todas las aeronaves
    pub aircraft: Option<String>,
    /// `None` = todos los orígenes
    pub origin: Option<String>,
    /// 0 = mostrar todo
    pub page_size: usize,
    pub page: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortKey::default(),
            status: StatusFilter::default(),
            aircraft: None,
            origin: None,
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

/// Actualización parcial de los parámetros de vista
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewUpdate {
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub status: Option<StatusFilter>,
    pub aircraft: Option<Option<String>>,
    pub origin: Option<Option<String>>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
}

impl ViewParams {
    /// Aplicar una actualización. Cualquier cambio de búsqueda, filtro o
    /// tamaño de página vuelve a la página 1 e ignora la página pedida.
    /// Devuelve `true` si algo cambió.
    pub fn apply(&mut self, update: ViewUpdate) -> bool {
        let before = self.clone();
        let mut reset = false;

        if let Some(search) = update.search {
            reset |= search != self.search;
            self.search = search;
        }
        if let Some(status) = update.status {
            reset |= status != self.status;
            self.status = status;
        }
        if let Some(aircraft) = update.aircraft {
            reset |= aircraft != self.aircraft;
            self.aircraft = aircraft;
        }
        if let Some(origin) = update.origin {
            reset |= origin != self.origin;
            self.origin = origin;
        }
        if let Some(page_size) = update.page_size {
            reset |= page_size != self.page_size;
            self.page_size = page_size;
        }
        if let Some(sort) = update.sort {
            self.sort = sort;
        }

        if reset {
            self.page = 1;
        } else if let Some(page) = update.page {
            self.page = page.max(1);
        }

        *self != before
    }
}

/// Convertir el valor de un selector ("all" o exacto) en filtro
pub fn selection(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Ruta visible con su estado de uso
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRoute {
    pub route: RouteRecord,
    pub in_use: bool,
}

/// Estadísticas agregadas
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewStats {
    pub total_routes: usize,
    /// Rutas en uso en todo el mapa de estado, no solo las filtradas
    pub active_count: usize,
    pub filtered_count: usize,
    pub filtered_profit: f64,
}

/// Información de paginación
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub page_shortcuts: Vec<usize>,
}

/// Resultado de la vista derivada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedView {
    pub routes: Vec<VisibleRoute>,
    pub stats: ViewStats,
    pub page: PageInfo,
    pub aircraft_options: Vec<String>,
    pub origin_options: Vec<String>,
}
