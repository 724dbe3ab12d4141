//! Motor de vista derivada
//!
//! Filtra, ordena y pagina el conjunto de rutas de una sesión y calcula las
//! estadísticas del panel. Todo es puro y determinista; `ViewCache` solo
//! evita recalcular cuando las entradas no cambiaron.

use crate::models::route::RouteRecord;
use crate::models::status::{active_count, is_active, ActiveStatusMap};
use crate::models::view::{DerivedView, PageInfo, ViewParams, ViewStats, VisibleRoute, ALL};

const MAX_PAGE_SHORTCUTS: usize = 5;

/// Predicado conjuntivo de filtrado para una ruta
pub fn matches(route: &RouteRecord, status: &ActiveStatusMap, params: &ViewParams) -> bool {
    matches_with(route, status, params, &params.search.to_lowercase())
}

fn matches_with(route: &RouteRecord, status: &ActiveStatusMap, params: &ViewParams, search_lower: &str) -> bool {
    matches_search(route, search_lower)
        && params.status.matches(is_active(status, &route.id))
        && params.aircraft.as_deref().map_or(true, |a| route.aircraft == a)
        && params.origin.as_deref().map_or(true, |o| route.origin == o)
}

fn matches_search(route: &RouteRecord, search_lower: &str) -> bool {
    search_lower.is_empty()
        || route.name.to_lowercase().contains(search_lower)
        || route.iata.to_lowercase().contains(search_lower)
}

/// Rutas filtradas y ordenadas de forma descendente (orden estable)
pub fn filter_and_sort<'a>(
    routes: &'a [RouteRecord],
    status: &ActiveStatusMap,
    params: &ViewParams,
) -> Vec<&'a RouteRecord> {
    let search = params.search.to_lowercase();
    let mut filtered: Vec<&RouteRecord> = routes
        .iter()
        .filter(|route| matches_with(route, status, params, &search))
        .collect();

    let key = params.sort;
    filtered.sort_by(|a, b| key.value_of(b).total_cmp(&key.value_of(a)));
    filtered
}

/// Número de páginas; con `page_size == 0` todo cabe en una página
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        usize::from(count > 0)
    } else {
        count.div_ceil(page_size)
    }
}

/// Página efectiva dentro de `[1, max(total, 1)]`
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Rango `[inicio, fin)` de una página
pub fn page_bounds(count: usize, page_size: usize, page: usize) -> (usize, usize) {
    if page_size == 0 {
        return (0, count);
    }
    let start = (page.max(1) - 1).saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);
    (start, end)
}

/// Atajos de página: hasta cinco números alrededor de la página actual
pub fn page_shortcuts(current: usize, total: usize) -> Vec<usize> {
    let offset = if current > 3 && total > MAX_PAGE_SHORTCUTS {
        current - 3
    } else {
        0
    };
    (1..=total.min(MAX_PAGE_SHORTCUTS))
        .map(|i| i + offset)
        .filter(|page| *page <= total)
        .collect()
}

/// Valores distintos en orden de aparición, precedidos por "all"
pub fn distinct_options<F>(routes: &[RouteRecord], field: F) -> Vec<String>
where
    F: Fn(&RouteRecord) -> &str,
{
    let mut options = vec![ALL.to_string()];
    for route in routes {
        let value = field(route);
        if !options.iter().skip(1).any(|o| o == value) {
            options.push(value.to_string());
        }
    }
    options
}

/// Calcular la vista completa
pub fn derive_view(routes: &[RouteRecord], status: &ActiveStatusMap, params: &ViewParams) -> DerivedView {
    let filtered = filter_and_sort(routes, status, params);
    let filtered_count = filtered.len();

    let total = total_pages(filtered_count, params.page_size);
    let page = clamp_page(params.page, total);
    let (start, end) = page_bounds(filtered_count, params.page_size, page);

    let stats = ViewStats {
        total_routes: routes.len(),
        active_count: active_count(status),
        filtered_count,
        filtered_profit: filtered.iter().map(|r| r.profit).sum(),
    };

    let visible = filtered[start..end]
        .iter()
        .map(|route| VisibleRoute {
            route: (*route).clone(),
            in_use: is_active(status, &route.id),
        })
        .collect();

    DerivedView {
        routes: visible,
        stats,
        page: PageInfo {
            page,
            page_size: params.page_size,
            total_pages: total,
            page_shortcuts: page_shortcuts(page, total),
        },
        aircraft_options: distinct_options(routes, |r| r.aircraft.as_str()),
        origin_options: distinct_options(routes, |r| r.origin.as_str()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    routes_revision: u64,
    status_revision: u64,
    params: ViewParams,
}

/// Memoización de la última vista calculada
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<ViewKey>,
    view: DerivedView,
}

impl ViewCache {
    /// Devuelve la vista en cache si las revisiones y parámetros coinciden
    pub fn get_or_compute(
        &mut self,
        routes_revision: u64,
        status_revision: u64,
        routes: &[RouteRecord],
        status: &ActiveStatusMap,
        params: &ViewParams,
    ) -> &DerivedView {
        let key = ViewKey {
            routes_revision,
            status_revision,
            params: params.clone(),
        };
        if self.key.as_ref() != Some(&key) {
            self.view = derive_view(routes, status, params);
            self.key = Some(key);
        }
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::view::{SortKey, StatusFilter};

    fn route(id: &str, name: &str, iata: &str, profit: f64, dist: f64, time: f64) -> RouteRecord {
        let mut route = RouteRecord::with_defaults(id);
        route.name = name.to_string();
        route.iata = iata.to_string();
        route.profit = profit;
        route.dist = dist;
        route.time = time;
        route
    }

    fn sample() -> Vec<RouteRecord> {
        let mut routes = vec![
            route("1", "Paris", "CDG", 450.0, 5837.0, 8.5),
            route("2", "London", "LHR", 900.0, 5570.0, 7.0),
            route("3", "Lisbon", "LIS", 450.0, 5420.0, 6.9),
            route("4", "Madrid", "MAD", 120.0, 5770.0, 7.5),
        ];
        routes[0].aircraft = "A320".to_string();
        routes[1].aircraft = "B737".to_string();
        routes[2].aircraft = "A320".to_string();
        routes[3].origin = "JFK".to_string();
        routes
    }

    fn many(count: usize) -> Vec<RouteRecord> {
        (0..count)
            .map(|i| route(&i.to_string(), "R", "XXX", (count - i) as f64, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_or_iata() {
        let routes = sample();
        let status = ActiveStatusMap::new();
        let params = ViewParams {
            search: "li".to_string(),
            ..ViewParams::default()
        };
        let ids: Vec<&str> = filter_and_sort(&routes, &status, &params)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3"]);

        let params = ViewParams {
            search: "lhr".to_string(),
            ..ViewParams::default()
        };
        assert_eq!(filter_and_sort(&routes, &status, &params)[0].id, "2");
    }

    #[test]
    fn test_search_is_not_trimmed() {
        let routes = sample();
        let status = ActiveStatusMap::new();

        let padded = ViewParams {
            search: "paris ".to_string(),
            ..ViewParams::default()
        };
        assert!(filter_and_sort(&routes, &status, &padded).is_empty());
        assert!(!matches(&routes[0], &status, &padded));

        let blank = ViewParams {
            search: "   ".to_string(),
            ..ViewParams::default()
        };
        assert!(filter_and_sort(&routes, &status, &blank).is_empty());
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let routes = sample();
        let mut status = ActiveStatusMap::new();
        status.insert("1".to_string(), true);
        status.insert("3".to_string(), false);

        let combined = ViewParams {
            search: "L".to_string(),
            status: StatusFilter::Unused,
            aircraft: Some("A320".to_string()),
            ..ViewParams::default()
        };
        let combined_ids: Vec<&str> = filter_and_sort(&routes, &status, &combined)
            .iter()
            .map(|r| r.id.as_str())
            .collect();

        let one_by_one: Vec<&str> = routes
            .iter()
            .filter(|r| r.aircraft == "A320")
            .filter(|r| !is_active(&status, &r.id))
            .filter(|r| r.name.to_lowercase().contains('l') || r.iata.to_lowercase().contains('l'))
            .map(|r| r.id.as_str())
            .collect();

        assert_eq!(combined_ids, one_by_one);
        assert_eq!(combined_ids, vec!["3"]);
        assert!(routes
            .iter()
            .filter(|r| r.id != "3")
            .all(|r| !matches(r, &status, &combined)));
    }

    #[test]
    fn test_origin_filter_is_exact() {
        let routes = sample();
        let params = ViewParams {
            origin: Some("JFK".to_string()),
            ..ViewParams::default()
        };
        let filtered = filter_and_sort(&routes, &ActiveStatusMap::new(), &params);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "4");
    }

    #[test]
    fn test_sort_is_non_increasing_and_stable() {
        let routes = sample();
        let status = ActiveStatusMap::new();
        for sort in [SortKey::Profit, SortKey::Distance, SortKey::Time] {
            let params = ViewParams {
                sort,
                ..ViewParams::default()
            };
            let sorted = filter_and_sort(&routes, &status, &params);
            assert!(sorted.windows(2).all(|w| sort.value_of(w[0]) >= sort.value_of(w[1])));
        }

        let ids: Vec<&str> = filter_and_sort(&routes, &status, &ViewParams::default())
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "1", "3", "4"]);
    }

    #[test]
    fn test_page_size_zero_returns_everything() {
        let routes = many(120);
        let params = ViewParams {
            page_size: 0,
            page: 7,
            ..ViewParams::default()
        };
        let view = derive_view(&routes, &ActiveStatusMap::new(), &params);
        assert_eq!(view.routes.len(), 120);
        assert_eq!(view.page.total_pages, 1);
        assert_eq!(view.page.page, 1);
    }

    #[test]
    fn test_third_page_of_fifty() {
        let routes = many(120);
        let params = ViewParams {
            page_size: 50,
            page: 3,
            ..ViewParams::default()
        };
        let view = derive_view(&routes, &ActiveStatusMap::new(), &params);
        let all = filter_and_sort(&routes, &ActiveStatusMap::new(), &params);

        assert_eq!(view.page.total_pages, 3);
        assert_eq!(view.routes.len(), 20);
        let expected: Vec<&str> = all[100..120].iter().map(|r| r.id.as_str()).collect();
        let actual: Vec<&str> = view.routes.iter().map(|v| v.route.id.as_str()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_pages_concatenate_to_full_sequence() {
        let routes = many(23);
        let status = ActiveStatusMap::new();
        for size in 1..=25 {
            let mut params = ViewParams {
                page_size: size,
                ..ViewParams::default()
            };
            let full: Vec<String> = filter_and_sort(&routes, &status, &params)
                .iter()
                .map(|r| r.id.clone())
                .collect();
            let pages = total_pages(full.len(), size);
            assert_eq!(pages, (full.len() + size - 1) / size);

            let mut joined = Vec::new();
            for page in 1..=pages {
                params.page = page;
                joined.extend(derive_view(&routes, &status, &params).routes.into_iter().map(|v| v.route.id));
            }
            assert_eq!(joined, full);
        }
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let routes = many(10);
        let params = ViewParams {
            page_size: 4,
            page: 9,
            ..ViewParams::default()
        };
        let view = derive_view(&routes, &ActiveStatusMap::new(), &params);
        assert_eq!(view.page.page, 3);
        assert_eq!(view.routes.len(), 2);

        let empty = derive_view(&[], &ActiveStatusMap::new(), &params);
        assert_eq!(empty.page.page, 1);
        assert_eq!(empty.page.total_pages, 0);
        assert!(empty.routes.is_empty());
    }

    #[test]
    fn test_stats_active_is_global_profit_is_filtered() {
        let routes = sample();
        let mut status = ActiveStatusMap::new();
        status.insert("2".to_string(), true);
        status.insert("gone".to_string(), true);
        status.insert("4".to_string(), false);

        let params = ViewParams {
            aircraft: Some("A320".to_string()),
            ..ViewParams::default()
        };
        let view = derive_view(&routes, &status, &params);
        assert_eq!(view.stats.active_count, 2);
        assert_eq!(view.stats.filtered_count, 2);
        assert_eq!(view.stats.filtered_profit, 900.0);
        assert_eq!(view.stats.total_routes, 4);
    }

    #[test]
    fn test_options_and_in_use_flags() {
        let routes = sample();
        let mut status = ActiveStatusMap::new();
        status.insert("1".to_string(), true);
        let view = derive_view(&routes, &status, &ViewParams::default());

        assert_eq!(view.aircraft_options, vec!["all", "A320", "B737", "Aeronave"]);
        assert_eq!(view.origin_options, vec!["all", "Origem", "JFK"]);
        let paris = view.routes.iter().find(|v| v.route.id == "1").unwrap();
        assert!(paris.in_use);
    }

    #[test]
    fn test_page_shortcuts() {
        assert_eq!(page_shortcuts(1, 3), vec![1, 2, 3]);
        assert_eq!(page_shortcuts(1, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_shortcuts(6, 10), vec![4, 5, 6, 7, 8]);
        assert_eq!(page_shortcuts(10, 10), vec![8, 9, 10]);
        assert!(page_shortcuts(1, 0).is_empty());
    }

    #[test]
    fn test_view_cache_recomputes_only_on_change() {
        let routes = sample();
        let status = ActiveStatusMap::new();
        let params = ViewParams::default();
        let mut cache = ViewCache::default();

        let count = cache.get_or_compute(1, 1, &routes, &status, &params).routes.len();
        assert_eq!(count, 4);

        let fewer = &routes[..2];
        assert_eq!(cache.get_or_compute(1, 1, fewer, &status, &params).routes.len(), 4);
        assert_eq!(cache.get_or_compute(2, 1, fewer, &status, &params).routes.len(), 2);
    }
}
