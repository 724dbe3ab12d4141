//! Métricas Prometheus del servicio

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AppMetrics {
    registry: Registry,
    pub uploads: IntCounter,
    pub routes_parsed: IntCounter,
    pub toggles: IntCounter,
    pub persistence_failures: IntCounterVec,
    pub active_sessions: IntGauge,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("airline_commander".to_string()), None)?;

        let uploads = IntCounter::new("csv_uploads_total", "CSV uploads persisted")?;
        let routes_parsed = IntCounter::new("routes_parsed_total", "Route records produced by the parser")?;
        let toggles = IntCounter::new("route_toggles_total", "In-use toggles applied")?;
        let persistence_failures = IntCounterVec::new(
            Opts::new("persistence_failures_total", "Failed document store operations"),
            &["operation"],
        )?;
        let active_sessions = IntGauge::new("active_sessions", "Dashboard sessions currently running")?;

        registry.register(Box::new(uploads.clone()))?;
        registry.register(Box::new(routes_parsed.clone()))?;
        registry.register(Box::new(toggles.clone()))?;
        registry.register(Box::new(persistence_failures.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;

        Ok(Self {
            registry,
            uploads,
            routes_parsed,
            toggles,
            persistence_failures,
            active_sessions,
        })
    }

    pub fn record_failure(&self, operation: &str) {
        self.persistence_failures.with_label_values(&[operation]).inc();
    }

    /// Exposición en formato texto
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
