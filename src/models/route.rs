//! Modelo de ruta
//!
//! Este módulo contiene el registro de ruta tal como se guarda en el
//! documento `routes` de cada identidad.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME: &str = "Destino";
pub const DEFAULT_COUNTRY: &str = "País";
pub const DEFAULT_IATA: &str = "???";
pub const DEFAULT_AIRCRAFT: &str = "Aeronave";
pub const DEFAULT_ORIGIN: &str = "Origem";
pub const DEFAULT_MARKET: f64 = 45.0;

/// Asientos por clase (económica, ejecutiva, primera)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatConfig {
    pub y: u32,
    pub j: u32,
    pub f: u32,
}

/// Precio del billete por clase
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketPrices {
    pub y: f64,
    pub j: f64,
    pub f: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stopover {
    pub iata: String,
    pub name: String,
}

/// Ruta principal - una fila del CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    pub country: String,
    pub iata: String,
    pub origin: String,
    /// Distancia directa en km
    pub dist: f64,
    /// Tiempo de vuelo en horas
    pub time: f64,
    #[serde(default)]
    pub config: SeatConfig,
    #[serde(default)]
    pub prices: TicketPrices,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub stopover: Option<Stopover>,
    #[serde(default = "default_market")]
    pub market: f64,
    pub aircraft: String,
}

fn default_market() -> f64 {
    DEFAULT_MARKET
}

impl RouteRecord {
    /// Ruta con todos los campos en su valor por defecto
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_NAME.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            iata: DEFAULT_IATA.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            dist: 0.0,
            time: 0.0,
            config: SeatConfig::default(),
            prices: TicketPrices::default(),
            profit: 0.0,
            stopover: None,
            market: DEFAULT_MARKET,
            aircraft: DEFAULT_AIRCRAFT.to_string(),
        }
    }

    pub fn flight_time_label(&self) -> String {
        format_flight_time(self.time)
    }
}

/// Documento persistido `{ list: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutesDocument {
    #[serde(default)]
    pub list: Vec<RouteRecord>,
}

/// Formatear horas decimales como "8h 30m"
pub fn format_flight_time(hours: f64) -> String {
    if !hours.is_finite() {
        return "0h 0m".to_string();
    }
    let h = hours.floor();
    let mut m = ((hours - h) * 60.0).round() as i64;
    let mut h = h as i64;
    if m == 60 {
        h += 1;
        m = 0;
    }
    format!("{}h {}m", h, m)
}
