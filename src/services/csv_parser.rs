//! Parser de CSV de rutas
//!
//! Convierte el texto de un CSV exportado del simulador en registros de ruta.
//! Es best-effort: un campo numérico ilegible nunca es un error, toma su
//! valor por defecto y queda contado en el `ParseReport`.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::route::{
    RouteRecord, SeatConfig, Stopover, TicketPrices, DEFAULT_AIRCRAFT, DEFAULT_COUNTRY, DEFAULT_IATA,
    DEFAULT_MARKET, DEFAULT_NAME, DEFAULT_ORIGIN,
};

/// Tokens de aeronave en el nombre del archivo, en orden de prioridad
const AIRCRAFT_TOKENS: &[(&str, &str)] = &[("mc214", "MC-21-400"), ("a320", "A320"), ("b737", "B737")];

/// Tokens de origen en el nombre del archivo
const ORIGIN_TOKENS: &[(&str, &str)] = &[("jfk", "JFK")];

pub const RECOGNIZED_HEADERS: &[&str] = &[
    "dest.id",
    "dest.name",
    "dest.country",
    "dest.iata",
    "direct_dist",
    "time",
    "cfg.y",
    "cfg.j",
    "cfg.f",
    "tkt.y",
    "tkt.j",
    "tkt.f",
    "profit_pt",
    "stop.iata",
    "stop.name",
    "market",
];

/// Contexto de una subida
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub file_name: &'a str,
    /// Marca de tiempo usada para sintetizar ids ausentes
    pub uploaded_at_millis: i64,
    /// Origen explícito; si falta se infiere del nombre del archivo
    pub origin_override: Option<&'a str>,
}

/// Resumen de un parseo
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub rows: usize,
    pub blank_lines_skipped: usize,
    pub malformed_values: usize,
    pub unrecognized_headers: Vec<String>,
    pub aircraft: String,
    pub origin: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedUpload {
    pub routes: Vec<RouteRecord>,
    pub report: ParseReport,
}

/// Aeronave según el nombre del archivo; el primer token que aparece gana
pub fn detect_aircraft(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    AIRCRAFT_TOKENS
        .iter()
        .find(|(token, _)| lower.contains(token))
        .map(|(_, label)| *label)
        .unwrap_or(DEFAULT_AIRCRAFT)
}

/// Origen según el nombre del archivo
pub fn detect_origin(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    ORIGIN_TOKENS
        .iter()
        .find(|(token, _)| lower.contains(token))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_ORIGIN)
}

/// Parsear el contenido completo de un CSV
pub fn parse_routes(text: &str, ctx: &ParseContext<'_>) -> ParsedUpload {
    let aircraft = detect_aircraft(ctx.file_name).to_string();
    let origin = ctx
        .origin_override
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.to_uppercase())
        .unwrap_or_else(|| detect_origin(ctx.file_name).to_string());

    let mut report = ParseReport {
        aircraft: aircraft.clone(),
        origin: origin.clone(),
        ..ParseReport::default()
    };

    let mut lines = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    let header_line = match lines.next() {
        Some(line) => line.trim_start_matches('\u{feff}'),
        None => return ParsedUpload { routes: Vec::new(), report },
    };

    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
    let mut columns: HashMap<&str, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        if RECOGNIZED_HEADERS.contains(header) {
            columns.entry(*header).or_insert(index);
        } else if !header.is_empty() {
            report.unrecognized_headers.push(header.to_string());
        }
    }

    let mut routes = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            report.blank_lines_skipped += 1;
            continue;
        }

        let values: Vec<&str> = line.split(',').collect();
        let row = Row {
            columns: &columns,
            values: &values,
        };
        let index = routes.len();
        routes.push(row.to_record(index, ctx, &aircraft, &origin, &mut report.malformed_values));
    }

    report.rows = routes.len();
    ParsedUpload { routes, report }
}

struct Row<'a> {
    columns: &'a HashMap<&'a str, usize>,
    values: &'a [&'a str],
}

impl<'a> Row<'a> {
    fn field(&self, header: &str) -> Option<&'a str> {
        self.columns
            .get(header)
            .and_then(|index| self.values.get(*index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn text(&self, header: &str, default: &str) -> String {
        self.field(header).unwrap_or(default).to_string()
    }

    fn number(&self, header: &str, default: f64, malformed: &mut usize) -> f64 {
        match self.field(header) {
            None => default,
            Some(raw) => parse_finite(raw).unwrap_or_else(|| {
                *malformed += 1;
                default
            }),
        }
    }

    fn non_negative(&self, header: &str, malformed: &mut usize) -> f64 {
        match self.field(header) {
            None => 0.0,
            Some(raw) => match parse_finite(raw) {
                Some(value) if value >= 0.0 => value,
                _ => {
                    *malformed += 1;
                    0.0
                }
            },
        }
    }

    fn seats(&self, header: &str, malformed: &mut usize) -> u32 {
        match self.field(header) {
            None => 0,
            Some(raw) => match raw.parse::<u32>() {
                Ok(seats) => seats,
                Err(_) => match parse_finite(raw) {
                    Some(value) if value >= 0.0 && value <= u32::MAX as f64 => value.floor() as u32,
                    _ => {
                        *malformed += 1;
                        0
                    }
                },
            },
        }
    }

    fn market(&self, malformed: &mut usize) -> f64 {
        match self.field("market") {
            None => DEFAULT_MARKET,
            Some(raw) => match parse_finite(raw) {
                Some(value) => ((value * 100.0).round() / 100.0).clamp(0.0, 100.0),
                None => {
                    *malformed += 1;
                    DEFAULT_MARKET
                }
            },
        }
    }

    fn to_record(
        &self,
        index: usize,
        ctx: &ParseContext<'_>,
        aircraft: &str,
        origin: &str,
        malformed: &mut usize,
    ) -> RouteRecord {
        let id = self
            .field("dest.id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", index, ctx.uploaded_at_millis));

        let stopover = self.field("stop.iata").map(|iata| Stopover {
            iata: iata.to_string(),
            name: self.text("stop.name", ""),
        });

        RouteRecord {
            id,
            name: self.text("dest.name", DEFAULT_NAME),
            country: self.text("dest.country", DEFAULT_COUNTRY),
            iata: self.text("dest.iata", DEFAULT_IATA),
            origin: origin.to_string(),
            dist: self.non_negative("direct_dist", malformed),
            time: self.non_negative("time", malformed),
            config: SeatConfig {
                y: self.seats("cfg.y", malformed),
                j: self.seats("cfg.j", malformed),
                f: self.seats("cfg.f", malformed),
            },
            prices: TicketPrices {
                y: self.non_negative("tkt.y", malformed),
                j: self.non_negative("tkt.j", malformed),
                f: self.non_negative("tkt.f", malformed),
            },
            profit: self.number("profit_pt", 0.0, malformed),
            stopover,
            market: self.market(malformed),
            aircraft: aircraft.to_string(),
        }
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Huella MD5 de un conjunto de rutas
pub fn fingerprint(routes: &[RouteRecord]) -> String {
    let serialized = serde_json::to_string(routes).unwrap_or_default();
    format!("{:x}", md5::compute(serialized.as_bytes()))
}
