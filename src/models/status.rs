//! Mapa de estado "en uso" por ruta

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// id de ruta -> en uso
pub type ActiveStatusMap = BTreeMap<String, bool>;

/// Documento persistido `{ active: { id: bool } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
    #[serde(default)]
    pub active: ActiveStatusMap,
}

/// Una ruta ausente del mapa no está en uso
pub fn is_active(map: &ActiveStatusMap, route_id: &str) -> bool {
    map.get(route_id).copied().unwrap_or(false)
}

pub fn active_count(map: &ActiveStatusMap) -> usize {
    map.values().filter(|active| **active).count()
}
