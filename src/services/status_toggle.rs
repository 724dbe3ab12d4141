//! Controlador de estado "en uso"
//!
//! `toggle` invierte una sola entrada del mapa. `StatusSync` guarda la
//! versión visible (optimista) y la última confirmada por el almacén, y
//! revierte la visible cuando falla la última escritura pendiente.

use crate::models::status::{is_active, ActiveStatusMap};

/// Invertir el estado de una ruta y devolver el mapa completo resultante
pub fn toggle(map: &ActiveStatusMap, route_id: &str) -> ActiveStatusMap {
    let mut next = map.clone();
    next.insert(route_id.to_string(), !is_active(map, route_id));
    next
}

/// Estado visible vs confirmado del mapa de uso
#[derive(Debug, Default)]
pub struct StatusSync {
    visible: ActiveStatusMap,
    confirmed: ActiveStatusMap,
    in_flight: usize,
    revision: u64,
}

impl StatusSync {
    pub fn visible(&self) -> &ActiveStatusMap {
        &self.visible
    }

    pub fn confirmed(&self) -> &ActiveStatusMap {
        &self.confirmed
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Cambia cada vez que el mapa visible cambia
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Aplicar un toggle optimista. Devuelve el nuevo valor de la ruta y el
    /// mapa completo que hay que escribir.
    pub fn toggle(&mut self, route_id: &str) -> (bool, ActiveStatusMap) {
        let next = toggle(&self.visible, route_id);
        let value = is_active(&next, route_id);
        self.set_visible(next.clone());
        self.in_flight += 1;
        (value, next)
    }

    /// Snapshot recibido del almacén: la última siempre gana como confirmada.
    /// Con escrituras pendientes no se pisa el estado optimista.
    pub fn on_snapshot(&mut self, map: ActiveStatusMap) {
        self.confirmed = map;
        if self.in_flight == 0 {
            self.set_visible(self.confirmed.clone());
        }
    }

    pub fn on_write_ok(&mut self, written: ActiveStatusMap) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.confirmed = written;
        if self.in_flight == 0 {
            self.set_visible(self.confirmed.clone());
        }
    }

    /// Devuelve `true` si el estado visible se revirtió
    pub fn on_write_failed(&mut self) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 && self.visible != self.confirmed {
            self.set_visible(self.confirmed.clone());
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.confirmed.clear();
        self.set_visible(ActiveStatusMap::new());
    }

    fn set_visible(&mut self, map: ActiveStatusMap) {
        if self.visible != map {
            self.visible = map;
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, bool)]) -> ActiveStatusMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_toggle_absent_then_again() {
        let original = map(&[("a", true), ("b", false)]);

        let once = toggle(&original, "new");
        assert_eq!(once.get("new"), Some(&true));

        let twice = toggle(&once, "new");
        assert_eq!(twice.get("new"), Some(&false));

        let others_before = serde_json::to_vec(&original).unwrap();
        let mut others_after = twice.clone();
        others_after.remove("new");
        assert_eq!(serde_json::to_vec(&others_after).unwrap(), others_before);
    }

    #[test]
    fn test_toggle_twice_restores_value() {
        let original = map(&[("a", true), ("b", false)]);
        let restored = toggle(&toggle(&original, "a"), "a");
        assert_eq!(restored, original);
    }

    #[test]
    fn test_optimistic_value_survives_snapshots_while_in_flight() {
        let mut sync = StatusSync::default();
        let (value, to_write) = sync.toggle("r1");
        assert!(value);
        assert_eq!(sync.in_flight(), 1);

        // snapshot anterior a la escritura
        sync.on_snapshot(ActiveStatusMap::new());
        assert_eq!(sync.visible().get("r1"), Some(&true));

        sync.on_write_ok(to_write.clone());
        assert_eq!(sync.visible(), &to_write);
        assert_eq!(sync.confirmed(), &to_write);
        assert_eq!(sync.in_flight(), 0);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut sync = StatusSync::default();
        sync.on_snapshot(map(&[("r1", true)]));
        let revision = sync.revision();

        sync.toggle("r1");
        assert_eq!(sync.visible().get("r1"), Some(&false));

        assert!(sync.on_write_failed());
        assert_eq!(sync.visible().get("r1"), Some(&true));
        assert!(sync.revision() > revision);
    }

    #[test]
    fn test_failure_with_later_write_pending_keeps_optimistic_state() {
        let mut sync = StatusSync::default();
        sync.toggle("r1");
        let (_, second) = sync.toggle("r2");

        assert!(!sync.on_write_failed());
        assert_eq!(sync.visible(), &second);

        sync.on_write_ok(second.clone());
        assert_eq!(sync.confirmed(), &second);
    }

    #[test]
    fn test_revision_changes_only_on_visible_change() {
        let mut sync = StatusSync::default();
        sync.on_snapshot(ActiveStatusMap::new());
        assert_eq!(sync.revision(), 0);
        sync.on_snapshot(map(&[("x", true)]));
        assert_eq!(sync.revision(), 1);
        sync.clear();
        assert_eq!(sync.revision(), 2);
        assert!(sync.confirmed().is_empty());
    }
}
