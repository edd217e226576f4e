//! From/To waypoint state for one user session.
//!
//! A slot, once filled, is never overwritten: callers must [`clear`] first.
//! Assignment returns immediately with the caller's label hint; when a
//! [`LabelUpgrader`] is attached, the human-readable address is resolved on
//! a background pool and applied later. Every assignment carries a
//! generation stamp, and a late label is only applied if the slot still
//! holds the exact waypoint it was requested for.
//!
//! [`clear`]: WaypointStore::clear

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::WaypointError;
use crate::geo::GeoPoint;
use crate::geocode::AddressLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    From,
    To,
}

impl Slot {
    pub fn default_label(self) -> &'static str {
        match self {
            Slot::From => "From Location",
            Slot::To => "To Location",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::From => f.write_str("From"),
            Slot::To => f.write_str("To"),
        }
    }
}

/// Which waypoint was assigned most recently. Only drives UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RouteMode {
    #[default]
    None,
    From,
    To,
}

impl From<Slot> for RouteMode {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::From => RouteMode::From,
            Slot::To => RouteMode::To,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    slot: Slot,
    point: GeoPoint,
    label: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl Waypoint {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The label, or "From Location"/"To Location" while none is known.
    pub fn display_label(&self) -> &str {
        self.label().unwrap_or(self.slot.default_label())
    }

    /// Identity of this assignment. Reassigning a slot always yields a
    /// larger generation, even after a clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaypointPair {
    pub from: Option<Waypoint>,
    pub to: Option<Waypoint>,
    pub mode: RouteMode,
}

impl WaypointPair {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Waypoint> {
        match slot {
            Slot::From => &mut self.from,
            Slot::To => &mut self.to,
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&Waypoint> {
        match slot {
            Slot::From => self.from.as_ref(),
            Slot::To => self.to.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

/// Resolves waypoint labels on a small dedicated thread pool.
///
/// Cheap to clone; one instance is normally shared by every session.
#[derive(Clone)]
pub struct LabelUpgrader {
    pool: Arc<rayon::ThreadPool>,
    lookup: Arc<AddressLookup>,
}

impl std::fmt::Debug for LabelUpgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelUpgrader")
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl LabelUpgrader {
    pub fn new(lookup: Arc<AddressLookup>, threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("label-upgrade-{i}"))
            .build()?;

        Ok(Self {
            pool: Arc::new(pool),
            lookup,
        })
    }
}

#[derive(Debug, Default)]
struct State {
    pair: WaypointPair,
    pin: Option<GeoPoint>,
    generation: u64,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    settled: Condvar,
    cancelled: AtomicBool,
}

impl Shared {
    fn finish_upgrade(&self, slot: Slot, generation: u64, label: Option<String>) {
        let mut state = self.state.lock();
        state.in_flight -= 1;

        if let Some(label) = label {
            let cancelled = self.cancelled.load(Ordering::SeqCst);
            match state.pair.slot_mut(slot) {
                Some(waypoint) if !cancelled && waypoint.generation == generation => {
                    debug!(%slot, %label, "waypoint label upgraded");
                    waypoint.label = Some(label);
                }
                _ => debug!(%slot, generation, "discarding stale waypoint label"),
            }
        }

        if state.in_flight == 0 {
            self.settled.notify_all();
        }
    }
}

/// Waypoints of one session. Dropping the store cancels pending upgrades.
#[derive(Debug, Default)]
pub struct WaypointStore {
    shared: Arc<Shared>,
    labeler: Option<LabelUpgrader>,
}

impl WaypointStore {
    /// A store that keeps whatever label the caller provides.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that resolves labels in the background after assignment.
    pub fn with_labeler(labeler: LabelUpgrader) -> Self {
        Self {
            shared: Arc::default(),
            labeler: Some(labeler),
        }
    }

    pub fn set_from(&self, candidate: GeoPoint, label_hint: Option<String>) -> Result<Waypoint, WaypointError> {
        self.assign(Slot::From, candidate, label_hint)
    }

    pub fn set_to(&self, candidate: GeoPoint, label_hint: Option<String>) -> Result<Waypoint, WaypointError> {
        self.assign(Slot::To, candidate, label_hint)
    }

    /// Places (or moves) the current map pin.
    pub fn drop_pin(&self, point: GeoPoint) {
        self.shared.state.lock().pin = Some(point);
    }

    pub fn clear_pin(&self) {
        self.shared.state.lock().pin = None;
    }

    pub fn pin(&self) -> Option<GeoPoint> {
        self.shared.state.lock().pin
    }

    /// Assigns From from the current pin. `NoPin` wins over `AlreadySet`.
    pub fn set_from_pin(&self, label_hint: Option<String>) -> Result<Waypoint, WaypointError> {
        let pin = self.pin().ok_or(WaypointError::NoPin)?;
        self.set_from(pin, label_hint)
    }

    pub fn set_to_pin(&self, label_hint: Option<String>) -> Result<Waypoint, WaypointError> {
        let pin = self.pin().ok_or(WaypointError::NoPin)?;
        self.set_to(pin, label_hint)
    }

    /// Empties both slots and resets the mode. Labels still being resolved
    /// for the cleared waypoints are discarded when they arrive.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.pair = WaypointPair::default();
        state.generation += 1;
    }

    pub fn snapshot(&self) -> WaypointPair {
        self.shared.state.lock().pair.clone()
    }

    pub fn from(&self) -> Option<Waypoint> {
        self.shared.state.lock().pair.from.clone()
    }

    pub fn to(&self) -> Option<Waypoint> {
        self.shared.state.lock().pair.to.clone()
    }

    pub fn mode(&self) -> RouteMode {
        self.shared.state.lock().pair.mode
    }

    /// Blocks until no label upgrade is in flight or `timeout` elapses.
    /// Returns true when everything settled.
    pub fn wait_for_labels(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.in_flight > 0 {
            if self
                .shared
                .settled
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.in_flight == 0;
            }
        }
        true
    }

    fn assign(&self, slot: Slot, point: GeoPoint, label_hint: Option<String>) -> Result<Waypoint, WaypointError> {
        let mut state = self.shared.state.lock();
        if state.pair.get(slot).is_some() {
            return Err(WaypointError::AlreadySet(slot));
        }

        state.generation += 1;
        let waypoint = Waypoint {
            slot,
            point,
            label: label_hint,
            generation: state.generation,
        };
        *state.pair.slot_mut(slot) = Some(waypoint.clone());
        state.pair.mode = slot.into();

        if let Some(labeler) = &self.labeler {
            state.in_flight += 1;
            drop(state);
            self.spawn_upgrade(labeler, &waypoint);
        }

        Ok(waypoint)
    }

    fn spawn_upgrade(&self, labeler: &LabelUpgrader, waypoint: &Waypoint) {
        let shared = Arc::clone(&self.shared);
        let lookup = Arc::clone(&labeler.lookup);
        let (slot, point, generation) = (waypoint.slot, waypoint.point, waypoint.generation);

        labeler.pool.spawn(move || {
            let label = if shared.cancelled.load(Ordering::SeqCst) {
                None
            } else {
                match lookup.lookup_address(point) {
                    Ok(label) => label,
                    Err(err) => {
                        warn!(%slot, error = %err, "waypoint label lookup failed");
                        None
                    }
                }
            };
            shared.finish_upgrade(slot, generation, label);
        });
    }
}

impl Drop for WaypointStore {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn test_set_from_twice_keeps_original() {
        let store = WaypointStore::new();
        let first = store.set_from(pt(10.3173, 123.9057), None).unwrap();

        let err = store.set_from(pt(10.3126, 123.9181), None).unwrap_err();

        assert_eq!(err, WaypointError::AlreadySet(Slot::From));
        assert_eq!(store.from(), Some(first));
    }

    #[test]
    fn test_mode_tracks_last_assignment() {
        let store = WaypointStore::new();
        assert_eq!(store.mode(), RouteMode::None);
        store.set_to(pt(10.3126, 123.9181), None).unwrap();
        assert_eq!(store.mode(), RouteMode::To);
        store.set_from(pt(10.3173, 123.9057), None).unwrap();
        assert_eq!(store.mode(), RouteMode::From);
    }

    #[test]
    fn test_failed_assignment_leaves_mode_untouched() {
        let store = WaypointStore::new();
        store.set_from(pt(1.0, 1.0), None).unwrap();
        store.set_to(pt(2.0, 2.0), None).unwrap();
        assert!(store.set_from(pt(3.0, 3.0), None).is_err());
        assert_eq!(store.mode(), RouteMode::To);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = WaypointStore::new();
        store.set_from(pt(1.0, 1.0), None).unwrap();
        store.set_to(pt(2.0, 2.0), None).unwrap();

        store.clear();

        assert_eq!(store.snapshot(), WaypointPair::default());
        assert!(store.set_from(pt(3.0, 3.0), None).is_ok());
    }

    #[test]
    fn test_generation_grows_across_clear() {
        let store = WaypointStore::new();
        let before = store.set_from(pt(1.0, 1.0), None).unwrap();
        store.clear();
        let after = store.set_from(pt(1.0, 1.0), None).unwrap();
        assert!(after.generation() > before.generation());
        assert_ne!(before, after);
    }

    #[test]
    fn test_default_and_hinted_labels() {
        let store = WaypointStore::new();
        let from = store.set_from(pt(1.0, 1.0), None).unwrap();
        let to = store.set_to(pt(2.0, 2.0), Some("Ayala Center".to_string())).unwrap();
        assert_eq!(from.label(), None);
        assert_eq!(from.display_label(), "From Location");
        assert_eq!(to.display_label(), "Ayala Center");
    }

    #[test]
    fn test_pin_assignment_without_pin() {
        let store = WaypointStore::new();
        assert_eq!(store.set_from_pin(None).unwrap_err(), WaypointError::NoPin);
        assert_eq!(store.set_to_pin(None).unwrap_err(), WaypointError::NoPin);
    }

    #[test]
    fn test_no_pin_reported_before_already_set() {
        let store = WaypointStore::new();
        store.set_from(pt(1.0, 1.0), None).unwrap();
        assert_eq!(store.set_from_pin(None).unwrap_err(), WaypointError::NoPin);

        store.drop_pin(pt(2.0, 2.0));
        assert_eq!(
            store.set_from_pin(None).unwrap_err(),
            WaypointError::AlreadySet(Slot::From)
        );
        let to = store.set_to_pin(None).unwrap();
        assert_eq!(to.point(), pt(2.0, 2.0));
    }

    #[test]
    fn test_wait_without_labeler_returns_immediately() {
        let store = WaypointStore::new();
        store.set_from(pt(1.0, 1.0), None).unwrap();
        assert!(store.wait_for_labels(Duration::from_millis(1)));
    }
}
