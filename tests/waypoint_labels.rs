//! Background label upgrades racing with clears and reassignments.

mod fixtures;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use jeepney_router::geocode::{AddressLookup, GeocodeCache};
use jeepney_router::waypoints::{LabelUpgrader, RouteMode, WaypointStore};

use fixtures::{DESTINATION_LOCATION, GatedGeocoder, USER_CURRENT_LOCATION};

const WAIT: Duration = Duration::from_secs(5);

fn store_with(geocoder: Arc<GatedGeocoder>, threads: usize) -> WaypointStore {
    let lookup = AddressLookup::new(geocoder, Arc::new(GeocodeCache::new()), Duration::from_secs(60));
    let labeler = LabelUpgrader::new(Arc::new(lookup), threads).unwrap();
    WaypointStore::with_labeler(labeler)
}

#[test]
fn assignment_returns_before_label_resolves() {
    let (geocoder, release) = GatedGeocoder::new();
    let store = store_with(geocoder, 1);

    let from = store.set_from(USER_CURRENT_LOCATION.point(), None).unwrap();
    assert_eq!(from.display_label(), "From Location");
    assert_eq!(store.mode(), RouteMode::From);

    release
        .send("Ayala Center Cebu, Cebu Business Park, Cebu City, Cebu, 6000, Philippines".to_string())
        .unwrap();
    assert!(store.wait_for_labels(WAIT));

    let upgraded = store.from().unwrap();
    assert_eq!(upgraded.label(), Some("Ayala Center Cebu, Cebu Business Park, Cebu City"));
    assert_eq!(upgraded.generation(), from.generation());
}

#[test]
fn label_arriving_after_clear_is_discarded() {
    let (geocoder, release) = GatedGeocoder::new();
    let store = store_with(geocoder, 1);

    store.set_from(USER_CURRENT_LOCATION.point(), None).unwrap();
    store.clear();

    release.send("Stale Street".to_string()).unwrap();
    assert!(store.wait_for_labels(WAIT));

    assert_eq!(store.from(), None);
    assert_eq!(store.mode(), RouteMode::None);
}

#[test]
fn stale_label_does_not_clobber_reassigned_waypoint() {
    let (geocoder, release) = GatedGeocoder::new();
    // One worker, so upgrades finish in submission order.
    let store = store_with(geocoder.clone(), 1);

    store.set_from(USER_CURRENT_LOCATION.point(), None).unwrap();
    store.clear();
    let fresh = store
        .set_from(DESTINATION_LOCATION.point(), Some("SM City Cebu".to_string()))
        .unwrap();

    release.send("Stale Street".to_string()).unwrap();
    release.send("SM City Cebu, North Reclamation Area".to_string()).unwrap();
    assert!(store.wait_for_labels(WAIT));

    let current = store.from().unwrap();
    assert_eq!(current.point(), fresh.point());
    assert_eq!(current.label(), Some("SM City Cebu, North Reclamation Area"));
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_lookup_keeps_hint() {
    let (geocoder, release) = GatedGeocoder::new();
    let store = store_with(geocoder, 1);

    store
        .set_to(DESTINATION_LOCATION.point(), Some("Destination".to_string()))
        .unwrap();
    // Dropping the sender makes the gated lookup fail.
    drop(release);
    assert!(store.wait_for_labels(WAIT));

    assert_eq!(store.to().unwrap().label(), Some("Destination"));
}

#[test]
fn wait_times_out_while_lookup_is_blocked() {
    let (geocoder, release) = GatedGeocoder::new();
    let store = store_with(geocoder, 1);

    store.set_from(USER_CURRENT_LOCATION.point(), None).unwrap();
    assert!(!store.wait_for_labels(Duration::from_millis(20)));

    release.send("Fuente Osmeña".to_string()).unwrap();
    assert!(store.wait_for_labels(WAIT));
}
