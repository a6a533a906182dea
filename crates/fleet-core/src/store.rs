//! The State Store: current simulated state of every fleet member.
//!
//! An owned value, not a global. The scheduler holds one store per
//! simulation, so tests can run any number of independent fleets side by
//! side. Iteration order is insertion order and never changes after
//! seeding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleet_types::{TelemetrySnapshot, VehicleId, VehicleRecord, VehicleState};
use rand::Rng;

use crate::geo::BoundingBox;

/// In-memory map from vehicle identifier to current state.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    vehicles: Vec<VehicleState>,
    index: BTreeMap<VehicleId, usize>,
}

impl StateStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with one parked vehicle per roster entry.
    ///
    /// Each vehicle starts at a uniformly random point inside `region`
    /// with its registered odometer. Duplicate roster ids keep the first
    /// entry. Returns the number of vehicles seeded.
    pub fn seed<R: Rng + ?Sized>(
        &mut self,
        roster: &[VehicleRecord],
        region: &BoundingBox,
        rng: &mut R,
    ) -> usize {
        self.vehicles.clear();
        self.index.clear();
        for record in roster {
            if self.index.contains_key(&record.vehicle_id) {
                continue;
            }
            let position = region.sample(rng);
            self.insert(VehicleState::parked(
                record.vehicle_id.clone(),
                position.lat,
                position.lng,
                record.odometer,
            ));
        }
        self.vehicles.len()
    }

    /// Insert a vehicle, or overwrite the existing entry with the same id.
    ///
    /// Returns `true` when the vehicle was new.
    pub fn insert(&mut self, state: VehicleState) -> bool {
        if let Some(slot) = self
            .index
            .get(&state.vehicle_id)
            .and_then(|&i| self.vehicles.get_mut(i))
        {
            *slot = state;
            return false;
        }
        self.index
            .insert(state.vehicle_id.clone(), self.vehicles.len());
        self.vehicles.push(state);
        true
    }

    /// Current state of one vehicle.
    pub fn get(&self, id: &VehicleId) -> Option<&VehicleState> {
        self.index.get(id).and_then(|&i| self.vehicles.get(i))
    }

    /// Number of vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Whether the store has been seeded with at least one vehicle.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.iter()
    }

    /// Replace every entry in place, in insertion order.
    ///
    /// `advance` receives the current state and returns the next one. The
    /// vehicle identity is preserved whatever the closure returns.
    pub fn advance_each<F>(&mut self, mut advance: F)
    where
        F: FnMut(&VehicleState) -> VehicleState,
    {
        for slot in &mut self.vehicles {
            let mut next = advance(slot);
            next.vehicle_id = slot.vehicle_id.clone();
            *slot = next;
        }
    }

    /// Owned copy of the whole fleet, in insertion order.
    pub fn snapshot(&self) -> Vec<VehicleState> {
        self.vehicles.clone()
    }

    /// Timestamped snapshot of every vehicle.
    pub fn capture(&self, recorded_at: DateTime<Utc>) -> Vec<TelemetrySnapshot> {
        self.vehicles
            .iter()
            .map(|state| TelemetrySnapshot::capture(state, recorded_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use fleet_types::VehicleStatus;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::geo::GeoPoint;

    fn record(id: &str, odometer: f64) -> VehicleRecord {
        VehicleRecord {
            vehicle_id: VehicleId::new(id),
            make: "Tesla".into(),
            model: "Model 3".into(),
            status: VehicleStatus::Active,
            odometer,
        }
    }

    fn region() -> BoundingBox {
        BoundingBox {
            min_lat: 37.75,
            max_lat: 37.79,
            min_lng: -122.50,
            max_lng: -122.38,
        }
    }

    #[test]
    fn seed_places_every_vehicle_inside_region() {
        let roster: Vec<_> = ["VH-001", "VH-002", "VH-003"]
            .iter()
            .map(|id| record(id, 1000.0))
            .collect();
        let mut store = StateStore::new();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(store.seed(&roster, &region(), &mut rng), 3);
        for state in store.iter() {
            assert!(region().contains(GeoPoint::new(state.latitude, state.longitude)));
            assert!((state.odometer - 1000.0).abs() < f64::EPSILON);
            assert!(state.speed.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn seed_keeps_insertion_order_and_skips_duplicates() {
        let roster = vec![
            record("VH-003", 1.0),
            record("VH-001", 2.0),
            record("VH-003", 3.0),
        ];
        let mut store = StateStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        store.seed(&roster, &region(), &mut rng);

        let ids: Vec<_> = store.iter().map(|s| s.vehicle_id.as_str()).collect();
        assert_eq!(ids, ["VH-003", "VH-001"]);
        let first = store.get(&VehicleId::new("VH-003"));
        assert!(first.is_some_and(|s| (s.odometer - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn reseeding_replaces_previous_fleet() {
        let mut store = StateStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        store.seed(&[record("VH-001", 0.0)], &region(), &mut rng);
        store.seed(&[record("VH-009", 0.0)], &region(), &mut rng);
        assert_eq!(store.len(), 1);
        assert!(store.get(&VehicleId::new("VH-001")).is_none());
    }

    #[test]
    fn insert_overwrites_existing_entry() {
        let mut store = StateStore::new();
        let id = VehicleId::new("VH-001");
        assert!(store.insert(VehicleState::parked(id.clone(), 1.0, 2.0, 0.0)));
        assert!(!store.insert(VehicleState::parked(id.clone(), 3.0, 4.0, 0.0)));
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_some_and(|s| (s.latitude - 3.0).abs() < f64::EPSILON));
    }

    #[test]
    fn advance_each_preserves_identity() {
        let mut store = StateStore::new();
        store.insert(VehicleState::parked(VehicleId::new("VH-001"), 1.0, 2.0, 0.0));
        store.advance_each(|prev| {
            let mut next = prev.clone();
            next.vehicle_id = VehicleId::new("hijacked");
            next.speed = 10.0;
            next
        });
        let state = store.get(&VehicleId::new("VH-001"));
        assert!(state.is_some_and(|s| (s.speed - 10.0).abs() < f64::EPSILON));
    }

    #[test]
    fn capture_stamps_every_vehicle() {
        let mut store = StateStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        store.seed(&[record("VH-001", 0.0), record("VH-002", 0.0)], &region(), &mut rng);
        let now = Utc::now();
        let batch = store.capture(now);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|s| s.recorded_at == now));
    }
}
