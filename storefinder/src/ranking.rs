//! Distance-ordered store lists.
//!
//! The store list shows the nearest branches first and labels each with its
//! distance from the customer.
//!
//! # Algorithm
//!
//! 1. Compute the great-circle distance from the origin to every store.
//! 2. Sort by distance (primary), then store id (secondary tiebreaker) so
//!    equidistant stores keep a stable order between refreshes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::position::{distance_meters, Position};

/// A store branch on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    /// Branch identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl StoreLocation {
    /// Create a store location.
    pub fn new(id: u64, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Distance in meters from `origin`.
    pub fn distance_from(&self, origin: &Position) -> f64 {
        distance_meters(
            origin.latitude,
            origin.longitude,
            self.latitude,
            self.longitude,
        )
    }
}

/// A store with its distance from the origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStore {
    /// The store.
    pub store: StoreLocation,
    /// Whole meters from the origin.
    pub distance_meters: f64,
}

impl RankedStore {
    /// Human-readable distance label.
    pub fn distance_label(&self) -> String {
        format_distance(self.distance_meters)
    }
}

fn by_distance_then_id(a: &RankedStore, b: &RankedStore) -> Ordering {
    a.distance_meters
        .total_cmp(&b.distance_meters)
        .then_with(|| a.store.id.cmp(&b.store.id))
}

/// All stores, nearest first.
pub fn rank_by_distance(origin: &Position, stores: &[StoreLocation]) -> Vec<RankedStore> {
    let mut ranked: Vec<RankedStore> = stores
        .iter()
        .map(|store| RankedStore {
            distance_meters: store.distance_from(origin),
            store: store.clone(),
        })
        .collect();
    ranked.sort_by(by_distance_then_id);
    ranked
}

/// The `limit` nearest stores.
pub fn nearest(origin: &Position, stores: &[StoreLocation], limit: usize) -> Vec<RankedStore> {
    let mut ranked = rank_by_distance(origin, stores);
    ranked.truncate(limit);
    ranked
}

/// Stores no farther than `radius_meters`, nearest first.
pub fn within_radius(
    origin: &Position,
    stores: &[StoreLocation],
    radius_meters: f64,
) -> Vec<RankedStore> {
    rank_by_distance(origin, stores)
        .into_iter()
        .take_while(|ranked| ranked.distance_meters <= radius_meters)
        .collect()
}

/// Format a distance for display: `"850m"` below a kilometer, `"1.2km"` above.
pub fn format_distance(meters: f64) -> String {
    let rounded = meters.round().max(0.0);
    if rounded < 1000.0 {
        format!("{}m", rounded as u64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}
