//! Geographic helpers: points, lat/lon bounding boxes, and bearings.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Construct a point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite numbers.
    pub const fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// An axis-aligned lat/lon rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// A square box of half-width `half_span` degrees centred on `center`.
    pub fn around(center: GeoPoint, half_span: f64) -> Self {
        Self {
            min_lat: center.lat - half_span,
            max_lat: center.lat + half_span,
            min_lng: center.lng - half_span,
            max_lng: center.lng + half_span,
        }
    }

    /// Whether min <= max on both axes.
    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lng <= self.max_lng
    }

    /// Whether `point` lies inside the box (edges included).
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &Self) -> bool {
        self.min_lat <= other.min_lat
            && self.max_lat >= other.max_lat
            && self.min_lng <= other.min_lng
            && self.max_lng >= other.max_lng
    }

    /// A uniformly random point inside the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GeoPoint {
        GeoPoint {
            lat: self.min_lat + rng.random::<f64>() * (self.max_lat - self.min_lat),
            lng: self.min_lng + rng.random::<f64>() * (self.max_lng - self.min_lng),
        }
    }
}

/// Initial great-circle bearing from `from` to `to`, in degrees `[0, 360)`.
///
/// Identical points yield 0.
pub fn initial_bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lambda = (to.lng - from.lng).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos().mul_add(phi2.sin(), -(phi1.sin() * phi2.cos() * delta_lambda.cos()));

    normalize_heading(y.atan2(x).to_degrees())
}

/// Wrap any finite angle into `[0, 360)`. Non-finite input maps to 0.
pub fn normalize_heading(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
