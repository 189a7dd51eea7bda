//! Great-circle distance.
//!
//! Haversine on a spherical Earth. Store lists only need meter resolution, so
//! results are rounded to whole meters.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Distance in meters between two latitude/longitude points (degrees).
///
/// The result is non-negative, rounded to the nearest meter, symmetric in its
/// arguments and zero for coincident points. The haversine term is clamped to
/// `[0, 1]` so antipodal and polar inputs never produce NaN.
///
/// # Example
///
/// ```
/// use storefinder::position::distance_meters;
///
/// let seoul_to_busan = distance_meters(37.5665, 126.9780, 35.1796, 129.0756);
/// assert!((seoul_to_busan - 325_000.0).abs() < 3_250.0);
/// ```
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    // abs() keeps the result bit-identical when the points are swapped
    let d_phi = (lat2 - lat1).abs().to_radians();
    let d_lambda = (lng2 - lng1).abs().to_radians();

    let sin_half_phi = (d_phi / 2.0).sin();
    let sin_half_lambda = (d_lambda / 2.0).sin();

    let h = sin_half_phi * sin_half_phi + phi1.cos() * phi2.cos() * sin_half_lambda * sin_half_lambda;
    let h = h.clamp(0.0, 1.0);

    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    (EARTH_RADIUS_METERS * central_angle).round().max(0.0)
}
