//! Web Mercator projection onto the unit square
//!
//! x grows eastwards from 0 at -180° to 1 at 180°, y grows southwards from 0 at the
//! north edge of the Mercator square to 1 at its south edge. Latitudes beyond the
//! Mercator limit are clamped to the square's edges.

use std::f64::consts::PI;

/// Latitude of the Mercator square's north edge
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Longitude in degrees to unit x
#[inline]
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude in degrees to unit y, clamped to [0, 1]
#[inline]
pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Unit x back to longitude in degrees
#[inline]
pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Unit y back to latitude in degrees
#[inline]
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}
