//! Camera math shared by both backends
//!
//! Both backends use the same degree-based zoom model as the viewport tracker:
//! a zoom `z` shows `360 / 2^z` degrees of latitude, and the longitude span follows
//! the container's aspect ratio.

use std::time::Duration;

use waymark_cluster::{zoom_from_delta, BoundingBox};
use waymark_common::{Coordinate, Region};

/// Smallest container dimension used for aspect ratios
const MIN_DIMENSION: f64 = 1.0;

/// Region visible with `center` at `zoom` in a `width` x `height` container
pub fn region_for_camera(center: Coordinate, zoom: f64, width: u32, height: u32) -> Region {
    let latitude_delta = 360.0 / 2f64.powf(zoom);
    let aspect = f64::from(width).max(MIN_DIMENSION) / f64::from(height).max(MIN_DIMENSION);
    Region::new(
        center.latitude,
        center.longitude,
        latitude_delta,
        latitude_delta * aspect,
    )
}

/// Center and zoom that frame `bbox` inside the container minus `padding` pixels per side
///
/// The zoom never exceeds `max_zoom`, so a single point does not zoom in indefinitely.
pub fn fit_bounds(
    bbox: &BoundingBox,
    width: u32,
    height: u32,
    padding: u32,
    max_zoom: f64,
) -> (Coordinate, f64) {
    let center = Coordinate::new(
        (bbox.south + bbox.north) / 2.0,
        (bbox.west + bbox.east) / 2.0,
    );

    let height_px = f64::from(height).max(MIN_DIMENSION);
    let usable_width = (f64::from(width) - 2.0 * f64::from(padding)).max(MIN_DIMENSION);
    let usable_height = (height_px - 2.0 * f64::from(padding)).max(MIN_DIMENSION);

    let lat_span = (bbox.north - bbox.south).abs();
    let lng_span = (bbox.east - bbox.west).abs();
    let needed = (lat_span * height_px / usable_height).max(lng_span * height_px / usable_width);

    (center, zoom_from_delta(needed).min(max_zoom))
}

/// Ease-in-out cubic on `t` in `[0, 1]`
fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A timed move from one region to another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransition {
    pub from: Region,
    pub to: Region,
    pub duration: Duration,
}

impl CameraTransition {
    pub fn new(from: Region, to: Region, duration: Duration) -> Self {
        Self { from, to, duration }
    }

    /// Region shown `elapsed` into the transition
    pub fn sample(&self, elapsed: Duration) -> Region {
        if self.is_finished(elapsed) {
            return self.to;
        }
        let t = ease_in_out(elapsed.as_secs_f64() / self.duration.as_secs_f64());
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Region::new(
            lerp(self.from.latitude, self.to.latitude),
            lerp(self.from.longitude, self.to.longitude),
            lerp(self.from.latitude_delta, self.to.latitude_delta),
            lerp(self.from.longitude_delta, self.to.longitude_delta),
        )
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_for_camera_matches_zoom_model() {
        let region = region_for_camera(Coordinate::new(50.0, 4.0), 3.0, 800, 400);
        assert!((region.latitude_delta - 45.0).abs() < 1e-12);
        assert!((region.longitude_delta - 90.0).abs() < 1e-12);
        assert!((zoom_from_delta(region.latitude_delta) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_bounds_frames_box() {
        let bbox = BoundingBox {
            west: 4.0,
            south: 50.0,
            east: 5.0,
            north: 51.0,
        };
        let (center, zoom) = fit_bounds(&bbox, 400, 400, 0, 20.0);
        assert_eq!(center, Coordinate::new(50.5, 4.5));

        let region = region_for_camera(center, zoom, 400, 400);
        assert!(region.latitude_delta >= 1.0 - 1e-9);
        assert!(region.longitude_delta >= 1.0 - 1e-9);
        assert!((zoom - 360f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn test_fit_bounds_padding_zooms_out() {
        let bbox = BoundingBox {
            west: 4.0,
            south: 50.0,
            east: 5.0,
            north: 51.0,
        };
        let (_, tight) = fit_bounds(&bbox, 400, 400, 0, 20.0);
        let (_, padded) = fit_bounds(&bbox, 400, 400, 50, 20.0);
        assert!(padded < tight);
    }

    #[test]
    fn test_fit_single_point_caps_zoom() {
        let bbox = BoundingBox {
            west: 4.0,
            south: 50.0,
            east: 4.0,
            north: 50.0,
        };
        let (_, zoom) = fit_bounds(&bbox, 400, 300, 40, 15.0);
        assert_eq!(zoom, 15.0);
    }

    #[test]
    fn test_transition_endpoints() {
        let from = Region::new(0.0, 0.0, 10.0, 10.0);
        let to = Region::new(10.0, 20.0, 1.0, 1.0);
        let transition = CameraTransition::new(from, to, Duration::from_millis(500));

        assert_eq!(transition.sample(Duration::ZERO), from);
        assert_eq!(transition.sample(Duration::from_millis(500)), to);
        assert_eq!(transition.sample(Duration::from_secs(3)), to);

        let mid = transition.sample(Duration::from_millis(250));
        assert!((mid.latitude - 5.0).abs() < 1e-9);
        assert!((mid.longitude - 10.0).abs() < 1e-9);
        assert!(!transition.is_finished(Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_duration_jumps() {
        let to = Region::new(1.0, 1.0, 1.0, 1.0);
        let transition = CameraTransition::new(Region::new(0.0, 0.0, 1.0, 1.0), to, Duration::ZERO);
        assert_eq!(transition.sample(Duration::ZERO), to);
    }
}
