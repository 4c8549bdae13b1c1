//! Region/viewport tracking
//!
//! Converts the region reported by a map backend into the bounding box and zoom the
//! cluster index is queried with. Only "change complete" events produce a query;
//! intermediate frames of a gesture are recorded but never re-cluster.

use waymark_common::{Error, Region, Result};

/// Smallest latitude span used for zoom derivation
pub const MIN_LATITUDE_DELTA: f64 = 0.001;

/// Largest latitude span used for zoom derivation (whole world, zoom 0)
pub const MAX_LATITUDE_DELTA: f64 = 360.0;

/// `log2(360 / delta)` with the span clamped so the result is always finite
pub fn zoom_from_delta(latitude_delta: f64) -> f64 {
    // f64::max returns the other operand when one side is NaN
    let delta = latitude_delta
        .max(MIN_LATITUDE_DELTA)
        .min(MAX_LATITUDE_DELTA);
    (360.0 / delta).log2()
}

/// How a backend feeds zoom to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomPolicy {
    /// Native SDK: the index floors fractional zooms itself
    Fractional,
    /// Web SDK: integer zoom levels
    Rounded,
}

impl ZoomPolicy {
    pub fn apply(&self, zoom: f64) -> f64 {
        match self {
            ZoomPolicy::Fractional => zoom,
            ZoomPolicy::Rounded => zoom.round(),
        }
    }
}

/// `[west, south, east, north]` in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn from_region(region: &Region) -> Self {
        let [west, south, east, north] = region.bounds();
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude) && (self.west..=self.east).contains(&longitude)
    }
}

/// What the cluster index is queried with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: f64,
}

impl Viewport {
    /// Sanitize `region` and derive its query box and zoom
    ///
    /// Spans that are zero, negative or NaN fall back to the smallest span; a
    /// non-finite center cannot be repaired and is an error.
    pub fn from_region(region: &Region, policy: ZoomPolicy) -> Result<Self> {
        if !region.latitude.is_finite() || !region.longitude.is_finite() {
            return Err(Error::InvalidRegion(format!(
                "center ({}, {}) is not finite",
                region.latitude, region.longitude
            )));
        }
        let sanitized = sanitize(region);
        Ok(Self {
            bbox: BoundingBox::from_region(&sanitized),
            zoom: policy.apply(zoom_from_delta(sanitized.latitude_delta)),
        })
    }
}

fn sanitize(region: &Region) -> Region {
    let clamp_delta = |delta: f64| {
        if delta.is_finite() && delta > 0.0 {
            delta
        } else if delta == f64::INFINITY {
            MAX_LATITUDE_DELTA
        } else {
            MIN_LATITUDE_DELTA
        }
    };
    Region::new(
        region.latitude,
        region.longitude,
        clamp_delta(region.latitude_delta),
        clamp_delta(region.longitude_delta),
    )
}

/// Follows the backend's region events
#[derive(Debug, Clone)]
pub struct RegionTracker {
    policy: ZoomPolicy,
    settled: Option<Region>,
    in_progress: Option<Region>,
}

impl RegionTracker {
    pub fn new(policy: ZoomPolicy) -> Self {
        Self {
            policy,
            settled: None,
            in_progress: None,
        }
    }

    pub fn policy(&self) -> ZoomPolicy {
        self.policy
    }

    /// A gesture frame; recorded, never queried
    pub fn region_changing(&mut self, region: Region) {
        self.in_progress = Some(region);
    }

    /// The gesture or animation settled; returns the viewport to re-query
    pub fn region_change_complete(&mut self, region: Region) -> Result<Viewport> {
        let viewport = Viewport::from_region(&region, self.policy)?;
        self.in_progress = None;
        self.settled = Some(region);
        Ok(viewport)
    }

    /// Last settled region
    pub fn region(&self) -> Option<Region> {
        self.settled
    }

    /// Region currently under a gesture, if any
    pub fn in_progress(&self) -> Option<Region> {
        self.in_progress
    }

    /// Viewport of the last settled region; `None` until one is known
    pub fn viewport(&self) -> Option<Viewport> {
        self.settled
            .and_then(|region| Viewport::from_region(&region, self.policy).ok())
    }

    pub fn reset(&mut self) {
        self.settled = None;
        self.in_progress = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_from_small_delta() {
        let expected = (360.0f64 / 0.001).log2();
        assert!((zoom_from_delta(0.001) - expected).abs() < 1e-12);
        assert!((zoom_from_delta(360.0)).abs() < 1e-12);
        assert!((zoom_from_delta(45.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_from_degenerate_delta_is_finite() {
        for delta in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let zoom = zoom_from_delta(delta);
            assert!(zoom.is_finite(), "delta {delta} gave {zoom}");
        }
        assert_eq!(zoom_from_delta(0.0), zoom_from_delta(MIN_LATITUDE_DELTA));
    }

    #[test]
    fn test_policies() {
        let region = Region::new(50.0, 4.0, 0.3, 0.3);
        let native = Viewport::from_region(&region, ZoomPolicy::Fractional).unwrap();
        let web = Viewport::from_region(&region, ZoomPolicy::Rounded).unwrap();
        assert!((native.zoom - (1200.0f64).log2()).abs() < 1e-9);
        assert_eq!(web.zoom, 10.0);
    }

    #[test]
    fn test_bbox_from_region() {
        let viewport =
            Viewport::from_region(&Region::new(11.0, 12.0, 2.4, 4.8), ZoomPolicy::Fractional).unwrap();
        let [west, south, east, north] = viewport.bbox.to_array();
        assert!((west - 9.6).abs() < 1e-12);
        assert!((south - 9.8).abs() < 1e-12);
        assert!((east - 14.4).abs() < 1e-12);
        assert!((north - 12.2).abs() < 1e-12);
        assert!(viewport.bbox.contains(11.0, 12.0));
    }

    #[test]
    fn test_zero_deltas_are_clamped() {
        let viewport =
            Viewport::from_region(&Region::new(0.0, 0.0, 0.0, 0.0), ZoomPolicy::Fractional).unwrap();
        assert!(viewport.zoom.is_finite());
        assert!(viewport.bbox.east > viewport.bbox.west);
    }

    #[test]
    fn test_non_finite_center_is_rejected() {
        let region = Region::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(matches!(
            Viewport::from_region(&region, ZoomPolicy::Rounded),
            Err(Error::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_tracker_only_settles_on_complete() {
        let mut tracker = RegionTracker::new(ZoomPolicy::Rounded);
        assert!(tracker.viewport().is_none());

        tracker.region_changing(Region::new(1.0, 1.0, 1.0, 1.0));
        assert!(tracker.region().is_none());
        assert!(tracker.in_progress().is_some());

        let viewport = tracker
            .region_change_complete(Region::new(2.0, 2.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(tracker.region(), Some(Region::new(2.0, 2.0, 1.0, 1.0)));
        assert!(tracker.in_progress().is_none());
        assert_eq!(tracker.viewport(), Some(viewport));
    }

    #[test]
    fn test_tracker_keeps_last_good_region_on_error() {
        let mut tracker = RegionTracker::new(ZoomPolicy::Fractional);
        tracker
            .region_change_complete(Region::new(2.0, 2.0, 1.0, 1.0))
            .unwrap();
        assert!(tracker
            .region_change_complete(Region::new(f64::INFINITY, 2.0, 1.0, 1.0))
            .is_err());
        assert_eq!(tracker.region(), Some(Region::new(2.0, 2.0, 1.0, 1.0)));
    }
}
