//! Regions that reveal the members of a pressed cluster

use geo::{BoundingRect, MultiPoint, Point};
use waymark_common::{Coordinate, Region};

use crate::feature::LeafFeature;
use crate::index::ClusterId;

/// Padding applied to the leaves' span
pub const EXPANSION_PADDING: f64 = 1.2;

/// Span used on an axis where every leaf shares the same value
pub const SINGLE_POINT_DELTA: f64 = 0.02;

/// Result of expanding one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterExpansion {
    pub cluster: ClusterId,
    pub leaves: Vec<LeafFeature>,
    /// Viewport framing every leaf
    pub region: Region,
    /// Zoom at which the cluster breaks apart
    pub expansion_zoom: u8,
}

/// Padded bounding region of `points`; `None` for an empty slice
pub fn region_for_points(points: &[Coordinate]) -> Option<Region> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|c| Point::new(c.longitude, c.latitude))
        .collect();
    let rect = multi.bounding_rect()?;
    let center = rect.center();

    Some(Region::new(
        center.y,
        center.x,
        padded_span(rect.height()),
        padded_span(rect.width()),
    ))
}

fn padded_span(span: f64) -> f64 {
    let padded = span * EXPANSION_PADDING;
    if padded > 0.0 {
        padded
    } else {
        SINGLE_POINT_DELTA
    }
}
