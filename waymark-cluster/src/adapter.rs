//! Spatial index adapter: waypoint list in, visible features out
//!
//! Owns the waypoint list and the cluster index built from it. The index is rebuilt
//! from scratch whenever the list changes. While a drawing mode is active the index
//! is bypassed and every waypoint comes back as its own leaf.

use waymark_common::{Coordinate, DrawingMode, Error, Result, Waypoint};

use crate::expansion::{region_for_points, ClusterExpansion};
use crate::feature::{Feature, LeafFeature};
use crate::index::{ClusterId, ClusterIndex, ClusterOptions};
use crate::viewport::Viewport;

#[derive(Default)]
pub struct WaypointClusterer {
    options: ClusterOptions,
    waypoints: Vec<Waypoint>,
    /// Valid waypoints, in list order
    leaves: Vec<LeafFeature>,
    index: Option<ClusterIndex>,
    drawing_mode: Option<DrawingMode>,
}

impl WaypointClusterer {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ClusterOptions) {
        if self.options != options {
            self.options = options;
            self.rebuild();
        }
    }

    /// Replace the waypoint list and rebuild the index
    ///
    /// Waypoints with non-finite or out-of-range coordinates are skipped; the rest
    /// keep identities based on their position in `waypoints`.
    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        let mut skipped = 0usize;
        self.leaves = waypoints
            .iter()
            .enumerate()
            .filter_map(|(index, waypoint)| {
                if waypoint.is_valid() {
                    Some(LeafFeature::from_waypoint(waypoint, index))
                } else {
                    skipped += 1;
                    tracing::warn!(
                        index,
                        latitude = waypoint.latitude,
                        longitude = waypoint.longitude,
                        "skipping waypoint with invalid coordinates"
                    );
                    None
                }
            })
            .collect();
        self.waypoints = waypoints;
        self.rebuild();

        tracing::debug!(
            waypoints = self.waypoints.len(),
            indexed = self.leaves.len(),
            skipped,
            "waypoint list replaced"
        );
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Number of waypoints that made it into the index
    pub fn indexed_len(&self) -> usize {
        self.leaves.len()
    }

    pub fn set_drawing_mode(&mut self, mode: Option<DrawingMode>) {
        self.drawing_mode = mode;
    }

    pub fn drawing_mode(&self) -> Option<DrawingMode> {
        self.drawing_mode
    }

    /// True while a drawing mode forces one leaf per waypoint
    pub fn is_bypassed(&self) -> bool {
        self.drawing_mode.is_some()
    }

    /// Features visible in `viewport`
    ///
    /// An empty list (or one where every waypoint was invalid) yields no features.
    pub fn query(&self, viewport: &Viewport) -> Result<Vec<Feature>> {
        if self.is_bypassed() {
            return Ok(self.leaves.iter().cloned().map(Feature::Leaf).collect());
        }
        match &self.index {
            Some(index) => index.clusters(viewport.bbox.to_array(), viewport.zoom),
            None => Ok(Vec::new()),
        }
    }

    /// Leaves of a cluster plus the region that frames them
    pub fn expand(&self, id: ClusterId) -> Result<ClusterExpansion> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::UnknownCluster(id.to_string()))?;
        let leaves = index.leaves(id)?;
        let coordinates: Vec<Coordinate> = leaves.iter().map(|leaf| leaf.coordinate).collect();
        let region =
            region_for_points(&coordinates).ok_or_else(|| Error::UnknownCluster(id.to_string()))?;

        Ok(ClusterExpansion {
            cluster: id,
            expansion_zoom: index.expansion_zoom(id)?,
            leaves,
            region,
        })
    }

    /// Drop the waypoints and the index
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.leaves.clear();
        self.index = None;
    }

    fn rebuild(&mut self) {
        self.index = if self.leaves.is_empty() {
            None
        } else {
            Some(ClusterIndex::build(self.options.clone(), self.leaves.clone()))
        };
    }
}
