//! Cluster pyramid over per-zoom R-trees
//!
//! Points are projected to unit Web Mercator space and clustered greedily from the
//! finest zoom (`max_zoom + 1`, every point on its own) down to `min_zoom`. At each
//! zoom an unvisited node absorbs every unvisited neighbour within
//! `radius / (extent * 2^zoom)` and becomes a weighted-centroid cluster. Each level
//! keeps its own R-tree so a viewport query is a single envelope lookup.
//!
//! The index is immutable once built; a new waypoint list means a new index.

use std::fmt;
use std::str::FromStr;

use rstar::{primitives::GeomWithData, RTree, AABB};
use rustc_hash::FxHashMap;
use waymark_common::{ClusterTuning, Coordinate, Error, Result};

use crate::feature::{ClusterFeature, Feature, LeafFeature};
use crate::projection::{lat_y, lng_x, x_lng, y_lat, MAX_LATITUDE};

/// Node position in unit space, tagged with its slot in the level
type IndexedNode = GeomWithData<[f64; 2], u32>;

/// Highest zoom the pyramid accepts
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

/// Opaque handle to a cluster: the zoom it was formed at and its slot in that level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId {
    zoom: u8,
    slot: u32,
}

impl ClusterId {
    pub fn new(zoom: u8, slot: u32) -> Self {
        Self { zoom, slot }
    }

    /// Zoom level the cluster was formed at
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z{}-{}", self.zoom, self.slot)
    }
}

impl FromStr for ClusterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownCluster(s.to_string());
        let (zoom, slot) = s
            .strip_prefix('z')
            .and_then(|rest| rest.split_once('-'))
            .ok_or_else(unknown)?;
        Ok(ClusterId {
            zoom: zoom.parse().map_err(|_| unknown())?,
            slot: slot.parse().map_err(|_| unknown())?,
        })
    }
}

/// Clustering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOptions {
    /// Merge radius in pixels
    pub radius: f64,
    /// Tile extent in pixels the radius is measured against
    pub extent: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 40.0,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: 15,
            min_points: 2,
        }
    }
}

impl ClusterOptions {
    pub fn from_tuning(tuning: &ClusterTuning, radius: f64) -> Self {
        Self {
            radius,
            extent: tuning.extent,
            min_zoom: tuning.min_zoom,
            max_zoom: tuning.max_zoom,
            min_points: tuning.min_points,
        }
    }

    /// Zoom range ordered and capped, minimum cluster size at least 2
    fn normalized(&self) -> Self {
        let max_zoom = self.max_zoom.min(MAX_SUPPORTED_ZOOM);
        Self {
            radius: self.radius,
            extent: self.extent,
            min_zoom: self.min_zoom.min(max_zoom),
            max_zoom,
            min_points: self.min_points.max(2),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    /// Index into `ClusterIndex::leaves`
    Point(u32),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    point_count: usize,
    /// Zoom at which this node was last absorbed or kept; `None` = untouched
    visited: Option<u8>,
    kind: NodeKind,
}

impl Node {
    fn is_unvisited_at(&self, zoom: u8) -> bool {
        self.visited.map_or(true, |v| v > zoom)
    }

    /// Copy carried up to the next coarser level
    fn promoted(&self) -> Node {
        Node {
            visited: None,
            ..self.clone()
        }
    }
}

struct Level {
    nodes: Vec<Node>,
    tree: RTree<IndexedNode>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let entries = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| IndexedNode::new([node.x, node.y], slot as u32))
            .collect();
        Self {
            nodes,
            tree: RTree::bulk_load(entries),
        }
    }
}

/// Immutable cluster pyramid over one waypoint list
pub struct ClusterIndex {
    options: ClusterOptions,
    leaves: Vec<LeafFeature>,
    /// `levels[0]` is `min_zoom`, the last entry is `max_zoom + 1` (unclustered)
    levels: Vec<Level>,
    /// Children of each cluster, as slots in the level one zoom finer
    children: FxHashMap<ClusterId, Vec<u32>>,
}

impl ClusterIndex {
    /// Build the whole pyramid from scratch
    pub fn build(options: ClusterOptions, leaves: Vec<LeafFeature>) -> Self {
        let options = options.normalized();
        let nodes = leaves
            .iter()
            .enumerate()
            .map(|(i, leaf)| Node {
                x: lng_x(leaf.coordinate.longitude),
                y: lat_y(leaf.coordinate.latitude),
                point_count: 1,
                visited: None,
                kind: NodeKind::Point(i as u32),
            })
            .collect();

        let mut children = FxHashMap::default();
        let mut levels = Vec::with_capacity((options.max_zoom - options.min_zoom) as usize + 2);
        let mut finer = Level::new(nodes);

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let coarser = cluster_level(&mut finer, zoom, &options, &mut children);
            levels.push(finer);
            finer = Level::new(coarser);
        }
        levels.push(finer);
        levels.reverse();

        tracing::debug!(
            points = leaves.len(),
            clusters = children.len(),
            min_zoom = options.min_zoom,
            max_zoom = options.max_zoom,
            "built cluster index"
        );

        Self {
            options,
            leaves,
            levels,
            children,
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Features visible in `[west, south, east, north]` at `zoom`
    ///
    /// Longitudes wrap, latitudes clamp, and a box crossing the antimeridian is
    /// answered as its eastern and western halves. Fractional zooms are floored.
    pub fn clusters(&self, bbox: [f64; 4], zoom: f64) -> Result<Vec<Feature>> {
        let [west, south, east, north] = bbox;
        if !bbox.iter().all(|v| v.is_finite()) || zoom.is_nan() {
            return Err(Error::InvalidBounds {
                west,
                south,
                east,
                north,
            });
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut min_lng = wrap_longitude(west);
        let min_lat = south.clamp(-90.0, 90.0);
        let mut max_lng = if east == 180.0 { 180.0 } else { wrap_longitude(east) };
        let max_lat = north.clamp(-90.0, 90.0);

        if east - west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut features = self.clusters([min_lng, min_lat, 180.0, max_lat], zoom)?;
            features.extend(self.clusters([-180.0, min_lat, max_lng, max_lat], zoom)?);
            return Ok(features);
        }

        let Some(level) = self.level_for(zoom) else {
            return Ok(Vec::new());
        };
        let envelope = AABB::from_corners(
            [lng_x(min_lng), lat_y(max_lat.min(MAX_LATITUDE))],
            [lng_x(max_lng), lat_y(min_lat.max(-MAX_LATITUDE))],
        );
        let mut slots: Vec<u32> = level
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        slots.sort_unstable();

        Ok(slots
            .into_iter()
            .map(|slot| self.feature(&level.nodes[slot as usize]))
            .filter(|feature| match feature {
                // Polar points share the square's edge, so check their true latitude
                Feature::Leaf(leaf) => {
                    let lat = leaf.coordinate.latitude;
                    lat.abs() <= MAX_LATITUDE || (min_lat..=max_lat).contains(&lat)
                }
                Feature::Cluster(_) => true,
            })
            .collect())
    }

    /// Direct children of a cluster, one zoom finer than it was formed
    pub fn children(&self, id: ClusterId) -> Result<Vec<Feature>> {
        let slots = self.children_of(id)?;
        let level = self.child_level(id)?;
        Ok(slots
            .iter()
            .map(|&slot| self.feature(&level.nodes[slot as usize]))
            .collect())
    }

    /// Every waypoint under a cluster, ordered by waypoint index
    pub fn leaves(&self, id: ClusterId) -> Result<Vec<LeafFeature>> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out)?;
        out.sort_by_key(|leaf| leaf.index);
        Ok(out)
    }

    /// Zoom at which the cluster splits into its children
    pub fn expansion_zoom(&self, id: ClusterId) -> Result<u8> {
        self.children_of(id)?;
        Ok(id.zoom + 1)
    }

    fn collect_leaves(&self, id: ClusterId, out: &mut Vec<LeafFeature>) -> Result<()> {
        let slots = self.children_of(id)?;
        let level = self.child_level(id)?;
        for &slot in slots {
            match level.nodes[slot as usize].kind {
                NodeKind::Point(i) => out.push(self.leaves[i as usize].clone()),
                NodeKind::Cluster(child) => self.collect_leaves(child, out)?,
            }
        }
        Ok(())
    }

    fn children_of(&self, id: ClusterId) -> Result<&[u32]> {
        self.children
            .get(&id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownCluster(id.to_string()))
    }

    /// Level one zoom finer than the cluster was formed at
    fn child_level(&self, id: ClusterId) -> Result<&Level> {
        id.zoom
            .checked_add(1)
            .and_then(|zoom| self.level_at(zoom))
            .ok_or_else(|| Error::UnknownCluster(id.to_string()))
    }

    fn level_for(&self, zoom: f64) -> Option<&Level> {
        let zoom = zoom
            .floor()
            .clamp(self.options.min_zoom as f64, self.options.max_zoom as f64 + 1.0);
        self.level_at(zoom as u8)
    }

    /// `None` outside `[min_zoom, max_zoom + 1]`
    fn level_at(&self, zoom: u8) -> Option<&Level> {
        zoom.checked_sub(self.options.min_zoom)
            .and_then(|i| self.levels.get(i as usize))
    }

    fn feature(&self, node: &Node) -> Feature {
        match node.kind {
            NodeKind::Point(i) => Feature::Leaf(self.leaves[i as usize].clone()),
            NodeKind::Cluster(id) => Feature::Cluster(ClusterFeature {
                id,
                coordinate: Coordinate::new(y_lat(node.y), x_lng(node.x)),
                point_count: node.point_count,
            }),
        }
    }
}

/// Cluster `level` at `zoom`, returning the nodes of the next coarser level
fn cluster_level(
    level: &mut Level,
    zoom: u8,
    options: &ClusterOptions,
    children: &mut FxHashMap<ClusterId, Vec<u32>>,
) -> Vec<Node> {
    let radius = options.radius / (options.extent * 2f64.powi(zoom as i32));
    let radius_2 = radius * radius;
    let mut next = Vec::new();

    for i in 0..level.nodes.len() {
        if !level.nodes[i].is_unvisited_at(zoom) {
            continue;
        }
        level.nodes[i].visited = Some(zoom);

        let (x, y, own_count) = {
            let node = &level.nodes[i];
            (node.x, node.y, node.point_count)
        };

        let mut neighbors: Vec<usize> = level
            .tree
            .locate_within_distance([x, y], radius_2)
            .map(|entry| entry.data as usize)
            .filter(|&n| level.nodes[n].is_unvisited_at(zoom))
            .collect();
        neighbors.sort_unstable();

        let count = own_count
            + neighbors
                .iter()
                .map(|&n| level.nodes[n].point_count)
                .sum::<usize>();

        if count > own_count && count >= options.min_points {
            let id = ClusterId::new(zoom, next.len() as u32);
            let mut wx = x * own_count as f64;
            let mut wy = y * own_count as f64;
            let mut members = Vec::with_capacity(neighbors.len() + 1);
            members.push(i as u32);

            for &n in &neighbors {
                let neighbor = &mut level.nodes[n];
                neighbor.visited = Some(zoom);
                wx += neighbor.x * neighbor.point_count as f64;
                wy += neighbor.y * neighbor.point_count as f64;
                members.push(n as u32);
            }

            children.insert(id, members);
            next.push(Node {
                x: wx / count as f64,
                y: wy / count as f64,
                point_count: count,
                visited: None,
                kind: NodeKind::Cluster(id),
            });
        } else {
            next.push(level.nodes[i].promoted());

            // Too few to cluster: neighbours stay individual at this zoom
            if count > own_count {
                for &n in &neighbors {
                    level.nodes[n].visited = Some(zoom);
                    next.push(level.nodes[n].promoted());
                }
            }
        }
    }

    next
}

fn wrap_longitude(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_common::Waypoint;

    fn leaves(points: &[(f64, f64)]) -> Vec<LeafFeature> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| LeafFeature::from_waypoint(&Waypoint::new(lat, lng), i))
            .collect()
    }

    const WORLD: [f64; 4] = [-180.0, -85.0, 180.0, 85.0];

    #[test]
    fn test_cluster_id_text_form() {
        let id = ClusterId::new(7, 42);
        assert_eq!(id.to_string(), "z7-42");
        assert_eq!("z7-42".parse::<ClusterId>().unwrap(), id);
        assert!("7-42".parse::<ClusterId>().is_err());
        assert!("z7".parse::<ClusterId>().is_err());
        assert!("z300-1".parse::<ClusterId>().is_err());
    }

    #[test]
    fn test_close_points_merge_at_low_zoom() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(50.8503, 4.3517), (50.8510, 4.3520), (-33.86, 151.2)]),
        );

        let features = index.clusters(WORLD, 2.0).unwrap();
        assert_eq!(features.len(), 2);
        let cluster = features.iter().find(|f| f.is_cluster()).unwrap();
        assert_eq!(cluster.point_count(), 2);
        let center = cluster.coordinate();
        assert!((center.latitude - 50.85065).abs() < 1e-3);
        assert!((center.longitude - 4.35185).abs() < 1e-3);
    }

    #[test]
    fn test_points_split_beyond_max_zoom() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(50.8503, 4.3517), (50.85031, 4.35171)]),
        );
        // Even at max zoom these two are within the radius
        assert_eq!(index.clusters(WORLD, 15.0).unwrap().len(), 1);
        // max_zoom + 1 is the unclustered level; higher zooms clamp to it
        assert_eq!(index.clusters(WORLD, 16.0).unwrap().len(), 2);
        assert_eq!(index.clusters(WORLD, 22.5).unwrap().len(), 2);
    }

    #[test]
    fn test_children_and_leaves() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(10.0, 10.0), (10.001, 10.001), (10.002, 10.0), (40.0, -70.0)]),
        );
        let features = index.clusters(WORLD, 0.0).unwrap();
        let Some(Feature::Cluster(cluster)) = features.iter().find(|f| f.point_count() == 3) else {
            panic!("expected a cluster of three, got {features:?}");
        };

        let leaves = index.leaves(cluster.id).unwrap();
        assert_eq!(leaves.iter().map(|l| l.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let children = index.children(cluster.id).unwrap();
        assert_eq!(children.iter().map(Feature::point_count).sum::<usize>(), 3);
        assert!(children.len() >= 2);
        assert_eq!(index.expansion_zoom(cluster.id).unwrap(), cluster.id.zoom() + 1);
    }

    #[test]
    fn test_unknown_cluster() {
        let index = ClusterIndex::build(ClusterOptions::default(), leaves(&[(1.0, 1.0)]));
        let err = index.leaves(ClusterId::new(3, 0)).unwrap_err();
        assert!(matches!(err, Error::UnknownCluster(id) if id == "z3-0"));
    }

    #[test]
    fn test_cluster_ids_outside_zoom_range_are_unknown() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(10.0, 10.0), (10.0, 10.0)]),
        );
        for id in [ClusterId::new(16, 0), ClusterId::new(24, 3), ClusterId::new(255, 0)] {
            assert!(matches!(index.leaves(id), Err(Error::UnknownCluster(_))));
            assert!(matches!(index.children(id), Err(Error::UnknownCluster(_))));
            assert!(index.expansion_zoom(id).is_err());
        }

        let options = ClusterOptions {
            min_zoom: 4,
            ..Default::default()
        };
        let index = ClusterIndex::build(options, leaves(&[(10.0, 10.0), (10.0, 10.0)]));
        let err = index.leaves(ClusterId::new(2, 0)).unwrap_err();
        assert!(matches!(err, Error::UnknownCluster(id) if id == "z2-0"));
        assert!(index.children(ClusterId::new(0, 0)).is_err());
        // Ids the index did form still resolve
        let cluster = index.clusters(WORLD, 4.0).unwrap();
        let Some(Feature::Cluster(cluster)) = cluster.first() else {
            panic!("expected a cluster at min_zoom, got {cluster:?}");
        };
        assert_eq!(index.leaves(cluster.id).unwrap().len(), 2);
    }

    #[test]
    fn test_polar_points_outside_box_are_excluded() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(89.5, 10.0), (87.0, 10.0), (60.0, 10.0)]),
        );
        let arctic = index.clusters([0.0, 86.0, 20.0, 88.0], 16.0).unwrap();
        let indices: Vec<usize> = arctic
            .iter()
            .filter_map(|f| f.as_leaf().map(|l| l.index))
            .collect();
        assert_eq!(indices, vec![1]);

        let pole = index.clusters([0.0, 80.0, 20.0, 90.0], 16.0).unwrap();
        assert_eq!(pole.len(), 2);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = ClusterIndex::build(ClusterOptions::default(), Vec::new());
        assert!(index.is_empty());
        assert!(index.clusters(WORLD, 3.0).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        let index = ClusterIndex::build(ClusterOptions::default(), leaves(&[(1.0, 1.0)]));
        assert!(matches!(
            index.clusters([f64::NAN, 0.0, 1.0, 1.0], 3.0),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(index.clusters([0.0, 0.0, 1.0, 1.0], f64::NAN).is_err());
    }

    #[test]
    fn test_bbox_filters_points() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(50.0, 4.0), (48.0, 2.0), (40.0, -74.0)]),
        );
        let europe = index.clusters([-10.0, 35.0, 30.0, 60.0], 16.0).unwrap();
        assert_eq!(europe.len(), 2);
    }

    #[test]
    fn test_antimeridian_query() {
        let index = ClusterIndex::build(
            ClusterOptions::default(),
            leaves(&[(-17.7, 178.0), (-14.3, -170.7), (0.0, 0.0)]),
        );
        // 170°E eastwards across the antimeridian to 165°W
        let features = index.clusters([170.0, -30.0, 195.0, 0.0], 16.0).unwrap();
        assert_eq!(features.len(), 2);
        let indices: Vec<usize> = features
            .iter()
            .filter_map(|f| f.as_leaf().map(|l| l.index))
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_min_points_keeps_small_groups_apart() {
        let options = ClusterOptions {
            min_points: 3,
            ..Default::default()
        };
        let index = ClusterIndex::build(options, leaves(&[(10.0, 10.0), (10.0001, 10.0001)]));
        let features = index.clusters(WORLD, 0.0).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| !f.is_cluster()));
    }

    #[test]
    fn test_inverted_zoom_range_is_normalized() {
        let options = ClusterOptions {
            min_zoom: 12,
            max_zoom: 5,
            ..Default::default()
        };
        let index = ClusterIndex::build(options, leaves(&[(1.0, 1.0), (1.0, 1.0)]));
        assert_eq!(index.options().min_zoom, 5);
        assert_eq!(index.clusters(WORLD, 0.0).unwrap().len(), 1);
    }
}
