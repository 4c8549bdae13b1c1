//! Waypoint clustering for waymark maps
//!
//! A cluster pyramid is built over the waypoint list (one R-tree per zoom level),
//! queried with the bounding box and zoom derived from the visible region, and
//! expanded on demand when a cluster marker is pressed.
//!
//! ```
//! use waymark_cluster::{RegionTracker, WaypointClusterer, ZoomPolicy};
//! use waymark_common::{Region, Waypoint};
//!
//! let mut clusterer = WaypointClusterer::default();
//! clusterer.set_waypoints(vec![
//!     Waypoint::new(50.8503, 4.3517).with_id("a"),
//!     Waypoint::new(50.8504, 4.3518).with_id("b"),
//! ]);
//!
//! let mut tracker = RegionTracker::new(ZoomPolicy::Fractional);
//! let viewport = tracker
//!     .region_change_complete(Region::new(50.85, 4.35, 0.5, 0.5))
//!     .unwrap();
//! let features = clusterer.query(&viewport).unwrap();
//! assert_eq!(features.len(), 1);
//! assert_eq!(features[0].point_count(), 2);
//! ```

pub mod adapter;
pub mod expansion;
pub mod feature;
pub mod index;
pub mod projection;
pub mod viewport;

pub use adapter::WaypointClusterer;
pub use expansion::{region_for_points, ClusterExpansion};
pub use feature::{ClusterFeature, Feature, LeafFeature};
pub use index::{ClusterId, ClusterIndex, ClusterOptions};
pub use viewport::{zoom_from_delta, BoundingBox, RegionTracker, Viewport, ZoomPolicy};
