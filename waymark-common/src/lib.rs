//! Common types for the waymark map layer
//!
//! Waypoints, regions and drawing modes shared by the clustering and map crates,
//! together with the configuration object and the error type every crate returns.

pub mod config;
pub mod error;
pub mod geo;
pub mod palette;

pub use config::{ClusterTuning, MapConfig, MapStyle};
pub use error::{Error, Result};
pub use geo::{Coordinate, DrawingMode, Region, RoutePath, Waypoint};
pub use palette::{Color, Palette};
