//! CLI-specific utilities for the waymark preview tool
//!
//! Input parsing and logging setup, kept apart from the map libraries.

pub mod input;
pub mod logging;

pub use input::{load_config, parse_region, read_path, read_waypoints};
