//! Argument parsing and input files for the preview CLI

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use waymark_common::{MapConfig, Region, RoutePath, Waypoint};

/// Parse `lat,lng,latDelta,lngDelta`
pub fn parse_region(s: &str) -> std::result::Result<Region, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err("region must be in format 'lat,lng,latDelta,lngDelta'".to_string());
    }
    let mut values = [0.0f64; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|_| format!("'{part}' is not a number"))?;
    }
    Ok(Region::new(values[0], values[1], values[2], values[3]))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid {what} JSON in {}", path.display()))
}

/// JSON array of waypoint objects
pub fn read_waypoints(path: &Path) -> Result<Vec<Waypoint>> {
    read_json(path, "waypoints")
}

/// JSON array of `{ "latitude": .., "longitude": .. }` points, all inside WGS84
pub fn read_path(path: &Path) -> Result<RoutePath> {
    let points: RoutePath = read_json(path, "path")?;
    for (i, point) in points.iter().enumerate() {
        point
            .validate()
            .with_context(|| format!("point {i} of path file {}", path.display()))?;
    }
    Ok(points)
}

/// Configuration from `path`, or the defaults plus the environment override
pub fn load_config(path: Option<&Path>) -> Result<MapConfig> {
    match path {
        Some(path) => MapConfig::from_path(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(MapConfig::from_env()),
    }
}
