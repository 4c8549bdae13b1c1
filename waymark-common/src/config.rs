//! Map layer configuration
//!
//! Loaded once at startup from TOML (or built in code) and installed process-wide.
//! The web map SDK access token lives here instead of in source.
//!
//! ```toml
//! access_token = "pk.example"
//! style = "satellite"
//! terrain = true
//!
//! [clustering]
//! native_radius = 40
//! web_radius = 50
//! max_zoom = 15
//!
//! [palette]
//! primary = "#69e3c4"
//! ```

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::palette::Palette;

/// Environment variable that overrides `access_token`
pub const ACCESS_TOKEN_ENV: &str = "WAYMARK_ACCESS_TOKEN";

static GLOBAL_CONFIG: OnceLock<MapConfig> = OnceLock::new();

/// Base tile style; backends map it to their own style names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    Standard,
    Satellite,
    Dark,
}

/// Clustering parameters, tuned per backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTuning {
    /// Merge radius in pixels for the native backend
    pub native_radius: f64,
    /// Merge radius in pixels for the web backend
    pub web_radius: f64,
    /// Tile extent the radius is relative to
    pub extent: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Smallest number of points that forms a cluster
    pub min_points: usize,
}

impl Default for ClusterTuning {
    fn default() -> Self {
        Self {
            native_radius: 40.0,
            web_radius: 50.0,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: 15,
            min_points: 2,
        }
    }
}

impl ClusterTuning {
    pub fn validate(&self) -> Result<()> {
        for (name, radius) in [("native_radius", self.native_radius), ("web_radius", self.web_radius)] {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(Error::Config(format!("clustering.{name} must be positive, got {radius}")));
            }
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(Error::Config(format!(
                "clustering.extent must be positive, got {}",
                self.extent
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(Error::Config(format!(
                "clustering.min_zoom ({}) exceeds max_zoom ({})",
                self.min_zoom, self.max_zoom
            )));
        }
        // Cluster ids pack the zoom next to the slot; keep it well inside u8.
        if self.max_zoom > 24 {
            return Err(Error::Config(format!(
                "clustering.max_zoom must be at most 24, got {}",
                self.max_zoom
            )));
        }
        if self.min_points < 2 {
            return Err(Error::Config("clustering.min_points must be at least 2".to_string()));
        }
        Ok(())
    }
}

/// Process-wide map configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Access token for the web map SDK
    pub access_token: Option<String>,
    pub style: MapStyle,
    /// 3D terrain and building extrusion (web backend only)
    pub terrain: bool,
    pub clustering: ClusterTuning,
    pub palette: Palette,
}

impl MapConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MapConfig = toml::from_str(text)?;
        config.clustering.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply the `WAYMARK_ACCESS_TOKEN` override
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded map configuration");
        Ok(config.with_access_token_override(std::env::var(ACCESS_TOKEN_ENV).ok()))
    }

    /// Defaults plus the environment override
    pub fn from_env() -> Self {
        Self::default().with_access_token_override(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    pub fn with_access_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token);
        }
        self
    }
}

/// Install the configuration for the lifetime of the process
pub fn install(config: MapConfig) -> Result<()> {
    config.clustering.validate()?;
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| Error::ConfigAlreadyInstalled)
}

/// The installed configuration, or the defaults when nothing was installed
pub fn global() -> &'static MapConfig {
    static DEFAULT_CONFIG: OnceLock<MapConfig> = OnceLock::new();
    GLOBAL_CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT_CONFIG.get_or_init(MapConfig::default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Color;
    use std::io::Write;

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = MapConfig::from_toml_str(
            r##"
            access_token = "pk.test"
            style = "dark"

            [clustering]
            web_radius = 60

            [palette]
            pen = "#ff0000"
            "##,
        )
        .unwrap();

        assert_eq!(config.access_token.as_deref(), Some("pk.test"));
        assert_eq!(config.style, MapStyle::Dark);
        assert!(!config.terrain);
        assert_eq!(config.clustering.web_radius, 60.0);
        assert_eq!(config.clustering.native_radius, 40.0);
        assert_eq!(config.clustering.max_zoom, 15);
        assert_eq!(config.palette.pen, Color::rgb(255, 0, 0));
        assert_eq!(config.palette.primary, Palette::default().primary);
    }

    #[test]
    fn test_rejects_inverted_zoom_range() {
        let err = MapConfig::from_toml_str("[clustering]\nmin_zoom = 10\nmax_zoom = 4\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_color() {
        let err = MapConfig::from_toml_str("[palette]\nprimary = \"teal\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "terrain = true\nstyle = \"satellite\"").unwrap();

        let config = MapConfig::from_path(file.path()).unwrap();
        assert!(config.terrain);
        assert_eq!(config.style, MapStyle::Satellite);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MapConfig::from_path(Path::new("/nonexistent/waymark.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_access_token_override_ignores_blank_values() {
        let base = MapConfig {
            access_token: Some("pk.file".to_string()),
            ..Default::default()
        };
        let kept = base.clone().with_access_token_override(Some("  ".to_string()));
        assert_eq!(kept.access_token.as_deref(), Some("pk.file"));

        let replaced = base.with_access_token_override(Some("pk.env".to_string()));
        assert_eq!(replaced.access_token.as_deref(), Some("pk.env"));
    }

    #[test]
    fn test_install_only_once() {
        let config = MapConfig {
            terrain: true,
            ..Default::default()
        };
        // Other tests in this binary never install, so the first call wins.
        install(config.clone()).unwrap();
        assert!(matches!(install(MapConfig::default()), Err(Error::ConfigAlreadyInstalled)));
        assert_eq!(global(), &config);
    }
}
