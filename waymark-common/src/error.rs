//! Error types for the waymark map layer
//!
//! Every library crate in the workspace returns this error. The map component
//! swallows it at its boundary (logging it), so callers of `MapView` never see it;
//! lower-level users of the clustering crate do.

use thiserror::Error;

/// Main error type for waymark operations
#[derive(Debug, Error)]
pub enum Error {
    /// Region center is not finite
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Bounding box passed to a cluster query is not usable
    #[error("Invalid bounds [{west}, {south}, {east}, {north}]")]
    InvalidBounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },

    /// Coordinate outside the WGS84 range or not finite
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Cluster handle that does not belong to the current index
    #[error("Cluster '{0}' not found in the current index")]
    UnknownCluster(String),

    /// The container view is not mounted yet, initialization must wait
    #[error("Map container is not ready")]
    ContainerNotReady,

    /// The web map SDK needs an access token and none was configured
    #[error("No access token configured for the web map backend")]
    MissingAccessToken,

    /// A backend operation ran before `initialize` succeeded
    #[error("Map backend is not initialized")]
    BackendNotInitialized,

    /// Invalid configuration file or value
    #[error("Configuration error: {0}")]
    Config(String),

    /// `config::install` was called a second time
    #[error("Map configuration is already installed")]
    ConfigAlreadyInstalled,

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convenience result type for waymark operations
pub type Result<T> = std::result::Result<T, Error>;
