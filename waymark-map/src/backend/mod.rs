//! Map backend contract
//!
//! A backend models one map SDK: it owns the camera and the retained scene (markers,
//! polylines, callouts) and exposes that scene as JSON. `MapView` drives a backend
//! through this trait and never branches on which one it has.

mod native;
mod web;

pub use native::NativeBackend;
pub use web::{WebBackend, WebCamera};

use std::time::Duration;

use serde::Serialize;
use waymark_cluster::ZoomPolicy;
use waymark_common::{Region, Result, Waypoint};

use crate::marker::MarkerDescriptor;
use crate::overlay::OverlayScene;
use crate::props::GestureSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Native,
    Web,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::Web => f.write_str("web"),
        }
    }
}

/// The host surface a backend renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container {
    pub width: u32,
    pub height: u32,
    /// Whether the host view is mounted in the layout tree
    pub attached: bool,
}

impl Container {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            attached: true,
        }
    }

    /// A container whose host view has not been laid out yet
    pub fn detached(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            attached: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.attached && self.width > 0 && self.height > 0
    }
}

/// Text shown above a marker when its press is not handled by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Callout {
    pub marker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Callout {
    fn for_marker(markers: &[MarkerDescriptor], marker_id: &str) -> Option<Self> {
        markers
            .iter()
            .find(|m| !m.is_cluster() && m.id == marker_id)
            .map(|m| Self {
                marker_id: m.id.clone(),
                title: m.title.clone(),
                description: m.description.clone(),
            })
    }
}

pub trait MapBackend {
    fn kind(&self) -> BackendKind;

    /// How region zoom is fed to the cluster index
    fn zoom_policy(&self) -> ZoomPolicy;

    /// Cluster merge radius in pixels
    fn cluster_radius(&self) -> f64;

    /// Create the map in `container` showing `region`
    ///
    /// Fails with `ContainerNotReady` while the container is not laid out; the
    /// caller retries on the next mount.
    fn initialize(&mut self, container: &Container, region: &Region) -> Result<()>;

    fn is_initialized(&self) -> bool;

    fn set_gestures(&mut self, gestures: &GestureSettings) -> Result<()>;

    /// Move the camera to `region` over `duration`
    fn animate_to_region(&mut self, region: &Region, duration: Duration) -> Result<()>;

    /// Replace every marker
    fn set_markers(&mut self, markers: &[MarkerDescriptor]) -> Result<()>;

    /// Replace the route/pen overlay
    fn set_overlay(&mut self, overlay: &OverlayScene) -> Result<()>;

    /// React to a new waypoint list
    ///
    /// Returns the region the camera moved to when the backend repositioned itself.
    fn waypoints_changed(&mut self, _waypoints: &[Waypoint]) -> Result<Option<Region>> {
        Ok(None)
    }

    /// Show the callout of a rendered leaf marker
    fn show_callout(&mut self, marker_id: &str) -> Result<()>;

    /// Region the camera currently shows
    fn current_region(&self) -> Option<Region>;

    /// Tear the map down; the backend may be initialized again afterwards
    fn release(&mut self);

    /// Retained scene as JSON
    fn scene(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_readiness() {
        assert!(Container::new(320, 480).is_ready());
        assert!(!Container::detached(320, 480).is_ready());
        assert!(!Container::new(0, 480).is_ready());
    }

    #[test]
    fn test_backend_kind_names() {
        assert_eq!(BackendKind::Native.to_string(), "native");
        assert_eq!(serde_json::to_string(&BackendKind::Web).unwrap(), "\"web\"");
    }
}
