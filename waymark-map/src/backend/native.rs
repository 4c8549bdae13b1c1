//! Native map SDK model: region camera, annotations, callouts

use std::time::Duration;

use serde_json::json;
use waymark_cluster::ZoomPolicy;
use waymark_common::{Error, MapConfig, MapStyle, Region, Result};

use super::{BackendKind, Callout, Container, MapBackend};
use crate::camera::CameraTransition;
use crate::marker::MarkerDescriptor;
use crate::overlay::OverlayScene;
use crate::props::GestureSettings;
use crate::snapshot::{Snapshot, SnapshotOptions};

fn map_type(style: MapStyle) -> &'static str {
    match style {
        MapStyle::Standard => "standard",
        MapStyle::Satellite => "satellite",
        MapStyle::Dark => "mutedStandard",
    }
}

#[derive(Debug, Clone)]
pub struct NativeBackend {
    map_type: &'static str,
    cluster_radius: f64,
    container: Option<Container>,
    region: Option<Region>,
    gestures: GestureSettings,
    annotations: Vec<MarkerDescriptor>,
    overlay: OverlayScene,
    callout: Option<Callout>,
    last_transition: Option<CameraTransition>,
}

impl NativeBackend {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            map_type: map_type(config.style),
            cluster_radius: config.clustering.native_radius,
            container: None,
            region: None,
            gestures: GestureSettings::default(),
            annotations: Vec::new(),
            overlay: OverlayScene::default(),
            callout: None,
            last_transition: None,
        }
    }

    pub fn map_type(&self) -> &'static str {
        self.map_type
    }

    pub fn annotations(&self) -> &[MarkerDescriptor] {
        &self.annotations
    }

    pub fn overlay(&self) -> &OverlayScene {
        &self.overlay
    }

    pub fn callout(&self) -> Option<&Callout> {
        self.callout.as_ref()
    }

    pub fn last_transition(&self) -> Option<&CameraTransition> {
        self.last_transition.as_ref()
    }

    /// Render the current scene to SVG
    pub fn take_snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot> {
        let region = options
            .region
            .or(self.region)
            .ok_or(Error::BackendNotInitialized)?;
        Snapshot::capture(options, &region, &self.annotations, &self.overlay)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::BackendNotInitialized)
        }
    }
}

impl MapBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn zoom_policy(&self) -> ZoomPolicy {
        ZoomPolicy::Fractional
    }

    fn cluster_radius(&self) -> f64 {
        self.cluster_radius
    }

    fn initialize(&mut self, container: &Container, region: &Region) -> Result<()> {
        if !container.is_ready() {
            return Err(Error::ContainerNotReady);
        }
        self.container = Some(*container);
        self.region = Some(*region);
        tracing::debug!(
            map_type = self.map_type,
            width = container.width,
            height = container.height,
            "native map initialized"
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.container.is_some()
    }

    fn set_gestures(&mut self, gestures: &GestureSettings) -> Result<()> {
        self.ensure_initialized()?;
        self.gestures = *gestures;
        Ok(())
    }

    fn animate_to_region(&mut self, region: &Region, duration: Duration) -> Result<()> {
        self.ensure_initialized()?;
        let from = self.region.unwrap_or(*region);
        self.last_transition = Some(CameraTransition::new(from, *region, duration));
        self.region = Some(*region);
        Ok(())
    }

    fn set_markers(&mut self, markers: &[MarkerDescriptor]) -> Result<()> {
        self.ensure_initialized()?;
        self.annotations = markers.to_vec();
        if let Some(callout) = &self.callout {
            if Callout::for_marker(&self.annotations, &callout.marker_id).is_none() {
                self.callout = None;
            }
        }
        Ok(())
    }

    fn set_overlay(&mut self, overlay: &OverlayScene) -> Result<()> {
        self.ensure_initialized()?;
        self.overlay = overlay.clone();
        Ok(())
    }

    fn show_callout(&mut self, marker_id: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.callout = Callout::for_marker(&self.annotations, marker_id);
        Ok(())
    }

    fn current_region(&self) -> Option<Region> {
        self.region
    }

    fn release(&mut self) {
        self.container = None;
        self.region = None;
        self.annotations.clear();
        self.overlay = OverlayScene::default();
        self.callout = None;
        self.last_transition = None;
    }

    fn scene(&self) -> serde_json::Value {
        json!({
            "backend": self.kind(),
            "mapType": self.map_type,
            "region": self.region,
            "gestures": self.gestures,
            "annotations": self.annotations,
            "polylines": self.overlay.polylines,
            "overlayMarkers": self.overlay.markers,
            "callout": self.callout,
        })
    }
}
