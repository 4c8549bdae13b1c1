//! The map component
//!
//! `MapView` owns one backend, one clusterer and one region tracker. Props are
//! replaced wholesale on every `update` and diffed against the previous ones so the
//! backend only sees what changed. Internal failures never reach the caller: they
//! are logged and the last successfully rendered markers stay on screen.

use std::time::Duration;

use waymark_cluster::{
    ClusterId, ClusterOptions, Feature, RegionTracker, Viewport, WaypointClusterer,
};
use waymark_common::{config, Coordinate, MapConfig, Region, Result};

use crate::backend::{Container, MapBackend, NativeBackend, WebBackend, WebCamera};
use crate::marker::{MarkerContext, MarkerDescriptor, MarkerKey, MarkerRenderer, CLUSTER_PRESS_ANIMATION};
use crate::overlay::{OverlayInput, OverlayScene, RouteOverlay};
use crate::props::{MapCallbacks, MapProps, PressEvent};
use crate::snapshot::{Snapshot, SnapshotOptions};

/// Duration of the camera move when the `region` prop changes
pub const REGION_PROP_ANIMATION: Duration = Duration::from_millis(1000);

/// Input events reported by the host
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Tap on the map surface
    Press(Coordinate),
    /// Tap on a rendered marker
    MarkerPress(MarkerKey),
    /// A gesture or animation frame
    RegionChange(Region),
    /// The gesture or animation settled
    RegionChangeComplete(Region),
}

/// Whether the host should keep propagating an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Stop,
}

/// Imperative control over a mounted map
pub trait MapHandle {
    fn animate_to_region(&mut self, region: Region, duration: Duration);
}

pub struct MapView<B: MapBackend> {
    backend: B,
    props: MapProps,
    callbacks: MapCallbacks,
    clusterer: WaypointClusterer,
    tracker: RegionTracker,
    renderer: MarkerRenderer,
    overlay: RouteOverlay,
    features: Vec<Feature>,
    markers: Vec<MarkerDescriptor>,
    overlay_scene: OverlayScene,
}

impl<B: MapBackend> MapView<B> {
    /// A view using the process-wide configuration
    pub fn new(backend: B, props: MapProps) -> Self {
        Self::with_config(backend, props, config::global())
    }

    pub fn with_config(backend: B, props: MapProps, config: &MapConfig) -> Self {
        let options = ClusterOptions::from_tuning(&config.clustering, backend.cluster_radius());
        let mut clusterer = WaypointClusterer::new(options);
        clusterer.set_waypoints(props.waypoints.clone());
        clusterer.set_drawing_mode(props.drawing_mode);

        Self {
            tracker: RegionTracker::new(backend.zoom_policy()),
            renderer: MarkerRenderer::new(config.palette.clone()),
            overlay: RouteOverlay::new(config.palette.clone()),
            backend,
            props,
            callbacks: MapCallbacks::default(),
            clusterer,
            features: Vec::new(),
            markers: Vec::new(),
            overlay_scene: OverlayScene::default(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: MapCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn set_callbacks(&mut self, callbacks: MapCallbacks) {
        self.callbacks = callbacks;
    }

    pub fn props(&self) -> &MapProps {
        &self.props
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_mounted(&self) -> bool {
        self.backend.is_initialized()
    }

    /// Features of the last successful clustering pass
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Markers currently handed to the backend
    pub fn markers(&self) -> &[MarkerDescriptor] {
        &self.markers
    }

    pub fn overlay_scene(&self) -> &OverlayScene {
        &self.overlay_scene
    }

    /// Last settled region
    pub fn region(&self) -> Option<Region> {
        self.tracker.region()
    }

    pub fn scene(&self) -> serde_json::Value {
        self.backend.scene()
    }

    /// Initialize the backend in `container`
    ///
    /// Returns `false` when initialization has to wait (container not laid out,
    /// missing access token); call again on the next layout pass.
    pub fn mount(&mut self, container: Container) -> bool {
        if self.backend.is_initialized() {
            return true;
        }
        if let Err(e) = self.backend.initialize(&container, &self.props.region) {
            tracing::warn!(backend = %self.backend.kind(), error = %e, "map initialization deferred");
            return false;
        }

        log_failure("gestures", self.backend.set_gestures(&self.props.gestures));
        self.settle(self.props.region);
        self.fit_to_waypoints();
        self.render_overlay();
        tracing::debug!(
            backend = %self.backend.kind(),
            waypoints = self.props.waypoints.len(),
            "map mounted"
        );
        true
    }

    /// Replace the props and apply what changed
    pub fn update(&mut self, props: MapProps) {
        let previous = std::mem::replace(&mut self.props, props);

        let waypoints_changed = previous.waypoints != self.props.waypoints;
        let mode_changed = previous.drawing_mode != self.props.drawing_mode;
        if waypoints_changed {
            self.clusterer.set_waypoints(self.props.waypoints.clone());
        }
        if mode_changed {
            self.clusterer.set_drawing_mode(self.props.drawing_mode);
        }

        if !self.backend.is_initialized() {
            return;
        }

        if previous.gestures != self.props.gestures {
            log_failure("gestures", self.backend.set_gestures(&self.props.gestures));
        }

        let mut markers_dirty =
            waypoints_changed || mode_changed || previous.selected_pin != self.props.selected_pin;
        if previous.region != self.props.region
            && self.move_camera(self.props.region, REGION_PROP_ANIMATION)
        {
            markers_dirty = false;
        }
        if waypoints_changed && self.fit_to_waypoints() {
            markers_dirty = false;
        }
        if markers_dirty {
            self.recluster();
        }

        if mode_changed
            || previous.route_path != self.props.route_path
            || previous.pen_path != self.props.pen_path
            || previous.route_style != self.props.route_style
            || previous.show_start_end_markers != self.props.show_start_end_markers
        {
            self.render_overlay();
        }
    }

    /// Route a host input event
    pub fn handle_event(&mut self, event: MapEvent) -> EventFlow {
        if !self.backend.is_initialized() {
            return EventFlow::Continue;
        }

        match event {
            MapEvent::Press(coordinate) => {
                if let Some(on_press) = self.callbacks.on_press.as_mut() {
                    on_press(PressEvent { coordinate });
                }
                EventFlow::Continue
            }
            MapEvent::MarkerPress(MarkerKey::Waypoint(id)) => {
                let handled = self
                    .callbacks
                    .on_marker_press
                    .as_mut()
                    .map_or(false, |on_marker_press| on_marker_press(id.as_str()));
                if !handled {
                    log_failure("callout", self.backend.show_callout(&id));
                }
                EventFlow::Stop
            }
            MapEvent::MarkerPress(MarkerKey::Cluster(id)) => {
                self.expand_cluster(id);
                EventFlow::Stop
            }
            MapEvent::RegionChange(region) => {
                self.tracker.region_changing(region);
                EventFlow::Continue
            }
            MapEvent::RegionChangeComplete(region) => {
                self.settle(region);
                EventFlow::Continue
            }
        }
    }

    /// Release the backend and forget every derived state
    pub fn unmount(&mut self) {
        if self.backend.is_initialized() {
            self.backend.release();
            tracing::debug!(backend = %self.backend.kind(), "map unmounted");
        }
        self.tracker.reset();
        self.features.clear();
        self.markers.clear();
        self.overlay_scene = OverlayScene::default();
    }

    fn expand_cluster(&mut self, id: ClusterId) {
        match self.clusterer.expand(id) {
            Ok(expansion) => {
                tracing::debug!(
                    cluster = %id,
                    leaves = expansion.leaves.len(),
                    expansion_zoom = expansion.expansion_zoom,
                    "expanding cluster"
                );
                self.move_camera(expansion.region, CLUSTER_PRESS_ANIMATION);
            }
            Err(e) => tracing::warn!(cluster = %id, error = %e, "cluster expansion failed"),
        }
    }

    /// Fit the camera to the waypoints when the backend wants to; true if it moved
    fn fit_to_waypoints(&mut self) -> bool {
        match self.backend.waypoints_changed(&self.props.waypoints) {
            Ok(Some(region)) => {
                self.settle(region);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "fit to waypoints failed");
                false
            }
        }
    }

    /// Animate to `region` and settle there; false if the region was rejected
    fn move_camera(&mut self, region: Region, duration: Duration) -> bool {
        if let Err(e) = Viewport::from_region(&region, self.backend.zoom_policy()) {
            tracing::warn!(error = %e, "ignoring camera move");
            return false;
        }
        log_failure(
            "animate to region",
            self.backend.animate_to_region(&region, duration),
        );
        self.settle(region)
    }

    fn settle(&mut self, region: Region) -> bool {
        match self.tracker.region_change_complete(region) {
            Ok(_) => {
                self.recluster();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring region change");
                false
            }
        }
    }

    fn recluster(&mut self) {
        let Some(viewport) = self.tracker.viewport() else {
            return;
        };
        let features = match self.clusterer.query(&viewport) {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(error = %e, "clustering failed, keeping previous markers");
                return;
            }
        };

        let ctx = MarkerContext {
            drawing_mode: self.props.drawing_mode,
            selected: self.props.selected_pin.as_deref(),
            total: self.props.waypoints.len(),
        };
        let markers = self.renderer.render_all(&features, &ctx);
        if let Err(e) = self.backend.set_markers(&markers) {
            tracing::warn!(error = %e, "marker update failed, keeping previous markers");
            return;
        }

        tracing::debug!(
            zoom = viewport.zoom,
            features = features.len(),
            clusters = features.iter().filter(|f| f.is_cluster()).count(),
            bypassed = self.clusterer.is_bypassed(),
            "re-clustered"
        );
        self.features = features;
        self.markers = markers;
    }

    fn render_overlay(&mut self) {
        let scene = self.overlay.build(&OverlayInput {
            drawing_mode: self.props.drawing_mode,
            route_path: &self.props.route_path,
            pen_path: &self.props.pen_path,
            style: &self.props.route_style,
            show_start_end_markers: self.props.show_start_end_markers,
        });
        match self.backend.set_overlay(&scene) {
            Ok(()) => self.overlay_scene = scene,
            Err(e) => tracing::warn!(error = %e, "overlay update failed"),
        }
    }
}

impl<B: MapBackend> MapHandle for MapView<B> {
    fn animate_to_region(&mut self, region: Region, duration: Duration) {
        if !self.backend.is_initialized() {
            tracing::warn!("animate_to_region called before mount");
            return;
        }
        self.move_camera(region, duration);
    }
}

impl MapView<WebBackend> {
    pub fn camera(&self) -> Option<WebCamera> {
        self.backend.camera()
    }
}

impl MapView<NativeBackend> {
    pub fn take_snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot> {
        self.backend.take_snapshot(options)
    }
}

impl<B: MapBackend> Drop for MapView<B> {
    fn drop(&mut self) {
        if self.backend.is_initialized() {
            self.backend.release();
        }
    }
}

fn log_failure(operation: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "map backend call failed");
    }
}
