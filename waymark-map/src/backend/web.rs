//! Web GL map SDK model: center/zoom camera, style document, DOM markers
//!
//! Routes and pen strokes become GeoJSON sources with line layers. Markers are
//! fixed-size badges, so the advisory marker size is ignored. The first non-empty
//! waypoint list of a mount fits the camera to the waypoints once.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use waymark_cluster::{zoom_from_delta, BoundingBox, ZoomPolicy};
use waymark_common::{Coordinate, Error, MapConfig, MapStyle, Region, Result, Waypoint};

use super::{BackendKind, Callout, Container, MapBackend};
use crate::camera::{fit_bounds, region_for_camera, CameraTransition};
use crate::marker::{MarkerDescriptor, MarkerShape};
use crate::overlay::{OverlayScene, Polyline, PolylineKind};
use crate::props::GestureSettings;

/// Padding around the waypoints when fitting the camera
pub const FIT_PADDING: u32 = 50;

/// Upper zoom bound for fitting
pub const FIT_MAX_ZOOM: f64 = 15.0;

/// Pitch used when terrain is enabled
pub const TERRAIN_PITCH: f64 = 45.0;

/// Diameter of a web leaf marker
pub const WEB_MARKER_SIZE: u32 = 24;

const TERRAIN_SOURCE: &str = "mapbox-dem";
const TERRAIN_SOURCE_URL: &str = "mapbox://mapbox.mapbox-terrain-dem-v1";

fn style_url(style: MapStyle) -> &'static str {
    match style {
        MapStyle::Standard => "mapbox://styles/mapbox/streets-v12",
        MapStyle::Satellite => "mapbox://styles/mapbox/satellite-streets-v12",
        MapStyle::Dark => "mapbox://styles/mapbox/dark-v11",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WebCamera {
    pub center: Coordinate,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone)]
pub struct WebBackend {
    access_token: Option<String>,
    style: MapStyle,
    terrain: bool,
    cluster_radius: f64,
    container: Option<Container>,
    camera: Option<WebCamera>,
    gestures: GestureSettings,
    markers: Vec<MarkerDescriptor>,
    overlay: OverlayScene,
    popup: Option<Callout>,
    fitted: bool,
    last_transition: Option<CameraTransition>,
}

impl WebBackend {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            style: config.style,
            terrain: config.terrain,
            cluster_radius: config.clustering.web_radius,
            container: None,
            camera: None,
            gestures: GestureSettings::default(),
            markers: Vec::new(),
            overlay: OverlayScene::default(),
            popup: None,
            fitted: false,
            last_transition: None,
        }
    }

    pub fn camera(&self) -> Option<WebCamera> {
        self.camera
    }

    pub fn style_url(&self) -> &'static str {
        style_url(self.style)
    }

    pub fn markers(&self) -> &[MarkerDescriptor] {
        &self.markers
    }

    pub fn popup(&self) -> Option<&Callout> {
        self.popup.as_ref()
    }

    /// Whether the camera was already fitted to the waypoints during this mount
    pub fn has_fitted(&self) -> bool {
        self.fitted
    }

    pub fn last_transition(&self) -> Option<&CameraTransition> {
        self.last_transition.as_ref()
    }

    fn camera_for(&self, center: Coordinate, zoom: f64) -> WebCamera {
        WebCamera {
            center,
            zoom,
            pitch: if self.terrain { TERRAIN_PITCH } else { 0.0 },
            bearing: self.camera.map_or(0.0, |c| c.bearing),
        }
    }

    fn ensure_initialized(&self) -> Result<Container> {
        self.container.ok_or(Error::BackendNotInitialized)
    }

    fn sources(&self) -> Value {
        let mut sources = serde_json::Map::new();
        for line in &self.overlay.polylines {
            let name = match line.kind {
                PolylineKind::Route => "route",
                PolylineKind::Pen => "pen",
            };
            sources.insert(name.to_string(), line_source(line));
        }
        if self.terrain {
            sources.insert(
                TERRAIN_SOURCE.to_string(),
                json!({
                    "type": "raster-dem",
                    "url": TERRAIN_SOURCE_URL,
                    "tileSize": 512,
                    "maxzoom": 14,
                }),
            );
        }
        Value::Object(sources)
    }

    fn layers(&self) -> Vec<Value> {
        let mut layers: Vec<Value> = self
            .overlay
            .polylines
            .iter()
            .map(|line| {
                let id = match line.kind {
                    PolylineKind::Route => "route",
                    PolylineKind::Pen => "pen",
                };
                json!({
                    "id": format!("{id}-line"),
                    "type": "line",
                    "source": id,
                    "layout": { "line-cap": line.cap, "line-join": line.join },
                    "paint": { "line-color": line.color, "line-width": line.width },
                })
            })
            .collect();

        if self.terrain {
            layers.push(json!({
                "id": "3d-buildings",
                "source": "composite",
                "source-layer": "building",
                "type": "fill-extrusion",
                "minzoom": 15,
                "paint": {
                    "fill-extrusion-color": "#aaa",
                    "fill-extrusion-height": ["get", "height"],
                    "fill-extrusion-base": ["get", "min_height"],
                    "fill-extrusion-opacity": 0.6,
                },
            }));
        }
        layers
    }

    fn dom_markers(&self) -> Vec<Value> {
        self.markers
            .iter()
            .map(|marker| {
                let size = match marker.shape {
                    MarkerShape::ClusterBadge => marker.size,
                    MarkerShape::Circle => WEB_MARKER_SIZE,
                };
                json!({
                    "id": marker.id,
                    "lngLat": [marker.coordinate.longitude, marker.coordinate.latitude],
                    "size": size,
                    "color": marker.color,
                    "border": marker.border,
                    "label": marker.label,
                    "labelColor": marker.label_color,
                    "selected": marker.selected,
                })
            })
            .collect()
    }
}

fn line_source(line: &Polyline) -> Value {
    let coordinates: Vec<[f64; 2]> = line
        .coordinates
        .iter()
        .map(|c| [c.longitude, c.latitude])
        .collect();
    json!({
        "type": "geojson",
        "data": {
            "type": "Feature",
            "properties": { "lengthMeters": line.length_m },
            "geometry": { "type": "LineString", "coordinates": coordinates },
        },
    })
}

impl MapBackend for WebBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Web
    }

    fn zoom_policy(&self) -> ZoomPolicy {
        ZoomPolicy::Rounded
    }

    fn cluster_radius(&self) -> f64 {
        self.cluster_radius
    }

    fn initialize(&mut self, container: &Container, region: &Region) -> Result<()> {
        if !container.is_ready() {
            return Err(Error::ContainerNotReady);
        }
        if self
            .access_token
            .as_deref()
            .map_or(true, |token| token.trim().is_empty())
        {
            return Err(Error::MissingAccessToken);
        }

        self.container = Some(*container);
        self.camera = Some(self.camera_for(region.center(), zoom_from_delta(region.latitude_delta)));
        tracing::debug!(
            style = self.style_url(),
            terrain = self.terrain,
            width = container.width,
            height = container.height,
            "web map initialized"
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
        let from = self.current_region().unwrap_or(*region);
        self.camera = Some(self.camera_for(region.center(), zoom_from_delta(region.latitude_delta)));
        self.last_transition = Some(CameraTransition::new(from, *region, duration));
        Ok(())
    }

    fn set_markers(&mut self, markers: &[MarkerDescriptor]) -> Result<()> {
        self.ensure_initialized()?;
        self.markers = markers.to_vec();
        if let Some(popup) = &self.popup {
            if Callout::for_marker(&self.markers, &popup.marker_id).is_none() {
                self.popup = None;
            }
        }
        Ok(())
    }

    fn set_overlay(&mut self, overlay: &OverlayScene) -> Result<()> {
        self.ensure_initialized()?;
        self.overlay = overlay.clone();
        Ok(())
    }

    fn waypoints_changed(&mut self, waypoints: &[Waypoint]) -> Result<Option<Region>> {
        let container = self.ensure_initialized()?;
        if self.fitted {
            return Ok(None);
        }

        let mut valid = waypoints.iter().filter(|w| w.is_valid());
        let Some(first) = valid.next() else {
            return Ok(None);
        };
        let mut bbox = BoundingBox {
            west: first.longitude,
            south: first.latitude,
            east: first.longitude,
            north: first.latitude,
        };
        for waypoint in valid {
            bbox.west = bbox.west.min(waypoint.longitude);
            bbox.east = bbox.east.max(waypoint.longitude);
            bbox.south = bbox.south.min(waypoint.latitude);
            bbox.north = bbox.north.max(waypoint.latitude);
        }

        let (center, zoom) = fit_bounds(
            &bbox,
            container.width,
            container.height,
            FIT_PADDING,
            FIT_MAX_ZOOM,
        );
        self.camera = Some(self.camera_for(center, zoom));
        self.fitted = true;

        let region = region_for_camera(center, zoom, container.width, container.height);
        tracing::debug!(zoom, ?center, "fitted camera to waypoints");
        Ok(Some(region))
    }

    fn show_callout(&mut self, marker_id: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.popup = Callout::for_marker(&self.markers, marker_id);
        Ok(())
    }

    fn current_region(&self) -> Option<Region> {
        let container = self.container?;
        let camera = self.camera?;
        Some(region_for_camera(
            camera.center,
            camera.zoom,
            container.width,
            container.height,
        ))
    }

    fn release(&mut self) {
        self.container = None;
        self.camera = None;
        self.markers.clear();
        self.overlay = OverlayScene::default();
        self.popup = None;
        self.fitted = false;
        self.last_transition = None;
    }

    fn scene(&self) -> Value {
        json!({
            "backend": self.kind(),
            "style": {
                "url": self.style_url(),
                "sources": self.sources(),
                "layers": self.layers(),
                "terrain": self.terrain.then(|| json!({ "source": TERRAIN_SOURCE, "exaggeration": 1.5 })),
            },
            "camera": self.camera,
            "gestures": self.gestures,
            "markers": self.dom_markers(),
            "overlayMarkers": self.overlay.markers,
            "popup": self.popup,
        })
    }
}
