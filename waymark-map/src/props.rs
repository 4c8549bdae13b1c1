//! Props and callbacks of the map component

use std::fmt;

use waymark_common::{Coordinate, DrawingMode, Region, RoutePath, Waypoint};

use crate::overlay::RouteStyle;

/// Gesture toggles forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct GestureSettings {
    pub scroll_enabled: bool,
    pub zoom_enabled: bool,
    pub pitch_enabled: bool,
    pub rotate_enabled: bool,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            scroll_enabled: true,
            zoom_enabled: true,
            pitch_enabled: true,
            rotate_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapProps {
    pub waypoints: Vec<Waypoint>,
    /// Region the camera animates to whenever this prop changes
    pub region: Region,
    pub route_path: RoutePath,
    /// Freehand pen drawing
    pub pen_path: RoutePath,
    pub route_style: RouteStyle,
    pub drawing_mode: Option<DrawingMode>,
    pub selected_pin: Option<String>,
    pub gestures: GestureSettings,
    pub show_start_end_markers: bool,
}

impl MapProps {
    pub fn new(region: Region) -> Self {
        Self {
            waypoints: Vec::new(),
            region,
            route_path: Vec::new(),
            pen_path: Vec::new(),
            route_style: RouteStyle::default(),
            drawing_mode: None,
            selected_pin: None,
            gestures: GestureSettings::default(),
            show_start_end_markers: false,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_route_path(mut self, path: RoutePath) -> Self {
        self.route_path = path;
        self
    }

    pub fn with_pen_path(mut self, path: RoutePath) -> Self {
        self.pen_path = path;
        self
    }

    pub fn with_route_style(mut self, style: RouteStyle) -> Self {
        self.route_style = style;
        self
    }

    pub fn with_drawing_mode(mut self, mode: Option<DrawingMode>) -> Self {
        self.drawing_mode = mode;
        self
    }

    pub fn with_selected_pin(mut self, id: Option<String>) -> Self {
        self.selected_pin = id;
        self
    }

    pub fn with_gestures(mut self, gestures: GestureSettings) -> Self {
        self.gestures = gestures;
        self
    }

    pub fn with_start_end_markers(mut self, show: bool) -> Self {
        self.show_start_end_markers = show;
        self
    }
}

/// A tap on the map surface outside any marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressEvent {
    pub coordinate: Coordinate,
}

type PressHandler = Box<dyn FnMut(PressEvent)>;
type MarkerPressHandler = Box<dyn FnMut(&str) -> bool>;

/// Caller hooks; both are optional
#[derive(Default)]
pub struct MapCallbacks {
    pub on_press: Option<PressHandler>,
    /// Returns `true` when the press was handled; `false` lets the backend show the
    /// marker's callout
    pub on_marker_press: Option<MarkerPressHandler>,
}

impl MapCallbacks {
    pub fn on_press(mut self, handler: impl FnMut(PressEvent) + 'static) -> Self {
        self.on_press = Some(Box::new(handler));
        self
    }

    pub fn on_marker_press(mut self, handler: impl FnMut(&str) -> bool + 'static) -> Self {
        self.on_marker_press = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for MapCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapCallbacks")
            .field("on_press", &self.on_press.is_some())
            .field("on_marker_press", &self.on_marker_press.is_some())
            .finish()
    }
}
