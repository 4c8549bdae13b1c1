//! Route and pen drawing overlay
//!
//! Independent of clustering: it reads the caller's recorded route and freehand pen
//! path and produces polylines plus a few fixed indicator markers. Nothing is drawn
//! unless a drawing mode is active.

use geo::{Distance, Haversine, Point};
use serde::Serialize;
use waymark_common::{Color, Coordinate, DrawingMode, Palette};

pub const DEFAULT_ROUTE_WIDTH: f32 = 3.0;
pub const PEN_WIDTH: f32 = 8.0;
pub const PEN_POINT_SIZE: u32 = 8;
pub const START_END_MARKER_SIZE: u32 = 14;

/// Caller styling for the recorded route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStyle {
    pub width: f32,
    /// `None` uses the palette's route path color
    pub color: Option<Color>,
}

impl Default for RouteStyle {
    fn default() -> Self {
        Self {
            width: DEFAULT_ROUTE_WIDTH,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolylineKind {
    Route,
    Pen,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub kind: PolylineKind,
    pub coordinates: Vec<Coordinate>,
    pub width: f32,
    pub color: Color,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Great-circle segments when true, straight screen segments otherwise
    pub geodesic: bool,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMarkerKind {
    Start,
    End,
    PenPoint,
}

/// Non-interactive indicator marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayMarker {
    pub kind: OverlayMarkerKind,
    pub coordinate: Coordinate,
    pub color: Color,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OverlayScene {
    pub polylines: Vec<Polyline>,
    pub markers: Vec<OverlayMarker>,
}

impl OverlayScene {
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty() && self.markers.is_empty()
    }
}

/// Inputs of one overlay pass
#[derive(Debug, Clone, Copy)]
pub struct OverlayInput<'a> {
    pub drawing_mode: Option<DrawingMode>,
    pub route_path: &'a [Coordinate],
    pub pen_path: &'a [Coordinate],
    pub style: &'a RouteStyle,
    pub show_start_end_markers: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RouteOverlay {
    palette: Palette,
}

impl RouteOverlay {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn build(&self, input: &OverlayInput<'_>) -> OverlayScene {
        let mut scene = OverlayScene::default();
        if input.drawing_mode.is_none() {
            return scene;
        }

        if input.route_path.len() >= 2 {
            scene.polylines.push(Polyline {
                kind: PolylineKind::Route,
                coordinates: input.route_path.to_vec(),
                width: input.style.width,
                color: input.style.color.unwrap_or(self.palette.route_path),
                cap: LineCap::Butt,
                join: LineJoin::Miter,
                geodesic: false,
                length_m: path_length_m(input.route_path),
            });

            if input.show_start_end_markers {
                let last = input.route_path.len() - 1;
                scene.markers.push(OverlayMarker {
                    kind: OverlayMarkerKind::Start,
                    coordinate: input.route_path[0],
                    color: self.palette.start,
                    size: START_END_MARKER_SIZE,
                });
                scene.markers.push(OverlayMarker {
                    kind: OverlayMarkerKind::End,
                    coordinate: input.route_path[last],
                    color: self.palette.end,
                    size: START_END_MARKER_SIZE,
                });
            }
        }

        match input.pen_path {
            [] => {}
            [point] => scene.markers.push(OverlayMarker {
                kind: OverlayMarkerKind::PenPoint,
                coordinate: *point,
                color: self.palette.pen,
                size: PEN_POINT_SIZE,
            }),
            path => scene.polylines.push(Polyline {
                kind: PolylineKind::Pen,
                coordinates: path.to_vec(),
                width: PEN_WIDTH,
                color: self.palette.pen,
                cap: LineCap::Round,
                join: LineJoin::Round,
                geodesic: false,
                length_m: path_length_m(path),
            }),
        }

        scene
    }
}

/// Sum of haversine segment lengths in meters
pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2)
        .map(|pair| {
            let a = Point::new(pair[0].longitude, pair[0].latitude);
            let b = Point::new(pair[1].longitude, pair[1].latitude);
            Haversine::distance(a, b)
        })
        .sum()
}
